//! Bounded retry with a fixed delay between attempts.

use openai_realtime::{CancelSignal, RealtimeError};
use std::{fmt, future::Future, time::Duration};
use tracing::{error, info};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Errors that know whether another attempt is worth making.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for RealtimeError {
    fn is_retryable(&self) -> bool {
        RealtimeError::is_retryable(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: fmt::Display> {
    #[error("All {attempts} retry attempts failed: {last}")]
    Exhausted { attempts: u32, last: E },
    #[error("Attempt {attempt} failed with a non-retryable error: {error}")]
    Aborted { attempt: u32, error: E },
    #[error("Cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E: fmt::Display> RetryError<E> {
    /// The underlying error of the final attempt, if one ran.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Aborted { error, .. } => Some(error),
            RetryError::Cancelled { .. } => None,
        }
    }
}

/// Calls `attempt` with the 1-based attempt number until it succeeds, fails
/// with a non-retryable error, or `policy.max_attempts` attempts have been made.
///
/// Attempts never overlap and share nothing: each call starts from scratch.
/// The delay between attempts is constant and observes `cancel`.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelSignal,
    mut attempt: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable + fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut number = 1;
    loop {
        let err = match attempt(number).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() {
            error!(attempt = number, error = %err, "Attempt failed with a non-retryable error");
            return Err(RetryError::Aborted {
                attempt: number,
                error: err,
            });
        }

        error!(attempt = number, error = %err, "Attempt failed");
        if number >= max_attempts {
            error!(attempts = number, "All retry attempts failed.");
            return Err(RetryError::Exhausted {
                attempts: number,
                last: err,
            });
        }

        info!(delay_secs = policy.delay.as_secs_f64(), "Retrying after delay");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts: number }),
            _ = tokio::time::sleep(policy.delay) => {}
        }
        number += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openai_realtime::cancel_pair;
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };
    use tokio::time::Instant;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_k_failures_with_k_delays() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result = with_retry(&policy(15), &CancelSignal::never(), |n| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if n <= 3 {
                    Err(RealtimeError::Closed)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_without_trailing_delay() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let result: Result<(), _> = with_retry(&policy(4), &CancelSignal::never(), |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RealtimeError::EmptyTranscript)
            }
        })
        .await;

        match result.unwrap_err() {
            RetryError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 4);
                assert!(matches!(last, RealtimeError::EmptyTranscript));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_stops_immediately() {
        let start = Instant::now();
        let result: Result<(), _> = with_retry(&policy(15), &CancelSignal::never(), |_| async {
            Err(RealtimeError::InvalidEndpoint("ftp://x".into()))
        })
        .await;

        assert!(matches!(result, Err(RetryError::Aborted { attempt: 1, .. })));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_tries_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = with_retry(&policy(0), &CancelSignal::never(), |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RealtimeError::Closed)
            }
        })
        .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay() {
        let (handle, signal) = cancel_pair();
        let result: Result<(), _> = with_retry(&policy(15), &signal, |n| {
            let handle = handle.clone();
            async move {
                if n == 2 {
                    handle.cancel();
                }
                Err(RealtimeError::Closed)
            }
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Cancelled { attempts: 2 }));
        assert!(err.last_error().is_none());
    }
}
