use tokio_tungstenite::tungstenite;

/// Broad classification of a failed attempt, used by callers to decide whether
/// another attempt is worthwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The server sent something out of order or unparseable.
    Protocol,
    /// The connection could not be opened, dropped, or timed out.
    Transport,
    /// The stream completed structurally but produced no usable output.
    Semantic,
    /// The request could not be built from the supplied settings.
    Configuration,
    /// The caller asked for the attempt to stop.
    Cancelled,
}

/// Errors produced by a single realtime session attempt.
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error(
        "Expected 'session.created', got '{event}'{}",
        detail.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default()
    )]
    UnexpectedFirstEvent {
        event: String,
        /// The server's explanation when the first event was an `error`.
        detail: Option<String>,
    },
    #[error("Malformed server event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
    #[error("Invalid audio delta: {0}")]
    InvalidAudio(#[from] base64::DecodeError),
    #[error("Unexpected event '{event}' while {state:?}")]
    OutOfOrder {
        event: String,
        state: crate::session::SessionState,
    },
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("Connection closed before response.done")]
    Closed,
    #[error("Server reported an error: {0}")]
    Server(String),
    #[error("Transcript is empty after response.")]
    EmptyTranscript,
    #[error("Audio is empty after response.")]
    EmptyAudio,
    #[error("Invalid realtime endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("Session attempt was cancelled")]
    Cancelled,
}

impl RealtimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedFirstEvent { .. }
            | Self::MalformedEvent(_)
            | Self::InvalidAudio(_)
            | Self::OutOfOrder { .. }
            | Self::Server(_) => ErrorKind::Protocol,
            Self::WebSocket(_) | Self::Timeout(_) | Self::Closed => ErrorKind::Transport,
            Self::EmptyTranscript | Self::EmptyAudio => ErrorKind::Semantic,
            Self::InvalidEndpoint(_) => ErrorKind::Configuration,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Whether a fresh attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Protocol | ErrorKind::Transport | ErrorKind::Semantic
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            RealtimeError::UnexpectedFirstEvent {
                event: "error".into(),
                detail: None,
            }
            .kind(),
            ErrorKind::Protocol
        );
        assert_eq!(RealtimeError::Closed.kind(), ErrorKind::Transport);
        assert_eq!(RealtimeError::Timeout("session.created").kind(), ErrorKind::Transport);
        assert_eq!(RealtimeError::EmptyTranscript.kind(), ErrorKind::Semantic);
        assert_eq!(
            RealtimeError::InvalidEndpoint("ftp://x".into()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(RealtimeError::EmptyTranscript.is_retryable());
        assert!(RealtimeError::Closed.is_retryable());
        assert!(RealtimeError::Server("rate limited".into()).is_retryable());
        assert!(!RealtimeError::Cancelled.is_retryable());
        assert!(!RealtimeError::InvalidEndpoint("ftp://x".into()).is_retryable());
    }

    #[test]
    fn test_unexpected_first_event_message_keeps_detail() {
        let err = RealtimeError::UnexpectedFirstEvent {
            event: "error".into(),
            detail: Some("401: Access denied due to invalid subscription key.".into()),
        };
        assert_eq!(
            err.to_string(),
            "Expected 'session.created', got 'error' (401: Access denied due to invalid subscription key.)"
        );

        let err = RealtimeError::UnexpectedFirstEvent {
            event: "response.done".into(),
            detail: None,
        };
        assert_eq!(err.to_string(), "Expected 'session.created', got 'response.done'");
    }

    #[test]
    fn test_empty_transcript_message() {
        assert_eq!(
            RealtimeError::EmptyTranscript.to_string(),
            "Transcript is empty after response."
        );
    }
}
