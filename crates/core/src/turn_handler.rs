//! Turn Handler
//!
//! The per-turn entry point: resolves the turn plan, then runs the realtime
//! session under the retry policy until it yields audio and a transcript.

use crate::{
    retry::{RetryError, RetryPolicy, with_retry},
    turn_policy::{self, CredentialSlot, Speaker},
};
use async_trait::async_trait;
use openai_realtime::{
    CancelHandle, CancelSignal, Credentials, GeneratedSpeech, RealtimeClient, RealtimeError,
    SpeechRequest, cancel_pair,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Produces one spoken line. Implemented by [`RealtimeClient`]; abstracted so
/// the handler can be exercised without a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    /// A single attempt. Must not retry internally.
    async fn generate(
        &self,
        credentials: &Credentials,
        request: &SpeechRequest,
        cancel: &CancelSignal,
    ) -> Result<GeneratedSpeech, RealtimeError>;
}

#[async_trait]
impl SpeechGenerator for RealtimeClient {
    async fn generate(
        &self,
        credentials: &Credentials,
        request: &SpeechRequest,
        cancel: &CancelSignal,
    ) -> Result<GeneratedSpeech, RealtimeError> {
        self.run_once(credentials, request, cancel).await
    }
}

/// Everything the caller knows about the conversation before this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationState {
    pub podcast_script: String,
    /// All previous lines, newline-separated.
    pub combined_transcript: String,
    pub audience_question: Option<String>,
    pub turn: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnResult {
    pub speaker: Speaker,
    pub transcript: String,
    pub audio_base64: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TurnHandlingError {
    #[error("Failed to handle turn {turn}: {source}")]
    Generation {
        turn: u32,
        #[source]
        source: RetryError<RealtimeError>,
    },
    #[error("Turn handler is not running")]
    NotRunning,
}

pub struct TurnHandler {
    generator: Arc<dyn SpeechGenerator>,
    primary: Credentials,
    secondary: Credentials,
    retry: RetryPolicy,
    running: Mutex<Option<CancelHandle>>,
}

impl TurnHandler {
    /// Creates a stopped handler; call [`TurnHandler::start`] before handling turns.
    pub fn new(
        generator: Arc<dyn SpeechGenerator>,
        primary: Credentials,
        secondary: Credentials,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            generator,
            primary,
            secondary,
            retry,
            running: Mutex::new(None),
        }
    }

    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_none() {
            let (handle, _) = cancel_pair();
            *running = Some(handle);
            info!(
                max_attempts = self.retry.max_attempts,
                retry_delay_secs = self.retry.delay.as_secs_f64(),
                "Turn handler started"
            );
        }
    }

    /// Cancels every in-flight attempt and rejects new turns until restarted.
    pub async fn stop(&self) {
        if let Some(handle) = self.running.lock().await.take() {
            handle.cancel();
            info!("Turn handler stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    fn credentials(&self, slot: CredentialSlot) -> &Credentials {
        match slot {
            CredentialSlot::Primary => &self.primary,
            CredentialSlot::Secondary => &self.secondary,
        }
    }

    pub async fn handle_turn(
        &self,
        state: &ConversationState,
    ) -> Result<TurnResult, TurnHandlingError> {
        let cancel = self
            .running
            .lock()
            .await
            .as_ref()
            .map(CancelHandle::signal)
            .ok_or(TurnHandlingError::NotRunning)?;

        debug!(
            turn = state.turn,
            audience_question = ?state.audience_question,
            "Handling turn"
        );
        let plan = turn_policy::decide(
            state.turn,
            &state.podcast_script,
            state.audience_question.as_deref(),
        );
        let speaker = plan.speaker();
        let credentials = self.credentials(plan.credential_slot());
        let request = SpeechRequest {
            speaker: speaker.name().to_string(),
            voice: plan.voice().to_string(),
            instructions: plan.instructions().to_string(),
            transcript: state.combined_transcript.clone(),
        };

        info!(turn = state.turn, %speaker, "Generating response");
        let generator = self.generator.as_ref();
        let request = &request;
        let signal = &cancel;
        let speech = with_retry(&self.retry, &cancel, move |attempt| async move {
            debug!(attempt, "Starting realtime attempt");
            generator.generate(credentials, request, signal).await
        })
        .await
        .map_err(|source| {
            error!(turn = state.turn, error = %source, "Failed to handle turn");
            TurnHandlingError::Generation {
                turn: state.turn,
                source,
            }
        })?;

        info!(turn = state.turn, %speaker, "Turn handled successfully");
        Ok(TurnResult {
            speaker,
            transcript: speech.transcript,
            audio_base64: speech.audio_base64,
        })
    }
}
