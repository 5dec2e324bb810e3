//! Network-free state machine for one realtime response attempt.
//!
//! The driver in [`crate::client`] owns the socket and feeds every inbound
//! event through [`SessionMachine::on_event`]; the machine decides what the
//! event means at the current point in the exchange and accumulates the
//! response payload.

use crate::{error::RealtimeError, types::ServerEvent};
use base64::Engine;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingSessionCreated,
    Configuring,
    AwaitingCompletion,
    Completed,
    Failed,
}

/// What the driver should do after an event has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Keep reading.
    Continue,
    /// The session exists; send the configuration and response request.
    Configure,
    /// The response is complete; stop reading.
    Done,
}

/// Output of a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSpeech {
    /// Base64 of the concatenated PCM16 audio deltas.
    pub audio_base64: String,
    pub transcript: String,
}

#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    audio: Vec<u8>,
    transcript: String,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Connecting,
            audio: Vec::new(),
            transcript: String::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn audio_len(&self) -> usize {
        self.audio.len()
    }

    /// The socket is open; the first inbound event must now be `session.created`.
    pub fn connected(&mut self) {
        self.transition(SessionState::AwaitingSessionCreated);
    }

    /// Both configuration messages have been sent.
    pub fn configured(&mut self) -> Result<(), RealtimeError> {
        if self.state != SessionState::Configuring {
            return self.fail(RealtimeError::OutOfOrder {
                event: "configured".to_string(),
                state: self.state,
            });
        }
        self.transition(SessionState::AwaitingCompletion);
        Ok(())
    }

    /// Whether a `response.create` has gone out and not yet finished.
    pub fn response_in_flight(&self) -> bool {
        self.state == SessionState::AwaitingCompletion
    }

    pub fn on_event(&mut self, event: ServerEvent) -> Result<Step, RealtimeError> {
        match self.state {
            SessionState::AwaitingSessionCreated => match event {
                ServerEvent::SessionCreated => {
                    self.transition(SessionState::Configuring);
                    Ok(Step::Configure)
                }
                other => {
                    let detail = match &other {
                        ServerEvent::Error { error } => Some(error.describe()),
                        _ => None,
                    };
                    self.fail(RealtimeError::UnexpectedFirstEvent {
                        event: other.name().to_string(),
                        detail,
                    })
                }
            },
            SessionState::AwaitingCompletion => match event {
                ServerEvent::ResponseAudioDelta { delta } => {
                    let bytes = match base64::engine::general_purpose::STANDARD.decode(delta) {
                        Ok(bytes) => bytes,
                        Err(e) => return self.fail(e.into()),
                    };
                    debug!(bytes = bytes.len(), "Appended audio delta");
                    self.audio.extend_from_slice(&bytes);
                    Ok(Step::Continue)
                }
                ServerEvent::ResponseAudioTranscriptDone { transcript } => {
                    debug!("Received completed transcript");
                    self.transcript = transcript;
                    Ok(Step::Continue)
                }
                ServerEvent::ResponseDone => {
                    self.transition(SessionState::Completed);
                    Ok(Step::Done)
                }
                ServerEvent::Error { error } => self.fail(RealtimeError::Server(error.describe())),
                ServerEvent::SessionCreated | ServerEvent::Other => Ok(Step::Continue),
            },
            state => self.fail(RealtimeError::OutOfOrder {
                event: event.name().to_string(),
                state,
            }),
        }
    }

    /// Marks the attempt as failed and hands the error back for propagation.
    pub fn fail<T>(&mut self, error: RealtimeError) -> Result<T, RealtimeError> {
        self.transition(SessionState::Failed);
        Err(error)
    }

    /// Checks the post-conditions of a completed stream and encodes the audio.
    pub fn finish(self) -> Result<GeneratedSpeech, RealtimeError> {
        if self.state != SessionState::Completed {
            return Err(RealtimeError::Closed);
        }
        if self.transcript.is_empty() {
            return Err(RealtimeError::EmptyTranscript);
        }
        if self.audio.is_empty() {
            return Err(RealtimeError::EmptyAudio);
        }
        Ok(GeneratedSpeech {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(&self.audio),
            transcript: self.transcript,
        })
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    fn ready_machine() -> SessionMachine {
        let mut machine = SessionMachine::new();
        machine.connected();
        assert_eq!(machine.on_event(ServerEvent::SessionCreated).unwrap(), Step::Configure);
        machine.configured().unwrap();
        machine
    }

    fn delta(bytes: &[u8]) -> ServerEvent {
        ServerEvent::ResponseAudioDelta {
            delta: STANDARD.encode(bytes),
        }
    }

    #[test]
    fn test_audio_deltas_concatenate_in_arrival_order() {
        let mut machine = ready_machine();
        machine.on_event(delta(&[1, 2])).unwrap();
        machine.on_event(delta(&[3])).unwrap();
        machine.on_event(delta(&[4, 5, 6])).unwrap();
        machine
            .on_event(ServerEvent::ResponseAudioTranscriptDone {
                transcript: "Dan: welcome back".into(),
            })
            .unwrap();
        assert_eq!(machine.on_event(ServerEvent::ResponseDone).unwrap(), Step::Done);

        let speech = machine.finish().unwrap();
        assert_eq!(STANDARD.decode(speech.audio_base64).unwrap(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(speech.transcript, "Dan: welcome back");
    }

    #[test]
    fn test_done_without_transcript_is_failure() {
        let mut machine = ready_machine();
        machine.on_event(delta(&[7, 7])).unwrap();
        machine.on_event(ServerEvent::ResponseDone).unwrap();
        assert!(matches!(machine.finish(), Err(RealtimeError::EmptyTranscript)));
    }

    #[test]
    fn test_done_without_audio_is_failure() {
        let mut machine = ready_machine();
        machine
            .on_event(ServerEvent::ResponseAudioTranscriptDone {
                transcript: "Anna: hi".into(),
            })
            .unwrap();
        machine.on_event(ServerEvent::ResponseDone).unwrap();
        assert!(matches!(machine.finish(), Err(RealtimeError::EmptyAudio)));
    }

    #[test]
    fn test_last_transcript_wins() {
        let mut machine = ready_machine();
        machine.on_event(delta(&[0])).unwrap();
        for text in ["first", "second"] {
            machine
                .on_event(ServerEvent::ResponseAudioTranscriptDone {
                    transcript: text.into(),
                })
                .unwrap();
        }
        machine.on_event(ServerEvent::ResponseDone).unwrap();
        assert_eq!(machine.finish().unwrap().transcript, "second");
    }

    #[test]
    fn test_unexpected_first_event() {
        let mut machine = SessionMachine::new();
        machine.connected();
        let err = machine.on_event(ServerEvent::ResponseDone).unwrap_err();
        assert!(matches!(
            err,
            RealtimeError::UnexpectedFirstEvent { ref event, detail: None } if event == "response.done"
        ));
        assert_eq!(machine.state(), SessionState::Failed);
    }

    #[test]
    fn test_error_as_first_event_keeps_server_detail() {
        let mut machine = SessionMachine::new();
        machine.connected();
        let err = machine
            .on_event(ServerEvent::Error {
                error: crate::types::ApiErrorDetail {
                    r#type: Some("invalid_request_error".into()),
                    code: Some("429".into()),
                    message: "Too many requests".into(),
                },
            })
            .unwrap_err();
        match err {
            RealtimeError::UnexpectedFirstEvent { event, detail } => {
                assert_eq!(event, "error");
                assert_eq!(detail.as_deref(), Some("429: Too many requests"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_events_are_ignored_mid_stream() {
        let mut machine = ready_machine();
        assert_eq!(machine.on_event(ServerEvent::Other).unwrap(), Step::Continue);
        assert_eq!(machine.state(), SessionState::AwaitingCompletion);
    }

    #[test]
    fn test_server_error_fails_attempt() {
        let mut machine = ready_machine();
        let err = machine
            .on_event(ServerEvent::Error {
                error: crate::types::ApiErrorDetail {
                    r#type: None,
                    code: Some("rate_limit_exceeded".into()),
                    message: "slow down".into(),
                },
            })
            .unwrap_err();
        assert!(err.to_string().contains("slow down"));
        assert_eq!(machine.state(), SessionState::Failed);
    }

    #[test]
    fn test_invalid_base64_delta() {
        let mut machine = ready_machine();
        let err = machine
            .on_event(ServerEvent::ResponseAudioDelta {
                delta: "***".into(),
            })
            .unwrap_err();
        assert!(matches!(err, RealtimeError::InvalidAudio(_)));
    }

    #[test]
    fn test_events_before_connect_are_out_of_order() {
        let mut machine = SessionMachine::new();
        let err = machine.on_event(ServerEvent::SessionCreated).unwrap_err();
        assert!(matches!(
            err,
            RealtimeError::OutOfOrder {
                state: SessionState::Connecting,
                ..
            }
        ));
    }

    #[test]
    fn test_finish_before_done_is_closed() {
        let machine = ready_machine();
        assert!(matches!(machine.finish(), Err(RealtimeError::Closed)));
    }
}
