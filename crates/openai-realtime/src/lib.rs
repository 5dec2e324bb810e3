//! Client for the Azure OpenAI realtime speech endpoint.
//!
//! One [`RealtimeClient::run_once`] call is one attempt: a fresh WebSocket is
//! opened, the session is configured, a single audio+text response is
//! collected, and the socket is closed again. Retrying is the caller's job.

pub mod cancel;
pub mod client;
pub mod error;
pub mod session;
pub mod types;

pub use cancel::{CancelHandle, CancelSignal, cancel_pair};
pub use client::{
    Credentials, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT, RealtimeClient, SpeechRequest,
};
pub use error::{ErrorKind, RealtimeError};
pub use session::GeneratedSpeech;
