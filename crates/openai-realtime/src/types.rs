//! Wire types for the realtime speech protocol.
//!
//! Every message is a JSON object discriminated by its `type` field. Only the
//! events this client acts on are modelled; anything else deserializes to
//! [`ServerEvent::Other`].

use serde::{Deserialize, Serialize};

/// Sampling temperature used for both the session and each response.
pub const TEMPERATURE: f32 = 0.6;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Uncompressed 16-bit little-endian PCM.
    #[serde(rename = "pcm16")]
    Pcm16,
}

/// Session-wide settings sent with `session.update`.
#[derive(Serialize, Debug, Clone)]
pub struct SessionConfig {
    pub modalities: Vec<Modality>,
    pub instructions: String,
    pub voice: String,
    pub input_audio_format: AudioFormat,
    pub output_audio_format: AudioFormat,
    /// `None` serializes as `null`, which disables server-side voice activity detection.
    pub turn_detection: Option<serde_json::Value>,
    pub temperature: f32,
}

impl SessionConfig {
    pub fn new(instructions: String, voice: &str) -> Self {
        Self {
            modalities: vec![Modality::Text, Modality::Audio],
            instructions,
            voice: voice.to_string(),
            input_audio_format: AudioFormat::Pcm16,
            output_audio_format: AudioFormat::Pcm16,
            turn_detection: None,
            temperature: TEMPERATURE,
        }
    }
}

/// Per-response settings sent with `response.create`.
#[derive(Serialize, Debug, Clone)]
pub struct ResponseConfig {
    pub modalities: Vec<Modality>,
    pub voice: String,
    pub output_audio_format: AudioFormat,
    pub temperature: f32,
}

impl ResponseConfig {
    pub fn new(voice: &str) -> Self {
        Self {
            modalities: vec![Modality::Audio, Modality::Text],
            voice: voice.to_string(),
            output_audio_format: AudioFormat::Pcm16,
            temperature: TEMPERATURE,
        }
    }
}

/// Messages sent from this client to the realtime service.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionConfig },
    #[serde(rename = "response.create")]
    ResponseCreate { response: ResponseConfig },
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

impl ClientEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub r#type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl ApiErrorDetail {
    /// `code: message`, falling back to the error type when no code is given.
    pub fn describe(&self) -> String {
        match self.code.as_ref().or(self.r#type.as_ref()) {
            Some(code) => format!("{}: {}", code, self.message),
            None => self.message.clone(),
        }
    }
}

/// Messages received from the realtime service.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated,
    #[serde(rename = "response.audio.delta")]
    ResponseAudioDelta {
        /// Base64-encoded PCM16 chunk.
        #[serde(default)]
        delta: String,
    },
    #[serde(rename = "response.audio_transcript.done")]
    ResponseAudioTranscriptDone {
        #[serde(default)]
        transcript: String,
    },
    #[serde(rename = "response.done")]
    ResponseDone,
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: ApiErrorDetail,
    },
    #[serde(other)]
    Other,
}

impl ServerEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionCreated => "session.created",
            Self::ResponseAudioDelta { .. } => "response.audio.delta",
            Self::ResponseAudioTranscriptDone { .. } => "response.audio_transcript.done",
            Self::ResponseDone => "response.done",
            Self::Error { .. } => "error",
            Self::Other => "other",
        }
    }
}
