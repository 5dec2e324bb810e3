//! API Models
//!
//! Request and response bodies for the HTTP surface, with `utoipa` schemas for
//! the OpenAPI document.

use podcast_core::{
    turn_handler::{ConversationState, TurnResult},
    turn_policy::Speaker,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Debug)]
pub struct PodcastRequest {
    #[schema(example = "The history of the Rust programming language")]
    pub topic: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct PodcastScriptResponse {
    pub podcast_script: String,
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct TurnRequest {
    pub podcast_script: String,
    #[schema(example = "Dan: Welcome to the show!\nAnna: Thanks for having me.")]
    pub combined_transcript: String,
    #[serde(default)]
    #[schema(example = "What about bias?")]
    pub audience_question: Option<String>,
    #[schema(minimum = 0, example = 2)]
    pub turn: u32,
}

impl From<TurnRequest> for ConversationState {
    fn from(request: TurnRequest) -> Self {
        Self {
            podcast_script: request.podcast_script,
            combined_transcript: request.combined_transcript,
            audience_question: request.audience_question,
            turn: request.turn,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerName {
    Dan,
    Anna,
}

impl From<Speaker> for SpeakerName {
    fn from(speaker: Speaker) -> Self {
        match speaker {
            Speaker::Host => SpeakerName::Dan,
            Speaker::Guest => SpeakerName::Anna,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct TurnResponse {
    pub speaker: SpeakerName,
    pub transcript: String,
    /// Base64-encoded 24 kHz mono PCM16 audio.
    pub audio_base64: String,
}

impl From<TurnResult> for TurnResponse {
    fn from(result: TurnResult) -> Self {
        Self {
            speaker: result.speaker.into(),
            transcript: result.transcript,
            audio_base64: result.audio_base64,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
