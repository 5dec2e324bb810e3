//! Axum Handlers for the REST API
//!
//! Script generation, turn handling, and the landing page. Failures are
//! logged in full but reported to the client with a fixed message only.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use podcast_core::turn_handler::ConversationState;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    models::{ErrorResponse, PodcastRequest, PodcastScriptResponse, TurnRequest, TurnResponse},
    state::AppState,
};

pub enum ApiError {
    NotFound(String),
    InternalServerError {
        message: &'static str,
        source: anyhow::Error,
    },
}

impl ApiError {
    /// An internal failure reported to the client as `message` only.
    pub fn internal(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::InternalServerError {
            message,
            source: source.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError { message, source } => {
                error!("Internal Server Error: {:?}", source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        message: message.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// Generate a podcast script for a topic.
#[utoipa::path(
    post,
    path = "/generate_podcast_script",
    request_body = PodcastRequest,
    responses(
        (status = 200, description = "Script generated", body = PodcastScriptResponse),
        (status = 500, description = "Generation failed", body = ErrorResponse)
    )
)]
pub async fn generate_podcast_script(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PodcastRequest>,
) -> Result<Json<PodcastScriptResponse>, ApiError> {
    info!(topic = %payload.topic, "Received request to generate podcast script");
    let podcast_script = state
        .podcast_generator
        .generate_full_podcast(&payload.topic)
        .await
        .map_err(|e| ApiError::internal("Failed to generate podcast script.", e))?;
    info!("Podcast script generated successfully.");
    Ok(Json(PodcastScriptResponse { podcast_script }))
}

/// Generate the next spoken turn of the conversation.
#[utoipa::path(
    post,
    path = "/next_turn",
    request_body = TurnRequest,
    responses(
        (status = 200, description = "Turn generated", body = TurnResponse),
        (status = 500, description = "Turn failed after all retries", body = ErrorResponse)
    )
)]
pub async fn next_turn(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    let turn = payload.turn;
    info!(turn, "Received request to handle turn");
    let conversation: ConversationState = payload.into();
    let result = state
        .turn_handler
        .handle_turn(&conversation)
        .await
        .map_err(|e| ApiError::internal("Failed to handle the turn.", e))?;
    info!(turn, speaker = %result.speaker, "Turn handled successfully");
    Ok(Json(result.into()))
}

/// Serve the landing page.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "The landing page", body = String, content_type = "text/html"),
        (status = 404, description = "index.html is missing", body = ErrorResponse)
    )
)]
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    match tokio::fs::read_to_string(&state.config.index_path).await {
        Ok(content) => {
            info!("Served index.html successfully.");
            Ok(Html(content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!(path = %state.config.index_path.display(), "index.html not found.");
            Err(ApiError::NotFound("index.html not found.".to_string()))
        }
        Err(e) => Err(ApiError::internal("Failed to serve the main page.", e)),
    }
}
