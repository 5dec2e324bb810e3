//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, static assets, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ErrorResponse, PodcastRequest, PodcastScriptResponse, SpeakerName, TurnRequest,
        TurnResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::generate_podcast_script,
        handlers::next_turn,
        handlers::index,
    ),
    components(
        schemas(PodcastRequest, PodcastScriptResponse, TurnRequest, TurnResponse, SpeakerName, ErrorResponse)
    ),
    tags(
        (name = "Podcast API", description = "Two-persona podcast script and turn generation")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&app_state.config.static_dir);

    let api_router = Router::new()
        .route("/", get(handlers::index))
        .route(
            "/generate_podcast_script",
            post(handlers::generate_podcast_script),
        )
        .route("/next_turn", post(handlers::next_turn))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/static", static_files)
        .merge(api_router)
}
