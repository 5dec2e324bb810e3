//! Main Entrypoint for the Podcast API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the text pipeline and the realtime turn handler.
//! 3. Constructing the Axum router and applying middleware.
//! 4. Starting the web server and stopping the turn handler on shutdown.

use anyhow::Context;
use openai_realtime::{Credentials, RealtimeClient};
use podcast_api::{config::Config, router::create_router, state::AppState};
use podcast_core::{
    llm_client::{AzureChatClient, LLMClient},
    podcast_generator::PodcastGenerator,
    turn_handler::TurnHandler,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Waits for `Ctrl+C`, then cancels any turn still in flight.
async fn shutdown_signal(turn_handler: Arc<TurnHandler>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
    turn_handler.stop().await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!(?config, "Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let llm_client: Arc<dyn LLMClient> = Arc::new(AzureChatClient::new(
        config.primary.api_key.clone(),
        config.primary.api_base.clone(),
        config.chat_deployment.clone(),
    ));
    let podcast_generator = Arc::new(PodcastGenerator::new(llm_client));

    let realtime_client = RealtimeClient::new(config.realtime_deployment.clone())
        .with_timeouts(config.realtime_connect_timeout, config.realtime_idle_timeout);
    let turn_handler = Arc::new(TurnHandler::new(
        Arc::new(realtime_client),
        Credentials::new(
            config.primary.api_key.clone(),
            config.primary.api_base.clone(),
        ),
        Credentials::new(
            config.secondary.api_key.clone(),
            config.secondary.api_base.clone(),
        ),
        config.retry_policy(),
    ));
    turn_handler.start().await;

    let app_state = Arc::new(AppState {
        podcast_generator,
        turn_handler: turn_handler.clone(),
        config: Arc::new(config.clone()),
    });

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        chat_deployment = %config.chat_deployment,
        realtime_deployment = %config.realtime_deployment,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(turn_handler.clone()))
    .await;

    turn_handler.stop().await;
    served?;
    info!("Server has shut down.");
    Ok(())
}
