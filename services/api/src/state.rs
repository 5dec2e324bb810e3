//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the long-lived
//! clients shared by every request.

use crate::config::Config;
use podcast_core::{podcast_generator::PodcastGenerator, turn_handler::TurnHandler};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub podcast_generator: Arc<PodcastGenerator>,
    pub turn_handler: Arc<TurnHandler>,
    pub config: Arc<Config>,
}
