//! Podcast Core
//!
//! The turn-taking conversation engine and the text pipeline that feeds it.
//!
//! - `turn_policy`: who speaks on a turn and with which instructions.
//! - `retry`: bounded, fixed-delay retry around single attempts.
//! - `turn_handler`: composes the two around the realtime client.
//! - `llm_client` / `podcast_generator`: chat-completion based script generation.

pub mod llm_client;
pub mod podcast_generator;
pub mod retry;
pub mod turn_handler;
pub mod turn_policy;
