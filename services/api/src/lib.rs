//! Podcast API Library Crate
//!
//! Configuration, shared state, handlers and routing for the podcast web
//! service. The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
