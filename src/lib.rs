// Clippy allows for reasonable defaults
#![allow(clippy::new_without_default)] // Default not always appropriate for stateful types
#![allow(clippy::unnecessary_map_or)] // map_or can be clearer than alternatives

// Module declarations
pub mod config;
pub mod council;
pub mod events;
pub mod gateway;
pub mod models;
pub mod shutdown;
mod utils;

// Server module (HTTP/WebSocket API)
pub mod server;

// Re-export models for use by the binary and integration tests
pub use models::*;
