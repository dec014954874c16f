//! Server application state shared across handlers

use crate::config::AppConfig;
use crate::council::Council;
use crate::events::EventBroadcaster;
use crate::shutdown::ShutdownState;
use std::sync::Arc;

/// Shared state for the server
#[derive(Clone)]
pub struct ServerAppState {
    /// Council engine (jobs, progress, history)
    pub council: Council,

    /// Effective configuration
    pub config: Arc<AppConfig>,

    /// Event broadcaster for WebSocket clients
    pub broadcaster: Arc<EventBroadcaster>,

    /// Shutdown state
    pub shutdown_state: ShutdownState,
}

impl ServerAppState {
    pub fn new(
        council: Council,
        config: AppConfig,
        broadcaster: Arc<EventBroadcaster>,
        shutdown_state: ShutdownState,
    ) -> Self {
        Self {
            council,
            config: Arc::new(config),
            broadcaster,
            shutdown_state,
        }
    }
}
