//! Command routing modules
//!
//! This module organizes command routing into focused sub-modules by domain:
//! - council_routes: Chat submission, job polling, progress, models and history
//! - config_routes: Configuration commands

pub mod config_routes;
pub mod council_routes;

use serde_json::Value;

use super::proxy::InvokeError;
use super::ServerAppState;

// =============================================================================
// Argument helpers for route modules
// =============================================================================

/// Extract a required argument from JSON args
pub fn get_arg<T: serde::de::DeserializeOwned>(args: &Value, name: &str) -> Result<T, String> {
    serde_json::from_value(
        args.get(name)
            .ok_or_else(|| format!("Missing argument: {}", name))?
            .clone(),
    )
    .map_err(|e| format!("Invalid argument {}: {}", name, e))
}

/// Extract an optional argument from JSON args
pub fn get_opt_arg<T: serde::de::DeserializeOwned>(
    args: &Value,
    name: &str,
) -> Result<Option<T>, String> {
    match args.get(name) {
        Some(v) if !v.is_null() => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|e| format!("Invalid argument {}: {}", name, e)),
        _ => Ok(None),
    }
}

// =============================================================================
// Command Routing Macros
// =============================================================================

/// Routes an async command: awaits the handler, serializes the result
#[macro_export]
macro_rules! route_async {
    ($handler:expr) => {{
        let result = $handler.await?;
        serde_json::to_value(result).map_err(|e| $crate::server::InvokeError::from(e.to_string()))
    }};
}

/// Routes a sync command
#[macro_export]
macro_rules! route_sync {
    ($handler:expr) => {{
        let result = $handler?;
        serde_json::to_value(result).map_err(|e| $crate::server::InvokeError::from(e.to_string()))
    }};
}

/// Routes a command returning a plain value
#[macro_export]
macro_rules! route_value {
    ($value:expr) => {{
        serde_json::to_value($value).map_err(|e| $crate::server::InvokeError::from(e.to_string()))
    }};
}

// Re-export macros for use in route modules
pub use route_async;
pub use route_sync;
pub use route_value;

// =============================================================================
// Main Command Dispatcher
// =============================================================================

/// Route a command to its implementation by dispatching to the appropriate sub-router
pub async fn route_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> Result<Value, InvokeError> {
    if council_routes::is_council_command(cmd) {
        return council_routes::route_council_command(cmd, args, state).await;
    }

    if config_routes::is_config_command(cmd) {
        return config_routes::route_config_command(cmd, args, state).await;
    }

    Err(format!("Unknown command: {}", cmd).into())
}
