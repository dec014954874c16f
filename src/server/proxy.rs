//! Command proxy handler that routes HTTP requests to council commands
//!
//! A single /api/invoke endpoint receives `{cmd, args}` and dispatches to the
//! route modules in `routes/`:
//! - council_routes: chat submission, jobs, progress, models, history
//! - config_routes: effective configuration

use super::routes;
use super::ServerAppState;
use crate::council::CouncilError;
use crate::models::state_machine::JobError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for /api/invoke endpoint
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    /// Command name (e.g., "submit_chat", "get_job")
    pub cmd: String,
    /// Command arguments as JSON object
    #[serde(default)]
    pub args: Value,
}

/// Response body for /api/invoke endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct InvokeResponse {
    /// Whether the command succeeded
    pub success: bool,
    /// Result data (on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error message (on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error type for invoke handler
#[derive(Debug)]
pub struct InvokeError {
    pub status: StatusCode,
    pub message: String,
}

impl InvokeError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Argument and serialization errors from route glue are client errors
impl From<String> for InvokeError {
    fn from(message: String) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<CouncilError> for InvokeError {
    fn from(err: CouncilError) -> Self {
        let status = match &err {
            CouncilError::Validation(_) => StatusCode::BAD_REQUEST,
            CouncilError::JobNotFound(_) | CouncilError::Job(JobError::NotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            CouncilError::Gateway(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for InvokeError {
    fn into_response(self) -> Response {
        let body = InvokeResponse {
            success: false,
            data: None,
            error: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

// =============================================================================
// Main Handler
// =============================================================================

/// Main invoke handler - routes commands to their implementations
pub async fn invoke_handler(
    State(state): State<ServerAppState>,
    Json(req): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, InvokeError> {
    log::debug!("Invoke command: {} with args: {:?}", req.cmd, req.args);

    match routes::route_command(&req.cmd, req.args, &state).await {
        Ok(data) => Ok(Json(InvokeResponse {
            success: true,
            data: Some(data),
            error: None,
        })),
        Err(e) => {
            log::warn!("Command {} failed ({}): {}", req.cmd, e.status, e.message);
            Err(e)
        }
    }
}
