//! Backend gateway: the capability used to list models and generate text.
//!
//! The council engine only talks to [`BackendGateway`]; which provider API a
//! call lands on is decided by the implementation from the target
//! [`ModelRef`], never by the engine.

mod http;

pub use http::HttpGateway;

use crate::models::{ChatTurn, ModelRef, ModelSize};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("No API token configured for provider '{0}'")]
    MissingToken(String),

    #[error("Request to {provider} failed: {message}")]
    Request { provider: String, message: String },

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {provider}: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("No models available")]
    NoModelsAvailable,
}

/// Everything needed for one text generation call
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub system_prompt: &'a str,
    pub history: &'a [ChatTurn],
    pub target: &'a ModelRef,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// List the models that can currently be queried, optionally limited to
    /// one size class
    async fn list_models(&self, size: Option<ModelSize>) -> Result<Vec<ModelRef>, GatewayError>;

    /// Generate a reply from `request.target` for the given conversation
    async fn generate_text(&self, request: GenerateRequest<'_>) -> Result<String, GatewayError>;
}
