// Council engine - fans one chat message out to several models and combines the answers
//
// This module is organized into submodules:
// - orchestrator: Job submission and the per-round driver
// - fan_out: Concurrent querying of the selected models
// - combiner: Synthesis of the successful answers, with random fallback
// - progress: Progress snapshot of the round in flight
// - jobs: In-memory job table and lifecycle
// - history: Shared conversation history
// - prompts: Combiner prompt template

mod combiner;
mod fan_out;
mod history;
mod jobs;
mod orchestrator;
mod progress;
mod prompts;

pub use combiner::{pick_fallback, CombinedAnswer, ResponseCombiner};
pub use fan_out::{FanOutEngine, RoundReport, Successes};
pub use history::{ChatHistory, RoundTicket, RoundTurn};
pub use jobs::JobStore;
pub use orchestrator::{validate_request, Council, ValidatedRequest};
pub use progress::ProgressTracker;
pub use prompts::{build_combiner_prompt, COMBINER_PROMPT_TEMPLATE};

use crate::gateway::GatewayError;
use crate::models::state_machine::JobError;
use thiserror::Error;

/// Error message recorded on a job when no model answered
pub const ALL_MODELS_FAILED: &str = "All models failed to respond";

/// Reasons a chat submission is rejected before a job is created
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("At least one model must be selected")]
    NoModelsSelected,

    #[error("A combiner model must be selected")]
    MissingCombiner,
}

#[derive(Debug, Error)]
pub enum CouncilError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("{}", ALL_MODELS_FAILED)]
    AllModelsFailed,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
