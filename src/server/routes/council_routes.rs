//! Council command routing
//!
//! Handles submit_chat, get_job, list_jobs, get_progress, list_models and
//! get_history.

use crate::models::{ChatRequest, ModelSize};
use crate::utils::ResultExt;
use serde::Serialize;
use serde_json::Value;

use super::{get_arg, get_opt_arg, route_async, route_sync, route_value, InvokeError, ServerAppState};

const COUNCIL_COMMANDS: &[&str] = &[
    "submit_chat",
    "get_job",
    "list_jobs",
    "get_progress",
    "list_models",
    "get_history",
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitChatResponse {
    job_id: String,
}

/// Check if a command belongs to this router
pub fn is_council_command(cmd: &str) -> bool {
    COUNCIL_COMMANDS.contains(&cmd)
}

/// Route council commands
pub async fn route_council_command(
    cmd: &str,
    args: Value,
    state: &ServerAppState,
) -> Result<Value, InvokeError> {
    match cmd {
        "submit_chat" => {
            // Missing fields fall through to validation for a precise message
            let request: ChatRequest =
                serde_json::from_value(args).with_context("Invalid chat request")?;
            let job_id = state.council.submit(request)?;
            route_value!(SubmitChatResponse { job_id })
        }

        "get_job" => {
            let job_id: String = get_arg(&args, "jobId")?;
            route_sync!(state.council.get_job(&job_id))
        }

        "list_jobs" => route_value!(state.council.list_jobs()),

        "get_progress" => route_value!(state.council.progress()),

        "list_models" => {
            let size: Option<String> = get_opt_arg(&args, "size")?;
            let size = size.map(|s| s.parse::<ModelSize>()).transpose()?;
            route_async!(state.council.list_models(size))
        }

        "get_history" => route_value!(state.council.history()),

        _ => Err(format!("Unknown council command: {}", cmd).into()),
    }
}
