// Event types and payload structures for real-time updates
// These are broadcast via WebSocket to connected clients

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// Event name constants
pub const EVENT_JOB_SUBMITTED: &str = "council:job_submitted";
pub const EVENT_ROUND_STARTED: &str = "council:round_started";
pub const EVENT_MODEL_COMPLETED: &str = "council:model_completed";
pub const EVENT_COMBINING: &str = "council:combining";
pub const EVENT_JOB_COMPLETED: &str = "council:job_completed";
pub const EVENT_JOB_FAILED: &str = "council:job_failed";

/// Payload for job submitted events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmittedPayload {
    pub job_id: String,
    pub models: Vec<String>,
}

/// Payload for round started events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStartedPayload {
    pub job_id: String,
    pub total_models: usize,
}

/// Payload for a single model finishing during fan-out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelCompletedPayload {
    pub job_id: String,
    pub model_name: String,
    pub display_name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub completed: usize,
    pub total_models: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload for combining events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombiningPayload {
    pub job_id: String,
    pub combiner: String,
    pub successful: usize,
}

/// Payload for job completed events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCompletedPayload {
    pub job_id: String,
    pub answer_source: crate::models::AnswerSource,
}

/// Payload for job failed events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailedPayload {
    pub job_id: String,
    pub error: String,
}

/// A server event that can be broadcast to WebSocket clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEvent {
    /// Event type (e.g., "council:model_completed")
    pub event: String,
    /// Event payload as JSON value
    pub payload: serde_json::Value,
}

/// Broadcasts events to all connected WebSocket clients
pub struct EventBroadcaster {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventBroadcaster {
    /// Create a new event broadcaster with a channel capacity of 1000 events
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx }
    }

    /// Broadcast an event to all connected clients
    pub fn broadcast(&self, event_type: &str, payload: impl Serialize) {
        let event = ServerEvent {
            event: event_type.to_string(),
            payload: serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        };

        // Ignore send errors (no receivers)
        let _ = self.tx.send(event);
    }

    /// Subscribe to events (returns a receiver)
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
