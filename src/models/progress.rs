// Progress snapshot for the round currently being processed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    #[default]
    Idle,
    Querying,
    Combining,
    Completed,
}

/// One model finishing during fan-out
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedEvent {
    pub model_name: String,
    pub success: bool,
    pub display_name: String,
}

/// Mutable state of the current round.
///
/// `completed == successful + failed <= total_models` and
/// `completed_events.len() == completed` hold whenever the snapshot is
/// observable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub is_processing: bool,
    pub total_models: usize,
    pub completed: usize,
    pub successful: usize,
    pub failed: usize,
    pub stage: ProgressStage,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_events: Vec<CompletedEvent>,
}

impl ProgressSnapshot {
    /// Fresh snapshot for a round about to query `total_models` models
    pub fn for_round(total_models: usize) -> Self {
        Self {
            is_processing: true,
            total_models,
            stage: ProgressStage::Querying,
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Overall completion percentage (0-100)
    pub fn percent(&self) -> u8 {
        match self.stage {
            ProgressStage::Idle => 0,
            ProgressStage::Querying => {
                if self.total_models == 0 {
                    0
                } else {
                    (self.completed as f32 / self.total_models as f32 * 90.0) as u8
                }
            }
            ProgressStage::Combining => 90,
            ProgressStage::Completed => 100,
        }
    }
}

/// Read-only copy of the snapshot handed to pollers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    #[serde(flatten)]
    pub snapshot: ProgressSnapshot,
    pub elapsed_secs: f64,
    pub percent: u8,
}

impl ProgressView {
    pub fn from_snapshot(snapshot: ProgressSnapshot, now: DateTime<Utc>) -> Self {
        let elapsed_secs = snapshot
            .started_at
            .map(|started| (now - started).num_milliseconds().max(0) as f64 / 1000.0)
            .unwrap_or(0.0);
        let percent = snapshot.percent();
        Self {
            snapshot,
            elapsed_secs,
            percent,
        }
    }
}
