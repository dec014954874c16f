// Progress tracker for the round currently being processed

use crate::models::{CompletedEvent, ProgressSnapshot, ProgressStage, ProgressView, QueryOutcome};
use crate::utils::lock_mutex_recover;
use chrono::Utc;
use std::sync::Mutex;

/// Lock-guarded progress snapshot.
///
/// Only the fan-out engine, the combiner and the orchestration driver write
/// to it; pollers get copies through [`ProgressTracker::view`].
pub struct ProgressTracker {
    state: Mutex<ProgressSnapshot>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProgressSnapshot::default()),
        }
    }

    /// Overwrite the snapshot for a new round querying `total_models` models
    pub fn begin_round(&self, total_models: usize) {
        *lock_mutex_recover(&self.state) = ProgressSnapshot::for_round(total_models);
    }

    /// Count one finished backend call. Returns the updated snapshot.
    pub fn record_completion(&self, outcome: &QueryOutcome) -> ProgressSnapshot {
        let mut state = lock_mutex_recover(&self.state);

        if state.completed >= state.total_models {
            log::warn!(
                "Ignoring completion of {} beyond the {} models of this round",
                outcome.model.key(),
                state.total_models
            );
            return state.clone();
        }

        state.completed += 1;
        if outcome.success {
            state.successful += 1;
        } else {
            state.failed += 1;
        }
        state.completed_events.push(CompletedEvent {
            model_name: outcome.model.key(),
            success: outcome.success,
            display_name: outcome.model.display_name.clone(),
        });

        state.clone()
    }

    pub fn set_stage(&self, stage: ProgressStage) {
        lock_mutex_recover(&self.state).stage = stage;
    }

    /// Mark the round as done; counts stay visible until the next round
    pub fn finish_round(&self) {
        let mut state = lock_mutex_recover(&self.state);
        state.stage = ProgressStage::Completed;
        state.is_processing = false;
    }

    /// Back to idle after a failed round
    pub fn reset(&self) {
        *lock_mutex_recover(&self.state) = ProgressSnapshot::default();
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        lock_mutex_recover(&self.state).clone()
    }

    /// Snapshot plus elapsed time, for pollers
    pub fn view(&self) -> ProgressView {
        ProgressView::from_snapshot(self.snapshot(), Utc::now())
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
