// Job status state machine with validation

use super::JobStatus;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Invalid job transition from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Job already in terminal state: {0}")]
    AlreadyTerminal(JobStatus),
}

/// Validates if a job can move from one status to another.
///
/// Jobs only ever move forward. `Pending -> Error` covers faults raised
/// before the worker got to start the job.
pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    matches!(
        (from, to),
        (JobStatus::Pending, JobStatus::Processing)
            | (JobStatus::Pending, JobStatus::Error)
            | (JobStatus::Processing, JobStatus::Completed)
            | (JobStatus::Processing, JobStatus::Error)
    )
}

/// Validates and performs a state transition
pub fn transition_state(current: JobStatus, target: JobStatus) -> Result<JobStatus, JobError> {
    if current.is_terminal() {
        return Err(JobError::AlreadyTerminal(current));
    }

    if !can_transition(current, target) {
        return Err(JobError::InvalidTransition {
            from: current,
            to: target,
        });
    }

    Ok(target)
}
