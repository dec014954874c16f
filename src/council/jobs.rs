// In-memory job table

use crate::models::state_machine::{transition_state, JobError};
use crate::models::{AnswerSource, ChatRequest, Job, JobStatus};
use crate::utils::lock_mutex_recover;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Table of jobs keyed by id, guarded by a single lock.
///
/// Every change goes through a validated status transition; terminal jobs
/// are never modified again.
pub struct JobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a pending job and return its id
    pub fn create(&self, request: ChatRequest) -> String {
        let id = format!("job-{}", Uuid::new_v4());
        let job = Job::new(id.clone(), request);
        lock_mutex_recover(&self.jobs).insert(id.clone(), job);
        log::debug!("Created job {}", id);
        id
    }

    /// pending -> processing
    pub fn start(&self, id: &str) -> Result<Job, JobError> {
        self.transition(id, JobStatus::Processing, |_| {})
    }

    /// processing -> completed
    pub fn finish_ok(&self, id: &str, result: String, source: AnswerSource) -> Result<Job, JobError> {
        self.transition(id, JobStatus::Completed, |job| {
            job.result = Some(result);
            job.answer_source = Some(source);
        })
    }

    /// processing (or pending) -> error
    pub fn finish_err(&self, id: &str, error: String) -> Result<Job, JobError> {
        self.transition(id, JobStatus::Error, |job| {
            job.error = Some(error);
        })
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        lock_mutex_recover(&self.jobs).get(id).cloned()
    }

    /// All jobs, newest first
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = lock_mutex_recover(&self.jobs).values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn len(&self) -> usize {
        lock_mutex_recover(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop terminal jobs last updated more than `max_age` ago
    pub fn prune_finished(&self, max_age: Duration) -> usize {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let cutoff = Utc::now() - max_age;

        let mut jobs = lock_mutex_recover(&self.jobs);
        let before = jobs.len();
        jobs.retain(|_, job| !(job.is_terminal() && job.updated_at < cutoff));
        before - jobs.len()
    }

    /// Periodically prune finished jobs in the background
    pub fn start_cleanup_task(store: Arc<Self>, interval: Duration, retention: Duration) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let removed = store.prune_finished(retention);
                if removed > 0 {
                    log::debug!("Pruned {} finished jobs", removed);
                }
            }
        });
    }

    fn transition<F>(&self, id: &str, target: JobStatus, apply: F) -> Result<Job, JobError>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = lock_mutex_recover(&self.jobs);
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        job.status = transition_state(job.status, target)?;
        apply(job);
        job.updated_at = Utc::now();

        log::debug!("Job {} -> {}", id, target);
        Ok(job.clone())
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            message: "hi".to_string(),
            selected_models: vec![],
            combiner_model: None,
        }
    }

    #[test]
    fn test_create_returns_unique_pending_jobs() {
        let store = JobStore::new();
        let a = store.create(request());
        let b = store.create(request());
        assert_ne!(a, b);
        assert_eq!(store.get(&a).unwrap().status, JobStatus::Pending);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_happy_path() {
        let store = JobStore::new();
        let id = store.create(request());

        store.start(&id).unwrap();
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Processing);

        let job = store
            .finish_ok(&id, "hello".to_string(), AnswerSource::Synthesized)
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.as_deref(), Some("hello"));
        assert!(job.error.is_none());
        assert_eq!(job.answer_source, Some(AnswerSource::Synthesized));
    }

    #[test]
    fn test_error_path() {
        let store = JobStore::new();
        let id = store.create(request());
        store.start(&id).unwrap();

        let job = store.finish_err(&id, "boom".to_string()).unwrap();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.result.is_none());
    }

    #[test]
    fn test_cannot_complete_pending_job() {
        let store = JobStore::new();
        let id = store.create(request());
        let err = store
            .finish_ok(&id, "x".to_string(), AnswerSource::Synthesized)
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidTransition { .. }));
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Pending);
    }

    #[test]
    fn test_terminal_job_is_immutable() {
        let store = JobStore::new();
        let id = store.create(request());
        store.start(&id).unwrap();
        store
            .finish_ok(&id, "first".to_string(), AnswerSource::Fallback)
            .unwrap();
        let before = store.get(&id).unwrap();

        assert!(store.finish_err(&id, "late".to_string()).is_err());
        assert!(store.start(&id).is_err());

        let after = store.get(&id).unwrap();
        assert_eq!(after.status, JobStatus::Completed);
        assert_eq!(after.result, before.result);
        assert_eq!(after.updated_at, before.updated_at);
        assert!(after.error.is_none());
    }

    #[test]
    fn test_unknown_job() {
        let store = JobStore::new();
        assert!(store.get("job-missing").is_none());
        assert_eq!(
            store.start("job-missing").unwrap_err(),
            JobError::NotFound("job-missing".to_string())
        );
        assert!(store.get("job-missing").is_none());
    }

    #[test]
    fn test_prune_finished_keeps_active_jobs() {
        let store = JobStore::new();
        let pending = store.create(request());
        let done = store.create(request());
        store.start(&done).unwrap();
        store.finish_err(&done, "x".to_string()).unwrap();

        // Nothing is old enough yet
        assert_eq!(store.prune_finished(Duration::from_secs(3600)), 0);

        assert_eq!(store.prune_finished(Duration::ZERO), 1);
        assert!(store.get(&done).is_none());
        assert!(store.get(&pending).is_some());
    }

    #[test]
    fn test_list_newest_first() {
        let store = JobStore::new();
        let first = store.create(request());
        std::thread::sleep(Duration::from_millis(2));
        let second = store.create(request());

        let ids: Vec<String> = store.list().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![second, first]);
    }
}
