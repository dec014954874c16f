// Orchestrator - job submission and the driver that runs one chat round

use super::combiner::ResponseCombiner;
use super::fan_out::{panic_message, FanOutEngine};
use super::history::{ChatHistory, RoundTicket};
use super::jobs::JobStore;
use super::progress::ProgressTracker;
use super::{CouncilError, ValidationError};
use crate::config::GenerationConfig;
use crate::events::{
    CombiningPayload, EventBroadcaster, JobCompletedPayload, JobFailedPayload,
    JobSubmittedPayload, RoundStartedPayload, EVENT_COMBINING, EVENT_JOB_COMPLETED,
    EVENT_JOB_FAILED, EVENT_JOB_SUBMITTED, EVENT_ROUND_STARTED,
};
use crate::gateway::{BackendGateway, GatewayError};
use crate::models::{
    AnswerSource, ChatRequest, ChatTurn, Job, ModelRef, ModelSize, ProgressView,
};
use crate::utils::preview;
use std::sync::Arc;

// ============================================================================
// Validation
// ============================================================================

/// A chat request that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub message: String,
    /// Selected models, duplicates removed, in submission order
    pub models: Vec<ModelRef>,
    pub combiner: ModelRef,
}

/// Check a submission before any job exists for it
pub fn validate_request(request: &ChatRequest) -> Result<ValidatedRequest, ValidationError> {
    if request.message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if request.selected_models.is_empty() {
        return Err(ValidationError::NoModelsSelected);
    }
    let combiner = request
        .combiner_model
        .clone()
        .ok_or(ValidationError::MissingCombiner)?;

    let mut models: Vec<ModelRef> = Vec::with_capacity(request.selected_models.len());
    for model in &request.selected_models {
        if !models.contains(model) {
            models.push(model.clone());
        }
    }

    Ok(ValidatedRequest {
        message: request.message.clone(),
        models,
        combiner,
    })
}

// ============================================================================
// Council
// ============================================================================

/// Entry point for chat submissions and the queries the frontend polls.
///
/// Cloning is cheap; every clone shares the same jobs, history and progress.
#[derive(Clone)]
pub struct Council {
    gateway: Arc<dyn BackendGateway>,
    jobs: Arc<JobStore>,
    progress: Arc<ProgressTracker>,
    history: Arc<ChatHistory>,
    fan_out: Arc<FanOutEngine>,
    combiner: Arc<ResponseCombiner>,
    broadcaster: Arc<EventBroadcaster>,
    settings: Arc<GenerationConfig>,
}

impl Council {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        settings: GenerationConfig,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        let settings = Arc::new(settings);
        let progress = Arc::new(ProgressTracker::new());
        let fan_out = FanOutEngine::new(
            gateway.clone(),
            progress.clone(),
            broadcaster.clone(),
            settings.clone(),
        );
        let combiner = ResponseCombiner::new(gateway.clone(), progress.clone(), settings.clone());

        Self {
            gateway,
            jobs: Arc::new(JobStore::new()),
            progress,
            history: Arc::new(ChatHistory::new()),
            fan_out: Arc::new(fan_out),
            combiner: Arc::new(combiner),
            broadcaster,
            settings,
        }
    }

    /// Validate and queue a chat message. Returns the new job id right away;
    /// the round runs in the background.
    pub fn submit(&self, request: ChatRequest) -> Result<String, CouncilError> {
        let validated = validate_request(&request)?;
        let job_id = self.jobs.create(request);

        log::info!(
            "Job {} submitted: {} models, combiner {}, message \"{}\"",
            job_id,
            validated.models.len(),
            validated.combiner.key(),
            preview(&validated.message, 60)
        );
        self.broadcaster.broadcast(
            EVENT_JOB_SUBMITTED,
            JobSubmittedPayload {
                job_id: job_id.clone(),
                models: validated.models.iter().map(|m| m.key()).collect(),
            },
        );

        // Queue position is taken here so rounds run in submission order
        let ticket = self.history.enqueue_round();
        tokio::spawn(self.clone().process_job(job_id.clone(), validated, ticket));
        Ok(job_id)
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job, CouncilError> {
        self.jobs
            .get(job_id)
            .ok_or_else(|| CouncilError::JobNotFound(job_id.to_string()))
    }

    pub fn list_jobs(&self) -> Vec<Job> {
        self.jobs.list()
    }

    pub fn progress(&self) -> ProgressView {
        self.progress.view()
    }

    pub fn history(&self) -> Vec<ChatTurn> {
        self.history.snapshot()
    }

    pub fn settings(&self) -> &GenerationConfig {
        &self.settings
    }

    /// Shared job table, for the cleanup task
    pub fn job_store(&self) -> Arc<JobStore> {
        self.jobs.clone()
    }

    /// Models the gateway can currently reach
    pub async fn list_models(&self, size: Option<ModelSize>) -> Result<Vec<ModelRef>, CouncilError> {
        match self.gateway.list_models(size).await {
            Ok(models) if !models.is_empty() => Ok(models),
            Ok(_) => Err(GatewayError::NoModelsAvailable.into()),
            Err(e) => {
                log::warn!("Listing models failed: {}", e);
                Err(GatewayError::NoModelsAvailable.into())
            }
        }
    }

    /// Worker for one job. Waits for every earlier round on the conversation,
    /// then runs this round in its own task so a panic still ends the job.
    async fn process_job(self, job_id: String, request: ValidatedRequest, ticket: RoundTicket) {
        let _round = ticket.wait().await;

        let council = self.clone();
        let round_job_id = job_id.clone();
        let round = tokio::spawn(async move { council.run_round(&round_job_id, request).await });

        match round.await {
            Ok(Ok(source)) => {
                log::info!("Job {} completed ({:?} answer)", job_id, source);
            }
            Ok(Err(e)) => self.fail_job(&job_id, e.to_string()),
            Err(e) => {
                let reason = if e.is_panic() {
                    panic_message(e.into_panic().as_ref())
                } else {
                    e.to_string()
                };
                self.fail_job(&job_id, format!("Internal error: {}", reason));
            }
        }
    }

    async fn run_round(
        &self,
        job_id: &str,
        request: ValidatedRequest,
    ) -> Result<AnswerSource, CouncilError> {
        self.jobs.start(job_id)?;
        self.broadcaster.broadcast(
            EVENT_ROUND_STARTED,
            RoundStartedPayload {
                job_id: job_id.to_string(),
                total_models: request.models.len(),
            },
        );

        self.history.append(ChatTurn::user(request.message.clone()));
        let snapshot = self.history.snapshot();

        let report = self
            .fan_out
            .run(job_id, &request.models, snapshot.clone())
            .await;
        let successes = report
            .into_successes()
            .ok_or(CouncilError::AllModelsFailed)?;

        self.broadcaster.broadcast(
            EVENT_COMBINING,
            CombiningPayload {
                job_id: job_id.to_string(),
                combiner: request.combiner.key(),
                successful: successes.len(),
            },
        );
        let answer = self
            .combiner
            .combine(&request.message, &successes, &request.combiner, &snapshot)
            .await;

        let source = answer.source();
        let text = answer.into_text();
        self.history.append(ChatTurn::assistant(text.clone()));
        self.progress.finish_round();
        self.jobs.finish_ok(job_id, text, source)?;

        self.broadcaster.broadcast(
            EVENT_JOB_COMPLETED,
            JobCompletedPayload {
                job_id: job_id.to_string(),
                answer_source: source,
            },
        );
        Ok(source)
    }

    fn fail_job(&self, job_id: &str, error: String) {
        log::error!("Job {} failed: {}", job_id, error);
        self.progress.reset();

        match self.jobs.finish_err(job_id, error.clone()) {
            Ok(_) => self.broadcaster.broadcast(
                EVENT_JOB_FAILED,
                JobFailedPayload {
                    job_id: job_id.to_string(),
                    error,
                },
            ),
            Err(e) => log::warn!("Could not record failure of job {}: {}", job_id, e),
        }
    }
}
