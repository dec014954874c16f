// Fan-out engine - queries every selected model concurrently

use super::progress::ProgressTracker;
use crate::config::GenerationConfig;
use crate::events::{EventBroadcaster, ModelCompletedPayload, EVENT_MODEL_COMPLETED};
use crate::gateway::{BackendGateway, GenerateRequest};
use crate::models::{ChatTurn, ModelRef, QueryOutcome};
use futures_util::FutureExt;
use rand::seq::SliceRandom;
use rand::Rng;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcomes of one fan-out, in completion order
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub requested: usize,
    pub outcomes: Vec<QueryOutcome>,
}

impl RoundReport {
    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.successful()
    }

    /// The successful outcomes, or `None` when every model failed
    pub fn into_successes(self) -> Option<Successes> {
        Successes::from_outcomes(self.outcomes)
    }
}

/// Non-empty set of successful outcomes.
///
/// The combiner only accepts this type, so it can always fall back to one of
/// the responses.
#[derive(Debug, Clone)]
pub struct Successes(Vec<QueryOutcome>);

impl Successes {
    pub fn from_outcomes(outcomes: Vec<QueryOutcome>) -> Option<Self> {
        let successes: Vec<QueryOutcome> = outcomes
            .into_iter()
            .filter(|o| o.text().is_some_and(|t| !t.trim().is_empty()))
            .collect();

        if successes.is_empty() {
            None
        } else {
            Some(Self(successes))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryOutcome> {
        self.0.iter()
    }

    /// Pick one outcome uniformly at random
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &QueryOutcome {
        // Non-empty by construction
        self.0.choose(rng).unwrap_or(&self.0[0])
    }
}

impl<'a> IntoIterator for &'a Successes {
    type Item = &'a QueryOutcome;
    type IntoIter = std::slice::Iter<'a, QueryOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Sends one message to many models at once and collects every outcome
pub struct FanOutEngine {
    gateway: Arc<dyn BackendGateway>,
    progress: Arc<ProgressTracker>,
    broadcaster: Arc<EventBroadcaster>,
    settings: Arc<GenerationConfig>,
}

impl FanOutEngine {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        progress: Arc<ProgressTracker>,
        broadcaster: Arc<EventBroadcaster>,
        settings: Arc<GenerationConfig>,
    ) -> Self {
        Self {
            gateway,
            progress,
            broadcaster,
            settings,
        }
    }

    /// Query every model with the same history and wait for all of them.
    ///
    /// Returns exactly one outcome per model. Progress is reset for the round
    /// and bumped as each call finishes.
    pub async fn run(&self, job_id: &str, models: &[ModelRef], history: Vec<ChatTurn>) -> RoundReport {
        let total = models.len();
        self.progress.begin_round(total);

        log::info!("Fanning out job {} to {} models", job_id, total);

        let history = Arc::new(history);
        let semaphore = self.settings.max_parallel.map(|n| Arc::new(Semaphore::new(n)));

        let mut units = JoinSet::new();
        for model in models.iter().cloned() {
            let gateway = self.gateway.clone();
            let settings = self.settings.clone();
            let history = history.clone();
            let semaphore = semaphore.clone();

            units.spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let started = Instant::now();
                let call = query_model(gateway.as_ref(), &settings, &history, model.clone());
                match AssertUnwindSafe(call).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(panic) => QueryOutcome::failed(
                        model,
                        format!("model call panicked: {}", panic_message(panic.as_ref())),
                        started.elapsed(),
                    ),
                }
            });
        }

        let mut pending: Vec<ModelRef> = models.to_vec();
        let mut outcomes = Vec::with_capacity(total);

        while let Some(joined) = units.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    // Unit was cancelled; its model is reported after draining
                    log::error!("Fan-out unit for job {} did not finish: {}", job_id, e);
                    continue;
                }
            };

            if let Some(pos) = pending.iter().position(|m| *m == outcome.model) {
                pending.remove(pos);
            }
            self.record(job_id, &outcome);
            outcomes.push(outcome);
        }

        for model in pending {
            let outcome = QueryOutcome::failed(model, "model call was cancelled", Default::default());
            self.record(job_id, &outcome);
            outcomes.push(outcome);
        }

        let report = RoundReport {
            requested: total,
            outcomes,
        };
        log::info!(
            "Fan-out for job {} finished: {} succeeded, {} failed",
            job_id,
            report.successful(),
            report.failed()
        );
        report
    }

    fn record(&self, job_id: &str, outcome: &QueryOutcome) {
        let snapshot = self.progress.record_completion(outcome);

        if outcome.success {
            log::debug!(
                "{} answered in {}ms",
                outcome.model.key(),
                outcome.duration.as_millis()
            );
        } else {
            log::warn!(
                "{} failed after {}ms: {}",
                outcome.model.key(),
                outcome.duration.as_millis(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }

        self.broadcaster.broadcast(
            EVENT_MODEL_COMPLETED,
            ModelCompletedPayload {
                job_id: job_id.to_string(),
                model_name: outcome.model.key(),
                display_name: outcome.model.display_name.clone(),
                success: outcome.success,
                duration_ms: outcome.duration.as_millis() as u64,
                completed: snapshot.completed,
                total_models: snapshot.total_models,
                error: outcome.error.clone(),
            },
        );
    }
}

/// One bounded gateway call. Every failure mode becomes a failed outcome.
async fn query_model(
    gateway: &dyn BackendGateway,
    settings: &GenerationConfig,
    history: &[ChatTurn],
    model: ModelRef,
) -> QueryOutcome {
    let request = GenerateRequest {
        system_prompt: &settings.system_prompt,
        history,
        target: &model,
        max_tokens: settings.max_tokens,
        temperature: settings.temperature,
    };

    let started = Instant::now();
    let result = tokio::time::timeout(settings.request_timeout(), gateway.generate_text(request)).await;
    let duration = started.elapsed();

    match result {
        Ok(Ok(text)) if !text.trim().is_empty() => QueryOutcome::succeeded(model, text, duration),
        Ok(Ok(_)) => QueryOutcome::failed(model, "empty response", duration),
        Ok(Err(e)) => QueryOutcome::failed(model, e.to_string(), duration),
        Err(_) => QueryOutcome::failed(
            model,
            format!("timed out after {}s", settings.request_timeout_secs),
            duration,
        ),
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
