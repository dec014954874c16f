// Response combiner - merges the successful answers of a round into one reply

use super::fan_out::{panic_message, Successes};
use super::progress::ProgressTracker;
use super::prompts::build_combiner_prompt;
use crate::config::GenerationConfig;
use crate::gateway::{BackendGateway, GenerateRequest};
use crate::models::{AnswerSource, ChatTurn, ModelRef, ProgressStage};
use crate::utils::preview;
use futures_util::FutureExt;
use rand::Rng;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Final answer of a round, either synthesized by the combiner model or one
/// of the individual responses when synthesis failed
#[derive(Debug, Clone, PartialEq)]
pub enum CombinedAnswer {
    Synthesized {
        text: String,
        combiner: ModelRef,
    },
    Fallback {
        text: String,
        source: ModelRef,
        reason: String,
    },
}

impl CombinedAnswer {
    pub fn text(&self) -> &str {
        match self {
            CombinedAnswer::Synthesized { text, .. } | CombinedAnswer::Fallback { text, .. } => text,
        }
    }

    pub fn source(&self) -> AnswerSource {
        match self {
            CombinedAnswer::Synthesized { .. } => AnswerSource::Synthesized,
            CombinedAnswer::Fallback { .. } => AnswerSource::Fallback,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            CombinedAnswer::Synthesized { text, .. } | CombinedAnswer::Fallback { text, .. } => text,
        }
    }
}

pub struct ResponseCombiner {
    gateway: Arc<dyn BackendGateway>,
    progress: Arc<ProgressTracker>,
    settings: Arc<GenerationConfig>,
}

impl ResponseCombiner {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        progress: Arc<ProgressTracker>,
        settings: Arc<GenerationConfig>,
    ) -> Self {
        Self {
            gateway,
            progress,
            settings,
        }
    }

    /// Ask `combiner` to merge the successful responses.
    ///
    /// Never fails: if the combiner call errors, panics, times out or returns
    /// nothing, one of the successful responses is returned instead.
    pub async fn combine(
        &self,
        user_message: &str,
        successes: &Successes,
        combiner: &ModelRef,
        history: &[ChatTurn],
    ) -> CombinedAnswer {
        self.progress.set_stage(ProgressStage::Combining);

        let prompt = build_combiner_prompt(user_message, successes);
        let mut conversation = history.to_vec();
        conversation.push(ChatTurn::user(prompt));

        let request = GenerateRequest {
            system_prompt: &self.settings.combiner_system_prompt,
            history: &conversation,
            target: combiner,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        log::info!(
            "Combining {} responses with {}",
            successes.len(),
            combiner.key()
        );

        let call =
            tokio::time::timeout(self.settings.request_timeout(), self.gateway.generate_text(request));
        let result = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result.map(|r| r.map_err(|e| e.to_string())),
            Err(panic) => Ok(Err(format!(
                "combiner panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        let reason = match result {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                log::debug!("Combined answer: {}", preview(&text, 80));
                return CombinedAnswer::Synthesized {
                    text,
                    combiner: combiner.clone(),
                };
            }
            Ok(Ok(_)) => "combiner returned an empty response".to_string(),
            Ok(Err(e)) => e,
            Err(_) => format!(
                "combiner timed out after {}s",
                self.settings.request_timeout_secs
            ),
        };

        let answer = pick_fallback(successes, reason, &mut rand::thread_rng());
        if let CombinedAnswer::Fallback { source, reason, .. } = &answer {
            log::warn!(
                "Combining with {} failed ({}); answering with {} instead",
                combiner.key(),
                reason,
                source.key()
            );
        }
        answer
    }
}

/// Pick one successful response uniformly at random
pub fn pick_fallback<R: Rng + ?Sized>(successes: &Successes, reason: String, rng: &mut R) -> CombinedAnswer {
    let chosen = successes.choose(rng);
    CombinedAnswer::Fallback {
        text: chosen.text().unwrap_or_default().to_string(),
        source: chosen.model.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fake::{FakeGateway, Reply};
    use crate::models::QueryOutcome;
    use std::time::Duration;

    fn successes(texts: &[(&str, &str)]) -> Successes {
        let outcomes = texts
            .iter()
            .map(|(model, text)| {
                QueryOutcome::succeeded(ModelRef::new("openai", model), text.to_string(), Duration::ZERO)
            })
            .collect();
        Successes::from_outcomes(outcomes).unwrap()
    }

    fn combiner_with(gateway: FakeGateway, settings: GenerationConfig) -> (ResponseCombiner, Arc<ProgressTracker>) {
        let progress = Arc::new(ProgressTracker::new());
        let combiner = ResponseCombiner::new(Arc::new(gateway), progress.clone(), Arc::new(settings));
        (combiner, progress)
    }

    #[tokio::test]
    async fn test_synthesized_answer() {
        let judge = ModelRef::new("claude", "judge");
        let gateway = FakeGateway::new().with(&judge, Reply::Text("merged".into()));
        let (combiner, progress) = combiner_with(gateway, GenerationConfig::default());

        let answer = combiner
            .combine("q", &successes(&[("a", "A"), ("b", "B")]), &judge, &[])
            .await;

        assert_eq!(answer.text(), "merged");
        assert_eq!(answer.source(), AnswerSource::Synthesized);
        assert_eq!(progress.snapshot().stage, ProgressStage::Combining);
    }

    #[tokio::test]
    async fn test_prompt_appended_without_touching_history() {
        let judge = ModelRef::new("claude", "judge");
        let gateway = Arc::new(FakeGateway::new().with(&judge, Reply::Text("merged".into())));
        let combiner = ResponseCombiner::new(
            gateway.clone(),
            Arc::new(ProgressTracker::new()),
            Arc::new(GenerationConfig::default()),
        );

        let history = vec![ChatTurn::user("q")];
        combiner
            .combine("q", &successes(&[("a", "A")]), &judge, &history)
            .await;

        assert_eq!(history.len(), 1);
        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (target, seen) = &calls[0];
        assert_eq!(target, "claude/judge");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ChatTurn::user("q"));
        assert!(seen[1].content.contains("### Openai A\nA"));
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_a_success() {
        let judge = ModelRef::new("claude", "judge");
        let gateway = FakeGateway::new().with(&judge, Reply::Fail("overloaded".into()));
        let (combiner, _) = combiner_with(gateway, GenerationConfig::default());

        let answer = combiner
            .combine("q", &successes(&[("a", "A"), ("b", "B")]), &judge, &[])
            .await;

        assert_eq!(answer.source(), AnswerSource::Fallback);
        assert!(answer.text() == "A" || answer.text() == "B");
        match answer {
            CombinedAnswer::Fallback { reason, .. } => assert!(reason.contains("overloaded")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_synthesis_falls_back() {
        let judge = ModelRef::new("claude", "judge");
        let gateway = FakeGateway::new().with(&judge, Reply::Text("\n".into()));
        let (combiner, _) = combiner_with(gateway, GenerationConfig::default());

        let answer = combiner.combine("q", &successes(&[("a", "A")]), &judge, &[]).await;
        assert_eq!(
            answer,
            CombinedAnswer::Fallback {
                text: "A".to_string(),
                source: ModelRef::new("openai", "a"),
                reason: "combiner returned an empty response".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let judge = ModelRef::new("claude", "judge");
        let gateway = FakeGateway::new().with(
            &judge,
            Reply::Delayed(Duration::from_secs(30), Box::new(Reply::Text("late".into()))),
        );
        let settings = GenerationConfig {
            request_timeout_secs: 1,
            ..GenerationConfig::default()
        };
        let (combiner, _) = combiner_with(gateway, settings);

        let answer = combiner.combine("q", &successes(&[("a", "A")]), &judge, &[]).await;
        assert_eq!(answer.text(), "A");
        assert_eq!(answer.source(), AnswerSource::Fallback);
    }

    #[tokio::test]
    async fn test_panicking_combiner_falls_back() {
        let judge = ModelRef::new("claude", "judge");
        let gateway = FakeGateway::new().with(&judge, Reply::Panic);
        let (combiner, _) = combiner_with(gateway, GenerationConfig::default());

        let answer = combiner.combine("q", &successes(&[("a", "A")]), &judge, &[]).await;
        assert_eq!(answer.text(), "A");
        match answer {
            CombinedAnswer::Fallback { reason, .. } => {
                assert!(reason.starts_with("combiner panicked:"), "{}", reason)
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_pick_fallback_covers_every_success() {
        let set = successes(&[("a", "A"), ("b", "B"), ("c", "C")]);
        let mut rng = rand::thread_rng();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(pick_fallback(&set, "x".into(), &mut rng).into_text());
        }
        assert_eq!(seen.len(), 3);
    }
}
