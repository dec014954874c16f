// Data models shared by the council engine and the HTTP layer

pub mod job;
pub mod progress;
pub mod state_machine;

pub use job::{AnswerSource, Job, JobStatus};
pub use progress::{CompletedEvent, ProgressSnapshot, ProgressStage, ProgressView};

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::time::Duration;

// ============================================================================
// Model references
// ============================================================================

/// Identifies one backend model.
///
/// `display_name` is derived from the provider and model ids and only used
/// for presentation; equality and hashing ignore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawModelRef")]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
    pub display_name: String,
}

/// Wire form of [`ModelRef`] where the display name is optional
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModelRef {
    provider: String,
    model: String,
}

impl From<RawModelRef> for ModelRef {
    fn from(raw: RawModelRef) -> Self {
        ModelRef::new(&raw.provider, &raw.model)
    }
}

impl ModelRef {
    pub fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
            display_name: format!("{} {}", title_case(provider), format_model_name(model)),
        }
    }

    /// `provider/model` key used in logs and event payloads
    pub fn key(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.provider == other.provider && self.model == other.model
    }
}

impl Eq for ModelRef {}

impl Hash for ModelRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.provider.hash(state);
        self.model.hash(state);
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name)
    }
}

/// Capitalize the first letter of every word
fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format a model ID into a human-readable name
pub fn format_model_name(model_id: &str) -> String {
    match model_id {
        "gpt-4o" => "GPT-4o".to_string(),
        "gpt-4o-mini" => "GPT-4o Mini".to_string(),
        "o1" => "o1".to_string(),
        "o1-mini" => "o1 Mini".to_string(),
        _ => {
            // Convert kebab/snake case to Title Case, keeping version dots intact
            title_case(&model_id.replace(['-', '_'], " "))
        }
    }
}

/// Relative size class of a model, used to filter model listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ModelSize {
    Small,
    Medium,
    Large,
    Largest,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
            ModelSize::Largest => "largest",
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            "largest" => Ok(ModelSize::Largest),
            _ => Err(format!(
                "Unknown model size: '{}'. Expected one of: small, medium, large, largest",
                s
            )),
        }
    }
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One turn of the shared conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat submission as received from the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub selected_models: Vec<ModelRef>,
    #[serde(default)]
    pub combiner_model: Option<ModelRef>,
}

// ============================================================================
// Query outcomes
// ============================================================================

/// Result of one backend call made during fan-out.
///
/// Exactly one of `response`/`error` is set, matching `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub model: ModelRef,
    pub response: Option<String>,
    #[serde(rename = "durationMs", with = "duration_ms")]
    pub duration: Duration,
    pub success: bool,
    pub error: Option<String>,
}

impl QueryOutcome {
    pub fn succeeded(model: ModelRef, response: String, duration: Duration) -> Self {
        Self {
            model,
            response: Some(response),
            duration,
            success: true,
            error: None,
        }
    }

    pub fn failed(model: ModelRef, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            model,
            response: None,
            duration,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Response text of a successful outcome
    pub fn text(&self) -> Option<&str> {
        if self.success {
            self.response.as_deref()
        } else {
            None
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
