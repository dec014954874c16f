// Builtin model provider presets
//
// Each preset describes how to reach one provider's chat API and which of its
// models are offered. Config files can override a preset by id or add new
// providers (e.g. a local OpenAI-compatible server).

use crate::models::ModelSize;
use serde::{Deserialize, Serialize};

/// Wire protocol spoken by a provider endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    /// `POST .../chat/completions` with a `messages` array
    Openai,
    /// `POST /v1/messages` with a top-level `system` field
    Anthropic,
}

/// A builtin provider preset
/// Note: This is hardcoded data, not deserialized from files
#[derive(Debug, Clone)]
pub struct ProviderPreset {
    /// Provider ID used in model references (e.g., "openai", "claude")
    pub id: &'static str,
    /// Display name
    pub name: &'static str,
    pub api_style: ApiStyle,
    /// Full URL of the chat endpoint
    pub endpoint: &'static str,
    /// Environment variable holding the API token
    pub token_env: &'static str,
    /// (model id, provider API model id, size)
    pub models: &'static [(&'static str, &'static str, ModelSize)],
}

/// Builtin provider presets
pub static PROVIDERS: &[ProviderPreset] = &[
    ProviderPreset {
        id: "openai",
        name: "OpenAI",
        api_style: ApiStyle::Openai,
        endpoint: "https://api.openai.com/v1/chat/completions",
        token_env: "OPENAI_API_KEY",
        models: &[
            ("gpt-4o-mini", "gpt-4o-mini", ModelSize::Small),
            ("gpt-4o", "gpt-4o", ModelSize::Large),
            ("o1", "o1", ModelSize::Largest),
        ],
    },
    ProviderPreset {
        id: "claude",
        name: "Anthropic",
        api_style: ApiStyle::Anthropic,
        endpoint: "https://api.anthropic.com/v1/messages",
        token_env: "ANTHROPIC_API_KEY",
        models: &[
            ("haiku-3.5", "claude-3-5-haiku-latest", ModelSize::Medium),
            ("sonnet-4", "claude-sonnet-4-0", ModelSize::Large),
            ("opus-4", "claude-opus-4-0", ModelSize::Largest),
        ],
    },
    ProviderPreset {
        id: "gemini",
        name: "Google Gemini",
        api_style: ApiStyle::Openai,
        endpoint: "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions",
        token_env: "GEMINI_API_KEY",
        models: &[
            ("gemini-2.0-flash", "gemini-2.0-flash", ModelSize::Medium),
            ("gemini-1.5-pro", "gemini-1.5-pro", ModelSize::Large),
        ],
    },
    ProviderPreset {
        id: "mistral",
        name: "Mistral",
        api_style: ApiStyle::Openai,
        endpoint: "https://api.mistral.ai/v1/chat/completions",
        token_env: "MISTRAL_API_KEY",
        models: &[
            ("mistral-small", "mistral-small-latest", ModelSize::Small),
            ("mistral-large", "mistral-large-latest", ModelSize::Large),
        ],
    },
];

/// Get a provider preset by ID
pub fn get_provider_preset(id: &str) -> Option<&'static ProviderPreset> {
    PROVIDERS.iter().find(|p| p.id == id)
}

/// One model offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderModel {
    /// Id exposed to clients in model references
    pub id: String,
    /// Id sent to the provider API; defaults to `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<String>,
    pub size: ModelSize,
}

impl ProviderModel {
    pub fn api_model(&self) -> &str {
        self.api_id.as_deref().unwrap_or(&self.id)
    }
}

/// Runtime provider configuration (preset or config file entry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub api_style: ApiStyle,
    pub endpoint: String,
    #[serde(default)]
    pub token_env: Option<String>,
    /// Local servers usually accept unauthenticated requests
    #[serde(default = "default_requires_token")]
    pub requires_token: bool,
    #[serde(default)]
    pub models: Vec<ProviderModel>,
}

fn default_requires_token() -> bool {
    true
}

impl ProviderConfig {
    /// Find a model by the id clients use
    pub fn find_model(&self, model_id: &str) -> Option<&ProviderModel> {
        self.models.iter().find(|m| m.id == model_id)
    }
}

impl ProviderPreset {
    pub fn to_config(&self) -> ProviderConfig {
        ProviderConfig {
            id: self.id.to_string(),
            name: self.name.to_string(),
            api_style: self.api_style,
            endpoint: self.endpoint.to_string(),
            token_env: Some(self.token_env.to_string()),
            requires_token: true,
            models: self
                .models
                .iter()
                .map(|(id, api_id, size)| ProviderModel {
                    id: (*id).to_string(),
                    api_id: (id != api_id).then(|| (*api_id).to_string()),
                    size: *size,
                })
                .collect(),
        }
    }
}

/// Combine the builtin presets with configured providers.
///
/// A configured provider replaces the preset with the same id; unknown ids
/// are appended in configuration order.
pub fn merge_providers(configured: &[ProviderConfig]) -> Vec<ProviderConfig> {
    let mut merged: Vec<ProviderConfig> = PROVIDERS.iter().map(|p| p.to_config()).collect();

    for provider in configured {
        match merged.iter_mut().find(|p| p.id == provider.id) {
            Some(existing) => *existing = provider.clone(),
            None => merged.push(provider.clone()),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_provider_preset() {
        let claude = get_provider_preset("claude");
        assert!(claude.is_some());
        assert_eq!(claude.unwrap().api_style, ApiStyle::Anthropic);

        assert!(get_provider_preset("unknown").is_none());
    }

    #[test]
    fn test_preset_to_config_maps_api_ids() {
        let config = get_provider_preset("claude").unwrap().to_config();
        let haiku = config.find_model("haiku-3.5").unwrap();
        assert_eq!(haiku.api_model(), "claude-3-5-haiku-latest");
        assert_eq!(haiku.size, ModelSize::Medium);

        let openai = get_provider_preset("openai").unwrap().to_config();
        let gpt = openai.find_model("gpt-4o").unwrap();
        assert!(gpt.api_id.is_none());
        assert_eq!(gpt.api_model(), "gpt-4o");
        assert_eq!(openai.token_env.as_deref(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn test_merge_providers_overrides_and_appends() {
        let local = ProviderConfig {
            id: "local".to_string(),
            name: "Local".to_string(),
            api_style: ApiStyle::Openai,
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            token_env: None,
            requires_token: false,
            models: vec![ProviderModel {
                id: "llama3".to_string(),
                api_id: None,
                size: ModelSize::Medium,
            }],
        };
        let mut openai = get_provider_preset("openai").unwrap().to_config();
        openai.models.truncate(1);

        let merged = merge_providers(&[openai, local]);
        assert_eq!(merged.len(), PROVIDERS.len() + 1);
        assert_eq!(merged[0].id, "openai");
        assert_eq!(merged[0].models.len(), 1);
        assert_eq!(merged.last().unwrap().id, "local");
    }

    #[test]
    fn test_provider_config_from_toml() {
        let toml_str = r#"
            id = "local"
            api_style = "openai"
            endpoint = "http://localhost:8080/v1/chat/completions"
            requires_token = false
            models = [{ id = "llama3", size = "medium" }]
        "#;
        let provider: ProviderConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(provider.api_style, ApiStyle::Openai);
        assert!(!provider.requires_token);
        assert_eq!(provider.models[0].size, ModelSize::Medium);
    }
}
