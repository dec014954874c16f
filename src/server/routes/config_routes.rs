//! Configuration command routing
//!
//! Handles get_config and get_config_paths. Secrets are never returned; only
//! whether a provider has a token configured.

use crate::config::{self, JobsConfig, ProviderConfig, SecretsConfig, ServerConfig};
use serde::Serialize;
use serde_json::Value;

use super::{route_value, InvokeError, ServerAppState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigView<'a> {
    server: &'a ServerConfig,
    generation: &'a config::GenerationConfig,
    jobs: &'a JobsConfig,
    providers: Vec<ProviderView<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderView<'a> {
    id: &'a str,
    name: &'a str,
    model_count: usize,
    has_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigPaths {
    config_path: Option<String>,
    secrets_path: Option<String>,
}

/// Check if a command belongs to this router
pub fn is_config_command(cmd: &str) -> bool {
    matches!(cmd, "get_config" | "get_config_paths")
}

/// Route configuration commands
pub async fn route_config_command(
    cmd: &str,
    _args: Value,
    state: &ServerAppState,
) -> Result<Value, InvokeError> {
    match cmd {
        "get_config" => {
            let secrets = SecretsConfig::load().unwrap_or_default();
            let providers = state.config.effective_providers();
            route_value!(ConfigView {
                server: &state.config.server,
                generation: state.council.settings(),
                jobs: &state.config.jobs,
                providers: providers.iter().map(|p| provider_view(p, &secrets)).collect(),
            })
        }

        "get_config_paths" => route_value!(ConfigPaths {
            config_path: config::default_config_path().map(|p| p.display().to_string()),
            secrets_path: SecretsConfig::get_secrets_path().map(|p| p.display().to_string()),
        }),

        _ => Err(format!("Unknown config command: {}", cmd).into()),
    }
}

fn provider_view<'a>(provider: &'a ProviderConfig, secrets: &SecretsConfig) -> ProviderView<'a> {
    ProviderView {
        id: &provider.id,
        name: &provider.name,
        model_count: provider.models.len(),
        has_token: !provider.requires_token || secrets.resolve_token(provider).is_some(),
    }
}
