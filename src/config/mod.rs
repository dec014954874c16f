// Application configuration loaded from ~/.fanout-chat/config.toml

pub mod providers;
pub mod secrets;

pub use providers::{merge_providers, ApiStyle, ProviderConfig, ProviderModel};
pub use secrets::SecretsConfig;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Be conversational and engaging.";

pub const DEFAULT_COMBINER_SYSTEM_PROMPT: &str =
    "You combine answers from several AI assistants into one clear, accurate reply.";

/// Directory holding config and secrets (~/.fanout-chat)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".fanout-chat"))
}

/// Default config file path (~/.fanout-chat/config.toml)
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bind: "127.0.0.1".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

/// Fixed parameters applied to every backend call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub system_prompt: String,
    pub combiner_system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Deadline for a single backend call
    pub request_timeout_secs: u64,
    /// Upper bound on concurrent backend calls per round; unset means no bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            combiner_system_prompt: DEFAULT_COMBINER_SYSTEM_PROMPT.to_string(),
            max_tokens: 500,
            temperature: 0.7,
            request_timeout_secs: 120,
            max_parallel: None,
        }
    }
}

impl GenerationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("generation.request_timeout_secs must be greater than 0"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("generation.max_tokens must be greater than 0"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!(
                "generation.temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.max_parallel == Some(0) {
            return Err(anyhow!("generation.max_parallel must be greater than 0"));
        }
        Ok(())
    }
}

/// Retention of finished jobs in the in-memory table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobsConfig {
    pub retention_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
            cleanup_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    pub jobs: JobsConfig,
    /// Provider overrides and additions on top of the builtin presets
    pub providers: Vec<ProviderConfig>,
}

impl AppConfig {
    /// Load config from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config = Self::from_toml(&contents)
            .map_err(|e| anyhow!("Invalid config file '{}': {}", path.display(), e))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.generation.validate()?;
        Ok(config)
    }

    /// Builtin presets merged with configured providers
    pub fn effective_providers(&self) -> Vec<ProviderConfig> {
        merge_providers(&self.providers)
    }
}
