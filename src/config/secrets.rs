// Storage for provider API tokens
//
// Tokens are stored in ~/.fanout-chat/secrets.toml. A provider's environment
// variable (e.g. OPENAI_API_KEY) takes precedence over the file.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::providers::ProviderConfig;

/// Secrets stored in ~/.fanout-chat/secrets.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecretsConfig {
    /// API tokens indexed by provider ID (e.g., "openai" -> "sk-...")
    #[serde(default)]
    pub api_tokens: HashMap<String, String>,
}

impl SecretsConfig {
    /// Get the secrets file path (~/.fanout-chat/secrets.toml)
    pub fn get_secrets_path() -> Option<PathBuf> {
        super::config_dir().map(|p| p.join("secrets.toml"))
    }

    /// Load secrets from the default location
    pub fn load() -> Result<Self> {
        let path = Self::get_secrets_path()
            .ok_or_else(|| anyhow!("Could not determine home directory"))?;
        Self::load_from(&path)
    }

    /// Load secrets from a specific file; a missing file yields no secrets
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read secrets file '{}': {}", path.display(), e))?;

        let config: SecretsConfig = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse secrets file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save secrets to a specific file with owner-only permissions
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    anyhow!(
                        "Failed to create secrets directory '{}': {}",
                        parent.display(),
                        e
                    )
                })?;
            }
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize secrets: {}", e))?;

        fs::write(path, contents)
            .map_err(|e| anyhow!("Failed to write secrets file '{}': {}", path.display(), e))?;

        // Set file permissions to 600 (owner read/write only) on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, permissions).map_err(|e| {
                anyhow!(
                    "Failed to set permissions on secrets file '{}': {}",
                    path.display(),
                    e
                )
            })?;
        }

        log::info!("Saved secrets to: {}", path.display());
        Ok(())
    }

    /// Get a provider's API token from the file
    pub fn get_token(&self, provider_id: &str) -> Option<&String> {
        self.api_tokens.get(provider_id)
    }

    /// Set a provider's API token
    pub fn set_token(&mut self, provider_id: &str, token: &str) {
        self.api_tokens
            .insert(provider_id.to_string(), token.to_string());
    }

    /// Resolve the token for a provider: environment variable first, then file
    pub fn resolve_token(&self, provider: &ProviderConfig) -> Option<String> {
        provider
            .token_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|token| !token.trim().is_empty())
            .or_else(|| self.get_token(&provider.id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::providers::ApiStyle;
    use tempfile::TempDir;

    fn provider(id: &str, token_env: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            id: id.to_string(),
            name: id.to_string(),
            api_style: ApiStyle::Openai,
            endpoint: "http://localhost/v1/chat/completions".to_string(),
            token_env: token_env.map(|s| s.to_string()),
            requires_token: true,
            models: vec![],
        }
    }

    #[test]
    fn test_secrets_config_default() {
        let config = SecretsConfig::default();
        assert!(config.api_tokens.is_empty());
    }

    #[test]
    fn test_set_and_get_token() {
        let mut config = SecretsConfig::default();
        config.set_token("openai", "test-token");
        assert_eq!(config.get_token("openai"), Some(&"test-token".to_string()));
        assert!(config.get_token("claude").is_none());
    }

    #[test]
    fn test_resolve_token_prefers_env() {
        let mut config = SecretsConfig::default();
        config.set_token("envtest", "from-file");

        let var = "FANOUT_CHAT_TEST_TOKEN_PREFERS_ENV";
        std::env::set_var(var, "from-env");
        assert_eq!(
            config.resolve_token(&provider("envtest", Some(var))),
            Some("from-env".to_string())
        );
        std::env::remove_var(var);

        assert_eq!(
            config.resolve_token(&provider("envtest", Some(var))),
            Some("from-file".to_string())
        );
        assert_eq!(config.resolve_token(&provider("other", None)), None);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("secrets.toml");

        let mut config = SecretsConfig::default();
        config.set_token("openai", "sk-12345");
        config.save_to(&path).unwrap();

        let loaded = SecretsConfig::load_from(&path).unwrap();
        assert_eq!(loaded.get_token("openai"), Some(&"sk-12345".to_string()));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let loaded = SecretsConfig::load_from(&dir.path().join("missing.toml")).unwrap();
        assert!(loaded.api_tokens.is_empty());
    }
}
