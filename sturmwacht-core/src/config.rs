use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{model::Location, provider::ProviderId};

/// Environment variable holding the key for both the Grok and OpenAI endpoints.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration for a single weather provider (e.g., API key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
}

/// Chat completion endpoints used by the API handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub xai_base_url: String,
    pub openai_base_url: String,
    pub grok_model: String,
    pub openai_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            xai_base_url: "https://api.x.ai/v1".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            grok_model: "grok-4-latest".to_string(),
            openai_model: "gpt-4".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// default_provider = "openweather"
/// cache_ttl_secs = 600
///
/// [providers.openweather]
/// api_key = "..."
///
/// [location]
/// name = "Berlin-Mitte"
/// latitude = 52.52
/// longitude = 13.41
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Optional default provider id, "open-meteo" or "openweather".
    pub default_provider: Option<String>,
    pub providers: HashMap<String, ProviderConfig>,
    pub location: Location,
    pub cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub llm: LlmConfig,
    pub server: ServerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_provider: None,
            providers: HashMap::new(),
            location: Location::default(),
            cache_ttl_secs: 10 * 60,
            http_timeout_secs: 10,
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    ///
    /// Open-Meteo needs no credentials, so it is used when nothing is configured.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        match self.default_provider.as_deref() {
            Some(s) => ProviderId::try_from(s),
            None => Ok(ProviderId::OpenMeteo),
        }
    }

    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Load config from the platform config dir, or an empty default on first run.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    /// Save config, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("de", "baumfaeller24", "sturmwacht")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set/replace a provider API key; becomes the default if none is set yet.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        let key = provider_id.as_str().to_string();
        self.providers.insert(key, ProviderConfig { api_key });

        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers
            .get(provider_id.as_str())
            .map(|cfg| cfg.api_key.as_str())
    }
}

/// Reads the LLM key from `OPENAI_API_KEY`. Empty values count as unset.
pub fn llm_api_key_from_env() -> Option<String> {
    non_empty(std::env::var(API_KEY_ENV).ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
