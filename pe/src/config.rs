//! Plansmith configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main plansmith configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Assistant service configuration
    pub assistant: AssistantConfig,

    /// Engine pacing and polling configuration
    pub engine: EngineConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.assistant.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Assistant API key not found. Set the {} environment variable.",
                self.assistant.api_key_env
            ));
        }
        if self.assistant.assistant_id.is_empty() {
            return Err(eyre::eyre!("assistant.assistant-id must be set"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .plansmith.yml
        let local_config = PathBuf::from(".plansmith.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/plansmith/plansmith.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("plansmith").join("plansmith.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Assistant service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Provider name (currently only "openai" supported)
    pub provider: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Pre-configured assistant to run against
    #[serde(rename = "assistant-id")]
    pub assistant_id: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            assistant_id: String::new(),
            timeout_ms: 60_000,
        }
    }
}

/// Engine pacing and polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum gap between consecutive assistant service calls
    #[serde(rename = "min-gap-ms")]
    pub min_gap_ms: u64,

    /// Interval between run status polls
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Maximum status polls per run before surfacing Timeout
    #[serde(rename = "max-poll-attempts")]
    pub max_poll_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_gap_ms: 750,
            poll_interval_ms: 1_000,
            max_poll_attempts: 120,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the plan document store
    #[serde(rename = "plans-dir")]
    pub plans_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            plans_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("plansmith")
                .join("plans"),
        }
    }
}
