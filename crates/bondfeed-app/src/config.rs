//! Application configuration.

use crate::error::{AppError, AppResult};
use bondfeed_feed::DEFAULT_MAX_TRANSACTIONS;
use bondfeed_ws::{ConnectorConfig, ReconnectConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BONDFEED_CONFIG";
/// Config file used when neither `--config` nor `BONDFEED_CONFIG` is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Live feed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Cap on the live view.
    #[serde(default = "default_max_transactions")]
    pub max_transactions: usize,
}

fn default_feed_url() -> String {
    "ws://localhost:8000/ws".to_string()
}

fn default_max_transactions() -> usize {
    DEFAULT_MAX_TRANSACTIONS
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            max_transactions: default_max_transactions(),
        }
    }
}

/// Reconnect backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
    /// 0 = unlimited.
    #[serde(default)]
    pub max_attempts: u32,
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_jitter_ms() -> u64 {
    250
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            max_jitter_ms: default_max_jitter_ms(),
            max_attempts: 0,
        }
    }
}

impl From<ReconnectSettings> for ReconnectConfig {
    fn from(s: ReconnectSettings) -> Self {
        Self {
            initial_delay_ms: s.initial_delay_ms,
            max_delay_ms: s.max_delay_ms,
            multiplier: s.multiplier,
            max_jitter_ms: s.max_jitter_ms,
            max_attempts: s.max_attempts,
        }
    }
}

/// REST backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    #[serde(default)]
    pub api: ApiSettings,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config path (CLI arg > `BONDFEED_CONFIG` > default) and
    /// load it. A missing file yields the built-in defaults.
    pub fn load(cli_path: Option<String>) -> AppResult<Self> {
        let path = resolve_path(cli_path, std::env::var(CONFIG_ENV).ok());
        info!(config_path = %path, "Loading configuration");

        if !Path::new(&path).exists() {
            warn!(config_path = %path, "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    fn validate(&self) -> AppResult<()> {
        if self.feed.url.is_empty() {
            return Err(AppError::Config("feed.url must not be empty".to_string()));
        }
        if self.feed.max_transactions == 0 {
            return Err(AppError::Config(
                "feed.max_transactions must be positive".to_string(),
            ));
        }
        if !self.reconnect.multiplier.is_finite() {
            return Err(AppError::Config(
                "reconnect.multiplier must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Connector configuration for the live feed.
    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            url: self.feed.url.clone(),
            reconnect: self.reconnect.clone().into(),
        }
    }
}

fn resolve_path(cli_path: Option<String>, env_path: Option<String>) -> String {
    cli_path
        .or(env_path)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}
