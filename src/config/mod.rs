pub mod validation;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Environment variable overriding `upstream.chat_url`.
pub const UPSTREAM_URL_ENV: &str = "ZIPPT_UPSTREAM_URL";

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8787
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Upstream AI-catalog service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Full URL of the upstream chat endpoint.
    #[serde(default = "default_chat_url")]
    pub chat_url: String,
    /// Idle-read timeout in seconds for the upstream SSE stream.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Cap on bytes buffered while waiting for an SSE event delimiter.
    /// Exceeding it aborts the relayed stream instead of growing unbounded.
    #[serde(default = "default_max_buffered_event_bytes")]
    pub max_buffered_event_bytes: usize,
}

fn default_chat_url() -> String {
    "https://api-catalog.zippt.app/api/chat".to_string()
}
fn default_timeout() -> u64 {
    120
}
fn default_max_buffered_event_bytes() -> usize {
    1024 * 1024
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            chat_url: default_chat_url(),
            timeout: default_timeout(),
            max_buffered_event_bytes: default_max_buffered_event_bytes(),
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file and validate it.
///
/// A missing file is not an error: the proxy boots with built-in defaults so
/// a bare deployment only needs the env override. `ZIPPT_UPSTREAM_URL`, when
/// set and non-empty, replaces `upstream.chat_url`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails for any reason
/// other than it not existing, [`ConfigError::Yaml`] when parsing fails, or
/// [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str(&contents)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(err) => return Err(ConfigError::Io(err)),
    };
    if let Ok(url) = std::env::var(UPSTREAM_URL_ENV) {
        if !url.trim().is_empty() {
            config.upstream.chat_url = url;
        }
    }
    validate_config(&config)?;
    Ok(config)
}
