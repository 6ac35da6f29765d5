//! Client configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. `<config dir>/ollama-chat/config.json`, if present
//! 3. `OLLAMA_CHAT_*` environment variables
//!
//! # Example
//!
//! ```ignore
//! use ollama_chat::config::ClientConfig;
//!
//! let config = ClientConfig::default()
//!     .with_api_url("http://127.0.0.1:8000/api")
//!     .with_default_model("llama3");
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::api::DEFAULT_API_URL;

/// Directory name under the platform config dir.
pub const CONFIG_DIR: &str = "ollama-chat";
/// File name of the configuration file.
pub const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "OLLAMA_CHAT_API_URL";
pub const ENV_MODEL: &str = "OLLAMA_CHAT_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "OLLAMA_CHAT_TIMEOUT_SECS";
pub const ENV_MAX_LINE_BYTES: &str = "OLLAMA_CHAT_MAX_LINE_BYTES";
pub const ENV_LOG: &str = "OLLAMA_CHAT_LOG";

/// Timeout for non-streaming requests (3 minutes)
const DEFAULT_TIMEOUT_SECS: u64 = 180;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Configuration for the chat client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the backend's `/api` routes.
    pub api_url: String,
    /// Model used when neither the command line nor the conversation names one.
    pub default_model: Option<String>,
    /// Timeout for non-streaming requests. Streams are never timed out.
    pub request_timeout_secs: u64,
    /// Longest accepted streamed line in bytes. Unbounded when `None`.
    pub max_line_bytes: Option<usize>,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            default_model: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_line_bytes: None,
            log_filter: "warn".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_max_line_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_line_bytes = limit;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Default location of the configuration file.
    ///
    /// Returns `None` if the platform config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load defaults, then the config file if it exists, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env()
    }

    /// Read a config file. Missing fields keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Override fields from `OLLAMA_CHAT_*` environment variables.
    ///
    /// Empty variables are ignored. `OLLAMA_CHAT_MAX_LINE_BYTES=0` removes
    /// the line limit.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = var(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(model) = var(ENV_MODEL) {
            self.default_model = Some(model);
        }
        if let Some(value) = var(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_number(ENV_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = var(ENV_MAX_LINE_BYTES) {
            let limit: usize = parse_number(ENV_MAX_LINE_BYTES, &value)?;
            self.max_line_bytes = if limit == 0 { None } else { Some(limit) };
        }
        if let Some(filter) = var(ENV_LOG) {
            self.log_filter = filter;
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
