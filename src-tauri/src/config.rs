//! Application configuration.
//!
//! Values come from three layers, later ones winning:
//! - built-in defaults (mirrored in `config/default.toml`)
//! - an optional `dicomview.toml` in the platform config directory
//! - the `DICOMVIEW_API_URL` environment variable for the API base URL

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::inference::PollConfig;

/// Commented template shipped with the app, parsed by `default_config()`.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

pub const API_URL_ENV: &str = "DICOMVIEW_API_URL";
pub const CONFIG_FILE_NAME: &str = "dicomview.toml";

const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub inference: InferenceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            inference: InferenceConfig::default(),
        }
    }
}

/// Inference status polling settings.
///
/// Both bounds are unset by default: the loop runs until the server reports a
/// terminal status or the owning view cancels it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub poll_interval_ms: u64,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_attempts: None,
            timeout_secs: None,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.inference.poll_interval_ms),
            max_attempts: self.inference.max_attempts,
            timeout: self.inference.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Replace the API base URL when an override is present and non-blank.
    pub fn with_api_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            info!("Using API base URL from {}: {}", API_URL_ENV, url);
            self.api_base_url = url;
        }
        self
    }
}

/// Parse the embedded default configuration.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_config() -> AppConfig {
    toml::from_str(DEFAULT_CONFIG).expect("embedded default.toml must be valid TOML")
}

/// Load a configuration file. Keys missing from the file keep their defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Location of the optional user configuration file.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("dicomview").join(CONFIG_FILE_NAME))
}

/// Resolve the effective configuration for this process.
pub fn resolve_config() -> AppConfig {
    let mut config = default_config();

    if let Some(path) = user_config_path().filter(|p| p.exists()) {
        match load_config(&path) {
            Ok(loaded) => {
                info!("Loaded configuration from {:?}", path);
                config = loaded;
            }
            Err(e) => warn!("Ignoring invalid config file {:?}: {}", path, e),
        }
    }

    config.with_api_url_override(std::env::var(API_URL_ENV).ok())
}
