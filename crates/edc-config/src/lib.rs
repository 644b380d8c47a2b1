//! ---
//! edc_section: "03-configuration"
//! edc_subsection: "module"
//! edc_type: "source"
//! edc_scope: "code"
//! edc_description: "Configuration loading and validation helpers."
//! edc_version: "v0.0.0-prealpha"
//! edc_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use edc_model::UserGoals;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed reading configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn default_base_url() -> String {
    "http://localhost:8000".to_owned()
}

fn default_stream_url() -> String {
    "ws://localhost:8000/ws/live-meter".to_owned()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_tariff_inr_per_kwh() -> f64 {
    8.0
}

fn default_reconnect() -> bool {
    true
}

fn default_initial_backoff() -> Duration {
    Duration::from_secs(1)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(30)
}

fn default_appliances() -> Vec<String> {
    ["Fridge", "AC", "TV", "Washing Machine"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Primary configuration object for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub goals: UserGoals,
    #[serde(default = "default_appliances")]
    pub appliances: Vec<String>,
}

/// Request/response backend settings.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL joined with the endpoint paths.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request bound; timeout is treated as a standard failure.
    #[serde(default = "default_request_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
    /// Tariff used to derive the per-bucket cost posted with simulation
    /// requests.
    #[serde(default = "default_tariff_inr_per_kwh")]
    pub tariff_inr_per_kwh: f64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            tariff_inr_per_kwh: default_tariff_inr_per_kwh(),
        }
    }
}

/// Live meter stream settings, including the reconnect policy.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// WebSocket endpoint of the live meter feed.
    #[serde(default = "default_stream_url")]
    pub url: String,
    /// Disable to reproduce the single-attempt policy: one connection, no
    /// recovery after it drops.
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,
    /// First retry delay; doubles per failed attempt.
    #[serde(default = "default_initial_backoff")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub initial_backoff: Duration,
    /// Ceiling for the doubling retry delay.
    #[serde(default = "default_max_backoff")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub max_backoff: Duration,
    /// Optional bound on reconnect attempts; `None` retries indefinitely.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_stream_url(),
            reconnect: default_reconnect(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
            max_attempts: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            stream: StreamConfig::default(),
            goals: UserGoals::default(),
            appliances: default_appliances(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the first existing candidate path, falling
    /// back to defaults when none exists.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                debug!(path = %path.display(), "loading client configuration");
                let config = Self::from_path(path)?;
                config.validate()?;
                return Ok(config);
            }
        }
        debug!("no configuration file found; using defaults");
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration file at an explicit path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("backend.base_url is empty".into()));
        }
        if self.stream.url.trim().is_empty() {
            return Err(ConfigError::Invalid("stream.url is empty".into()));
        }
        if self.backend.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "backend.request_timeout must be non-zero".into(),
            ));
        }
        if self.backend.tariff_inr_per_kwh <= 0.0 {
            return Err(ConfigError::Invalid(
                "backend.tariff_inr_per_kwh must be positive".into(),
            ));
        }
        if self.stream.initial_backoff.is_zero()
            || self.stream.max_backoff < self.stream.initial_backoff
        {
            return Err(ConfigError::Invalid(
                "stream backoff bounds must satisfy 0 < initial <= max".into(),
            ));
        }
        Ok(())
    }
}
