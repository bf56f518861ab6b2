//! Client configuration.
//!
//! The client consumes [`BillyConfig`] as given. Loading it from a TOML file
//! or the environment is offered here for hosts that want it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.billysbilling.com/v2";

/// Errors raised while loading a [`BillyConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Connection and behavior settings for [`BillyClient`](crate::BillyClient).
#[derive(Clone, Serialize, Deserialize)]
pub struct BillyConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    pub api_key: String,
    #[serde(default)]
    pub organization_id: String,
    /// Answer every call locally instead of contacting the API.
    #[serde(default)]
    pub dry_run: bool,
    /// Marks the client as talking to a Billy test organization.
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default)]
    pub resilience: ResilienceSettings,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl BillyConfig {
    pub fn new(api_key: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            api_base: default_api_base(),
            api_key: api_key.into(),
            organization_id: organization_id.into(),
            dry_run: false,
            test_mode: false,
            resilience: ResilienceSettings::default(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_resilience(mut self, resilience: ResilienceSettings) -> Self {
        self.resilience = resilience;
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Reads `BILLY_API_KEY` and `BILLY_ORGANIZATION_ID` (both required),
    /// plus the optional `BILLY_API_BASE`, `BILLY_DRY_RUN` and
    /// `BILLY_TEST_MODE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };
        let flag = |name: &'static str| match lookup(name) {
            None => Ok(false),
            Some(value) => parse_flag(name, &value),
        };

        let mut config = Self::new(required("BILLY_API_KEY")?, required("BILLY_ORGANIZATION_ID")?);
        if let Some(api_base) = lookup("BILLY_API_BASE").filter(|v| !v.trim().is_empty()) {
            config.api_base = api_base;
        }
        config.dry_run = flag("BILLY_DRY_RUN")?;
        config.test_mode = flag("BILLY_TEST_MODE")?;
        Ok(config)
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        }),
    }
}

impl fmt::Debug for BillyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BillyConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"<redacted>")
            .field("organization_id", &self.organization_id)
            .field("dry_run", &self.dry_run)
            .field("test_mode", &self.test_mode)
            .field("resilience", &self.resilience)
            .finish()
    }
}

/// Tuning for the resilience stack. Every section falls back to its
/// defaults when omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub rate_limit: RateLimitSettings,
    pub circuit: CircuitSettings,
    pub cache: CacheSettings,
    pub transport: TransportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub max_requests: usize,
    pub window_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_ms: 60_000,
        }
    }
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitSettings {
    pub call_timeout_ms: u64,
    pub error_threshold_percentage: u8,
    pub reset_timeout_ms: u64,
    pub rolling_window_ms: u64,
    pub rolling_buckets: u32,
    /// Executed calls required in the window before the circuit may open.
    pub volume_threshold: u64,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            error_threshold_percentage: 50,
            reset_timeout_ms: 60_000,
            rolling_window_ms: 10_000,
            rolling_buckets: 10,
            volume_threshold: 5,
        }
    }
}

impl CircuitSettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn rolling_window(&self) -> Duration {
        Duration::from_millis(self.rolling_window_ms)
    }

    pub fn failure_rate_threshold(&self) -> f64 {
        f64::from(self.error_threshold_percentage.min(100)) / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
    pub freshness_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 1000,
            freshness_ms: 3_600_000,
        }
    }
}

impl CacheSettings {
    pub fn freshness(&self) -> Duration {
        Duration::from_millis(self.freshness_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Upper bound on concurrent in-flight HTTP requests.
    pub max_connections: usize,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            max_connections: 50,
            pool_max_idle_per_host: 10,
            pool_idle_timeout_ms: 90_000,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 60_000,
        }
    }
}
