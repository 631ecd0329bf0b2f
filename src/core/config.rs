//! Runtime configuration for the MCP server.
//!
//! Values come from defaults, then environment variables (a `.env` file is
//! loaded first), then command-line overrides applied by the binary. The
//! service document itself is read by [`loader`](super::loader).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::transport::TransportConfig;
use crate::domains::operations::{
    DEFAULT_TIMEOUT, DispatchOptions, SettingsPolicy, positive_seconds,
};

/// A malformed environment variable that was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvWarning {
    /// The offending variable.
    pub key: &'static str,
    /// Why its value was rejected.
    pub message: String,
}

impl EnvWarning {
    pub(crate) fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EnvWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ignoring {}: {}", self.key, self.message)
    }
}

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Dispatcher configuration.
    pub dispatch: DispatchConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name reported to clients. When unset, the service document's name
    /// is used.
    pub name: Option<String>,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Path of the service document to load.
    pub service_config: Option<PathBuf>,

    /// Deadline for operations without an override.
    #[serde(with = "duration_secs")]
    pub default_timeout: Duration,

    /// Treatment of unknown group settings.
    pub settings_policy: SettingsPolicy,

    /// Time allowed for in-flight invocations at shutdown.
    #[serde(with = "duration_secs")]
    pub shutdown_grace: Duration,
}

impl DispatchConfig {
    /// Options handed to [`Dispatcher::load`](crate::domains::operations::Dispatcher::load).
    pub fn options(&self) -> DispatchOptions {
        DispatchOptions {
            default_timeout: self.default_timeout,
            settings_policy: self.settings_policy,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            service_config: None,
            default_timeout: DEFAULT_TIMEOUT,
            settings_policy: SettingsPolicy::default(),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Variables are prefixed with `MCP_`, e.g. `MCP_SERVER_NAME`,
    /// `MCP_DEFAULT_TIMEOUT`. Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        let (config, warnings) = Self::load_env();
        for warning in &warnings {
            warn!("{}", warning);
        }
        config
    }

    /// Like [`from_env`](Self::from_env), but returns the ignored values
    /// instead of logging them, for callers that set up logging afterwards.
    pub fn load_env() -> (Self, Vec<EnvWarning>) {
        dotenvy::dotenv().ok();

        let mut config = Self::default();
        let mut warnings = Vec::new();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = Some(name);
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.transport = TransportConfig::load_env(&mut warnings);

        if let Ok(path) = std::env::var("MCP_SERVICE_CONFIG") {
            config.dispatch.service_config = Some(PathBuf::from(path));
        }

        if let Some(timeout) = env_seconds("MCP_DEFAULT_TIMEOUT", &mut warnings) {
            config.dispatch.default_timeout = timeout;
        }

        if let Ok(policy) = std::env::var("MCP_SETTINGS_POLICY") {
            match policy.parse() {
                Ok(policy) => config.dispatch.settings_policy = policy,
                Err(e) => warnings.push(EnvWarning::new("MCP_SETTINGS_POLICY", e)),
            }
        }

        if let Some(grace) = env_seconds("MCP_SHUTDOWN_GRACE", &mut warnings) {
            config.dispatch.shutdown_grace = grace;
        }

        (config, warnings)
    }
}

/// Read a positive number of seconds from an environment variable.
fn env_seconds(key: &'static str, warnings: &mut Vec<EnvWarning>) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    let duration = raw.parse::<f64>().ok().and_then(positive_seconds);
    if duration.is_none() {
        warnings.push(EnvWarning::new(
            key,
            format!("'{}' is not a positive number of seconds", raw),
        ));
    }
    duration
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        crate::domains::operations::positive_seconds(secs).ok_or_else(|| {
            serde::de::Error::custom(format!("{} is not a positive number of seconds", secs))
        })
    }
}
