//! Configuration for the backing-store agent.
//!
//! Supports multiple configuration sources with precedence:
//! 1. Environment variables (highest priority)
//! 2. TOML configuration file
//! 3. Default values (lowest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vcstore_core::naming::MIN_PASSWORD_LENGTH;
use vcstore_core::{InstanceRef, TeardownSettings};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "vcstore.toml";

/// Main configuration structure for the agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Instance identity and backing-store selection
    #[serde(default)]
    pub instance: InstanceConfig,

    /// Deadlines for database and cleanup work
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Teardown job tunables
    #[serde(default)]
    pub teardown: TeardownSettings,

    /// Generated credential settings
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where the provisioned data source is handed off
    #[serde(default)]
    pub output: OutputConfig,
}

/// Which instance this agent serves and where its store lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Instance name
    #[serde(default)]
    pub name: String,

    /// Host namespace
    #[serde(default)]
    pub namespace: String,

    /// Connector record name; empty disables provisioning
    #[serde(default)]
    pub connector: String,

    /// Explicit data source, used when no connector is configured
    #[serde(default)]
    pub data_source: String,
}

impl InstanceConfig {
    /// Instance reference for this configuration.
    pub fn instance_ref(&self) -> InstanceRef {
        InstanceRef::new(&self.name, &self.namespace)
    }

    /// Connector name, if provisioning is enabled.
    pub fn connector(&self) -> Option<&str> {
        (!self.connector.is_empty()).then_some(self.connector.as_str())
    }
}

/// Deadlines, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connecting to and pinging the admin endpoint (default: 10)
    #[serde(default = "default_connect_seconds")]
    pub connect_seconds: u64,

    /// A single DDL/DCL statement (default: 30)
    #[serde(default = "default_statement_seconds")]
    pub statement_seconds: u64,

    /// Whole shutdown cleanup, including artifact removal (default: 30)
    #[serde(default = "default_cleanup_seconds")]
    pub cleanup_seconds: u64,

    /// Delay before the script artifact is deleted (default: 10)
    #[serde(default = "default_artifact_grace_seconds")]
    pub artifact_grace_seconds: u64,
}

/// Generated credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Password length, at least 32 (default: 32)
    #[serde(default = "default_password_length")]
    pub password_length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty (default: "pretty")
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Data source hand-off.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File the data source is written to; stdout when unset
    #[serde(default)]
    pub data_source_path: Option<PathBuf>,
}

fn default_connect_seconds() -> u64 {
    10
}

fn default_statement_seconds() -> u64 {
    30
}

fn default_cleanup_seconds() -> u64 {
    30
}

fn default_artifact_grace_seconds() -> u64 {
    10
}

fn default_password_length() -> usize {
    MIN_PASSWORD_LENGTH
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_seconds: default_connect_seconds(),
            statement_seconds: default_statement_seconds(),
            cleanup_seconds: default_cleanup_seconds(),
            artifact_grace_seconds: default_artifact_grace_seconds(),
        }
    }
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_seconds)
    }

    pub fn statement(&self) -> Duration {
        Duration::from_secs(self.statement_seconds)
    }

    pub fn cleanup(&self) -> Duration {
        Duration::from_secs(self.cleanup_seconds)
    }

    pub fn artifact_grace(&self) -> Duration {
        Duration::from_secs(self.artifact_grace_seconds)
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            password_length: default_password_length(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file doesn't exist or has invalid TOML syntax.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::TomlError { path, source: e })
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Reads `path` when given, otherwise `vcstore.toml` if it exists,
    /// otherwise starts from defaults.
    ///
    /// Supported environment variables:
    /// - `VCSTORE_INSTANCE_NAME` - Instance name
    /// - `VCSTORE_INSTANCE_NAMESPACE` - Host namespace
    /// - `VCSTORE_CONNECTOR` - Connector record name
    /// - `VCSTORE_DATA_SOURCE` - Explicit data source
    /// - `VCSTORE_DATA_SOURCE_PATH` - Data source output file
    /// - `VCSTORE_CLEANUP_TIMEOUT_SECONDS` - Shutdown cleanup deadline
    /// - `VCSTORE_LOG_LEVEL` - Log level
    /// - `VCSTORE_LOG_FORMAT` - Log format
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("VCSTORE_INSTANCE_NAME") {
            self.instance.name = name;
        }

        if let Ok(namespace) = std::env::var("VCSTORE_INSTANCE_NAMESPACE") {
            self.instance.namespace = namespace;
        }

        if let Ok(connector) = std::env::var("VCSTORE_CONNECTOR") {
            self.instance.connector = connector;
        }

        if let Ok(data_source) = std::env::var("VCSTORE_DATA_SOURCE") {
            self.instance.data_source = data_source;
        }

        if let Ok(path) = std::env::var("VCSTORE_DATA_SOURCE_PATH") {
            self.output.data_source_path = Some(PathBuf::from(path));
        }

        if let Ok(seconds) = std::env::var("VCSTORE_CLEANUP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = seconds.parse() {
                self.timeouts.cleanup_seconds = seconds;
            }
        }

        if let Ok(level) = std::env::var("VCSTORE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("VCSTORE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instance.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "instance.name cannot be empty".to_string(),
            ));
        }

        if self.instance.namespace.is_empty() {
            return Err(ConfigError::ValidationError(
                "instance.namespace cannot be empty".to_string(),
            ));
        }

        if self.timeouts.connect_seconds == 0 || self.timeouts.statement_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts.connect_seconds and timeouts.statement_seconds must be > 0".to_string(),
            ));
        }

        if self.timeouts.artifact_grace_seconds >= self.timeouts.cleanup_seconds {
            return Err(ConfigError::ValidationError(
                "timeouts.artifact_grace_seconds must be < timeouts.cleanup_seconds".to_string(),
            ));
        }

        if self.credentials.password_length < MIN_PASSWORD_LENGTH {
            return Err(ConfigError::ValidationError(format!(
                "credentials.password_length must be >= {MIN_PASSWORD_LENGTH}"
            )));
        }

        if self.teardown.backoff_limit < 0 || self.teardown.ttl_seconds_after_finished < 0 {
            return Err(ConfigError::ValidationError(
                "teardown.backoff_limit and teardown.ttl_seconds_after_finished must be >= 0"
                    .to_string(),
            ));
        }

        let mount_path = &self.teardown.script_mount_path;
        if !mount_path.starts_with('/') || mount_path.trim_end_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "teardown.script_mount_path must be an absolute path below /".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be one of: {}",
                valid_formats.join(", ")
            )));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error reading configuration file
    #[error("Failed to read config file {path:?}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("Failed to parse TOML in {path:?}: {source}")]
    TomlError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
