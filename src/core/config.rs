//! Configuration parsing and validation.
//!
//! Ledgerkv configuration is loaded from TOML files with CLI overrides.
//! Every section has working defaults so an empty file is a valid
//! configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level ledgerkv configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Transaction log configuration.
    #[serde(default)]
    pub log: LogConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
}

/// Transaction log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log file path. Parent directories are created on open.
    #[serde(default = "default_log_path")]
    pub path: PathBuf,

    /// Capacity of the bounded queue feeding the writer task.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Sync the file to disk after every append.
    #[serde(default)]
    pub fsync: bool,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_path() -> PathBuf {
    PathBuf::from("data/transactions.log")
}

fn default_queue_capacity() -> usize {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            log: LogConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
            queue_capacity: default_queue_capacity(),
            fsync: false,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.server
            .bind
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("invalid server.bind address: {}", self.server.bind))?;

        if self.log.path.as_os_str().is_empty() {
            bail!("log.path must not be empty");
        }
        if self.log.queue_capacity == 0 {
            bail!("log.queue_capacity must be at least 1");
        }
        if !LOG_LEVELS.contains(&self.telemetry.log_level.as_str()) {
            bail!(
                "telemetry.log_level must be one of {:?}, got {:?}",
                LOG_LEVELS,
                self.telemetry.log_level
            );
        }

        Ok(())
    }
}
