//! Typed configuration
//!
//! Strongly-typed configuration with defaults, JSON5 file loading, and
//! validation. The file location is `$POLLROOM_CONFIG` when set, otherwise
//! `<config dir>/pollroom/config.json5`. A missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] json5::Error),
}

/// A single validation finding, addressed by dot-notation path.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Gateway server configuration
    pub gateway: GatewayConfig,
    /// Room engine configuration
    pub room: RoomConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Gateway server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 7270;

/// Room engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomConfig {
    /// Countdown broadcast interval in milliseconds
    pub tick_interval_ms: u64,
    /// Outbound message queue size per connection
    pub queue_size: usize,
    /// Number of completed polls retained in history
    pub history_limit: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            queue_size: 100,
            history_limit: 50,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "pollroom=debug")
    pub level: String,
    /// Emit JSON log lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Resolve the configuration file path.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var("POLLROOM_CONFIG") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pollroom")
        .join("config.json5")
}

/// Load configuration from the resolved path; defaults when the file is
/// absent.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load configuration from an explicit path; defaults when the file is
/// absent.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = json5::from_str(&raw)?;
    Ok(config)
}

/// Validate a configuration, returning every issue found.
pub fn validate_config(config: &Config) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if config.gateway.host.trim().is_empty() {
        issues.push(ValidationIssue {
            path: "gateway.host".to_string(),
            message: "bind host must not be empty".to_string(),
        });
    }
    if config.gateway.port == 0 {
        issues.push(ValidationIssue {
            path: "gateway.port".to_string(),
            message: "bind port must be non-zero".to_string(),
        });
    }
    if config.room.tick_interval_ms == 0 {
        issues.push(ValidationIssue {
            path: "room.tickIntervalMs".to_string(),
            message: "tick interval must be positive".to_string(),
        });
    }
    if config.room.queue_size == 0 {
        issues.push(ValidationIssue {
            path: "room.queueSize".to_string(),
            message: "queue size must be positive".to_string(),
        });
    }
    if config.room.history_limit == 0 {
        issues.push(ValidationIssue {
            path: "room.historyLimit".to_string(),
            message: "history limit must be positive".to_string(),
        });
    }

    issues
}
