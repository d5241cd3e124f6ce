//! Application configuration loaded from environment variables.

use std::num::ParseIntError;
use std::str::FromStr;

use store::{IsolationLevel, ParseIsolationLevelError};
use thiserror::Error;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::LogFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    Port(#[source] ParseIntError),

    #[error("invalid DATABASE_MAX_CONNECTIONS: {0}")]
    MaxConnections(#[source] ParseIntError),

    #[error("invalid ORDER_ISOLATION_LEVEL: {0}")]
    Isolation(#[from] ParseIsolationLevelError),

    #[error("invalid LOG_FORMAT: {0} (expected text or json)")]
    LogFormat(String),
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `ORDER_ISOLATION_LEVEL`: `read_committed`, `repeatable_read` or
///   `serializable` (default: `read_committed`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub isolation_level: IsolationLevel,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for unset ones. Set but malformed values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .map(|p| p.parse().map_err(ConfigError::Port))
                .transpose()?
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: var("LOG_FORMAT")
                .map(|f| f.parse::<LogFormat>())
                .transpose()?
                .unwrap_or(defaults.log_format),
            database_url: var("DATABASE_URL"),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .map(|n| n.parse().map_err(ConfigError::MaxConnections))
                .transpose()?
                .unwrap_or(defaults.database_max_connections),
            isolation_level: var("ORDER_ISOLATION_LEVEL")
                .map(|level| level.parse::<IsolationLevel>())
                .transpose()?
                .unwrap_or(defaults.isolation_level),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            isolation_level: IsolationLevel::ReadCommitted,
        }
    }
}
