//! Logging configuration and initialization.
//!
//! Supports JSON and pretty-printed formats, written to stderr or a file.

use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logging (default for production).
    #[default]
    Json,
    /// Human-readable pretty printing (for development).
    Pretty,
}

impl LogFormat {
    /// Parse a format name; anything other than `pretty` selects JSON.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("pretty") {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Filter directive (e.g. "info", "flextape=debug").
    pub level: String,
    /// Log file path. Logs go to stderr when unset.
    pub output_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
            output_path: None,
        }
    }
}

impl LogConfig {
    /// Read `FLEXTAPE_LOG`, `FLEXTAPE_LOG_FORMAT` and `FLEXTAPE_LOG_FILE`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            format: std::env::var("FLEXTAPE_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.format),
            level: std::env::var("FLEXTAPE_LOG").unwrap_or(defaults.level),
            output_path: std::env::var_os("FLEXTAPE_LOG_FILE").map(PathBuf::from),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
    #[error("Failed to open log file: {0}")]
    FileOpen(String),
    #[error("Subscriber already initialized")]
    AlreadyInitialized,
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| LogError::InvalidFilter(e.to_string()))?;
    let registry = tracing_subscriber::registry().with(filter);

    match (config.format, &config.output_path) {
        (LogFormat::Json, Some(path)) => {
            let file = std::fs::File::create(path)
                .map_err(|e| LogError::FileOpen(e.to_string()))?;
            registry
                .with(fmt::layer().json().with_writer(std::sync::Mutex::new(file)))
                .try_init()
        }
        (LogFormat::Pretty, Some(path)) => {
            let file = std::fs::File::create(path)
                .map_err(|e| LogError::FileOpen(e.to_string()))?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(std::sync::Mutex::new(file)))
                .try_init()
        }
        (LogFormat::Json, None) => registry.with(fmt::layer().json()).try_init(),
        (LogFormat::Pretty, None) => registry.with(fmt::layer().pretty()).try_init(),
    }
    .map_err(|_| LogError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parse_defaults_to_json() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = LogConfig {
            level: "flextape=[".to_string(),
            ..Default::default()
        };
        assert!(matches!(init_logging(&config), Err(LogError::InvalidFilter(_))));
    }
}
