//! Tracing subscriber bootstrap for the bridge runtime.
//!
//! Hosts call [`init_logging`] once during startup. The default filter keeps
//! bridge crates at the configured level while quieting dependency noise;
//! `RUST_LOG` overrides everything when set.

use crate::error::{Error, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line human-readable output for development.
    Pretty,
    /// Single-line machine-parseable JSON for production log shippers.
    Json,
    /// Single-line human-readable output.
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Pretty
        } else {
            LogFormat::Compact
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base level for bridge crates ("trace", "debug", "info", "warn", "error").
    pub level: String,
    pub format: LogFormat,
    /// Include source file and line number in output.
    pub with_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_location: cfg!(debug_assertions),
        }
    }
}

impl LoggingConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

fn default_filter(level: &str) -> String {
    format!(
        "bridge_traits={level},core_runtime={level},core_credentials={level},\
         core_transfer={level},core_service={level},cos_bridge={level},warn",
        level = level
    )
}

/// Initializes the global tracing subscriber.
///
/// # Errors
///
/// Returns [`Error::Logging`] when the filter directive is malformed or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter(&config.level))
            .map_err(|e| Error::Logging(format!("invalid log filter: {e}")))?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(config.with_location)
                    .with_line_number(config.with_location),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(config.with_location)
                    .with_line_number(config.with_location),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_file(config.with_location)
                    .with_line_number(config.with_location),
            )
            .try_init(),
    };

    result.map_err(|e| Error::Logging(format!("failed to install subscriber: {e}")))
}
