//! Subscriber installation for the console binaries.
//!
//! # Design
//! - `RUST_LOG` wins over the configured level when set.
//! - Output goes to stderr so command output on stdout stays machine-readable.
//! - The first installed service name is remembered for later log fields.

use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{Result, TelemetryError};

/// Level used when neither `RUST_LOG` nor `CATALOG_LOG_LEVEL` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Level override variable.
pub const ENV_LOG_LEVEL: &str = "CATALOG_LOG_LEVEL";
/// Format override variable (`json`, `pretty`, `compact`).
pub const ENV_LOG_FORMAT: &str = "CATALOG_LOG_FORMAT";

static SERVICE: OnceCell<String> = OnceCell::new();

/// Output layout of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Multi-line, human-oriented.
    Pretty,
    /// Single-line, human-oriented.
    Compact,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            _ => Err(TelemetryError::UnknownFormat {
                value: value.to_string(),
            }),
        }
    }
}

/// Logging settings for one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Name reported in the startup line.
    pub service: String,
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output layout.
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Defaults for `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::infer(),
        }
    }

    /// Defaults for `service`, overridden by `CATALOG_LOG_LEVEL` and `CATALOG_LOG_FORMAT`.
    ///
    /// # Errors
    /// Returns [`TelemetryError::UnknownFormat`] for an unrecognised format.
    pub fn from_env(service: impl Into<String>) -> Result<Self> {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    /// Same as [`LoggingConfig::from_env`] with an injectable lookup.
    ///
    /// # Errors
    /// Returns [`TelemetryError::UnknownFormat`] for an unrecognised format.
    pub fn from_lookup<F>(service: impl Into<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new(service);
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty()) {
            config.level = level.trim().to_string();
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT).filter(|value| !value.trim().is_empty()) {
            config.format = format.parse()?;
        }
        Ok(config)
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let builder = fmt::fmt()
        .with_env_filter(env_filter(&config.level))
        .with_target(false)
        .with_writer(std::io::stderr);
    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    }
    .map_err(|source| TelemetryError::SubscriberInstall { source })?;

    let service = SERVICE.get_or_init(|| config.service.clone());
    info!(service = %service, format = ?config.format, "logging initialised");
    Ok(())
}

/// Service name recorded by the first successful [`init_logging`] call.
#[must_use]
pub fn service_name() -> Option<&'static str> {
    SERVICE.get().map(String::as_str)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
