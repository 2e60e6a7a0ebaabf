//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable contained an invalid value.
    #[error("invalid configuration value for {variable}: {reason}")]
    InvalidField {
        /// Environment variable that failed validation.
        variable: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The API base URL could not be parsed.
    #[error("invalid API base URL")]
    InvalidBaseUrl {
        /// Offending value.
        value: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
