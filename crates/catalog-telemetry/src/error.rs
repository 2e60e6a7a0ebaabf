//! Logging bootstrap errors.

use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while installing the log subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber is already installed, or installation failed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Error reported by `tracing-subscriber`.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// `CATALOG_LOG_FORMAT` named an unknown format.
    #[error("unknown log format '{value}'")]
    UnknownFormat {
        /// Offending value.
        value: String,
    },
}
