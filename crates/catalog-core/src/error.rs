//! Error types shared by the DOM-free primitives.

use std::io;

use thiserror::Error;

/// Primary error type for decoding and persistence failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A payload did not have the expected shape.
    #[error("invalid payload: {reason}")]
    Decode {
        /// Payload being decoded (for example `session profile`).
        subject: &'static str,
        /// Human-readable reason for the failure.
        reason: String,
    },
    /// A required field was absent from a payload.
    #[error("missing field `{field}` in {subject}")]
    MissingField {
        /// Payload being decoded.
        subject: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },
    /// Persisted state could not be read or written.
    #[error("storage operation failed")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Source IO error.
        source: io::Error,
    },
    /// A validation pattern failed to compile.
    #[error("invalid validation pattern")]
    Pattern {
        /// Source regex error.
        source: regex::Error,
    },
    /// Persisted state could not be serialized.
    #[error("failed to serialize persisted state")]
    Serialize {
        /// Source serialization error.
        source: serde_json::Error,
    },
}

impl CoreError {
    /// Convenience constructor for decode failures.
    #[must_use]
    pub fn decode(subject: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            subject,
            reason: reason.into(),
        }
    }
}

/// Convenience alias for core results.
pub type CoreResult<T> = Result<T, CoreError>;
