//! Error types for client operations.

use std::fmt;
use std::io;

use catalog_core::CoreError;
use catalog_core::form::FieldErrors;
use serde_json::Value;
use thiserror::Error;

/// Message used when neither the server nor the transport explains a failure.
pub const FALLBACK_ERROR_MESSAGE: &str = "Unexpected error, please try again";

/// Normalized HTTP failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// Human-readable message (`payload.message`, transport text, or the fallback).
    pub message: String,
    /// HTTP status, absent for transport failures.
    pub status: Option<u16>,
    /// Raw response body, when it was JSON.
    pub payload: Option<Value>,
}

impl ApiError {
    /// Build an error from a response status and optional JSON body.
    #[must_use]
    pub fn from_response(status: u16, payload: Option<Value>) -> Self {
        let message = payload
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map_or_else(
                || format!("Request failed with status code {status}"),
                str::to_string,
            );
        Self {
            message,
            status: Some(status),
            payload,
        }
    }

    /// Build an error for a request that never produced a response.
    #[must_use]
    pub fn transport(detail: &str) -> Self {
        let message = if detail.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            detail.to_string()
        };
        Self {
            message,
            status: None,
            payload: None,
        }
    }

    /// Whether the server rejected the payload with per-field errors.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.status == Some(422)
    }

    /// Per-field errors from a 422 `errors` map.
    ///
    /// Both `{"field": ["msg"]}` and `{"field": "msg"}` shapes are accepted.
    #[must_use]
    pub fn field_errors(&self) -> Option<FieldErrors> {
        if !self.is_validation() {
            return None;
        }
        let errors = self.payload.as_ref()?.get("errors")?.as_object()?;
        let mapped: FieldErrors = errors
            .iter()
            .map(|(field, messages)| {
                let messages = match messages {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                    Value::String(message) => vec![message.clone()],
                    _ => Vec::new(),
                };
                (field.clone(), messages)
            })
            .filter(|(_, messages)| !messages.is_empty())
            .collect();
        (!mapped.is_empty()).then_some(mapped)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Primary error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server or transport reported a failure.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A response did not have the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[source] CoreError),
    /// Local validation rejected the form before any request was sent.
    #[error("validation failed")]
    Validation {
        /// Errors by field.
        errors: FieldErrors,
    },
    /// The manager is read-only.
    #[error("operation not permitted in read-only mode")]
    ReadOnly,
    /// The source does not implement the operation.
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// Operation name.
        operation: &'static str,
    },
    /// A request URL could not be built.
    #[error("invalid request URL for {path}")]
    InvalidUrl {
        /// Path being joined onto the base URL.
        path: String,
        /// Underlying parse error.
        source: url::ParseError,
    },
    /// A local file operation failed.
    #[error("io operation failed")]
    Io {
        /// Underlying IO error.
        source: io::Error,
    },
}

impl From<CoreError> for ClientError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Storage { source, .. } => Self::Io { source },
            other => Self::Decode(other),
        }
    }
}

impl ClientError {
    /// HTTP status, when the failure came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api(error) => error.status,
            _ => None,
        }
    }

    /// Per-field errors from local validation or a 422 response.
    #[must_use]
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::Validation { errors } => Some(errors.clone()),
            Self::Api(error) => error.field_errors(),
            _ => None,
        }
    }

    /// Text suitable for a notification title.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(error) => error.message.clone(),
            other => other.to_string(),
        }
    }
}

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;
