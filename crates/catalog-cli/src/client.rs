//! Shared context, error types, and error classification for the CLI.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use catalog_client::{ClientError, Console};
use catalog_core::form::FieldErrors;
use url::Url;

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(error: ClientError) -> Self {
        classify_client_error(error)
    }
}

/// Application context passed to command handlers.
#[derive(Clone, Debug)]
pub(crate) struct AppContext {
    pub(crate) console: Console,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Fail early when no session token is stored.
    pub(crate) fn require_session(&self) -> CliResult<()> {
        if self.console.session().is_authenticated() {
            Ok(())
        } else {
            Err(CliError::validation(
                "not signed in (run `catalog login` first)",
            ))
        }
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Map a client error onto the CLI's exit-code classes.
///
/// Local validation and 400/409/422 responses are validation errors; everything
/// else is an operational failure.
pub(crate) fn classify_client_error(error: ClientError) -> CliError {
    match &error {
        ClientError::Validation { errors } => {
            CliError::validation(describe_field_errors("validation failed", errors))
        }
        ClientError::Api(api) if matches!(api.status, Some(400 | 409 | 422)) => {
            let message = api.field_errors().map_or_else(
                || api.message.clone(),
                |errors| describe_field_errors(&api.message, &errors),
            );
            CliError::validation(message)
        }
        ClientError::Api(api) if api.status == Some(401) => CliError::failure(anyhow!(
            "{} (session cleared; run `catalog login` again)",
            api.message
        )),
        _ => CliError::failure(error),
    }
}

fn describe_field_errors(headline: &str, errors: &FieldErrors) -> String {
    let mut message = headline.to_string();
    for (field, messages) in errors {
        message.push_str(&format!("\n  {field}: {}", messages.join(", ")));
    }
    message
}
