//! Application configuration and its environment loader.
//!
//! # Design
//! - Read once at startup; the loader takes a lookup function so tests never touch
//!   the process environment.
//! - A bad page size falls back to the default; a bad URL or timeout is an error.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_LOGIN_PATH, DEFAULT_PAGE_SIZE,
    ENV_API_BASE_URL, ENV_HTTP_TIMEOUT_SECS, ENV_LOGIN_PATH, ENV_PAGE_SIZE, ENV_SESSION_FILE,
    SESSION_FILE_NAME,
};
use crate::error::{ConfigError, ConfigResult};

/// Runtime configuration for the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Backend base URL.
    pub api_base_url: Url,
    /// Default rows per page.
    pub page_size: u32,
    /// Fixed request timeout.
    pub http_timeout: Duration,
    /// File holding the persisted session.
    pub session_file: PathBuf,
    /// Route the session redirects to on logout.
    pub login_path: String,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error when the base URL, timeout, or login path is invalid.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// # Errors
    /// Returns an error when the base URL, timeout, or login path is invalid.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let raw_url = read(ENV_API_BASE_URL).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = parse_base_url(&raw_url)?;

        let page_size = read(ENV_PAGE_SIZE).map_or(DEFAULT_PAGE_SIZE, |raw| {
            parse_page_size(&raw).unwrap_or_else(|| {
                warn!(value = %raw, fallback = DEFAULT_PAGE_SIZE, "invalid page size; using default");
                DEFAULT_PAGE_SIZE
            })
        });

        let http_timeout = match read(ENV_HTTP_TIMEOUT_SECS) {
            Some(raw) => parse_timeout(&raw)?,
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let session_file = read(ENV_SESSION_FILE).map_or_else(
            || {
                read("HOME").map_or_else(
                    || PathBuf::from(SESSION_FILE_NAME),
                    |home| PathBuf::from(home).join(SESSION_FILE_NAME),
                )
            },
            PathBuf::from,
        );

        let login_path = read(ENV_LOGIN_PATH).unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());
        if !login_path.starts_with('/') {
            return Err(ConfigError::InvalidField {
                variable: ENV_LOGIN_PATH,
                value: login_path,
                reason: "must start with '/'",
            });
        }

        Ok(Self {
            api_base_url,
            page_size,
            http_timeout,
            session_file,
            login_path,
        })
    }
}

fn parse_base_url(raw: &str) -> ConfigResult<Url> {
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        source,
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidField {
            variable: ENV_API_BASE_URL,
            value: raw.to_string(),
            reason: "scheme must be http or https",
        });
    }
    Ok(url)
}

fn parse_page_size(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|size| *size > 0)
}

fn parse_timeout(raw: &str) -> ConfigResult<Duration> {
    raw.parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidField {
            variable: ENV_HTTP_TIMEOUT_SECS,
            value: raw.to_string(),
            reason: "must be a positive number of seconds",
        })
}
