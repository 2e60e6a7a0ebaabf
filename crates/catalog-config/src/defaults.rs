//! Fallback values and environment variable names.

/// API base URL variable.
pub const ENV_API_BASE_URL: &str = "CATALOG_API_BASE_URL";
/// Default page size variable.
pub const ENV_PAGE_SIZE: &str = "CATALOG_PAGE_SIZE";
/// Request timeout variable, in seconds.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "CATALOG_HTTP_TIMEOUT_SECS";
/// Session file variable.
pub const ENV_SESSION_FILE: &str = "CATALOG_SESSION_FILE";
/// Login route variable.
pub const ENV_LOGIN_PATH: &str = "CATALOG_LOGIN_PATH";

/// Base URL used when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
/// Rows per page when none (or an unusable value) is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Request timeout when none is configured.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
/// Login route when none is configured.
pub const DEFAULT_LOGIN_PATH: &str = "/login";
/// Session file name placed in the home directory.
pub const SESSION_FILE_NAME: &str = ".catalog-console-session.json";
