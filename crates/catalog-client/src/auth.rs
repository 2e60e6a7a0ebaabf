//! Login and profile endpoints.

use catalog_core::{AuthTokens, CoreError, CoreResult, SessionProfile, SessionUser};
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::ClientResult;
use crate::http::HttpClient;

const LOGIN_PATH: &str = "/auth/login";
const PROFILE_PATH: &str = "/auth/me";

/// Credentials posted to the login endpoint.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Decoded login response.
#[derive(Clone, Debug, PartialEq)]
pub struct LoginResponse {
    /// Profile of the signed-in user.
    pub profile: SessionProfile,
    /// Issued tokens.
    pub tokens: AuthTokens,
}

/// Auth endpoints bound to an HTTP client.
#[derive(Clone, Debug)]
pub struct AuthService {
    http: HttpClient,
}

impl AuthService {
    /// Service using `http`.
    #[must_use]
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// POST the credentials and decode the session.
    ///
    /// # Errors
    /// Returns an error when the request fails, the user is missing, or no access token was issued.
    pub async fn login(&self, credentials: &LoginRequest) -> ClientResult<LoginResponse> {
        let body = serde_json::to_value(credentials)
            .map_err(|source| CoreError::Serialize { source })?;
        let payload = self
            .http
            .send_json(Method::POST, LOGIN_PATH, &[], Some(&body))
            .await?;
        let data = envelope_data(payload);
        let profile = decode_profile(&data)?;
        let access_token = data
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                CoreError::decode("login response", "Missing access token in login response")
            })?;
        Ok(LoginResponse {
            profile,
            tokens: AuthTokens::bearer(access_token),
        })
    }

    /// Log in and store the session.
    ///
    /// # Errors
    /// Returns the same errors as [`AuthService::login`]; the session is untouched on failure.
    pub async fn sign_in(&self, credentials: &LoginRequest) -> ClientResult<SessionProfile> {
        let LoginResponse { profile, tokens } = self.login(credentials).await?;
        info!(user = %profile.user.email, "signed in");
        self.http.session().set_session(profile.clone(), tokens);
        Ok(profile)
    }

    /// GET the current user's profile.
    ///
    /// # Errors
    /// Returns an error when the request fails or the user is missing.
    pub async fn fetch_profile(&self) -> ClientResult<SessionProfile> {
        let payload = self
            .http
            .send_json(Method::GET, PROFILE_PATH, &[], None)
            .await?;
        Ok(decode_profile(&envelope_data(payload))?)
    }

    /// Fetch the profile and replace the stored one, keeping tokens.
    ///
    /// # Errors
    /// Returns the same errors as [`AuthService::fetch_profile`].
    pub async fn refresh_profile(&self) -> ClientResult<SessionProfile> {
        let profile = self.fetch_profile().await?;
        self.http.session().set_profile(profile.clone());
        Ok(profile)
    }
}

fn envelope_data(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Build a profile from `{user, abilities?, roles?, company?, country?}`.
///
/// A non-blank `full_name` replaces `name`.
fn decode_profile(data: &Value) -> CoreResult<SessionProfile> {
    let Some(Value::Object(raw_user)) = data.get("user") else {
        return Err(CoreError::decode(
            "session response",
            "Missing user data in session response",
        ));
    };
    let mut extra: Map<String, Value> = raw_user.clone();
    let id = match extra.remove("id") {
        Some(Value::String(id)) => id,
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(CoreError::MissingField {
                subject: "session user",
                field: "id",
            });
        }
    };
    let email = match extra.remove("email") {
        Some(Value::String(email)) => email,
        _ => String::new(),
    };
    let name = extra.remove("name").and_then(|name| name.as_str().map(str::to_string));
    let full_name = extra
        .get("full_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|full| !full.is_empty())
        .map(str::to_string);

    Ok(SessionProfile {
        user: SessionUser {
            id,
            email,
            name: full_name.or(name),
            extra,
        },
        abilities: string_list(data.get("abilities")),
        roles: string_list(data.get("roles")),
        company: data.get("company").filter(|value| !value.is_null()).cloned(),
        country: data.get("country").filter(|value| !value.is_null()).cloned(),
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
