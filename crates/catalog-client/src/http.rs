//! Authenticated HTTP wrapper.
//!
//! # Design
//! - The bearer token is read from the session store on every request, never cached.
//! - Every failure becomes an [`ApiError`] with `{message, status, payload}`.
//! - A 401 signs the session out without navigation, then redirects to the login
//!   route only when the location is not already there.
//! - One fixed timeout per request; no retry and no token refresh.

use std::time::Duration;

use catalog_core::{LogoutOptions, SessionStore};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ApiError, ClientError, ClientResult};

/// Raw response body plus the headers the report download needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryResponse {
    /// `Content-Type` header.
    pub content_type: Option<String>,
    /// `Content-Disposition` header.
    pub content_disposition: Option<String>,
    /// Body bytes.
    pub bytes: Vec<u8>,
}

/// HTTP client bound to a base URL and a session store.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    session: SessionStore,
}

impl HttpClient {
    /// Build a client with a fixed request timeout.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration, session: SessionStore) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::transport(&format!("failed to build HTTP client: {err}")))?;
        Ok(Self::with_client(client, base_url, session))
    }

    /// Wrap an existing `reqwest` client.
    #[must_use]
    pub const fn with_client(client: Client, base_url: Url, session: SessionStore) -> Self {
        Self {
            client,
            base_url,
            session,
        }
    }

    /// Session store consulted for tokens and 401 handling.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` under the base URL, keeping any base path prefix.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidUrl`] if the joined URL does not parse.
    pub fn url(&self, path: &str) -> ClientResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = format!("{base}/{}", path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|source| ClientError::InvalidUrl {
            path: path.to_string(),
            source,
        })
    }

    /// Send a request and decode a JSON response. Empty bodies decode as `null`.
    ///
    /// # Errors
    /// Returns [`ClientError::Api`] for transport failures and non-2xx responses.
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> ClientResult<Value> {
        let response = self.send(method, path, query, body).await?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::transport(&err.to_string()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|err| {
            ClientError::Decode(catalog_core::CoreError::decode(
                "response body",
                format!("status {status}: {err}"),
            ))
        })
    }

    /// Send a request and return the raw body with its content headers.
    ///
    /// # Errors
    /// Returns [`ClientError::Api`] for transport failures and non-2xx responses.
    pub async fn send_binary(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ClientResult<BinaryResponse> {
        let response = self.send(method, path, &[], body).await?;
        let content_type = header_text(response.headers(), CONTENT_TYPE.as_str());
        let content_disposition = header_text(response.headers(), CONTENT_DISPOSITION.as_str());
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::transport(&err.to_string()))?;
        Ok(BinaryResponse {
            content_type,
            content_disposition,
            bytes: bytes.to_vec(),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> ClientResult<Response> {
        let url = self.url(path)?;
        debug!(method = %method, path, "sending request");
        let mut request = self.authorize(self.client.request(method, url));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| ApiError::transport(&err.to_string()))?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(self.normalize_failure(response).await.into())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn normalize_failure(&self, response: Response) -> ApiError {
        let status = response.status();
        let bytes = response.bytes().await.unwrap_or_default();
        let payload = serde_json::from_slice::<Value>(&bytes).ok();
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
        }
        ApiError::from_response(status.as_u16(), payload)
    }

    fn handle_unauthorized(&self) {
        let was_authenticated = self.session.logout(LogoutOptions { propagate: false });
        if was_authenticated {
            warn!("session rejected by server; signed out");
        }
        if self.session.redirect_to_login() {
            debug!(path = self.session.login_path(), "redirected to login");
        }
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use catalog_core::{
        AuthTokens, CoreResult, Location, MemoryLocation, MemorySessionStorage, SessionProfile,
        SessionStorage, SessionUser,
    };
    use httpmock::prelude::*;
    use reqwest::Method;
    use serde_json::{Map, json};

    fn profile() -> SessionProfile {
        SessionProfile {
            user: SessionUser {
                id: "u-1".to_string(),
                email: "ops@example.com".to_string(),
                name: None,
                extra: Map::new(),
            },
            abilities: Vec::new(),
            roles: Vec::new(),
            company: None,
            country: None,
        }
    }

    fn client(server: &MockServer, location: Arc<MemoryLocation>) -> HttpClient {
        let session = SessionStore::new(
            Arc::new(MemorySessionStorage::default()),
            location,
            "/login",
        );
        session.set_session(profile(), AuthTokens::bearer("tok-1"));
        HttpClient::new(
            server.base_url().parse().expect("valid URL"),
            Duration::from_secs(5),
            session,
        )
        .expect("client")
    }

    #[tokio::test]
    async fn bearer_token_is_read_per_request() {
        let server = MockServer::start_async().await;
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/category")
                .header("authorization", "Bearer tok-1");
            then.status(200).json_body(json!({"data": []}));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/category")
                .header("authorization", "Bearer tok-2");
            then.status(200).json_body(json!({"data": []}));
        });

        let http = client(&server, Arc::new(MemoryLocation::new("/categories")));
        http.send_json(Method::GET, "/category", &[], None)
            .await
            .expect("first request");
        http.session()
            .set_session(profile(), AuthTokens::bearer("tok-2"));
        http.send_json(Method::GET, "/category", &[], None)
            .await
            .expect("second request");

        first.assert();
        second.assert();
    }

    #[tokio::test]
    async fn failures_are_normalized() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/category");
            then.status(409).json_body(json!({"message": "Duplicate name"}));
        });

        let http = client(&server, Arc::new(MemoryLocation::new("/categories")));
        let err = http
            .send_json(Method::POST, "/category", &[], Some(&json!({"name": "x"})))
            .await
            .expect_err("conflict");
        match err {
            ClientError::Api(api) => {
                assert_eq!(api.status, Some(409));
                assert_eq!(api.message, "Duplicate name");
                assert_eq!(api.payload, Some(json!({"message": "Duplicate name"})));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_signs_out_once_and_redirects() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/category");
            then.status(401).json_body(json!({"message": "Unauthenticated."}));
        });

        let location = Arc::new(MemoryLocation::new("/categories"));
        let http = client(&server, Arc::clone(&location));
        for _ in 0..2 {
            let err = http
                .send_json(Method::GET, "/category", &[], None)
                .await
                .expect_err("unauthorized");
            assert_eq!(err.status(), Some(401));
        }

        assert!(!http.session().is_authenticated());
        assert_eq!(location.navigations(), vec!["/login".to_string()]);
        assert_eq!(location.path(), "/login");
    }

    /// Storage that counts clears which actually dropped a stored session.
    #[derive(Default)]
    struct CountingStorage {
        raw: Mutex<Option<String>>,
        cleared: AtomicUsize,
    }

    impl SessionStorage for CountingStorage {
        fn load(&self) -> CoreResult<Option<String>> {
            Ok(self.raw.lock().expect("lock").clone())
        }

        fn save(&self, raw: &str) -> CoreResult<()> {
            *self.raw.lock().expect("lock") = Some(raw.to_string());
            Ok(())
        }

        fn clear(&self) -> CoreResult<()> {
            if self.raw.lock().expect("lock").take().is_some() {
                self.cleared.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn concurrent_unauthorized_responses_sign_out_and_redirect_once() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/category");
            then.status(401)
                .delay(Duration::from_millis(50))
                .json_body(json!({"message": "Unauthenticated."}));
        });

        let storage = Arc::new(CountingStorage::default());
        let location = Arc::new(MemoryLocation::new("/categories"));
        let session = SessionStore::new(storage.clone(), location.clone(), "/login");
        session.set_session(profile(), AuthTokens::bearer("tok-1"));
        let http = HttpClient::new(
            server.base_url().parse().expect("valid URL"),
            Duration::from_secs(5),
            session,
        )
        .expect("client");

        let (first, second) = tokio::join!(
            http.send_json(Method::GET, "/category", &[], None),
            http.send_json(Method::GET, "/category", &[], None)
        );
        assert_eq!(first.expect_err("first").status(), Some(401));
        assert_eq!(second.expect_err("second").status(), Some(401));

        mock.assert_calls(2);
        assert!(!http.session().is_authenticated());
        assert_eq!(storage.cleared.load(Ordering::SeqCst), 1);
        assert_eq!(location.navigations(), vec!["/login".to_string()]);
    }

    #[tokio::test]
    async fn unauthorized_on_login_page_does_not_redirect() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/auth/login");
            then.status(401);
        });

        let location = Arc::new(MemoryLocation::new("/login"));
        let http = client(&server, Arc::clone(&location));
        let err = http
            .send_json(Method::POST, "/auth/login", &[], Some(&json!({})))
            .await
            .expect_err("unauthorized");
        assert_eq!(err.status(), Some(401));
        assert!(location.navigations().is_empty());
    }

    #[tokio::test]
    async fn empty_success_body_is_null() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(DELETE).path("/category/7");
            then.status(204);
        });

        let http = client(&server, Arc::new(MemoryLocation::new("/categories")));
        let value = http
            .send_json(Method::DELETE, "/category/7", &[], None)
            .await
            .expect("delete");
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let session = SessionStore::new(
            Arc::new(MemorySessionStorage::default()),
            Arc::new(MemoryLocation::new("/")),
            "/login",
        );
        let http = HttpClient::with_client(
            Client::new(),
            "https://api.example.com/v1/".parse().expect("valid URL"),
            session,
        );
        assert_eq!(
            http.url("/category/3").expect("url").as_str(),
            "https://api.example.com/v1/category/3"
        );
    }
}
