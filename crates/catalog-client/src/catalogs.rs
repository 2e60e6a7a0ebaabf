//! Lookup-list service (`POST /selects`).

use catalog_core::CoreError;
use catalog_core::catalog::{CatalogRequest, CatalogResponse, decode_catalogs};
use reqwest::Method;
use tracing::debug;

use crate::error::ClientResult;
use crate::http::HttpClient;

const SELECTS_PATH: &str = "/selects";

/// Fetches several lookup lists in one round trip.
#[derive(Clone, Debug)]
pub struct CatalogService {
    http: HttpClient,
}

impl CatalogService {
    /// Service using `http`.
    #[must_use]
    pub const fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Fetch the requested lookup lists.
    ///
    /// An empty request returns an empty map without calling the server.
    ///
    /// # Errors
    /// Returns an error when the request fails or the payload is not an object.
    pub async fn fetch(&self, request: &CatalogRequest) -> ClientResult<CatalogResponse> {
        if request.is_empty() {
            return Ok(CatalogResponse::new());
        }
        let body = serde_json::to_value(request).map_err(|source| CoreError::Serialize { source })?;
        let payload = self
            .http
            .send_json(Method::POST, SELECTS_PATH, &[], Some(&body))
            .await?;
        let catalogs = decode_catalogs(request, payload)?;
        debug!(catalogs = catalogs.len(), "lookup lists loaded");
        Ok(catalogs)
    }
}
