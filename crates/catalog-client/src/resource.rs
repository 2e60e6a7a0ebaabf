//! Generic CRUD resource bound to a base path.
//!
//! # Design
//! - A [`ResourceCodec`] carries the per-resource mappers; the HTTP plumbing is shared.
//! - Responses are decoded at the boundary into typed records or a decode error.
//! - Extra endpoints are described by [`CustomOperation`] values and resolved by
//!   one interpreter instead of ad-hoc methods.

use std::fmt;
use std::sync::Arc;

use catalog_core::entity::Entity;
use catalog_core::form::FormValues;
use catalog_core::query::bracket_pairs;
use catalog_core::report::{ReportFile, ReportRequest, report_filename};
use catalog_core::{CoreError, CoreResult, ListQuery, PaginationMeta};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::http::HttpClient;

/// Endpoint that renders spreadsheet reports.
pub const REPORT_PATH: &str = "/customReport";

/// Per-resource mappers between wire JSON and typed records/forms.
pub trait ResourceCodec: Send + Sync + 'static {
    /// Record held in the entity store.
    type Record: Entity;
    /// Form payload edited by the CRUD manager.
    type Form: FormValues;

    /// Decode one record from its wire form.
    ///
    /// # Errors
    /// Returns a decode error when required fields are missing or malformed.
    fn decode_record(&self, value: Value) -> CoreResult<Self::Record>;

    /// Wire payload for a create.
    fn encode_create(&self, form: &Self::Form) -> Value;

    /// Wire payload for an update; `existing` is the record being edited, when known.
    fn encode_update(&self, form: &Self::Form, existing: Option<&Self::Record>) -> Value;

    /// Relations the server should embed in the save response.
    fn include(&self, _form: &Self::Form) -> Option<String> {
        None
    }

    /// Post-process a decoded list page.
    fn map_list(&self, page: ListPage<Self::Record>) -> ListPage<Self::Record> {
        page
    }
}

/// Decoded list response.
#[derive(Clone, Debug, PartialEq)]
pub struct ListPage<T> {
    /// Records on this page.
    pub data: Vec<T>,
    /// Pagination metadata, when the server sent any.
    pub meta: Option<PaginationMeta>,
    /// Metadata object exactly as received.
    pub raw_meta: Option<Value>,
}

impl<T> ListPage<T> {
    /// Page without metadata.
    #[must_use]
    pub const fn bare(data: Vec<T>) -> Self {
        Self {
            data,
            meta: None,
            raw_meta: None,
        }
    }
}

/// HTTP verb of a [`CustomOperation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    /// GET; a body object is sent as query parameters.
    Get,
    /// POST with a JSON body.
    Post,
    /// PUT with a JSON body.
    Put,
    /// PATCH with a JSON body.
    Patch,
    /// DELETE; a body object is sent as query parameters.
    Delete,
}

impl OperationKind {
    fn method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    const fn sends_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

/// Resource-relative endpoint beyond the standard CRUD set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomOperation {
    /// HTTP verb.
    pub kind: OperationKind,
    /// Path relative to the resource base (`"{id}/duplicate"`, `"bulk"`).
    pub path: String,
}

impl CustomOperation {
    /// Operation `kind` at `path`.
    #[must_use]
    pub fn new(kind: OperationKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// CRUD endpoints for one resource.
pub struct ResourceApi<C: ResourceCodec> {
    http: HttpClient,
    base_path: String,
    codec: Arc<C>,
}

impl<C: ResourceCodec> Clone for ResourceApi<C> {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            base_path: self.base_path.clone(),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<C: ResourceCodec> fmt::Debug for ResourceApi<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceApi")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl<C: ResourceCodec> ResourceApi<C> {
    /// Resource at `base_path` (`"/category"`).
    #[must_use]
    pub fn new(http: HttpClient, base_path: impl Into<String>, codec: C) -> Self {
        let base_path = base_path.into();
        let base_path = format!("/{}", base_path.trim_matches('/'));
        Self {
            http,
            base_path,
            codec: Arc::new(codec),
        }
    }

    /// Base path requests are issued under.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// HTTP client requests go through.
    #[must_use]
    pub const fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Codec used for decoding and encoding.
    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// GET the base path with bracket-encoded query params.
    ///
    /// # Errors
    /// Returns an error when the request fails or the envelope cannot be decoded.
    pub async fn list(&self, query: &ListQuery) -> ClientResult<ListPage<C::Record>> {
        let payload = self
            .http
            .send_json(Method::GET, &self.base_path, &query.to_query_pairs(), None)
            .await?;
        self.decode_page(payload)
    }

    /// POST `{base}/search` with the query as a JSON body.
    ///
    /// # Errors
    /// Returns an error when the request fails or the envelope cannot be decoded.
    pub async fn search(&self, query: &ListQuery) -> ClientResult<ListPage<C::Record>> {
        let path = self.member_path("search");
        let payload = self
            .http
            .send_json(Method::POST, &path, &[], Some(&query.to_body()))
            .await?;
        self.decode_page(payload)
    }

    /// GET one record.
    ///
    /// # Errors
    /// Returns an error when the request fails or the record cannot be decoded.
    pub async fn fetch_one(&self, id: &str) -> ClientResult<C::Record> {
        let payload = self
            .http
            .send_json(Method::GET, &self.member_path(id), &[], None)
            .await?;
        self.decode_record(payload)
    }

    /// POST a new record; `with` is attached as `_with`.
    ///
    /// # Errors
    /// Returns an error when the request fails or the record cannot be decoded.
    pub async fn create(&self, form: &C::Form, with: &[String]) -> ClientResult<C::Record> {
        let body = attach_with(self.codec.encode_create(form), with);
        let query = include_pairs(self.codec.include(form));
        let payload = self
            .http
            .send_json(Method::POST, &self.base_path, &query, Some(&body))
            .await?;
        self.decode_record(payload)
    }

    /// PUT an existing record.
    ///
    /// # Errors
    /// Returns an error when the request fails or the record cannot be decoded.
    pub async fn update(
        &self,
        id: &str,
        form: &C::Form,
        existing: Option<&C::Record>,
        with: &[String],
    ) -> ClientResult<C::Record> {
        let body = attach_with(self.codec.encode_update(form, existing), with);
        let query = include_pairs(self.codec.include(form));
        let payload = self
            .http
            .send_json(Method::PUT, &self.member_path(id), &query, Some(&body))
            .await?;
        self.decode_record(payload)
    }

    /// DELETE a record and return its id.
    ///
    /// # Errors
    /// Returns an error when the request fails.
    pub async fn remove(&self, id: &str) -> ClientResult<String> {
        self.http
            .send_json(Method::DELETE, &self.member_path(id), &[], None)
            .await?;
        Ok(id.to_string())
    }

    /// Undo a soft delete via `PUT {base}/{id}/restore`.
    ///
    /// # Errors
    /// Returns an error when the request fails or the record cannot be decoded.
    pub async fn restore(&self, id: &str) -> ClientResult<C::Record> {
        let path = self.member_path(&format!("{id}/restore"));
        let payload = self.http.send_json(Method::PUT, &path, &[], None).await?;
        self.decode_record(payload)
    }

    /// Render a spreadsheet report.
    ///
    /// # Errors
    /// Returns an error when the request fails.
    pub async fn report(&self, request: &ReportRequest) -> ClientResult<ReportFile> {
        let body = serde_json::to_value(request)
            .map_err(|source| ClientError::from(CoreError::Serialize { source }))?;
        let response = self
            .http
            .send_binary(Method::POST, REPORT_PATH, Some(&body))
            .await?;
        let filename = report_filename(
            request.title.as_deref(),
            response.content_disposition.as_deref(),
        );
        debug!(filename = %filename, bytes = response.bytes.len(), "report downloaded");
        Ok(ReportFile {
            filename,
            content_type: response.content_type,
            bytes: response.bytes,
        })
    }

    /// Invoke a custom operation under the resource base.
    ///
    /// # Errors
    /// Returns an error when the request fails.
    pub async fn call(&self, operation: &CustomOperation, body: Option<Value>) -> ClientResult<Value> {
        let path = self.member_path(&operation.path);
        if operation.kind.sends_body() {
            return self
                .http
                .send_json(operation.kind.method(), &path, &[], body.as_ref())
                .await;
        }
        let query = body.as_ref().map(bracket_pairs).unwrap_or_default();
        self.http
            .send_json(operation.kind.method(), &path, &query, None)
            .await
    }

    fn member_path(&self, suffix: &str) -> String {
        let suffix = suffix.trim_matches('/');
        if suffix.is_empty() {
            self.base_path.clone()
        } else {
            format!("{}/{suffix}", self.base_path)
        }
    }

    fn decode_record(&self, payload: Value) -> ClientResult<C::Record> {
        let record = match payload {
            Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        Ok(self.codec.decode_record(record)?)
    }

    fn decode_page(&self, payload: Value) -> ClientResult<ListPage<C::Record>> {
        let (rows, raw_meta) = split_envelope(payload)?;
        let meta = raw_meta
            .clone()
            .map(serde_json::from_value::<PaginationMeta>)
            .transpose()
            .map_err(|err| CoreError::decode("pagination meta", err.to_string()))?;
        let data = rows
            .into_iter()
            .map(|row| self.codec.decode_record(row))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(self.codec.map_list(ListPage {
            data,
            meta,
            raw_meta,
        }))
    }
}

/// Split `{data, meta}`, a paginator object, or a bare array into rows and metadata.
fn split_envelope(payload: Value) -> CoreResult<(Vec<Value>, Option<Value>)> {
    match payload {
        Value::Array(rows) => Ok((rows, None)),
        Value::Object(mut map) => {
            let rows = match map.remove("data") {
                Some(Value::Array(rows)) => rows,
                _ => return Err(CoreError::decode("list response", "missing `data` array")),
            };
            let meta = match map.remove("meta") {
                Some(meta @ Value::Object(_)) => Some(meta),
                _ if map.contains_key("current_page") => Some(Value::Object(map)),
                _ => None,
            };
            Ok((rows, meta))
        }
        _ => Err(CoreError::decode("list response", "expected an object or array")),
    }
}

fn attach_with(body: Value, with: &[String]) -> Value {
    match body {
        Value::Object(mut map) if !with.is_empty() => {
            map.insert(
                "_with".to_string(),
                Value::Array(with.iter().cloned().map(Value::String).collect()),
            );
            Value::Object(map)
        }
        other => other,
    }
}

fn include_pairs(include: Option<String>) -> Vec<(String, String)> {
    include
        .filter(|value| !value.trim().is_empty())
        .map(|value| vec![("include".to_string(), value)])
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use catalog_core::categories::{CategoryFormValues, CategoryStatus};
    use catalog_core::{MemoryLocation, MemorySessionStorage, QueryFilter, SearchParams, SessionStore};
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::categories::CategoryCodec;

    fn api(server: &MockServer) -> ResourceApi<CategoryCodec> {
        let session = SessionStore::new(
            Arc::new(MemorySessionStorage::default()),
            Arc::new(MemoryLocation::new("/categories")),
            "/login",
        );
        let http = HttpClient::new(
            server.base_url().parse().expect("valid URL"),
            Duration::from_secs(5),
            session,
        )
        .expect("client");
        ResourceApi::new(http, "category", CategoryCodec)
    }

    fn form(name: &str) -> CategoryFormValues {
        CategoryFormValues {
            id: None,
            name: name.to_string(),
            description: String::new(),
            status: CategoryStatus::Active,
            color: String::new(),
            display_order: "2".to_string(),
        }
    }

    #[tokio::test]
    async fn list_sends_bracket_params_and_decodes_meta() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/category")
                .query_param("page", "2")
                .query_param("limit", "20")
                .query_param("filters[0][field]", "is_active")
                .query_param("filters[0][operator]", "=");
            then.status(200).json_body(json!({
                "data": [{"id": 21, "name": "Books", "is_active": true}],
                "meta": {"current_page": 2, "per_page": 20, "total": 57, "last_page": 3}
            }));
        });

        let mut params = SearchParams::default();
        params.upsert_filter(QueryFilter::eq("is_active", true));
        let query = ListQuery::new(2, 20).with_params(&params);
        let page = api(&server).list(&query).await.expect("list");

        mock.assert();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, "21");
        assert_eq!(page.meta.map(|meta| meta.total), Some(57));
    }

    #[tokio::test]
    async fn search_posts_json_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/category/search")
                .json_body(json!({
                    "page": 1,
                    "limit": 10,
                    "search": {"value": "boo", "case_sensitive": false}
                }));
            then.status(200).json_body(json!([{"id": "1", "name": "Books"}]));
        });

        let params = SearchParams {
            search: Some(catalog_core::Search::new("boo")),
            ..SearchParams::default()
        };
        let page = api(&server)
            .search(&ListQuery::new(1, 10).with_params(&params))
            .await
            .expect("search");

        mock.assert();
        assert_eq!(page.data[0].name, "Books");
        assert!(page.meta.is_none());
    }

    #[tokio::test]
    async fn create_attaches_with_and_unwraps_record() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/category")
                .json_body(json!({
                    "name": "Games",
                    "description": "",
                    "is_active": true,
                    "color": null,
                    "position": 2,
                    "_with": ["parent"]
                }));
            then.status(201)
                .json_body(json!({"data": {"id": 9, "name": "Games", "position": 2}}));
        });

        let created = api(&server)
            .create(&form("Games"), &["parent".to_string()])
            .await
            .expect("create");

        mock.assert();
        assert_eq!(created.id, "9");
        assert_eq!(created.display_order, 2);
    }

    #[tokio::test]
    async fn remove_returns_id_and_restore_uses_member_path() {
        let server = MockServer::start_async().await;
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/category/4");
            then.status(200).json_body(json!({"message": "ok"}));
        });
        let restore = server.mock(|when, then| {
            when.method(PUT).path("/category/4/restore");
            then.status(200).json_body(json!({"id": 4, "name": "Toys"}));
        });

        let api = api(&server);
        assert_eq!(api.remove("4").await.expect("remove"), "4");
        assert_eq!(api.restore("4").await.expect("restore").name, "Toys");
        delete.assert();
        restore.assert();
    }

    #[tokio::test]
    async fn malformed_list_is_a_decode_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/category");
            then.status(200).json_body(json!({"rows": []}));
        });

        let err = api(&server)
            .list(&ListQuery::new(1, 10))
            .await
            .expect_err("bad envelope");
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn custom_get_sends_body_as_query() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/category/tree")
                .query_param("depth", "2");
            then.status(200).json_body(json!({"data": []}));
        });

        let value = api(&server)
            .call(
                &CustomOperation::new(OperationKind::Get, "/tree/"),
                Some(json!({"depth": 2})),
            )
            .await
            .expect("custom call");
        mock.assert();
        assert_eq!(value, json!({"data": []}));
    }

    #[tokio::test]
    async fn report_uses_title_for_filename() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/customReport")
                .json_body(json!({"_title": "Categories"}));
            then.status(200)
                .header("content-type", "application/vnd.ms-excel")
                .header("content-disposition", "attachment; filename=\"server.xlsx\"")
                .body("xlsx-bytes");
        });

        let file = api(&server)
            .report(&ReportRequest::titled("Categories"))
            .await
            .expect("report");
        assert_eq!(file.filename, "Categories.xlsx");
        assert_eq!(file.bytes, b"xlsx-bytes".to_vec());
        assert_eq!(file.content_type.as_deref(), Some("application/vnd.ms-excel"));
    }

    #[test]
    fn paginator_object_is_accepted_as_meta() -> CoreResult<()> {
        let (rows, meta) = split_envelope(json!({
            "data": [{"id": 1}],
            "current_page": 1,
            "total": 1
        }))?;
        assert_eq!(rows.len(), 1);
        assert_eq!(meta.map(|meta| meta["total"].clone()), Some(json!(1)));
        Ok(())
    }
}
