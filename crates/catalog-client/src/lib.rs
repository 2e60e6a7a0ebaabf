#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::redundant_pub_crate)]

//! Async client layer for the catalog console.
//!
//! Layout:
//! - `http.rs`: authenticated HTTP wrapper with error normalization and 401 handling
//! - `resource.rs`: generic CRUD resource bound to a base path
//! - `auth.rs` / `catalogs.rs`: login/profile and lookup-list services
//! - `schedule.rs`: debounce slots backing deferred list fetches
//! - `list.rs`: list manager (query, pagination, search, URL sync)
//! - `crud.rs`: CRUD manager (form lifecycle, validation, notifications)
//! - `categories.rs`: category resource binding
//! - `console.rs`: dependency container wiring the pieces together

pub mod auth;
pub mod catalogs;
pub mod categories;
pub mod console;
pub mod crud;
pub mod error;
pub mod http;
pub mod list;
pub mod resource;
mod schedule;

pub use auth::{AuthService, LoginRequest, LoginResponse};
pub use catalogs::CatalogService;
pub use console::Console;
pub use crud::{CrudConfig, CrudHooks, CrudManager, CrudMessages, CrudMode, CrudSource};
pub use error::{ApiError, ClientError, ClientResult};
pub use http::HttpClient;
pub use list::{ListComputed, ListConfig, ListEndpoint, ListHooks, ListManager, ListSource};
pub use resource::{CustomOperation, ListPage, OperationKind, ResourceApi, ResourceCodec};
