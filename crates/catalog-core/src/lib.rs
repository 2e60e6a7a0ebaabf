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

//! DOM-free primitives for the catalog console.
//!
//! Layout:
//! - `session.rs`: session model, persistence trait, and the session store
//! - `location.rs`: navigation/query-string seam used for redirects and URL sync
//! - `query.rs`: search, filter, and sort params plus query-string encoding
//! - `pagination.rs`: pagination state derived from server meta or estimated
//! - `entity.rs` / `store.rs`: the per-resource entity cache
//! - `form.rs`: form values, field errors, and validators
//! - `notify.rs`: user-facing notifications
//! - `url_sync.rs`: list state mirrored into the query string
//! - `report.rs`: report filename derivation
//! - `catalog.rs`: lookup-list request/response types
//! - `categories.rs`: category schema, validation, and API mapping

pub mod catalog;
pub mod categories;
pub mod entity;
pub mod error;
pub mod form;
pub mod location;
pub mod notify;
pub mod pagination;
pub mod query;
pub mod report;
pub mod session;
pub mod store;
pub mod url_sync;

pub use entity::Entity;
pub use error::{CoreError, CoreResult};
pub use location::{Location, MemoryLocation};
pub use notify::{Notification, NotificationLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use pagination::{Pagination, PaginationMeta, PaginationPatch};
pub use query::{
    FilterOperator, ListQuery, QueryFilter, QuerySort, Search, SearchParams, SortDirection,
};
pub use session::{
    AuthTokens, FileSessionStorage, LogoutOptions, MemorySessionStorage, PersistedSession,
    SessionProfile, SessionSnapshot, SessionStorage, SessionStore, SessionUser,
};
pub use store::{EntityStore, SharedStore};
