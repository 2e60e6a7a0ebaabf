//! List state mirrored into the location query string.
//!
//! # Design
//! - Only non-default values are written (`page` > 1, non-default `limit`).
//! - Writes replace the query in place and are skipped when nothing changed.

use url::form_urlencoded;

use crate::location::Location;
use crate::query::QuerySort;

/// Values mirrored into the query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UrlState {
    /// Current page.
    pub page: u32,
    /// Current page size.
    pub limit: u32,
    /// Active search text.
    pub search: Option<String>,
    /// Primary sort entry.
    pub sort: Option<QuerySort>,
}

impl UrlState {
    /// Read page, limit, search, and sort from `location`.
    ///
    /// Unparseable numbers are ignored.
    #[must_use]
    pub fn read(location: &dyn Location) -> Self {
        Self {
            page: location
                .query_param("page")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(0),
            limit: location
                .query_param("limit")
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(0),
            search: location
                .query_param("search")
                .filter(|value| !value.trim().is_empty()),
            sort: location
                .query_param("sort")
                .and_then(|raw| QuerySort::parse(&raw).ok()),
        }
    }

    /// Serialize, omitting defaults.
    #[must_use]
    pub fn to_query_string(&self, default_limit: u32) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if self.page > 1 {
            serializer.append_pair("page", &self.page.to_string());
        }
        if self.limit != default_limit {
            serializer.append_pair("limit", &self.limit.to_string());
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            serializer.append_pair("search", search);
        }
        if let Some(sort) = &self.sort {
            serializer.append_pair(
                "sort",
                &format!("{},{}", sort.field, sort.direction.as_str()),
            );
        }
        serializer.finish()
    }
}

/// Remembers the last written query so unchanged state is not rewritten.
#[derive(Clone, Debug, Default)]
pub struct UrlSync {
    default_limit: u32,
    last_written: Option<String>,
}

impl UrlSync {
    /// Sync helper for lists whose default page size is `default_limit`.
    #[must_use]
    pub const fn new(default_limit: u32) -> Self {
        Self {
            default_limit,
            last_written: None,
        }
    }

    /// Write `state` when its serialized form differs from the last write.
    /// Returns whether the location was touched.
    pub fn sync(&mut self, location: &dyn Location, state: &UrlState) -> bool {
        let query = state.to_query_string(self.default_limit);
        if self.last_written.as_deref() == Some(query.as_str()) {
            return false;
        }
        location.replace_query(&query);
        self.last_written = Some(query);
        true
    }
}
