//! Navigation seam for login redirects and query-string sync.
//!
//! # Design
//! - The console only needs four things from the host: current path, current query,
//!   a hard navigation, and an in-place query replacement (no history push).
//! - Hosts without a browser use [`MemoryLocation`], which also records calls for tests.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Host location used for redirects and URL-synchronised list state.
pub trait Location: Send + Sync {
    /// Current route path (for example `/categories`).
    fn path(&self) -> String;

    /// Current query string without the leading `?`.
    fn query(&self) -> String;

    /// Perform a hard navigation to `path`.
    fn assign(&self, path: &str);

    /// Replace the current query string in place.
    fn replace_query(&self, query: &str);

    /// Read a single decoded query parameter.
    fn query_param(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query().as_bytes())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.into_owned())
    }
}

#[derive(Debug, Default)]
struct MemoryLocationState {
    path: String,
    query: String,
    navigations: Vec<String>,
    query_writes: usize,
}

/// In-memory [`Location`] that records navigations and query writes.
#[derive(Debug, Default)]
pub struct MemoryLocation {
    state: Mutex<MemoryLocationState>,
}

impl MemoryLocation {
    /// Create a location positioned at `path` with an empty query.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryLocationState {
                path: path.into(),
                ..MemoryLocationState::default()
            }),
        }
    }

    /// Seed the query string, as if the page had been opened with it.
    #[must_use]
    pub fn with_query(self, query: impl Into<String>) -> Self {
        self.lock().query = query.into();
        self
    }

    /// Paths passed to [`Location::assign`], oldest first.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    /// Number of times the query string was replaced.
    #[must_use]
    pub fn query_writes(&self) -> usize {
        self.lock().query_writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLocationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Location for MemoryLocation {
    fn path(&self) -> String {
        self.lock().path.clone()
    }

    fn query(&self) -> String {
        self.lock().query.clone()
    }

    fn assign(&self, path: &str) {
        let mut state = self.lock();
        state.path = path.to_string();
        state.query.clear();
        state.navigations.push(path.to_string());
    }

    fn replace_query(&self, query: &str) {
        let mut state = self.lock();
        state.query = query.to_string();
        state.query_writes += 1;
    }
}
