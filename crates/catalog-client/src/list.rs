//! List manager: query state, pagination, debounced search, and URL sync.
//!
//! # Design
//! - Page and page size live in the shared entity store; search, filters, and sort
//!   live on the manager and are rebuilt into a [`ListQuery`] before every fetch.
//! - Search changes wait for the debounce window; every other change waits for a
//!   short settle delay so same-tick updates collapse into one fetch.
//! - Automatic fetches only happen when `auto_init` is set; otherwise triggers
//!   just update state and the caller decides when to fetch.
//! - Responses that arrive out of order are applied as they land unless
//!   `discard_stale_responses` is set.
//! - The store lock is never held across an await.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::entity::Entity;
use catalog_core::pagination::{DEFAULT_LIMIT, DEFAULT_PAGE};
use catalog_core::url_sync::{UrlState, UrlSync};
use catalog_core::{
    ListQuery, Location, Pagination, QueryFilter, QuerySort, Search, SearchParams, SharedStore,
    SortDirection,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::resource::{ListPage, ResourceApi, ResourceCodec};
use crate::schedule::Debouncer;

/// Delay applied to search input before it reaches the query.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);
/// Delay used to coalesce non-search changes.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Backend a list manager reads from.
#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    /// Record type returned by the source.
    type Record: Entity;

    /// Fetch one page.
    async fn list(&self, query: &ListQuery) -> ClientResult<ListPage<Self::Record>>;

    /// Fetch one page through the search endpoint.
    async fn search(&self, query: &ListQuery) -> ClientResult<ListPage<Self::Record>> {
        self.list(query).await
    }

    /// Delete a record, returning its id.
    async fn remove(&self, _id: &str) -> ClientResult<String> {
        Err(ClientError::Unsupported {
            operation: "remove",
        })
    }

    /// Undo a soft delete, returning the restored record.
    async fn restore(&self, _id: &str) -> ClientResult<Self::Record> {
        Err(ClientError::Unsupported {
            operation: "restore",
        })
    }
}

#[async_trait]
impl<C: ResourceCodec> ListSource for ResourceApi<C> {
    type Record = C::Record;

    async fn list(&self, query: &ListQuery) -> ClientResult<ListPage<C::Record>> {
        ResourceApi::list(self, query).await
    }

    async fn search(&self, query: &ListQuery) -> ClientResult<ListPage<C::Record>> {
        ResourceApi::search(self, query).await
    }

    async fn remove(&self, id: &str) -> ClientResult<String> {
        ResourceApi::remove(self, id).await
    }

    async fn restore(&self, id: &str) -> ClientResult<C::Record> {
        ResourceApi::restore(self, id).await
    }
}

/// Which source method a fetch calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListEndpoint {
    /// `GET {base}` with query parameters.
    #[default]
    List,
    /// `POST {base}/search` with a JSON body.
    Search,
}

/// List manager configuration.
#[derive(Clone, Debug)]
pub struct ListConfig {
    /// Fetch on `init` and after every state change.
    pub auto_init: bool,
    /// Seed state from, and mirror it into, the location query string.
    pub preserve_query_params: bool,
    /// Search debounce window.
    pub debounce: Duration,
    /// Settle delay for non-search changes.
    pub settle: Duration,
    /// Page size used initially and after `reset`.
    pub default_page_size: u32,
    /// Sort used initially and after `reset`.
    pub default_sort: Option<QuerySort>,
    /// Top-level params merged into every query.
    pub override_params: BTreeMap<String, Value>,
    /// Source method used by `fetch`.
    pub endpoint: ListEndpoint,
    /// Ignore responses to requests that were superseded by a newer fetch.
    pub discard_stale_responses: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            auto_init: true,
            preserve_query_params: false,
            debounce: DEFAULT_DEBOUNCE,
            settle: DEFAULT_SETTLE,
            default_page_size: DEFAULT_LIMIT,
            default_sort: None,
            override_params: BTreeMap::new(),
            endpoint: ListEndpoint::List,
            discard_stale_responses: false,
        }
    }
}

/// Rewrites fetched rows before they reach the store.
pub type TransformResponse<T> = Arc<dyn Fn(Vec<T>) -> Vec<T> + Send + Sync>;
/// Called with the stored rows after a successful fetch.
pub type SuccessHook<T> = Arc<dyn Fn(&[T]) + Send + Sync>;
/// Called with the error after a failed fetch.
pub type ErrorHook = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// Optional list callbacks.
pub struct ListHooks<T> {
    /// Row transform.
    pub transform_response: Option<TransformResponse<T>>,
    /// Success callback.
    pub on_success: Option<SuccessHook<T>>,
    /// Failure callback.
    pub on_error: Option<ErrorHook>,
}

impl<T> Default for ListHooks<T> {
    fn default() -> Self {
        Self {
            transform_response: None,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> Clone for ListHooks<T> {
    fn clone(&self) -> Self {
        Self {
            transform_response: self.transform_response.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

/// Derived flags for pagination controls and bulk actions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListComputed {
    /// A later page exists.
    pub has_next_page: bool,
    /// An earlier page exists.
    pub has_prev_page: bool,
    /// The current page is the first.
    pub is_first_page: bool,
    /// The current page is the last (or beyond).
    pub is_last_page: bool,
    /// At least one row is selected.
    pub has_selection: bool,
    /// Number of selected rows.
    pub selected_count: usize,
    /// No rows and no fetch in flight.
    pub is_empty: bool,
}

struct ListState {
    params: SearchParams,
    search_input: String,
    url_sync: UrlSync,
}

struct ListInner<S: ListSource> {
    source: S,
    store: SharedStore<S::Record>,
    config: ListConfig,
    hooks: ListHooks<S::Record>,
    location: Option<Arc<dyn Location>>,
    state: Mutex<ListState>,
    search_slot: Arc<Debouncer>,
    settle_slot: Arc<Debouncer>,
    sequence: AtomicU64,
}

/// Drives one paginated list over a [`ListSource`].
pub struct ListManager<S: ListSource> {
    inner: Arc<ListInner<S>>,
}

impl<S: ListSource> Clone for ListManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ListSource> std::fmt::Debug for ListManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListManager")
            .field("config", &self.inner.config)
            .field("params", &self.params())
            .finish_non_exhaustive()
    }
}

impl<S: ListSource> ListManager<S> {
    /// Manager without hooks or location.
    #[must_use]
    pub fn new(source: S, store: SharedStore<S::Record>, config: ListConfig) -> Self {
        Self::with_options(source, store, config, ListHooks::default(), None)
    }

    /// Manager with hooks and an optional location for URL sync.
    ///
    /// With `preserve_query_params`, the initial page, page size, search, and
    /// sort are read from `location`.
    #[must_use]
    pub fn with_options(
        source: S,
        store: SharedStore<S::Record>,
        config: ListConfig,
        hooks: ListHooks<S::Record>,
        location: Option<Arc<dyn Location>>,
    ) -> Self {
        let mut params = SearchParams::default();
        if let Some(sort) = &config.default_sort {
            params.sort = vec![sort.clone()];
        }
        let mut page = DEFAULT_PAGE;
        let mut limit = config.default_page_size;
        let mut search_input = String::new();

        if config.preserve_query_params
            && let Some(location) = &location
        {
            let seeded = UrlState::read(location.as_ref());
            if seeded.page > 0 {
                page = seeded.page;
            }
            if seeded.limit > 0 {
                limit = seeded.limit;
            }
            if let Some(search) = seeded.search {
                params.search = Some(Search::new(search.clone()));
                search_input = search;
            }
            if let Some(sort) = seeded.sort {
                params.sort = vec![sort];
            }
        }
        store.update(|store| store.pagination = Pagination::at(page, limit));

        let url_sync = UrlSync::new(config.default_page_size);
        Self {
            inner: Arc::new(ListInner {
                source,
                store,
                config,
                hooks,
                location,
                state: Mutex::new(ListState {
                    params,
                    search_input,
                    url_sync,
                }),
                search_slot: Arc::new(Debouncer::default()),
                settle_slot: Arc::new(Debouncer::default()),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    /// Shared entity store.
    #[must_use]
    pub fn store(&self) -> &SharedStore<S::Record> {
        &self.inner.store
    }

    /// Underlying source.
    #[must_use]
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &ListConfig {
        &self.inner.config
    }

    /// Applied search params.
    #[must_use]
    pub fn params(&self) -> SearchParams {
        self.lock_state().params.clone()
    }

    /// Search text as last typed, before debouncing.
    #[must_use]
    pub fn search_term(&self) -> String {
        self.lock_state().search_input.clone()
    }

    /// Schedule the first fetch when `auto_init` is set.
    pub fn init(&self) {
        self.schedule_fetch();
    }

    /// Fetch the current page.
    ///
    /// `custom` is merged over the built query; its non-empty values win.
    ///
    /// # Errors
    /// Returns the source error after clearing the held rows.
    pub async fn fetch(&self, custom: Option<&SearchParams>) -> ClientResult<()> {
        let inner = &self.inner;
        let (page, limit) = inner
            .store
            .read(|store| (store.pagination.page, store.pagination.limit));
        let mut query = {
            let state = self.lock_state();
            ListQuery::new(page, limit)
                .with_overrides(&inner.config.override_params)
                .with_params(&state.params)
        };
        if let Some(custom) = custom {
            query.merge(custom);
        }

        let ticket = inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        inner.store.update(|store| {
            store.put_loading(true);
            store.put_not_found(false);
        });
        debug!(page, limit, ticket, "fetching list");

        let result = match inner.config.endpoint {
            ListEndpoint::List => inner.source.list(&query).await,
            ListEndpoint::Search => inner.source.search(&query).await,
        };

        if inner.config.discard_stale_responses && inner.sequence.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "discarding superseded list response");
            return result.map(|_| ());
        }

        match result {
            Ok(response) => {
                self.apply_page(response, page, limit);
                Ok(())
            }
            Err(error) => {
                let message = error.user_message();
                inner.store.update(|store| {
                    store.remove_all_entities();
                    store.put_meta(None);
                    store.put_error(Some(message));
                    store.put_loading(false);
                });
                warn!(error = %error, "list fetch failed");
                if let Some(on_error) = &inner.hooks.on_error {
                    on_error(&error);
                }
                Err(error)
            }
        }
    }

    /// Fetch again with the current state.
    ///
    /// # Errors
    /// Returns the source error.
    pub async fn refresh(&self) -> ClientResult<()> {
        self.fetch(None).await
    }

    /// Go to `page`.
    pub fn set_page(&self, page: u32) {
        self.put_page(page.max(1));
        self.schedule_fetch();
    }

    /// Change the page size and go back to the first page.
    pub fn set_page_size(&self, limit: u32) {
        self.inner.store.update(|store| {
            store.pagination.limit = limit.max(1);
            store.pagination.page = DEFAULT_PAGE;
        });
        self.schedule_fetch();
    }

    /// Go to the first page.
    pub fn go_to_first(&self) {
        self.set_page(DEFAULT_PAGE);
    }

    /// Go to the last known page.
    pub fn go_to_last(&self) {
        let pages = self.inner.store.read(|store| store.pagination.pages);
        self.set_page(pages);
    }

    /// Advance one page; no-op on the last page.
    pub fn go_to_next(&self) {
        let pagination = self.inner.store.read(|store| store.pagination);
        if pagination.has_next_page() {
            self.set_page(pagination.page + 1);
        }
    }

    /// Go back one page; no-op on the first page.
    pub fn go_to_prev(&self) {
        let pagination = self.inner.store.read(|store| store.pagination);
        if pagination.has_prev_page() {
            self.set_page(pagination.page - 1);
        }
    }

    /// Set the search text. It is applied, and the page reset, after the debounce window.
    pub fn search(&self, value: impl Into<String>) {
        let value = value.into();
        self.lock_state().search_input.clone_from(&value);
        let manager = self.clone();
        self.inner
            .search_slot
            .schedule(self.inner.config.debounce, async move {
                manager.apply_search(&value);
                if manager.inner.config.auto_init {
                    manager.run_scheduled_fetch().await;
                }
            });
    }

    /// Apply search text immediately and go back to the first page. Blank text clears the search.
    pub fn apply_search(&self, value: &str) {
        {
            let mut state = self.lock_state();
            state.search_input = value.to_string();
            state.params.search = (!value.trim().is_empty()).then(|| Search::new(value));
        }
        self.put_page(DEFAULT_PAGE);
    }

    /// Replace all filters with equality filters; `null` values are skipped.
    pub fn set_filters(&self, filters: BTreeMap<String, Value>) {
        let filters = filters
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(field, value)| QueryFilter::eq(field, value))
            .collect();
        self.lock_state().params.filters = filters;
        self.reset_page_and_fetch();
    }

    /// Add a filter, replacing any existing filter on the same field.
    pub fn add_filter(&self, filter: QueryFilter) {
        self.lock_state().params.upsert_filter(filter);
        self.reset_page_and_fetch();
    }

    /// Drop filters on `field`.
    pub fn remove_filter(&self, field: &str) {
        self.lock_state().params.remove_filter(field);
        self.reset_page_and_fetch();
    }

    /// Drop every filter.
    pub fn clear_filters(&self) {
        self.lock_state().params.filters.clear();
        self.reset_page_and_fetch();
    }

    /// Sort by a single field. The page is kept.
    pub fn set_sort(&self, field: impl Into<String>, direction: SortDirection) {
        self.lock_state().params.sort = vec![QuerySort::new(field, direction)];
        self.schedule_fetch();
    }

    /// Remove sorting. The page is kept.
    pub fn clear_sort(&self) {
        self.lock_state().params.sort.clear();
        self.schedule_fetch();
    }

    /// Edit scopes, includes, aggregates, or anything else on the params.
    pub fn update_params(&self, edit: impl FnOnce(&mut SearchParams)) {
        edit(&mut self.lock_state().params);
        self.schedule_fetch();
    }

    /// Clear the store and params back to their defaults.
    pub fn reset(&self) {
        self.inner.search_slot.cancel();
        let default_page_size = self.inner.config.default_page_size;
        self.inner.store.update(|store| {
            store.reset();
            store.pagination = Pagination::at(DEFAULT_PAGE, default_page_size);
        });
        {
            let mut state = self.lock_state();
            state.search_input.clear();
            state.params = SearchParams::default();
            if let Some(sort) = &self.inner.config.default_sort {
                state.params.sort = vec![sort.clone()];
            }
        }
        self.schedule_fetch();
    }

    /// Delete a record and evict it from the store.
    ///
    /// # Errors
    /// Returns the source error; the store is untouched apart from `deleting`.
    pub async fn remove(&self, id: &str) -> ClientResult<()> {
        self.inner.store.update(|store| store.put_deleting(true));
        let result = self.inner.source.remove(id).await;
        self.inner.store.update(|store| {
            if result.is_ok() {
                store.remove_entity(id);
            }
            store.put_deleting(false);
        });
        result.map(|_| ())
    }

    /// Restore a record and merge the server copy into the store.
    ///
    /// # Errors
    /// Returns the source error.
    pub async fn restore(&self, id: &str) -> ClientResult<()> {
        self.inner.store.update(|store| store.put_deleting(true));
        let result = self.inner.source.restore(id).await;
        self.inner.store.update(|store| store.put_deleting(false));
        let record = result?;
        self.inner
            .store
            .update(|store| store.update_entity(<S::Record as Entity>::Patch::from(record)));
        Ok(())
    }

    /// Flags derived from the current store.
    #[must_use]
    pub fn computed(&self) -> ListComputed {
        self.inner.store.read(|store| {
            let pagination = &store.pagination;
            ListComputed {
                has_next_page: pagination.has_next_page(),
                has_prev_page: pagination.has_prev_page(),
                is_first_page: pagination.page == DEFAULT_PAGE,
                is_last_page: pagination.page >= pagination.pages,
                has_selection: !store.selected_ids.is_empty(),
                selected_count: store.selected_ids.len(),
                is_empty: store.entities.is_empty() && !store.loading,
            }
        })
    }

    /// Wait for every scheduled fetch to finish.
    pub async fn settled(&self) {
        self.inner.search_slot.settled().await;
        self.inner.settle_slot.settled().await;
    }

    fn apply_page(&self, response: ListPage<S::Record>, page: u32, limit: u32) {
        let inner = &self.inner;
        let ListPage {
            data,
            meta,
            raw_meta,
        } = response;
        let pagination = meta.as_ref().map_or_else(
            || Pagination::estimate(page, limit, data.len()),
            |meta| Pagination::from_meta(meta, page, limit),
        );
        let rows = match &inner.hooks.transform_response {
            Some(transform) => transform(data),
            None => data,
        };
        let delivered = inner.hooks.on_success.as_ref().map(|_| rows.clone());
        let not_found = rows.is_empty();

        inner.store.update(|store| {
            store.set_all_entities(rows);
            store.put_not_found(not_found);
            store.put_meta(raw_meta);
            store.pagination = pagination;
            store.put_error(None);
            store.put_initial(true);
            store.put_loading(false);
        });
        self.sync_url();

        if let (Some(on_success), Some(rows)) = (&inner.hooks.on_success, delivered) {
            on_success(&rows);
        }
    }

    fn sync_url(&self) {
        if !self.inner.config.preserve_query_params {
            return;
        }
        let Some(location) = &self.inner.location else {
            return;
        };
        let (page, limit) = self
            .inner
            .store
            .read(|store| (store.pagination.page, store.pagination.limit));
        let mut state = self.lock_state();
        let url = UrlState {
            page,
            limit,
            search: state.params.search_value().map(str::to_string),
            sort: state.params.sort.first().cloned(),
        };
        if state.url_sync.sync(location.as_ref(), &url) {
            debug!(page, limit, "list state written to location");
        }
    }

    fn put_page(&self, page: u32) {
        self.inner.store.update(|store| store.pagination.page = page);
    }

    fn reset_page_and_fetch(&self) {
        self.put_page(DEFAULT_PAGE);
        self.schedule_fetch();
    }

    fn schedule_fetch(&self) {
        if !self.inner.config.auto_init {
            return;
        }
        let manager = self.clone();
        self.inner
            .settle_slot
            .schedule(self.inner.config.settle, async move {
                manager.run_scheduled_fetch().await;
            });
    }

    async fn run_scheduled_fetch(&self) {
        if let Err(error) = self.fetch(None).await {
            debug!(error = %error, "scheduled list fetch failed");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ListState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;

    use catalog_core::categories::Category;
    use catalog_core::{MemoryLocation, PaginationMeta};
    use serde_json::json;

    use crate::error::ApiError;

    #[derive(Default)]
    struct FakeSource {
        total: usize,
        with_meta: bool,
        fail: AtomicBool,
        delays: Mutex<VecDeque<u64>>,
        queries: Mutex<Vec<ListQuery>>,
    }

    impl FakeSource {
        fn new(total: usize, with_meta: bool) -> Arc<Self> {
            Arc::new(Self {
                total,
                with_meta,
                ..Self::default()
            })
        }

        fn queries(&self) -> Vec<ListQuery> {
            self.queries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    fn category(id: &str, name: &str) -> Category {
        Category::from_api(json!({"id": id, "name": name, "is_active": true})).expect("category")
    }

    #[async_trait]
    impl ListSource for Arc<FakeSource> {
        type Record = Category;

        async fn list(&self, query: &ListQuery) -> ClientResult<ListPage<Category>> {
            let call = {
                let mut queries = self.queries.lock().unwrap_or_else(PoisonError::into_inner);
                queries.push(query.clone());
                queries.len()
            };
            let delay = self
                .delays
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ApiError::from_response(500, Some(json!({"message": "boom"}))).into());
            }
            let page = query.page.max(1) as usize;
            let limit = query.limit as usize;
            let start = (page - 1) * limit;
            let end = (start + limit).min(self.total);
            let data = (start..end)
                .map(|index| category(&format!("c{index}"), &format!("call{call}")))
                .collect();
            let meta = self.with_meta.then(|| PaginationMeta {
                current_page: query.page,
                per_page: query.limit,
                total: self.total as u64,
                last_page: Some(self.total.div_ceil(limit.max(1)) as u32),
                from: None,
                to: None,
            });
            Ok(ListPage {
                data,
                meta,
                raw_meta: None,
            })
        }

        async fn remove(&self, id: &str) -> ClientResult<String> {
            Ok(id.to_string())
        }

        async fn restore(&self, id: &str) -> ClientResult<Category> {
            Ok(category(id, "restored"))
        }
    }

    fn manual(source: &Arc<FakeSource>) -> ListManager<Arc<FakeSource>> {
        ListManager::new(
            Arc::clone(source),
            SharedStore::new(),
            ListConfig {
                auto_init: false,
                ..ListConfig::default()
            },
        )
    }

    fn automatic(source: &Arc<FakeSource>) -> ListManager<Arc<FakeSource>> {
        ListManager::new(Arc::clone(source), SharedStore::new(), ListConfig::default())
    }

    #[tokio::test]
    async fn pagination_is_derived_from_meta() {
        let source = FakeSource::new(57, true);
        let manager = manual(&source);

        manager.set_page(2);
        manager.fetch(None).await.expect("page 2");
        let store = manager.store().snapshot();
        assert_eq!(store.pagination.pages, 3);
        assert_eq!((store.pagination.from, store.pagination.to), (Some(21), Some(40)));
        assert_eq!(store.entities.len(), 20);
        assert!(!store.loading);
        assert!(!store.not_found);
        assert!(store.initial);

        manager.set_page(3);
        manager.fetch(None).await.expect("page 3");
        let store = manager.store().snapshot();
        assert_eq!((store.pagination.from, store.pagination.to), (Some(41), Some(57)));
        assert!(manager.computed().is_last_page);
    }

    #[tokio::test]
    async fn pagination_falls_back_to_estimate() {
        let source = FakeSource::new(5, false);
        let manager = manual(&source);

        manager.fetch(None).await.expect("fetch");
        let pagination = manager.store().read(|store| store.pagination);
        assert_eq!(pagination.total, 5);
        assert_eq!(pagination.pages, 1);
        assert!(!pagination.has_next_page());
    }

    #[tokio::test]
    async fn empty_result_sets_not_found() {
        let source = FakeSource::new(0, true);
        let manager = manual(&source);

        manager.fetch(None).await.expect("fetch");
        assert!(manager.store().read(|store| store.not_found));
        assert!(manager.computed().is_empty);
    }

    #[tokio::test]
    async fn failure_clears_rows_and_reports() {
        let source = FakeSource::new(3, true);
        let failures = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&failures);
        let manager = ListManager::with_options(
            Arc::clone(&source),
            SharedStore::new(),
            ListConfig {
                auto_init: false,
                ..ListConfig::default()
            },
            ListHooks {
                on_error: Some(Arc::new(move |error: &ClientError| {
                    seen.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(error.user_message());
                })),
                ..ListHooks::default()
            },
            None,
        );

        manager.fetch(None).await.expect("first fetch");
        source.fail.store(true, Ordering::SeqCst);
        let err = manager.fetch(None).await.expect_err("failure");
        assert_eq!(err.status(), Some(500));

        let store = manager.store().snapshot();
        assert!(store.entities.is_empty());
        assert!(store.meta.is_none());
        assert_eq!(store.error.as_deref(), Some("boom"));
        assert!(!store.loading);
        assert!(!store.not_found);
        assert_eq!(
            *failures.lock().unwrap_or_else(PoisonError::into_inner),
            vec!["boom".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn search_is_debounced_to_one_fetch() {
        let source = FakeSource::new(3, true);
        let manager = automatic(&source);
        manager.set_page(2);
        manager.settled().await;
        let before = source.queries().len();

        for value in ["b", "bo", "boo"] {
            manager.search(value);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(manager.search_term(), "boo");
        manager.settled().await;

        let queries = source.queries();
        assert_eq!(queries.len(), before + 1);
        let last = queries.last().expect("search fetch");
        assert_eq!(last.search.as_ref().map(|s| s.value.as_str()), Some("boo"));
        assert_eq!(last.page, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn same_tick_changes_coalesce() {
        let source = FakeSource::new(57, true);
        let manager = automatic(&source);

        manager.set_page(3);
        manager.add_filter(QueryFilter::eq("is_active", true));
        manager.set_sort("name", SortDirection::Desc);
        manager.settled().await;

        let queries = source.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].page, 1);
        assert_eq!(queries[0].filters[0].field, "is_active");
        assert_eq!(queries[0].sort[0], QuerySort::new("name", SortDirection::Desc));
    }

    #[tokio::test(start_paused = true)]
    async fn sort_change_keeps_page() {
        let source = FakeSource::new(57, true);
        let manager = automatic(&source);
        manager.set_page(2);
        manager.settled().await;

        manager.set_sort("name", SortDirection::Asc);
        manager.settled().await;
        assert_eq!(source.queries().last().map(|query| query.page), Some(2));

        manager.set_filters(BTreeMap::from([
            ("status".to_string(), json!("active")),
            ("parent_id".to_string(), Value::Null),
        ]));
        manager.settled().await;
        let last = source.queries().last().cloned().expect("filter fetch");
        assert_eq!(last.page, 1);
        assert_eq!(last.filters.len(), 1);
    }

    #[tokio::test]
    async fn url_state_is_seeded_and_written_once() {
        let source = FakeSource::new(57, true);
        let location = Arc::new(MemoryLocation::new("/categories").with_query("page=2&search=boo"));
        let manager = ListManager::with_options(
            Arc::clone(&source),
            SharedStore::new(),
            ListConfig {
                auto_init: false,
                preserve_query_params: true,
                ..ListConfig::default()
            },
            ListHooks::default(),
            Some(location.clone() as Arc<dyn Location>),
        );

        assert_eq!(manager.search_term(), "boo");
        manager.fetch(None).await.expect("fetch");
        assert_eq!(source.queries()[0].page, 2);
        assert_eq!(location.query(), "page=2&search=boo");
        assert_eq!(location.query_writes(), 1);

        manager.fetch(None).await.expect("refetch");
        assert_eq!(location.query_writes(), 1);

        manager.set_sort("created_at", SortDirection::Desc);
        manager.fetch(None).await.expect("sorted");
        assert_eq!(location.query(), "page=2&search=boo&sort=created_at%2Cdesc");
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_wins_unless_stale_discarded() {
        for discard in [false, true] {
            let source = FakeSource::new(3, true);
            source
                .delays
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend([300, 10]);
            let manager = ListManager::new(
                Arc::clone(&source),
                SharedStore::new(),
                ListConfig {
                    auto_init: false,
                    discard_stale_responses: discard,
                    ..ListConfig::default()
                },
            );

            let slow = manager.fetch(None);
            let fast = async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                manager.fetch(None).await
            };
            let (slow, fast) = tokio::join!(slow, fast);
            slow.expect("slow");
            fast.expect("fast");

            let name = manager
                .store()
                .read(|store| store.entities[0].name.clone());
            let expected = if discard { "call2" } else { "call1" };
            assert_eq!(name, expected, "discard_stale_responses = {discard}");
        }
    }

    #[tokio::test]
    async fn remove_and_restore_reconcile_store() {
        let source = FakeSource::new(3, true);
        let manager = manual(&source);
        manager.fetch(None).await.expect("fetch");
        manager.store().update(|store| store.select("c1"));

        manager.remove("c1").await.expect("remove");
        let store = manager.store().snapshot();
        assert_eq!(store.entities.len(), 2);
        assert_eq!(store.pagination.total, 2);
        assert!(store.selected_ids.is_empty());
        assert!(!store.deleting);

        manager.restore("c0").await.expect("restore");
        assert_eq!(
            manager.store().read(|store| store.get("c0").map(|c| c.name.clone())),
            Some("restored".to_string())
        );
    }

    #[tokio::test]
    async fn navigation_respects_boundaries() {
        let source = FakeSource::new(57, true);
        let manager = manual(&source);
        manager.fetch(None).await.expect("fetch");

        manager.go_to_prev();
        assert_eq!(manager.store().read(|store| store.pagination.page), 1);
        manager.go_to_next();
        assert_eq!(manager.store().read(|store| store.pagination.page), 2);
        manager.go_to_last();
        assert_eq!(manager.store().read(|store| store.pagination.page), 3);
        manager.set_page_size(50);
        let pagination = manager.store().read(|store| store.pagination);
        assert_eq!((pagination.page, pagination.limit), (1, 50));
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let source = FakeSource::new(3, true);
        let default_sort = QuerySort::new("created_at", SortDirection::Desc);
        let manager = ListManager::new(
            Arc::clone(&source),
            SharedStore::new(),
            ListConfig {
                auto_init: false,
                default_page_size: 10,
                default_sort: Some(default_sort.clone()),
                ..ListConfig::default()
            },
        );
        manager.apply_search("boo");
        manager.add_filter(QueryFilter::eq("is_active", true));
        manager.fetch(None).await.expect("fetch");

        manager.reset();
        let params = manager.params();
        assert!(params.search.is_none());
        assert!(params.filters.is_empty());
        assert_eq!(params.sort, vec![default_sort]);
        let store = manager.store().snapshot();
        assert!(store.entities.is_empty());
        assert_eq!(store.pagination.limit, 10);
    }

    #[tokio::test]
    async fn custom_params_override_state() {
        let source = FakeSource::new(3, true);
        let manager = manual(&source);
        manager.apply_search("old");

        let custom = SearchParams {
            search: Some(Search::new("new")),
            ..SearchParams::default()
        };
        manager.fetch(Some(&custom)).await.expect("fetch");
        assert_eq!(
            source.queries()[0].search.as_ref().map(|s| s.value.clone()),
            Some("new".to_string())
        );
    }
}
