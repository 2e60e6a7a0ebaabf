//! Dependency container for one console session.
//!
//! # Design
//! - Everything the managers share (session, HTTP client, stores, notifier) is
//!   built once here and handed out explicitly; there are no globals.
//! - The persisted session is restored during construction, so the first request
//!   already carries the stored token.

use std::sync::Arc;

use catalog_config::AppConfig;
use catalog_core::categories::Category;
use catalog_core::{
    FileSessionStorage, Location, MemoryLocation, Notifier, SessionStorage, SessionStore,
    SharedStore, TracingNotifier,
};
use tracing::info;

use crate::auth::AuthService;
use crate::catalogs::CatalogService;
use crate::categories::{CategoryApi, category_api, category_crud, category_list};
use crate::crud::CrudManager;
use crate::error::ClientResult;
use crate::http::HttpClient;
use crate::list::ListManager;

/// Wired services for the catalog console.
#[derive(Clone)]
pub struct Console {
    config: AppConfig,
    session: SessionStore,
    http: HttpClient,
    notifier: Arc<dyn Notifier>,
    category_store: SharedStore<Category>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Console {
    /// Console persisting its session to `config.session_file`, logging notifications.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn from_config(config: AppConfig) -> ClientResult<Self> {
        let storage = Arc::new(FileSessionStorage::new(config.session_file.clone()));
        let location = Arc::new(MemoryLocation::new("/"));
        Self::with_parts(config, storage, location, Arc::new(TracingNotifier))
    }

    /// Console over injected storage, location, and notifier.
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn with_parts(
        config: AppConfig,
        storage: Arc<dyn SessionStorage>,
        location: Arc<dyn Location>,
        notifier: Arc<dyn Notifier>,
    ) -> ClientResult<Self> {
        let session = SessionStore::new(storage, location, config.login_path.clone());
        let restored = session.restore_session();
        let http = HttpClient::new(
            config.api_base_url.clone(),
            config.http_timeout,
            session.clone(),
        )?;
        info!(
            base_url = %config.api_base_url,
            authenticated = restored.is_authenticated,
            "console ready"
        );
        Ok(Self {
            config,
            session,
            http,
            notifier,
            category_store: SharedStore::new(),
        })
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Session store.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Shared HTTP client.
    #[must_use]
    pub const fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Notification sink.
    #[must_use]
    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    /// Login and profile endpoints.
    #[must_use]
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.http.clone())
    }

    /// Lookup-list endpoint.
    #[must_use]
    pub fn catalogs(&self) -> CatalogService {
        CatalogService::new(self.http.clone())
    }

    /// Category resource.
    #[must_use]
    pub fn categories(&self) -> CategoryApi {
        category_api(self.http.clone())
    }

    /// Store shared by the category list and forms.
    #[must_use]
    pub const fn category_store(&self) -> &SharedStore<Category> {
        &self.category_store
    }

    /// Category list manager syncing its state through the session's location.
    #[must_use]
    pub fn category_list(&self) -> ListManager<CategoryApi> {
        category_list(
            self.categories(),
            self.category_store.clone(),
            self.config.page_size,
            Some(self.session.location()),
        )
    }

    /// Category form, in edit mode when `entity` is given.
    ///
    /// # Errors
    /// Returns an error if the form validators cannot be built.
    pub fn category_form(&self, entity: Option<Category>) -> ClientResult<CrudManager<CategoryApi>> {
        category_crud(
            self.categories(),
            entity,
            self.notifier(),
            Some(self.category_store.clone()),
        )
    }

    /// Drop the session locally without redirecting.
    pub fn sign_out(&self) {
        self.session.clear_session();
        info!("signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use catalog_core::{AuthTokens, RecordingNotifier, SessionProfile, SessionUser};
    use serde_json::Map;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> AppConfig {
        AppConfig {
            api_base_url: "http://127.0.0.1:9".parse().expect("valid URL"),
            page_size: 20,
            http_timeout: Duration::from_secs(2),
            session_file: dir.path().join("session.json"),
            login_path: "/login".to_string(),
        }
    }

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

    #[test]
    fn restores_persisted_session_on_start() {
        let dir = TempDir::new().expect("tempdir");
        let first = Console::from_config(config(&dir)).expect("console");
        assert!(!first.session().is_authenticated());
        first
            .session()
            .set_session(profile(), AuthTokens::bearer("tok-1"));

        let second = Console::from_config(config(&dir)).expect("console");
        assert_eq!(second.session().access_token().as_deref(), Some("tok-1"));

        second.sign_out();
        let third = Console::from_config(config(&dir)).expect("console");
        assert!(!third.session().is_authenticated());
    }

    #[test]
    fn category_managers_share_one_store() {
        let dir = TempDir::new().expect("tempdir");
        let console = Console::with_parts(
            config(&dir),
            Arc::new(catalog_core::MemorySessionStorage::default()),
            Arc::new(MemoryLocation::new("/categories")),
            Arc::new(RecordingNotifier::new()),
        )
        .expect("console");

        let list = console.category_list();
        assert_eq!(list.config().default_page_size, 20);
        assert_eq!(console.categories().base_path(), "/category");
        assert!(console.category_form(None).expect("form").is_create());

        console
            .category_store()
            .update(|store| store.put_not_found(true));
        assert!(list.store().read(|store| store.not_found));
    }
}
