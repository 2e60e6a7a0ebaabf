//! Session state, persistence, and the injected session store.
//!
//! # Design
//! - One JSON blob under a fixed storage key holds `{profile, tokens}`.
//! - Every mutation writes through to storage; storage failures are logged, never returned.
//! - Corrupt or missing persisted data restores to the signed-out state.
//! - `is_authenticated` is always derived from the presence of a non-empty access token.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::location::Location;

/// Unix mode of the session file; it holds the bearer token.
#[cfg(unix)]
const SESSION_FILE_MODE: u32 = 0o600;

/// Fixed key the persisted session blob is stored under.
pub const STORAGE_KEY: &str = "catalog-console-session";

/// Authenticated user as returned by the auth endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Stable user identifier.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Display name, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Any additional user attributes returned by the backend.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Profile attached to an authenticated session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionProfile {
    /// Signed-in user.
    pub user: SessionUser,
    /// Ability keys used for permission checks.
    #[serde(default)]
    pub abilities: Vec<String>,
    /// Role names assigned to the user.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Company record, when scoped to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<Value>,
    /// Country record, when scoped to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Value>,
}

/// Bearer tokens issued at login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    /// Access token sent as `Authorization: Bearer`.
    pub access_token: String,
    /// Refresh token, when issued. No refresh flow consumes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AuthTokens {
    /// Build tokens from an access token alone.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
        }
    }
}

/// Shape of the persisted session blob.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    /// Persisted profile.
    #[serde(default)]
    pub profile: Option<SessionProfile>,
    /// Persisted tokens.
    #[serde(default)]
    pub tokens: Option<AuthTokens>,
}

/// Point-in-time view of the session store.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    /// Current profile.
    pub profile: Option<SessionProfile>,
    /// Current tokens.
    pub tokens: Option<AuthTokens>,
    /// Whether a usable access token is present.
    pub is_authenticated: bool,
    /// True until the first restore (or explicit session write) completes.
    pub is_restoring: bool,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            profile: None,
            tokens: None,
            is_authenticated: false,
            is_restoring: true,
        }
    }
}

impl SessionSnapshot {
    fn signed_out() -> Self {
        Self {
            is_restoring: false,
            ..Self::default()
        }
    }

    fn from_parts(profile: Option<SessionProfile>, tokens: Option<AuthTokens>) -> Self {
        let is_authenticated = has_access_token(tokens.as_ref());
        Self {
            profile,
            tokens,
            is_authenticated,
            is_restoring: false,
        }
    }
}

fn has_access_token(tokens: Option<&AuthTokens>) -> bool {
    tokens.is_some_and(|tokens| !tokens.access_token.trim().is_empty())
}

/// Options accepted by [`SessionStore::logout`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogoutOptions {
    /// Navigate to the login route after clearing state.
    pub propagate: bool,
}

impl Default for LogoutOptions {
    fn default() -> Self {
        Self { propagate: true }
    }
}

/// Backing storage for the persisted session blob.
pub trait SessionStorage: Send + Sync {
    /// Read the raw blob, `None` when nothing was persisted.
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] when the backing store cannot be read.
    fn load(&self) -> CoreResult<Option<String>>;

    /// Replace the raw blob.
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] when the backing store cannot be written.
    fn save(&self, raw: &str) -> CoreResult<()>;

    /// Remove the blob.
    ///
    /// # Errors
    /// Returns [`CoreError::Storage`] when the backing store cannot be cleared.
    fn clear(&self) -> CoreResult<()>;
}

/// File-backed session storage (one JSON file named after [`STORAGE_KEY`]).
#[derive(Clone, Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    /// Store the blob at an explicit file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the blob as `<dir>/catalog-console-session.json`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{STORAGE_KEY}.json")))
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> CoreResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CoreError::Storage {
                operation: "session.load",
                source,
            }),
        }
    }

    fn save(&self, raw: &str) -> CoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| CoreError::Storage {
                operation: "session.create_dir",
                source,
            })?;
        }
        write_private(&self.path, raw).map_err(|source| CoreError::Storage {
            operation: "session.save",
            source,
        })
    }

    fn clear(&self) -> CoreResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CoreError::Storage {
                operation: "session.clear",
                source,
            }),
        }
    }
}

/// Write `raw` to `path`, readable by the owner only on unix.
fn write_private(path: &Path, raw: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(SESSION_FILE_MODE);
    let mut file = options.open(path)?;
    // `mode` only applies on creation; tighten files left by older writes.
    #[cfg(unix)]
    file.set_permissions(fs::Permissions::from_mode(SESSION_FILE_MODE))?;
    file.write_all(raw.as_bytes())?;
    file.flush()
}

/// In-memory session storage for tests and ephemeral hosts.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    raw: Mutex<Option<String>>,
}

impl MemorySessionStorage {
    /// Seed the storage with a raw blob.
    #[must_use]
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    /// Current raw blob.
    #[must_use]
    pub fn raw(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.raw.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> CoreResult<Option<String>> {
        Ok(self.lock().clone())
    }

    fn save(&self, raw: &str) -> CoreResult<()> {
        *self.lock() = Some(raw.to_string());
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        *self.lock() = None;
        Ok(())
    }
}

struct SessionInner {
    state: Mutex<SessionSnapshot>,
    storage: Arc<dyn SessionStorage>,
    location: Arc<dyn Location>,
    login_path: String,
}

/// Injected session container shared by the HTTP client and the UI layer.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.lock())
            .field("login_path", &self.inner.login_path)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create an empty store (still restoring) over the given storage and location.
    #[must_use]
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        location: Arc<dyn Location>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionSnapshot::default()),
                storage,
                location,
                login_path: login_path.into(),
            }),
        }
    }

    /// Route used for login redirects.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.inner.login_path
    }

    /// Location the store redirects through.
    #[must_use]
    pub fn location(&self) -> Arc<dyn Location> {
        Arc::clone(&self.inner.location)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().clone()
    }

    /// Current access token, read fresh on every call.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.lock()
            .tokens
            .as_ref()
            .map(|tokens| tokens.access_token.clone())
            .filter(|token| !token.trim().is_empty())
    }

    /// Whether a usable access token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated
    }

    /// Current profile.
    #[must_use]
    pub fn profile(&self) -> Option<SessionProfile> {
        self.lock().profile.clone()
    }

    /// Load the persisted session. Missing or corrupt data yields the signed-out state.
    pub fn restore_session(&self) -> SessionSnapshot {
        let persisted = self.read_persisted();
        let next = SessionSnapshot::from_parts(persisted.profile, persisted.tokens);
        *self.lock() = next.clone();
        debug!(
            authenticated = next.is_authenticated,
            "session restored from storage"
        );
        next
    }

    /// Store a freshly issued session and persist it.
    pub fn set_session(&self, profile: SessionProfile, tokens: AuthTokens) {
        self.persist(&PersistedSession {
            profile: Some(profile.clone()),
            tokens: Some(tokens.clone()),
        });
        *self.lock() = SessionSnapshot::from_parts(Some(profile), Some(tokens));
    }

    /// Replace the profile while keeping the current tokens.
    pub fn set_profile(&self, profile: SessionProfile) {
        let mut state = self.lock();
        let tokens = state.tokens.clone();
        self.persist(&PersistedSession {
            profile: Some(profile.clone()),
            tokens: tokens.clone(),
        });
        *state = SessionSnapshot::from_parts(Some(profile), tokens);
    }

    /// Clear persisted and in-memory state without navigating.
    pub fn clear_session(&self) {
        self.clear_persisted();
        *self.lock() = SessionSnapshot::signed_out();
    }

    /// Sign out. Returns whether a session was authenticated before the call.
    ///
    /// With `propagate`, a hard navigation to the login route follows.
    pub fn logout(&self, options: LogoutOptions) -> bool {
        self.clear_persisted();
        let was_authenticated = {
            let mut state = self.lock();
            let was = state.is_authenticated;
            *state = SessionSnapshot::signed_out();
            was
        };
        if options.propagate {
            self.inner.location.assign(&self.inner.login_path);
        }
        was_authenticated
    }

    /// Navigate to the login route unless the location is already there.
    ///
    /// The path check and the navigation happen under the session lock, so
    /// concurrent callers navigate at most once. Returns whether this call navigated.
    pub fn redirect_to_login(&self) -> bool {
        let _state = self.lock();
        if self.inner.location.path() == self.inner.login_path {
            return false;
        }
        self.inner.location.assign(&self.inner.login_path);
        true
    }

    /// Whether the profile carries `ability`.
    #[must_use]
    pub fn can(&self, ability: &str) -> bool {
        self.lock()
            .profile
            .as_ref()
            .is_some_and(|profile| profile.abilities.iter().any(|entry| entry == ability))
    }

    /// Whether the profile carries any of `abilities`.
    #[must_use]
    pub fn can_any(&self, abilities: &[&str]) -> bool {
        abilities.iter().any(|ability| self.can(ability))
    }

    /// Whether the profile carries `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.lock()
            .profile
            .as_ref()
            .is_some_and(|profile| profile.roles.iter().any(|entry| entry == role))
    }

    fn read_persisted(&self) -> PersistedSession {
        let raw = match self.inner.storage.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return PersistedSession::default(),
            Err(err) => {
                warn!(error = %err, "failed to read persisted session");
                return PersistedSession::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(error = %err, "failed to parse session from storage");
            PersistedSession::default()
        })
    }

    fn persist(&self, session: &PersistedSession) {
        let result = serde_json::to_string(session)
            .map_err(|source| CoreError::Serialize { source })
            .and_then(|raw| self.inner.storage.save(&raw));
        if let Err(err) = result {
            warn!(error = %err, "failed to persist session");
        }
    }

    fn clear_persisted(&self) {
        if let Err(err) = self.inner.storage.clear() {
            warn!(error = %err, "failed to clear persisted session");
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::MemoryLocation;

    fn profile(abilities: &[&str]) -> SessionProfile {
        SessionProfile {
            user: SessionUser {
                id: "u-1".to_string(),
                email: "ada@example.com".to_string(),
                name: Some("Ada".to_string()),
                extra: Map::new(),
            },
            abilities: abilities.iter().map(ToString::to_string).collect(),
            roles: vec!["admin".to_string()],
            company: None,
            country: None,
        }
    }

    fn store_with(storage: Arc<dyn SessionStorage>) -> (SessionStore, Arc<MemoryLocation>) {
        let location = Arc::new(MemoryLocation::new("/categories"));
        let store = SessionStore::new(storage, location.clone(), "/login");
        (store, location)
    }

    #[test]
    fn new_store_is_restoring_until_restore_runs() {
        let (store, _) = store_with(Arc::new(MemorySessionStorage::default()));
        assert!(store.snapshot().is_restoring);
        let restored = store.restore_session();
        assert!(!restored.is_restoring);
        assert!(!restored.is_authenticated);
    }

    #[test]
    fn restore_without_data_is_idempotent() {
        let (store, _) = store_with(Arc::new(MemorySessionStorage::default()));
        for _ in 0..3 {
            let snapshot = store.restore_session();
            assert!(!snapshot.is_authenticated);
            assert!(!snapshot.is_restoring);
            assert!(snapshot.profile.is_none());
        }
    }

    #[test]
    fn corrupt_blob_restores_signed_out() {
        let storage = Arc::new(MemorySessionStorage::with_raw("{not json"));
        let (store, _) = store_with(storage);
        let snapshot = store.restore_session();
        assert!(!snapshot.is_authenticated);
        assert!(!snapshot.is_restoring);
    }

    #[test]
    fn set_session_persists_and_restores_in_fresh_store() {
        let storage = Arc::new(MemorySessionStorage::default());
        let (store, _) = store_with(storage.clone());
        store.set_session(profile(&[]), AuthTokens::bearer("tok"));
        assert!(store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("tok"));

        let (fresh, _) = store_with(storage);
        let snapshot = fresh.restore_session();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.profile, Some(profile(&[])));
    }

    #[test]
    fn empty_access_token_is_not_authenticated() {
        let raw = serde_json::to_string(&PersistedSession {
            profile: Some(profile(&[])),
            tokens: Some(AuthTokens::bearer("")),
        })
        .expect("serialize");
        let (store, _) = store_with(Arc::new(MemorySessionStorage::with_raw(raw)));
        assert!(!store.restore_session().is_authenticated);
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn set_profile_keeps_tokens() {
        let storage = Arc::new(MemorySessionStorage::default());
        let (store, _) = store_with(storage.clone());
        store.set_session(profile(&[]), AuthTokens::bearer("tok"));
        store.set_profile(profile(&["category.create"]));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.tokens, Some(AuthTokens::bearer("tok")));
        assert!(snapshot.is_authenticated);
        let persisted: PersistedSession =
            serde_json::from_str(&storage.raw().expect("persisted")).expect("parse");
        assert_eq!(persisted.tokens, Some(AuthTokens::bearer("tok")));
        assert!(store.can("category.create"));
    }

    #[test]
    fn logout_clears_state_and_navigates_when_propagating() {
        let storage = Arc::new(MemorySessionStorage::default());
        let (store, location) = store_with(storage.clone());
        store.set_session(profile(&[]), AuthTokens::bearer("tok"));
        assert!(store.logout(LogoutOptions::default()));
        assert!(!store.is_authenticated());
        assert!(storage.raw().is_none());
        assert_eq!(location.navigations(), vec!["/login".to_string()]);
    }

    #[test]
    fn logout_without_propagation_stays_put() {
        let (store, location) = store_with(Arc::new(MemorySessionStorage::default()));
        store.set_session(profile(&[]), AuthTokens::bearer("tok"));
        assert!(store.logout(LogoutOptions { propagate: false }));
        assert!(!store.logout(LogoutOptions { propagate: false }));
        assert!(location.navigations().is_empty());
    }

    #[test]
    fn redirect_to_login_navigates_once() {
        let (store, location) = store_with(Arc::new(MemorySessionStorage::default()));
        assert!(store.redirect_to_login());
        assert!(!store.redirect_to_login());
        assert_eq!(location.navigations(), vec!["/login".to_string()]);
    }

    #[test]
    fn permission_checks_follow_profile() {
        let (store, _) = store_with(Arc::new(MemorySessionStorage::default()));
        assert!(!store.can("category.delete"));
        store.set_session(
            profile(&["category.edit", "category.delete"]),
            AuthTokens::bearer("tok"),
        );
        assert!(store.can("category.delete"));
        assert!(store.can_any(&["category.create", "category.edit"]));
        assert!(!store.can_any(&["report.export"]));
        assert!(store.has_role("admin"));
        store.clear_session();
        assert!(!store.has_role("admin"));
    }

    #[test]
    fn file_storage_round_trips_and_tolerates_missing_file() -> Result<(), CoreError> {
        let dir = tempfile::tempdir().map_err(|source| CoreError::Storage {
            operation: "tempdir",
            source,
        })?;
        let storage = FileSessionStorage::in_dir(dir.path().join("nested"));
        assert!(storage.load()?.is_none());
        storage.save("{\"profile\":null,\"tokens\":null}")?;
        assert!(storage.load()?.is_some());
        storage.clear()?;
        storage.clear()?;
        assert!(storage.load()?.is_none());
        assert!(storage.path().ends_with("catalog-console-session.json"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn file_storage_is_owner_only() -> Result<(), CoreError> {
        let storage_err = |source| CoreError::Storage {
            operation: "test",
            source,
        };
        let dir = tempfile::tempdir().map_err(storage_err)?;
        let storage = FileSessionStorage::in_dir(dir.path());

        storage.save("{}")?;
        let mode = fs::metadata(storage.path()).map_err(storage_err)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        fs::set_permissions(storage.path(), fs::Permissions::from_mode(0o644))
            .map_err(storage_err)?;
        storage.save("{\"profile\":null}")?;
        let mode = fs::metadata(storage.path()).map_err(storage_err)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(storage.load()?.as_deref(), Some("{\"profile\":null}"));
        Ok(())
    }
}
