//! CRUD manager: form lifecycle, validation, notifications.
//!
//! # Design
//! - Local validation gates every save; nothing reaches the network while a rule fails.
//! - Server 422 responses are spread into per-field errors; anything else becomes a
//!   generic error notification. Errors are returned to the caller after notifying.
//! - `is_saving` guards double submits and is cleared on every path.
//! - Delete and restore only notify; the list manager or the caller reconciles the store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use catalog_core::catalog::{CatalogRequest, CatalogResponse};
use catalog_core::entity::Entity;
use catalog_core::form::{FieldErrors, FormState, FormValues, Validators};
use catalog_core::{Notification, Notifier, SharedStore};
use tracing::{debug, warn};

use crate::catalogs::CatalogService;
use crate::error::{ClientError, ClientResult};
use crate::resource::{ResourceApi, ResourceCodec};

/// Backend a CRUD manager writes to.
#[async_trait]
pub trait CrudSource: Send + Sync + 'static {
    /// Record returned by the backend.
    type Record: Entity;
    /// Form payload submitted to the backend.
    type Form: FormValues;

    /// Create a record.
    async fn create(&self, values: &Self::Form, with: &[String]) -> ClientResult<Self::Record>;

    /// Update the record `id`; `existing` is the copy being edited.
    async fn update(
        &self,
        id: &str,
        values: &Self::Form,
        existing: Option<&Self::Record>,
        with: &[String],
    ) -> ClientResult<Self::Record>;

    /// Delete the record `id`, returning its id.
    async fn delete(&self, id: &str) -> ClientResult<String>;

    /// Undo a soft delete.
    async fn restore(&self, id: &str) -> ClientResult<Self::Record>;

    /// Fetch lookup lists for the form's selects.
    async fn load_selects(&self, _request: &CatalogRequest) -> ClientResult<CatalogResponse> {
        Ok(CatalogResponse::new())
    }
}

#[async_trait]
impl<C: ResourceCodec> CrudSource for ResourceApi<C> {
    type Record = C::Record;
    type Form = C::Form;

    async fn create(&self, values: &C::Form, with: &[String]) -> ClientResult<C::Record> {
        ResourceApi::create(self, values, with).await
    }

    async fn update(
        &self,
        id: &str,
        values: &C::Form,
        existing: Option<&C::Record>,
        with: &[String],
    ) -> ClientResult<C::Record> {
        ResourceApi::update(self, id, values, existing, with).await
    }

    async fn delete(&self, id: &str) -> ClientResult<String> {
        ResourceApi::remove(self, id).await
    }

    async fn restore(&self, id: &str) -> ClientResult<C::Record> {
        ResourceApi::restore(self, id).await
    }

    async fn load_selects(&self, request: &CatalogRequest) -> ClientResult<CatalogResponse> {
        CatalogService::new(self.http().clone()).fetch(request).await
    }
}

/// What the form is being used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrudMode {
    /// New record.
    #[default]
    Create,
    /// Existing record.
    Edit,
    /// Read-only view of an existing record.
    Detail,
}

/// Notification texts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrudMessages {
    /// Create succeeded.
    pub save_success: String,
    /// Create failed.
    pub save_error: String,
    /// Update succeeded.
    pub update_success: String,
    /// Update failed.
    pub update_error: String,
    /// Delete succeeded.
    pub delete_success: String,
    /// Delete failed.
    pub delete_error: String,
    /// Restore succeeded.
    pub restore_success: String,
    /// Restore failed.
    pub restore_error: String,
    /// Local or server validation failed.
    pub validation_error: String,
}

impl Default for CrudMessages {
    fn default() -> Self {
        Self {
            save_success: "Saved successfully".to_string(),
            save_error: "Failed to save".to_string(),
            update_success: "Updated successfully".to_string(),
            update_error: "Failed to update".to_string(),
            delete_success: "Deleted successfully".to_string(),
            delete_error: "Failed to delete".to_string(),
            restore_success: "Restored successfully".to_string(),
            restore_error: "Failed to restore".to_string(),
            validation_error: "Please fix validation errors".to_string(),
        }
    }
}

/// CRUD manager configuration.
#[derive(Clone, Debug)]
pub struct CrudConfig<R> {
    /// Form mode.
    pub mode: CrudMode,
    /// Record being edited or shown.
    pub entity: Option<R>,
    /// Keep the form dirty after a create ("save and add another").
    pub additional_save: bool,
    /// Reject every save and update.
    pub read_only: bool,
    /// Relations sent as `_with`.
    pub with: Vec<String>,
    /// Notification texts.
    pub messages: CrudMessages,
}

impl<R> Default for CrudConfig<R> {
    fn default() -> Self {
        Self {
            mode: CrudMode::Create,
            entity: None,
            additional_save: false,
            read_only: false,
            with: Vec::new(),
            messages: CrudMessages::default(),
        }
    }
}

/// Rewrites form values before they are submitted.
pub type BeforeHook<V> = Arc<dyn Fn(V) -> V + Send + Sync>;
/// Observes a saved record.
pub type RecordHook<R> = Arc<dyn Fn(&R) + Send + Sync>;
/// Observes a failure.
pub type FailureHook = Arc<dyn Fn(&ClientError) + Send + Sync>;

/// Optional CRUD callbacks.
pub struct CrudHooks<R, V> {
    /// Before a create.
    pub before_save: Option<BeforeHook<V>>,
    /// After a create.
    pub after_save: Option<RecordHook<R>>,
    /// Before an update.
    pub before_update: Option<BeforeHook<V>>,
    /// After an update.
    pub after_update: Option<RecordHook<R>>,
    /// After any successful create or update.
    pub on_success: Option<RecordHook<R>>,
    /// After any failed request.
    pub on_error: Option<FailureHook>,
}

impl<R, V> Default for CrudHooks<R, V> {
    fn default() -> Self {
        Self {
            before_save: None,
            after_save: None,
            before_update: None,
            after_update: None,
            on_success: None,
            on_error: None,
        }
    }
}

impl<R, V> Clone for CrudHooks<R, V> {
    fn clone(&self) -> Self {
        Self {
            before_save: self.before_save.clone(),
            after_save: self.after_save.clone(),
            before_update: self.before_update.clone(),
            after_update: self.after_update.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

#[derive(Clone, Copy)]
enum Submit {
    Save,
    Update,
}

/// Form lifecycle for creating, editing, deleting, and restoring one record type.
pub struct CrudManager<S: CrudSource> {
    source: S,
    config: CrudConfig<S::Record>,
    hooks: CrudHooks<S::Record, S::Form>,
    validators: Validators<S::Form>,
    notifier: Arc<dyn Notifier>,
    store: Option<SharedStore<S::Record>>,
    form: Mutex<FormState<S::Form>>,
    selects: Mutex<CatalogResponse>,
    loading_selects: Mutex<bool>,
}

impl<S: CrudSource> std::fmt::Debug for CrudManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrudManager")
            .field("mode", &self.config.mode)
            .field("read_only", &self.config.read_only)
            .field("validators", &self.validators)
            .finish_non_exhaustive()
    }
}

impl<S: CrudSource> CrudManager<S> {
    /// Manager with empty form values and no validators.
    #[must_use]
    pub fn new(source: S, config: CrudConfig<S::Record>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            source,
            config,
            hooks: CrudHooks::default(),
            validators: Validators::new(),
            notifier,
            store: None,
            form: Mutex::new(FormState::default()),
            selects: Mutex::new(CatalogResponse::new()),
            loading_selects: Mutex::new(false),
        }
    }

    /// Start the form from `values`.
    #[must_use]
    pub fn with_values(self, values: S::Form) -> Self {
        self.lock_form().reset(values);
        self
    }

    /// Register field validators.
    #[must_use]
    pub fn with_validators(mut self, validators: Validators<S::Form>) -> Self {
        self.validators = validators;
        self
    }

    /// Register callbacks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: CrudHooks<S::Record, S::Form>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Reconcile successful saves and updates into `store`.
    #[must_use]
    pub fn with_store(mut self, store: SharedStore<S::Record>) -> Self {
        self.store = Some(store);
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CrudConfig<S::Record> {
        &self.config
    }

    /// Snapshot of the form.
    #[must_use]
    pub fn form(&self) -> FormState<S::Form> {
        self.lock_form().clone()
    }

    /// Current form values.
    #[must_use]
    pub fn values(&self) -> S::Form {
        self.lock_form().values.clone()
    }

    /// Current field errors.
    #[must_use]
    pub fn errors(&self) -> FieldErrors {
        self.lock_form().errors.clone()
    }

    /// Create a record from the form.
    ///
    /// # Errors
    /// Returns [`ClientError::ReadOnly`], [`ClientError::Validation`] when local
    /// rules fail, or the source error after it has been reported.
    pub async fn save(&self) -> ClientResult<S::Record> {
        self.submit(Submit::Save).await
    }

    /// Update the edited record from the form.
    ///
    /// # Errors
    /// Same as [`CrudManager::save`], plus [`ClientError::Unsupported`] when no
    /// record id is known.
    pub async fn update(&self) -> ClientResult<S::Record> {
        self.submit(Submit::Update).await
    }

    /// Delete a record and report the outcome.
    ///
    /// # Errors
    /// Returns the source error after it has been reported.
    pub async fn delete(&self, id: &str) -> ClientResult<String> {
        match self.source.delete(id).await {
            Ok(deleted) => {
                self.notify(Notification::success(&self.config.messages.delete_success));
                Ok(deleted)
            }
            Err(error) => {
                self.report_failure(&error, &self.config.messages.delete_error);
                Err(error)
            }
        }
    }

    /// Restore a record and report the outcome.
    ///
    /// # Errors
    /// Returns the source error after it has been reported.
    pub async fn restore(&self, id: &str) -> ClientResult<S::Record> {
        match self.source.restore(id).await {
            Ok(record) => {
                self.notify(Notification::success(&self.config.messages.restore_success));
                Ok(record)
            }
            Err(error) => {
                self.report_failure(&error, &self.config.messages.restore_error);
                Err(error)
            }
        }
    }

    /// Load lookup lists and merge them into the cached selects.
    ///
    /// Failures are logged and yield an empty map.
    pub async fn load_selects(&self, request: &CatalogRequest) -> CatalogResponse {
        *self.lock_loading_selects() = true;
        let result = self.source.load_selects(request).await;
        *self.lock_loading_selects() = false;
        match result {
            Ok(data) => {
                self.lock_selects()
                    .extend(data.iter().map(|(k, v)| (k.clone(), v.clone())));
                data
            }
            Err(error) => {
                warn!(error = %error, "failed to load selects");
                CatalogResponse::new()
            }
        }
    }

    /// Cached lookup lists.
    #[must_use]
    pub fn selects(&self) -> CatalogResponse {
        self.lock_selects().clone()
    }

    /// Whether a lookup-list request is in flight.
    #[must_use]
    pub fn is_loading_selects(&self) -> bool {
        *self.lock_loading_selects()
    }

    /// Edit values in place.
    pub fn set_value(&self, edit: impl FnOnce(&mut S::Form)) {
        self.lock_form().set_value(edit);
    }

    /// Replace all values.
    pub fn set_values(&self, values: S::Form) {
        self.lock_form().set_values(values);
    }

    /// Set one error on `field`.
    pub fn set_error(&self, field: &str, message: &str) {
        self.lock_form().set_error(field, message);
    }

    /// Clear every field error.
    pub fn clear_errors(&self) {
        self.lock_form().clear_errors();
    }

    /// Mark `field` as touched.
    pub fn touch(&self, field: &str) {
        self.lock_form().touch(field);
    }

    /// Mark every form field as touched.
    pub fn touch_all(&self) {
        self.lock_form().touch_all(S::Form::field_names());
    }

    /// Start over from `values`, or from empty values.
    pub fn reset(&self, values: Option<S::Form>) {
        self.lock_form().reset(values.unwrap_or_default());
    }

    /// Keep values, forget interaction state.
    pub fn pristine(&self) {
        self.lock_form().pristine();
    }

    /// Run every rule and replace the field errors. Returns whether the form is valid.
    pub fn validate(&self) -> bool {
        let mut form = self.lock_form();
        let errors = self.validators.validate(&form.values);
        let valid = errors.is_empty();
        form.set_errors(errors);
        valid
    }

    /// Run the rules for `field` and update only its errors.
    pub fn validate_field(&self, field: &str) -> bool {
        let mut form = self.lock_form();
        let messages = self.validators.validate_field(&form.values, field);
        if messages.is_empty() {
            form.errors.remove(field);
            true
        } else {
            form.errors.insert(field.to_string(), messages);
            false
        }
    }

    /// Form is editing an existing record.
    #[must_use]
    pub fn is_edit(&self) -> bool {
        self.config.mode == CrudMode::Edit
    }

    /// Form is creating a record.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.config.mode == CrudMode::Create
    }

    /// Form is showing a record.
    #[must_use]
    pub fn is_detail(&self) -> bool {
        self.config.mode == CrudMode::Detail
    }

    /// Submit is allowed right now.
    #[must_use]
    pub fn can_save(&self) -> bool {
        let form = self.lock_form();
        !self.config.read_only && form.is_valid() && !form.is_saving
    }

    async fn submit(&self, kind: Submit) -> ClientResult<S::Record> {
        if self.config.read_only {
            return Err(ClientError::ReadOnly);
        }
        let target_id = match kind {
            Submit::Save => None,
            Submit::Update => Some(self.target_id().ok_or(ClientError::Unsupported {
                operation: "update without a record id",
            })?),
        };

        let values = self.begin_submit()?;
        let before = match kind {
            Submit::Save => self.hooks.before_save.as_ref(),
            Submit::Update => self.hooks.before_update.as_ref(),
        };
        let mut values = match before {
            Some(hook) => hook(values),
            None => values,
        };
        if values.id().is_none_or(str::is_empty) {
            values.clear_id();
        }

        self.put_store_saving(true);
        let result = match &target_id {
            None => self.source.create(&values, &self.config.with).await,
            Some(id) => {
                self.source
                    .update(id, &values, self.config.entity.as_ref(), &self.config.with)
                    .await
            }
        };
        self.lock_form().is_saving = false;
        self.put_store_saving(false);

        let messages = &self.config.messages;
        match result {
            Ok(record) => {
                let (success, after) = match kind {
                    Submit::Save => (&messages.save_success, self.hooks.after_save.as_ref()),
                    Submit::Update => (&messages.update_success, self.hooks.after_update.as_ref()),
                };
                self.notify(Notification::success(success));
                if let Some(after) = after {
                    after(&record);
                }
                if let Some(on_success) = &self.hooks.on_success {
                    on_success(&record);
                }
                self.reconcile(kind, &record);
                if matches!(kind, Submit::Update) || !self.config.additional_save {
                    self.lock_form().pristine();
                }
                debug!(id = record.id(), "record saved");
                Ok(record)
            }
            Err(error) => {
                let title = match kind {
                    Submit::Save => &messages.save_error,
                    Submit::Update => &messages.update_error,
                };
                self.report_failure(&error, title);
                Err(error)
            }
        }
    }

    /// Mark submitted, validate, and flip `is_saving` when the form passes.
    fn begin_submit(&self) -> ClientResult<S::Form> {
        let mut form = self.lock_form();
        form.submitted = true;
        let errors = self.validators.validate(&form.values);
        form.set_errors(errors.clone());
        if !errors.is_empty() {
            drop(form);
            self.notify(Notification::error(&self.config.messages.validation_error));
            return Err(ClientError::Validation { errors });
        }
        form.is_saving = true;
        Ok(form.values.clone())
    }

    fn target_id(&self) -> Option<String> {
        self.config
            .entity
            .as_ref()
            .map(|entity| entity.id().to_string())
            .or_else(|| self.lock_form().values.id().map(str::to_string))
            .filter(|id| !id.is_empty())
    }

    fn reconcile(&self, kind: Submit, record: &S::Record) {
        let Some(store) = &self.store else {
            return;
        };
        store.update(|store| match kind {
            Submit::Save => {
                store.add_entity(record.clone());
                store.put_not_found(false);
            }
            Submit::Update => {
                store.update_entity(<S::Record as Entity>::Patch::from(record.clone()));
            }
        });
    }

    fn report_failure(&self, error: &ClientError, title: &str) {
        let server_errors = match error {
            ClientError::Api(api) => api.field_errors(),
            _ => None,
        };
        if let Some(errors) = server_errors {
            let description = errors
                .iter()
                .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
                .collect::<Vec<_>>()
                .join("\n");
            self.lock_form().set_errors(errors);
            self.notify(
                Notification::error(&self.config.messages.validation_error)
                    .with_description(description),
            );
        } else {
            self.notify(Notification::error(title).with_description(error.user_message()));
        }
        warn!(error = %error, "{title}");
        if let Some(on_error) = &self.hooks.on_error {
            on_error(error);
        }
    }

    fn put_store_saving(&self, saving: bool) {
        if let Some(store) = &self.store {
            store.update(|store| store.put_saving(saving));
        }
    }

    fn notify(&self, notification: Notification) {
        self.notifier.notify(notification);
    }

    fn lock_form(&self) -> MutexGuard<'_, FormState<S::Form>> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_selects(&self) -> MutexGuard<'_, CatalogResponse> {
        self.selects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_loading_selects(&self) -> MutexGuard<'_, bool> {
        self.loading_selects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
