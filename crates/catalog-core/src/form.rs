//! Form values, field errors, and client-declared validators.
//!
//! # Design
//! - Values stay in the caller's own form type; the state only tracks status.
//! - `is_dirty` is a flag raised by edits and cleared by `pristine`/`reset`,
//!   not a comparison against the initial values.
//! - Validators are registered per field and return the first failing message.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Field name to error messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Form payload handled by a CRUD manager.
pub trait FormValues: Clone + Default + Send + Sync + 'static {
    /// Id of the record being edited; `None` or empty for creates.
    fn id(&self) -> Option<&str>;

    /// Remove the id so a create does not send one.
    fn clear_id(&mut self);

    /// Every field name, used by `touch_all`.
    fn field_names() -> &'static [&'static str];
}

/// Validator for one field; `Some(message)` marks the field invalid.
pub type FieldValidator<V> = Arc<dyn Fn(&V) -> Option<String> + Send + Sync>;

/// Ordered set of field validators.
pub struct Validators<V> {
    rules: Vec<(String, FieldValidator<V>)>,
}

impl<V> Clone for Validators<V> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<V> Default for Validators<V> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<V> fmt::Debug for Validators<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|(field, _)| field))
            .finish()
    }
}

impl<V> Validators<V> {
    /// Empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator for `field`.
    #[must_use]
    pub fn rule<F>(mut self, field: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&V) -> Option<String> + Send + Sync + 'static,
    {
        self.rules.push((field.into(), Arc::new(validator)));
        self
    }

    /// Run every rule and collect failures by field.
    #[must_use]
    pub fn validate(&self, values: &V) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, validator) in &self.rules {
            if let Some(message) = validator(values) {
                errors.entry(field.clone()).or_default().push(message);
            }
        }
        errors
    }

    /// Run the rules registered for `field`.
    #[must_use]
    pub fn validate_field(&self, values: &V, field: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|(name, _)| name == field)
            .filter_map(|(_, validator)| validator(values))
            .collect()
    }

    /// Whether no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Form values plus edit and submission status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormState<V> {
    /// Current values.
    pub values: V,
    /// Field errors from local validation or the server.
    pub errors: FieldErrors,
    /// Fields the user has interacted with.
    pub touched: BTreeSet<String>,
    /// A submit has been attempted.
    pub submitted: bool,
    /// Values changed since the last pristine point.
    pub is_dirty: bool,
    /// A save or update is in flight.
    pub is_saving: bool,
}

impl<V: Default> Default for FormState<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V> FormState<V> {
    /// Pristine state holding `values`.
    #[must_use]
    pub fn new(values: V) -> Self {
        Self {
            values,
            errors: FieldErrors::new(),
            touched: BTreeSet::new(),
            submitted: false,
            is_dirty: false,
            is_saving: false,
        }
    }

    /// No field currently carries an error.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Edit values in place and mark the form dirty.
    pub fn set_value(&mut self, edit: impl FnOnce(&mut V)) {
        edit(&mut self.values);
        self.is_dirty = true;
    }

    /// Replace all values and mark the form dirty.
    pub fn set_values(&mut self, values: V) {
        self.values = values;
        self.is_dirty = true;
    }

    /// Set a single error on `field`, replacing earlier ones.
    pub fn set_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), vec![message.into()]);
    }

    /// Replace every field error.
    pub fn set_errors(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }

    /// Clear all field errors.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Error messages for `field`.
    #[must_use]
    pub fn field_errors(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Mark `field` as touched.
    pub fn touch(&mut self, field: impl Into<String>) {
        self.touched.insert(field.into());
    }

    /// Mark every listed field as touched.
    pub fn touch_all(&mut self, fields: &[&str]) {
        self.touched
            .extend(fields.iter().map(|field| (*field).to_string()));
    }

    /// Keep values, forget interaction state.
    pub fn pristine(&mut self) {
        self.touched.clear();
        self.submitted = false;
        self.is_dirty = false;
    }

    /// Start over from `values`.
    pub fn reset(&mut self, values: V) {
        *self = Self::new(values);
    }
}

/// Fails when `value` is blank after trimming.
#[must_use]
pub fn required(value: &str, message: &str) -> Option<String> {
    value.trim().is_empty().then(|| message.to_string())
}

/// Fails when a non-blank `value` is not an integer `>= 0`.
#[must_use]
pub fn non_negative_integer(value: &str, message: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<u32>().is_err().then(|| message.to_string())
}
