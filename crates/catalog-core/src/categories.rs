//! Category schema, form validation, and API mapping.
//!
//! # Design
//! - Form inputs stay as strings (`display_order` included) until the payload is built.
//! - The API speaks `is_active`/`position`; the console speaks `status`/`display_order`.
//! - Server-owned fields ride along in [`CategoryAudit`] so updates can preserve them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::catalog::{optional_flag, optional_string_or_number, string_or_number};
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::form::{FormValues, Validators, non_negative_integer, required};

/// REST path of the category resource.
pub const CATEGORY_PATH: &str = "/category";
/// Message for a blank name.
pub const NAME_REQUIRED: &str = "Name is required";
/// Message for a malformed color.
pub const INVALID_COLOR: &str = "Provide a valid hex color";
/// Message for a negative or non-integer display order.
pub const INVALID_DISPLAY_ORDER: &str = "Display order must be a whole number of zero or more";

const HEX_COLOR_PATTERN: &str = r"^#([0-9a-fA-F]{3}){1,2}$";

/// Category visibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    /// Shown to users.
    #[default]
    Active,
    /// Hidden from users.
    Inactive,
}

impl CategoryStatus {
    /// Wire/display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Map the API `is_active` flag.
    #[must_use]
    pub const fn from_active(is_active: bool) -> Self {
        if is_active { Self::Active } else { Self::Inactive }
    }

    /// Whether this is [`CategoryStatus::Active`].
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for CategoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown category status '{other}'")),
        }
    }
}

/// Server-owned category fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAudit {
    /// Creation timestamp.
    pub created_at: Option<String>,
    /// Last update timestamp.
    pub updated_at: Option<String>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<String>,
    /// Creator.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub user_created_id: Option<String>,
    /// Last editor.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub user_updated_id: Option<String>,
    /// Deleter.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub user_deleted_id: Option<String>,
    /// Restorer.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub user_restored_id: Option<String>,
    /// Raw `position` as sent by the API.
    pub position: Option<i64>,
    /// Search visibility flag.
    #[serde(default, deserialize_with = "optional_flag")]
    pub is_searchable: Option<bool>,
    /// Raw `is_active` as sent by the API.
    #[serde(default, deserialize_with = "optional_flag")]
    pub is_active: Option<bool>,
    /// Parent category.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub parent_id: Option<String>,
    /// Click behaviour key.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub click_action: Option<String>,
    /// Owning company.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub company_id: Option<String>,
    /// Owning country.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub country_id: Option<String>,
    /// Legacy title, used as the description fallback.
    pub title: Option<String>,
}

impl CategoryAudit {
    /// Parsed creation time.
    #[must_use]
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }

    /// Parsed update time.
    #[must_use]
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref())
    }

    /// Whether the record is soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.as_deref().is_some_and(|value| !value.is_empty())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|value| value.with_timezone(&Utc))
}

/// Category as shown in the console.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    /// Record id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description, falling back to the legacy title.
    pub description: String,
    /// Visibility.
    pub status: CategoryStatus,
    /// Hex color, empty when unset.
    pub color: String,
    /// Sort position.
    pub display_order: u32,
    /// Server-owned fields.
    pub audit: CategoryAudit,
}

#[derive(Deserialize)]
struct ApiCategory {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default, rename = "displayOrder")]
    display_order: Option<i64>,
    #[serde(flatten)]
    audit: CategoryAudit,
}

impl Category {
    /// Decode an API record.
    ///
    /// # Errors
    /// Returns [`CoreError::Decode`] when the record has no usable id or a field has the wrong type.
    pub fn from_api(value: Value) -> CoreResult<Self> {
        let raw: ApiCategory = serde_json::from_value(value)
            .map_err(|err| CoreError::decode("category", err.to_string()))?;
        if raw.id.is_empty() {
            return Err(CoreError::MissingField {
                subject: "category",
                field: "id",
            });
        }
        let description = raw
            .description
            .filter(|text| !text.is_empty())
            .or_else(|| raw.audit.title.clone())
            .unwrap_or_default();
        let display_order = raw
            .audit
            .position
            .filter(|position| *position != 0)
            .or(raw.display_order)
            .and_then(|position| u32::try_from(position).ok())
            .unwrap_or(0);
        Ok(Self {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            description,
            status: CategoryStatus::from_active(raw.audit.is_active.unwrap_or(false)),
            color: raw.color.unwrap_or_default(),
            display_order,
            audit: raw.audit,
        })
    }
}

/// Partial category update; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    /// Target record.
    pub id: String,
    /// New name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New status.
    pub status: Option<CategoryStatus>,
    /// New color.
    pub color: Option<String>,
    /// New display order.
    pub display_order: Option<u32>,
    /// Replacement server fields.
    pub audit: Option<CategoryAudit>,
}

impl From<Category> for CategoryPatch {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: Some(category.name),
            description: Some(category.description),
            status: Some(category.status),
            color: Some(category.color),
            display_order: Some(category.display_order),
            audit: Some(category.audit),
        }
    }
}

impl Entity for Category {
    type Patch = CategoryPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn patch_id(patch: &CategoryPatch) -> &str {
        &patch.id
    }

    fn apply_patch(&mut self, patch: CategoryPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(display_order) = patch.display_order {
            self.display_order = display_order;
        }
        if let Some(audit) = patch.audit {
            self.audit = audit;
        }
    }
}

/// Editable category form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategoryFormValues {
    /// Id of the record being edited.
    pub id: Option<String>,
    /// Name input.
    pub name: String,
    /// Description input.
    pub description: String,
    /// Status selector.
    pub status: CategoryStatus,
    /// Color input.
    pub color: String,
    /// Display order input, kept as typed.
    pub display_order: String,
}

impl CategoryFormValues {
    /// Prefill the form from an existing record.
    #[must_use]
    pub fn from_category(category: &Category) -> Self {
        Self {
            id: Some(category.id.clone()),
            name: category.name.clone(),
            description: category.description.clone(),
            status: category.status,
            color: category.color.clone(),
            display_order: category.display_order.to_string(),
        }
    }

    /// Parsed display order; blank or invalid input maps to zero.
    #[must_use]
    pub fn display_order_value(&self) -> u32 {
        self.display_order.trim().parse().unwrap_or(0)
    }

    /// Build the API payload.
    ///
    /// When `existing` is given, its ownership fields are carried over.
    #[must_use]
    pub fn to_api(&self, existing: Option<&Category>) -> Value {
        let color = self.color.trim();
        let mut payload = Map::new();
        payload.insert("name".to_string(), json!(self.name.trim()));
        payload.insert("description".to_string(), json!(self.description));
        payload.insert("is_active".to_string(), json!(self.status.is_active()));
        payload.insert(
            "color".to_string(),
            if color.is_empty() { Value::Null } else { json!(color) },
        );
        payload.insert("position".to_string(), json!(self.display_order_value()));
        if let Some(existing) = existing {
            let audit = &existing.audit;
            payload.insert("company_id".to_string(), json!(audit.company_id));
            payload.insert("country_id".to_string(), json!(audit.country_id));
            payload.insert("parent_id".to_string(), json!(audit.parent_id));
            payload.insert("is_searchable".to_string(), json!(audit.is_searchable));
            payload.insert("click_action".to_string(), json!(audit.click_action));
        }
        Value::Object(payload)
    }
}

impl FormValues for CategoryFormValues {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn field_names() -> &'static [&'static str] {
        &["name", "description", "status", "color", "display_order"]
    }
}

/// Field validators for the category form.
///
/// # Errors
/// Returns [`CoreError::Pattern`] if the color pattern fails to compile.
pub fn category_validators() -> CoreResult<Validators<CategoryFormValues>> {
    let hex = Regex::new(HEX_COLOR_PATTERN).map_err(|source| CoreError::Pattern { source })?;
    Ok(Validators::new()
        .rule("name", |values: &CategoryFormValues| {
            required(&values.name, NAME_REQUIRED)
        })
        .rule("color", move |values: &CategoryFormValues| {
            let color = values.color.trim();
            (!color.is_empty() && !hex.is_match(color)).then(|| INVALID_COLOR.to_string())
        })
        .rule("display_order", |values: &CategoryFormValues| {
            non_negative_integer(&values.display_order, INVALID_DISPLAY_ORDER)
        }))
}
