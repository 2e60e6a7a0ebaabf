//! Lookup-list (`/selects`) request and response types.
//!
//! # Design
//! - One request fetches several lookup lists keyed by catalog type.
//! - Every requested type is present in the decoded response, empty when the server omits it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// Per-catalog query options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogParams {
    /// Sort key (`name`, `-name`).
    #[serde(rename = "_sort", default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Maximum rows.
    #[serde(rename = "_limit", default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Free-text search.
    #[serde(rename = "_search", default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Equality filters.
    #[serde(rename = "_filters", default, skip_serializing_if = "Map::is_empty")]
    pub filters: Map<String, Value>,
}

/// Lookup lists to fetch, keyed by catalog type.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CatalogRequest {
    entries: BTreeMap<String, CatalogParams>,
}

impl CatalogRequest {
    /// Empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `catalog` with `params`.
    #[must_use]
    pub fn with(mut self, catalog: impl Into<String>, params: CatalogParams) -> Self {
        self.entries.insert(catalog.into(), params);
        self
    }

    /// Requested catalog types.
    pub fn catalog_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One lookup-list entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Entry id.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// URL-safe key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Whether the entry is active.
    #[serde(
        default,
        deserialize_with = "optional_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_active: Option<bool>,
    /// Remaining attributes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Decoded lookup lists keyed by catalog type.
pub type CatalogResponse = BTreeMap<String, Vec<CatalogItem>>;

/// Decode a `/selects` payload (`{data: {...}}` or a bare object).
///
/// Non-array entries are skipped.
///
/// # Errors
/// Returns [`CoreError::Decode`] when the payload is not an object or an item is malformed.
pub fn decode_catalogs(request: &CatalogRequest, payload: Value) -> CoreResult<CatalogResponse> {
    let body = match payload {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    let Value::Object(map) = body else {
        return Err(CoreError::decode("catalog response", "expected an object"));
    };

    let mut catalogs: CatalogResponse = request
        .catalog_types()
        .map(|name| (name.to_string(), Vec::new()))
        .collect();
    for (name, items) in map {
        if !items.is_array() {
            continue;
        }
        let items: Vec<CatalogItem> = serde_json::from_value(items)
            .map_err(|err| CoreError::decode("catalog response", err.to_string()))?;
        catalogs.insert(name, items);
    }
    Ok(catalogs)
}

/// Find an entry by id in a decoded catalog.
#[must_use]
pub fn find_by_id<'a>(catalogs: &'a CatalogResponse, catalog: &str, id: &str) -> Option<&'a CatalogItem> {
    catalogs.get(catalog)?.iter().find(|item| item.id == id)
}

/// Find an entry by slug in a decoded catalog.
#[must_use]
pub fn find_by_slug<'a>(
    catalogs: &'a CatalogResponse,
    catalog: &str,
    slug: &str,
) -> Option<&'a CatalogItem> {
    catalogs
        .get(catalog)?
        .iter()
        .find(|item| item.slug.as_deref() == Some(slug))
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Optional id that may arrive as a string or a number; `null` maps to `None`.
pub(crate) fn optional_string_or_number<'de, D>(
    deserializer: D,
) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        Value::Number(number) => Ok(Some(number.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Optional flag sent as a boolean, `0`/`1`, or their string forms.
pub(crate) fn optional_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let flag = match &value {
        Value::Null => return Ok(None),
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(text) => match text.trim() {
            "0" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        _ => None,
    };
    flag.map(Some).ok_or_else(|| {
        serde::de::Error::custom(format!("expected boolean or 0/1 flag, got {value}"))
    })
}
