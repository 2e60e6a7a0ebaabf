//! Search, filter, and sort params plus their query-string encoding.
//!
//! # Design
//! - Search params are transient and rebuilt into a [`ListQuery`] before every fetch.
//! - Empty collections and blank searches are omitted from the wire form.
//! - GET requests use bracket notation (`filters[0][field]=name`); POST bodies send the JSON form.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Closed set of filter operators understood by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    /// `=`
    #[serde(rename = "=")]
    Eq,
    /// `!=`
    #[serde(rename = "!=")]
    NotEq,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Gte,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Lte,
    /// `like`
    #[serde(rename = "like")]
    Like,
    /// `not_like`
    #[serde(rename = "not_like")]
    NotLike,
    /// `in`
    #[serde(rename = "in")]
    In,
    /// `not_in`
    #[serde(rename = "not_in")]
    NotIn,
    /// `between`
    #[serde(rename = "between")]
    Between,
    /// `is_null`
    #[serde(rename = "is_null")]
    IsNull,
    /// `is_not_null`
    #[serde(rename = "is_not_null")]
    IsNotNull,
}

impl FilterOperator {
    const ALL: [Self; 13] = [
        Self::Eq,
        Self::NotEq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Like,
        Self::NotLike,
        Self::In,
        Self::NotIn,
        Self::Between,
        Self::IsNull,
        Self::IsNotNull,
    ];

    /// Wire representation of the operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Between => "between",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == trimmed)
            .ok_or_else(|| format!("unknown filter operator '{trimmed}'"))
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Wire representation of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction '{other}'")),
        }
    }
}

/// Single field filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Field the filter applies to.
    pub field: String,
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Comparison value.
    pub value: Value,
    /// Optional backend type hint.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl QueryFilter {
    /// Equality filter, the shape produced by bulk filter assignment.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Filter with an explicit operator.
    #[must_use]
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            kind: None,
        }
    }
}

/// Single sort entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySort {
    /// Field to sort by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl QuerySort {
    /// Build a sort entry.
    #[must_use]
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parse `field`, `field,dir`, or `field:dir`.
    ///
    /// # Errors
    /// Returns an error when the field is blank or the direction is unknown.
    pub fn parse(token: &str) -> Result<Self, String> {
        let (field, direction) = token
            .split_once([',', ':'])
            .map_or((token, None), |(field, dir)| (field, Some(dir)));
        let field = field.trim();
        if field.is_empty() {
            return Err("sort field must not be empty".to_string());
        }
        let direction = direction.map_or(Ok(SortDirection::Asc), str::parse)?;
        Ok(Self::new(field, direction))
    }
}

/// Free-text search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    /// Search text.
    pub value: String,
    /// Whether matching is case-sensitive.
    #[serde(default)]
    pub case_sensitive: bool,
}

impl Search {
    /// Case-insensitive search for `value`.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            case_sensitive: false,
        }
    }
}

/// Named backend scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope name.
    pub name: String,
    /// Scope parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<String>,
}

/// Relation to eager-load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Include {
    /// Relation name.
    pub relation: String,
    /// Filters applied to the relation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<QueryFilter>,
}

/// Relation aggregate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Relation name.
    pub relation: String,
    /// Aggregate type (`count`, `sum`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Filters applied before aggregation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<QueryFilter>,
}

/// Search/filter/sort state held by a list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Free-text search, `None` when cleared.
    #[serde(default)]
    pub search: Option<Search>,
    /// Field filters.
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    /// Sort entries; the first one is primary.
    #[serde(default)]
    pub sort: Vec<QuerySort>,
    /// Backend scopes.
    #[serde(default)]
    pub scopes: Vec<Scope>,
    /// Eager-loaded relations.
    #[serde(default)]
    pub includes: Vec<Include>,
    /// Relation aggregates.
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
}

impl SearchParams {
    /// Params sorted by `sort` and nothing else.
    #[must_use]
    pub fn sorted_by(sort: QuerySort) -> Self {
        Self {
            sort: vec![sort],
            ..Self::default()
        }
    }

    /// Replace or append a filter keyed by field.
    pub fn upsert_filter(&mut self, filter: QueryFilter) {
        if let Some(existing) = self.filters.iter_mut().find(|f| f.field == filter.field) {
            *existing = filter;
        } else {
            self.filters.push(filter);
        }
    }

    /// Drop filters on `field`.
    pub fn remove_filter(&mut self, field: &str) {
        self.filters.retain(|filter| filter.field != field);
    }

    /// Active search text, trimmed; `None` when blank.
    #[must_use]
    pub fn search_value(&self) -> Option<&str> {
        self.search
            .as_ref()
            .map(|search| search.value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Fully built list request (pagination plus search params plus overrides).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ListQuery {
    /// One-based page.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Free-text search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<Search>,
    /// Field filters.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<QueryFilter>,
    /// Sort entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<QuerySort>,
    /// Backend scopes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<Scope>,
    /// Eager-loaded relations.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<Include>,
    /// Relation aggregates.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aggregates: Vec<Aggregate>,
    /// Resource-specific overrides merged into the top level.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ListQuery {
    /// Query for `page` with `limit` rows and no search params.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit,
            ..Self::default()
        }
    }

    /// Apply search params; blank searches and empty collections are dropped.
    #[must_use]
    pub fn with_params(mut self, params: &SearchParams) -> Self {
        self.merge(params);
        self
    }

    /// Add resource-specific top-level overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Value>) -> Self {
        self.extra
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Merge `params` over the current query. Non-empty values replace existing ones.
    pub fn merge(&mut self, params: &SearchParams) {
        if let Some(value) = params.search_value() {
            self.search = Some(Search {
                value: value.to_string(),
                case_sensitive: params
                    .search
                    .as_ref()
                    .is_some_and(|search| search.case_sensitive),
            });
        }
        if !params.filters.is_empty() {
            self.filters.clone_from(&params.filters);
        }
        if !params.sort.is_empty() {
            self.sort.clone_from(&params.sort);
        }
        if !params.scopes.is_empty() {
            self.scopes.clone_from(&params.scopes);
        }
        if !params.includes.is_empty() {
            self.includes.clone_from(&params.includes);
        }
        if !params.aggregates.is_empty() {
            self.aggregates.clone_from(&params.aggregates);
        }
    }

    /// JSON form used as a POST body.
    #[must_use]
    pub fn to_body(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Bracket-notation pairs for GET requests (`search[value]`, `filters[0][field]`, ...).
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        bracket_pairs(&self.to_body())
    }
}

/// Flatten a JSON object into bracket-notation query pairs.
///
/// Non-object values produce no pairs; `null` leaves become empty strings.
#[must_use]
pub fn bracket_pairs(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Value::Object(map) = value {
        for (key, inner) in map {
            flatten_into(key, inner, &mut pairs);
        }
    }
    pairs
}

fn flatten_into(prefix: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                flatten_into(&format!("{prefix}[{key}]"), inner, pairs);
            }
        }
        Value::Array(items) => {
            for (index, inner) in items.iter().enumerate() {
                flatten_into(&format!("{prefix}[{index}]"), inner, pairs);
            }
        }
        Value::String(text) => pairs.push((prefix.to_string(), text.clone())),
        Value::Null => pairs.push((prefix.to_string(), String::new())),
        Value::Bool(_) | Value::Number(_) => pairs.push((prefix.to_string(), value.to_string())),
    }
}
