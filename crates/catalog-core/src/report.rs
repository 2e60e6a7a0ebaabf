//! Spreadsheet report requests and downloaded files.
//!
//! # Design
//! - The filename comes from the request `_title`, then `Content-Disposition`, then a default.
//! - Names are reduced to a safe character set before touching the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// Filename used when neither the request nor the response names the file.
pub const DEFAULT_REPORT_NAME: &str = "report.xlsx";
const REPORT_EXTENSION: &str = "xlsx";

/// Body posted to the report endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportRequest {
    /// Preferred filename (without extension).
    #[serde(rename = "_title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Report-specific parameters, flattened into the body.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ReportRequest {
    /// Request titled `title`.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            params: Map::new(),
        }
    }

    /// Add a report parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Downloaded report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportFile {
    /// Sanitized filename.
    pub filename: String,
    /// Response content type.
    pub content_type: Option<String>,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

impl ReportFile {
    /// Write the report into `dir` and return the full path.
    ///
    /// # Errors
    /// Returns an error when the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> CoreResult<PathBuf> {
        let path = dir.join(&self.filename);
        fs::write(&path, &self.bytes).map_err(|source| CoreError::Storage {
            operation: "report.write",
            source,
        })?;
        Ok(path)
    }
}

/// Pick and sanitize the report filename.
#[must_use]
pub fn report_filename(title: Option<&str>, content_disposition: Option<&str>) -> String {
    title
        .filter(|value| !value.trim().is_empty())
        .map(sanitize_filename)
        .or_else(|| {
            content_disposition
                .and_then(disposition_filename)
                .map(|value| sanitize_filename(&value))
        })
        .filter(|value| !value.is_empty())
        .map_or_else(|| DEFAULT_REPORT_NAME.to_string(), ensure_extension)
}

/// Extract `filename` from a `Content-Disposition` header value.
#[must_use]
pub fn disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value.trim().trim_matches('"');
                let encoded = encoded
                    .split_once("''")
                    .map_or(encoded, |(_, rest)| rest);
                let decoded: String = url::form_urlencoded::parse(
                    format!("v={}", encoded.replace('+', "%2B")).as_bytes(),
                )
                .map(|(_, v)| v.into_owned())
                .collect();
                if !decoded.is_empty() {
                    return Some(decoded);
                }
            }
            "filename" => plain = Some(value.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }
    plain.filter(|value| !value.is_empty())
}

/// Reduce a name to ASCII letters, digits, `-`, `_`, and `.`.
///
/// Path separators and other characters become `_`; leading dots are dropped.
#[must_use]
pub fn sanitize_filename(raw: &str) -> String {
    let replaced: String = raw
        .trim()
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => ch,
            _ => '_',
        })
        .collect();
    replaced.trim_start_matches('.').to_string()
}

fn ensure_extension(name: String) -> String {
    if Path::new(&name).extension().is_some() {
        name
    } else {
        format!("{name}.{REPORT_EXTENSION}")
    }
}
