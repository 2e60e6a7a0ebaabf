//! Pagination state and its derivation from list responses.
//!
//! # Design
//! - Server `meta` is authoritative when present.
//! - Without `meta`, totals are estimated from the returned row count. The
//!   estimate assumes another page exists whenever a full page came back, so
//!   it can over-report by one page and never knows the true total.

use serde::{Deserialize, Serialize};

/// Default page number.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size held by a fresh store.
pub const DEFAULT_LIMIT: u32 = 20;

/// Pagination snapshot held by an entity store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// One-based current page.
    pub page: u32,
    /// Requested page size.
    pub limit: u32,
    /// Total matching rows.
    pub total: u64,
    /// Number of pages.
    pub pages: u32,
    /// Page size reported by the server.
    pub per_page: u32,
    /// One-based index of the first row on this page.
    pub from: Option<u64>,
    /// One-based index of the last row on this page.
    pub to: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            total: 0,
            pages: 0,
            per_page: DEFAULT_LIMIT,
            from: None,
            to: None,
        }
    }
}

/// Server pagination metadata (`meta` in list envelopes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Current page.
    #[serde(default)]
    pub current_page: u32,
    /// Page size.
    #[serde(default)]
    pub per_page: u32,
    /// Total matching rows.
    #[serde(default)]
    pub total: u64,
    /// Last page number.
    #[serde(default)]
    pub last_page: Option<u32>,
    /// First row index on this page.
    #[serde(default)]
    pub from: Option<u64>,
    /// Last row index on this page.
    #[serde(default)]
    pub to: Option<u64>,
}

/// Partial pagination update; `None` leaves a field untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaginationPatch {
    /// New page.
    pub page: Option<u32>,
    /// New page size.
    pub limit: Option<u32>,
    /// New total.
    pub total: Option<u64>,
    /// New page count.
    pub pages: Option<u32>,
    /// New server page size.
    pub per_page: Option<u32>,
    /// New first-row index.
    pub from: Option<Option<u64>>,
    /// New last-row index.
    pub to: Option<Option<u64>>,
}

impl Pagination {
    /// Fresh pagination for `page` with `limit` rows.
    #[must_use]
    pub fn at(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit,
            per_page: limit,
            ..Self::default()
        }
    }

    /// Merge the fields present in `patch`.
    pub fn apply(&mut self, patch: PaginationPatch) {
        if let Some(page) = patch.page {
            self.page = page;
        }
        if let Some(limit) = patch.limit {
            self.limit = limit;
        }
        if let Some(total) = patch.total {
            self.total = total;
        }
        if let Some(pages) = patch.pages {
            self.pages = pages;
        }
        if let Some(per_page) = patch.per_page {
            self.per_page = per_page;
        }
        if let Some(from) = patch.from {
            self.from = from;
        }
        if let Some(to) = patch.to {
            self.to = to;
        }
    }

    /// Derive pagination from server metadata.
    ///
    /// `from`/`to` are computed from page and page size when the server omits
    /// them, with `to` clamped to `total`.
    #[must_use]
    pub fn from_meta(meta: &PaginationMeta, requested_page: u32, requested_limit: u32) -> Self {
        let page = if meta.current_page == 0 {
            requested_page.max(1)
        } else {
            meta.current_page
        };
        let per_page = if meta.per_page == 0 {
            requested_limit
        } else {
            meta.per_page
        };
        let pages = meta
            .last_page
            .unwrap_or_else(|| page_count(meta.total, per_page));
        let (from, to) = match (meta.from, meta.to) {
            (Some(from), Some(to)) => (Some(from), Some(to.min(meta.total))),
            _ => row_bounds(page, per_page, meta.total),
        };
        Self {
            page,
            limit: requested_limit,
            total: meta.total,
            pages,
            per_page,
            from,
            to,
        }
    }

    /// Best-effort estimate when the server sends no metadata.
    ///
    /// A full page implies at least one more page; a short page is the last one.
    #[must_use]
    pub fn estimate(page: u32, limit: u32, returned: usize) -> Self {
        let page = page.max(1);
        let returned = u64::try_from(returned).unwrap_or(u64::MAX);
        let offset = u64::from(page - 1) * u64::from(limit);
        let full_page = limit > 0 && returned >= u64::from(limit);
        let pages = if full_page { page.saturating_add(1) } else { page };
        let (from, to) = if returned == 0 {
            (None, None)
        } else {
            (Some(offset + 1), Some(offset + returned))
        };
        Self {
            page,
            limit,
            total: offset + returned,
            pages,
            per_page: limit,
            from,
            to,
        }
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.page < self.pages
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_prev_page(&self) -> bool {
        self.page > 1
    }
}

fn page_count(total: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX)
}

fn row_bounds(page: u32, per_page: u32, total: u64) -> (Option<u64>, Option<u64>) {
    let offset = u64::from(page.saturating_sub(1)) * u64::from(per_page);
    if total == 0 || offset >= total {
        return (None, None);
    }
    let to = (offset + u64::from(per_page)).min(total);
    (Some(offset + 1), Some(to))
}
