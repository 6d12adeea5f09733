//! Pagination types for list endpoints.
//!
//! Reporting uses 1-based page numbers; the response echoes the window
//! plus the total count so clients can render page controls.

use serde::{Deserialize, Serialize};

/// Query parameters for paginated list endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct PageQuery {
    /// 1-based page number (default: 1)
    #[serde(default)]
    pub page: Option<i64>,
    /// Maximum number of items per page (default: 10, max: 1000)
    #[serde(default)]
    pub limit: Option<i64>,
}

impl PageQuery {
    /// Get the page number, minimum 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the limit, clamped to valid range
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 1000)
    }

    /// Rows to skip for the requested page
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Pagination metadata echoed in list responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    /// Total number of items across all pages
    pub total: i64,
    pub total_pages: i64,
}

impl PageInfo {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}
