//! Page/limit pagination for listing endpoints.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Raw `?page=&limit=` query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub fn default_page() -> i64 {
    DEFAULT_PAGE as i64
}
pub fn default_limit() -> i64 {
    DEFAULT_LIMIT as i64
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Validate raw query values.
    pub fn from_query(page: i64, limit: i64) -> Result<Self> {
        let page = u64::try_from(page)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| AppError::BadRequest("Page must be greater than 0".to_string()))?;
        let limit = u64::try_from(limit)
            .ok()
            .filter(|l| (1..=MAX_LIMIT).contains(l))
            .ok_or_else(|| {
                AppError::BadRequest(format!("Limit must be between 1 and {}", MAX_LIMIT))
            })?;

        // Reject pages whose offset would not fit in the storage range header
        if (page - 1).checked_mul(limit).is_none() {
            return Err(AppError::BadRequest(
                "Page number causes overflow".to_string(),
            ));
        }

        Ok(Self { page, limit })
    }

    /// Zero-based index of the first row on this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}

/// Pagination block returned alongside listed rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(request.limit),
        }
    }
}
