//! Limit/offset pagination for list queries.

use serde::{Deserialize, Serialize};

/// Limit/offset window applied to list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    /// Default page size for list endpoints.
    pub const DEFAULT_PER_PAGE: u32 = 50;

    /// Largest page size a caller may request.
    pub const MAX_PER_PAGE: u32 = 1000;

    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// A single window starting at the first row.
    pub fn first(limit: u32) -> Self {
        Self { limit, offset: 0 }
    }

    /// Builds a window from a 1-based page number.
    ///
    /// Page 0 is treated as page 1 and `per_page` is clamped to
    /// `1..=MAX_PER_PAGE`.
    pub fn page(page: u32, per_page: u32) -> Self {
        let per_page = per_page.clamp(1, Self::MAX_PER_PAGE);
        let page = page.max(1);
        Self {
            limit: per_page,
            offset: (page - 1).saturating_mul(per_page),
        }
    }

    pub fn limit_i64(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn offset_i64(&self) -> i64 {
        i64::from(self.offset)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::first(Self::DEFAULT_PER_PAGE)
    }
}
