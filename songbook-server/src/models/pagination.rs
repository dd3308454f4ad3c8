//! Pagination types
//!
//! Query parameters arrive as raw strings so that a non-numeric `page` or
//! `size` surfaces as a parse error, which classifies as a bad request.

use serde::{Deserialize, Serialize};

/// Maximum items per page
const MAX_SIZE: u32 = 100;

/// Default items per page
const DEFAULT_SIZE: u32 = 10;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page (max 100)
    pub size: u32,
}

impl Pagination {
    /// Create pagination with validation.
    ///
    /// - Page is clamped to minimum of 1
    /// - Size is clamped to 1..=100
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size: size.clamp(1, MAX_SIZE),
        }
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.size as u64
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> u32 {
        self.size
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_SIZE,
        }
    }
}

/// Query parameters for pagination and ordering
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<String>,
    pub size: Option<String>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
}

impl TryFrom<&PaginationParams> for Pagination {
    type Error = std::num::ParseIntError;

    fn try_from(params: &PaginationParams) -> Result<Self, Self::Error> {
        let parse = |raw: Option<&str>, default: u32| match raw.map(str::trim) {
            None | Some("") => Ok(default),
            Some(value) => value.parse::<u32>(),
        };

        Ok(Self::new(
            parse(params.page.as_deref(), 1)?,
            parse(params.size.as_deref(), DEFAULT_SIZE)?,
        ))
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    /// Items for current page
    pub items: Vec<T>,
    /// Total count across all pages
    pub total: i64,
    /// Current page number
    pub page: u32,
    /// Items per page
    pub size: u32,
    pub total_pages: u32,
    pub has_more: bool,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, page: Pagination) -> Self {
        let total_pages = total_pages(total, page.size);
        Self {
            items,
            total,
            page: page.page,
            size: page.size,
            total_pages,
            has_more: page.page < total_pages,
        }
    }

    /// Convert the items, keeping the page metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            size: self.size,
            total_pages: self.total_pages,
            has_more: self.has_more,
        }
    }
}

fn total_pages(total: i64, size: u32) -> u32 {
    if total <= 0 {
        1
    } else {
        let size = size.max(1) as u64;
        ((total as u64 + size - 1) / size) as u32
    }
}
