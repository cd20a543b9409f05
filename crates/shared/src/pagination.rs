//! Offset-based pagination utilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of rows per page when the caller does not specify one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on rows per page for listing operations.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Error type for pagination parameters.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("Page must be at least 1, got {0}")]
    InvalidPage(u32),
    #[error("Page size must be between 1 and {max}, got {size}")]
    InvalidPageSize { size: u32, max: u32 },
}

/// A validated page request.
///
/// Pages are 1-based: `offset = (page - 1) * page_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Validate `page` and `page_size` against `max_page_size`.
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Result<Self, PaginationError> {
        if page < 1 {
            return Err(PaginationError::InvalidPage(page));
        }
        if page_size < 1 || page_size > max_page_size {
            return Err(PaginationError::InvalidPageSize {
                size: page_size,
                max: max_page_size,
            });
        }
        Ok(Self { page, page_size })
    }

    /// First page with the given size, capped at [`MAX_PAGE_SIZE`].
    pub fn first(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Maximum number of rows to return.
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Computes `ceil(total / page_size)`. A zero page size yields zero pages.
pub fn total_pages(total: i64, page_size: u32) -> u32 {
    if total <= 0 || page_size == 0 {
        return 0;
    }
    let total = total as u64;
    let size = u64::from(page_size);
    total.div_ceil(size).min(u64::from(u32::MAX)) as u32
}

/// Pagination metadata returned alongside a page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PageInfo {
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl PageInfo {
    pub fn new(request: PageRequest, total: i64) -> Self {
        Self {
            page: request.page(),
            page_size: request.page_size(),
            total,
            total_pages: total_pages(total, request.page_size()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_for_second_page() {
        let req = PageRequest::new(2, 10, MAX_PAGE_SIZE).unwrap();
        assert_eq!(req.offset(), 10);
        assert_eq!(req.limit(), 10);
    }

    #[test]
    fn test_first_page_has_zero_offset() {
        let req = PageRequest::new(1, 25, MAX_PAGE_SIZE).unwrap();
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_page_zero_rejected() {
        assert_eq!(
            PageRequest::new(0, 10, MAX_PAGE_SIZE),
            Err(PaginationError::InvalidPage(0))
        );
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(PageRequest::new(1, 0, MAX_PAGE_SIZE).is_err());
        assert!(PageRequest::new(1, MAX_PAGE_SIZE, MAX_PAGE_SIZE).is_ok());
        assert_eq!(
            PageRequest::new(1, MAX_PAGE_SIZE + 1, MAX_PAGE_SIZE),
            Err(PaginationError::InvalidPageSize {
                size: MAX_PAGE_SIZE + 1,
                max: MAX_PAGE_SIZE
            })
        );
    }

    #[test]
    fn test_first_clamps_page_size() {
        assert_eq!(PageRequest::first(0).page_size(), 1);
        assert_eq!(PageRequest::first(10_000).page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(12, 10), 2);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_page_info_serialization() {
        let info = PageInfo::new(PageRequest::new(2, 10, MAX_PAGE_SIZE).unwrap(), 12);
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"total\":12"));
        assert!(json.contains("\"total_pages\":2"));
    }
}
