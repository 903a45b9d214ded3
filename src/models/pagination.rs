//! Pagination types for list queries
//!
//! Lists are requested with `page` (1-indexed) and `limit`, and answered in
//! the `{count, next, previous, results}` envelope built by the API layer.

use serde::{Deserialize, Serialize};

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { page: 1, per_page: 6 }
    }
}

impl ListParams {
    /// Create new pagination parameters, clamping `per_page` to `1..=max`
    pub fn new(page: u32, per_page: u32, max: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, max.max(1)),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        let total = self.total.max(0) as u64;
        total.div_ceil(self.per_page as u64) as u32
    }

    /// Check if there is a next page
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Check if there is a previous page
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Transform the items, keeping pagination metadata
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params_clamps() {
        let params = ListParams::new(0, 500, 100);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);

        let params = ListParams::new(3, 0, 100);
        assert_eq!(params.per_page, 1);
        assert_eq!(params.offset(), 2);
    }

    #[test]
    fn test_offset() {
        let params = ListParams::new(3, 6, 100);
        assert_eq!(params.offset(), 12);
        assert_eq!(params.limit(), 6);
    }

    #[test]
    fn test_paged_result_navigation() {
        let params = ListParams::new(2, 6, 100);
        let result = PagedResult::new(vec![1, 2, 3], 15, &params);

        assert_eq!(result.total_pages(), 3);
        assert!(result.has_next());
        assert!(result.has_prev());

        let last = PagedResult::new(vec![1], 13, &ListParams::new(3, 6, 100));
        assert!(!last.has_next());
    }

    #[test]
    fn test_map_keeps_metadata() {
        let result = PagedResult::new(vec![1, 2], 8, &ListParams::new(1, 2, 100)).map(|n| n * 10);
        assert_eq!(result.items, vec![10, 20]);
        assert_eq!(result.total, 8);
        assert_eq!(result.per_page, 2);
    }
}
