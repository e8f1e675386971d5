//! Pagination types shared by list queries

use serde::{Deserialize, Serialize};

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        ((self.total as u64).div_ceil(self.per_page as u64)) as u32
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 1-based index range of the items on this page, `None` when empty
    pub fn item_range(&self) -> Option<(i64, i64)> {
        if self.items.is_empty() {
            return None;
        }
        let start = (self.page.saturating_sub(1) as i64) * self.per_page as i64 + 1;
        let end = start + self.items.len() as i64 - 1;
        Some((start, end))
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_params_are_clamped() {
        let params = ListParams::new(0, 500);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_item_range_for_last_partial_page() {
        let params = ListParams::new(3, 12);
        let result = PagedResult::new(vec![1, 2, 3], 27, &params);
        assert_eq!(result.total_pages(), 3);
        assert_eq!(result.item_range(), Some((25, 27)));
        assert!(!result.has_next());
        assert!(result.has_prev());
    }

    #[test]
    fn test_empty_result_has_no_range() {
        let result: PagedResult<i32> = PagedResult::default();
        assert_eq!(result.total_pages(), 0);
        assert_eq!(result.item_range(), None);
    }

    proptest! {
        #[test]
        fn total_pages_covers_every_item(total in 0i64..10_000, per_page in 1u32..=100) {
            let params = ListParams::new(1, per_page);
            let result: PagedResult<()> = PagedResult::new(Vec::new(), total, &params);
            let pages = result.total_pages() as i64;
            prop_assert!(pages * per_page as i64 >= total);
            prop_assert!((pages - 1).max(0) * (per_page as i64) < total.max(1));
        }
    }
}
