//! Pagination utilities for list endpoints and repositories

use serde::Serialize;

/// Default page size when the caller does not supply one
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound on requested page sizes
pub const MAX_PAGE_SIZE: usize = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    /// Number of items to skip
    pub offset: usize,
}

/// Calculate pagination metadata from total results and requested page
///
/// The page is clamped to `[1, total_pages]` and the limit to
/// `[1, MAX_PAGE_SIZE]`.
///
/// ```
/// use aipr_rank::pagination::calculate_pagination;
///
/// let p = calculate_pagination(45, 2, 20);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// let p = calculate_pagination(45, 99, 20);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 40);
/// ```
pub fn calculate_pagination(total_results: usize, requested_page: usize, limit: usize) -> Pagination {
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    let total_pages = total_results.div_ceil(limit);
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * limit;

    Pagination {
        page,
        limit,
        total_pages,
        offset,
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice an already-ordered collection into a page
    pub fn from_vec(all: Vec<T>, requested_page: usize, limit: usize) -> Self {
        let total = all.len();
        let p = calculate_pagination(total, requested_page, limit);
        let items = all.into_iter().skip(p.offset).take(p.limit).collect();
        Self {
            items,
            total,
            page: p.page,
            limit: p.limit,
            total_pages: p.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_set_is_page_one() {
        let p = calculate_pagination(0, 5, 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(calculate_pagination(500, 1, 0).limit, 1);
        assert_eq!(calculate_pagination(500, 1, 1000).limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_page_from_vec() {
        let page = Page::from_vec((1..=7).collect::<Vec<_>>(), 2, 3);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);

        let last = Page::from_vec((1..=7).collect::<Vec<_>>(), 3, 3);
        assert_eq!(last.items, vec![7]);
    }
}
