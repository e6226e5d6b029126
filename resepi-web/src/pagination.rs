//! Pagination utilities
//!
//! Page size comes from runtime settings (`page_size`, `admin_page_size`),
//! so it is passed in rather than fixed.

use serde::Serialize;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub page_size: i64,
    /// Total number of pages
    pub total_pages: i64,
    pub total: i64,
    /// Offset for SQL LIMIT/OFFSET query
    #[serde(skip)]
    pub offset: i64,
}

impl Pagination {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Calculate pagination metadata from total results and requested page
///
/// Ensures page is within valid bounds [1, total_pages]
///
/// # Examples
/// ```
/// use resepi_web::pagination::calculate_pagination;
///
/// // 30 results at 12 per page = 3 pages (12 + 12 + 6)
/// let p = calculate_pagination(30, 2, 12);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 12);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(30, 99, 12);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 24);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = page_size.max(1);
    let total = total_results.max(0);
    let total_pages = (total + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        page_size,
        total_pages,
        total,
        offset,
    }
}
