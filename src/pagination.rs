//! Offset-based pagination.
//!
//! A [`Page`] is constructed fresh per query response and never mutated
//! afterwards. Page numbers are 1-based; a zero-match result has zero pages
//! regardless of the requested page.

use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::Error;

/// A bounded slice of a result set plus pagination metadata.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page_number: u64,
    pub total_pages: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap already-sliced items with pagination metadata.
    ///
    /// # Errors
    ///
    /// `Error::InvalidPage` for a non-positive page number or size.
    pub fn new(
        items: Vec<T>,
        page_number: u64,
        page_size: u64,
        total_matches: u64,
    ) -> Result<Self, Error> {
        validate_page(page_number, page_size)?;
        Ok(Self {
            page_number,
            total_pages: total_pages(total_matches, page_size),
            items,
        })
    }
}

/// # Errors
///
/// `Error::InvalidPage` when `page_number < 1` or `page_size < 1`.
pub fn validate_page(page_number: u64, page_size: u64) -> Result<(), Error> {
    if page_number < 1 {
        return Err(Error::invalid_page("Page number must be at least 1"));
    }
    if page_size < 1 {
        return Err(Error::invalid_page("Page size must be at least 1"));
    }
    Ok(())
}

/// Offset of the first item of a page.
#[must_use]
pub fn offset(page_number: u64, page_size: u64) -> u64 {
    page_number.saturating_sub(1).saturating_mul(page_size)
}

/// Total page count: `ceil(total_matches / page_size)`.
#[must_use]
pub fn total_pages(total_matches: u64, page_size: u64) -> u64 {
    total_matches.div_ceil(page_size.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_matches_zero_pages() {
        let page = Page::<i32>::new(Vec::new(), 1, 10, 0).unwrap();
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(30, 10), 3);
        assert_eq!(total_pages(31, 10), 4);
        assert_eq!(total_pages(1, 10), 1);
    }

    #[test]
    fn test_offset_is_zero_based() {
        assert_eq!(offset(1, 10), 0);
        assert_eq!(offset(2, 10), 10);
        assert_eq!(offset(4, 25), 75);
    }

    #[test]
    fn test_offset_saturates_instead_of_overflowing() {
        assert_eq!(offset(u64::MAX, 25), u64::MAX);
        assert_eq!(offset(u64::MAX, u64::MAX), u64::MAX);
    }

    #[test]
    fn test_invalid_page_number() {
        assert!(matches!(
            Page::<i32>::new(Vec::new(), 0, 10, 0).unwrap_err(),
            Error::InvalidPage { .. }
        ));
    }

    #[test]
    fn test_invalid_page_size() {
        assert!(matches!(
            Page::<i32>::new(Vec::new(), 1, 0, 0).unwrap_err(),
            Error::InvalidPage { .. }
        ));
    }
}
