//! # Pagination and List Filters
//!
//! Shared paging math for every listing the UI requests, and the filter
//! shapes for products, customers and sales.
//!
//! ```text
//! total = 12, page_size = 5
//!
//!   page 1 ─► offset 0  ─► items 1..=5
//!   page 2 ─► offset 5  ─► items 6..=10
//!   page 3 ─► offset 10 ─► items 11..=12
//!
//!   last_page = ceil(12 / 5) = 3
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Requested page. Pages are 1-based; out-of-range values are clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        PageRequest { page, page_size }
    }

    /// Page number, at least 1.
    #[inline]
    pub fn page(&self) -> usize {
        self.page.max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// `(page - 1) * page_size`, saturating at `usize::MAX` for absurd pages.
    #[inline]
    pub fn offset(&self) -> usize {
        (self.page() - 1).saturating_mul(self.page_size())
    }

    /// Cuts one page out of an already filtered and sorted list.
    pub fn paginate<T>(&self, items: Vec<T>) -> Paginated<T> {
        let total = items.len();
        let data = items
            .into_iter()
            .skip(self.offset())
            .take(self.page_size())
            .collect();

        Paginated {
            data,
            meta: PageMeta::new(self, total),
        }
    }
}

/// Paging metadata returned with every list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PageMeta {
    pub current_page: usize,
    /// `ceil(total / per_page)`; zero for an empty result.
    pub last_page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl PageMeta {
    pub fn new(request: &PageRequest, total: usize) -> Self {
        let per_page = request.page_size();
        PageMeta {
            current_page: request.page(),
            last_page: total.div_ceil(per_page),
            per_page,
            total,
        }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Product listing filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    #[serde(flatten)]
    pub page: PageRequest,
    /// Case-insensitive substring over name, code and barcode.
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
}

impl ProductFilter {
    pub fn page(page: usize, page_size: usize) -> Self {
        ProductFilter {
            page: PageRequest::new(page, page_size),
            ..Default::default()
        }
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn brand(mut self, brand_id: i64) -> Self {
        self.brand_id = Some(brand_id);
        self
    }
}

/// Customer listing filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerFilter {
    #[serde(flatten)]
    pub page: PageRequest,
    /// Case-insensitive substring over name, email and phone.
    pub search: Option<String>,
}

/// Sale listing filter. Dates are inclusive calendar dates (UTC).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleFilter {
    #[serde(flatten)]
    pub page: PageRequest,
    #[ts(as = "Option<String>")]
    pub start_date: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub end_date: Option<NaiveDate>,
}

impl SaleFilter {
    /// Whether a calendar date falls inside the (inclusive) range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_page_of_twelve() {
        let items: Vec<u32> = (1..=12).collect();
        let page = PageRequest::new(2, 5).paginate(items);
        assert_eq!(page.data, vec![6, 7, 8, 9, 10]);
        assert_eq!(page.meta.last_page, 3);
        assert_eq!(page.meta.total, 12);
        assert_eq!(page.meta.current_page, 2);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let request = PageRequest::new(0, 0);
        assert_eq!(request.page(), 1);
        assert_eq!(request.page_size(), 1);

        let huge = PageRequest::new(1, 10_000);
        assert_eq!(huge.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_empty_result_has_zero_last_page() {
        let page = PageRequest::default().paginate(Vec::<u8>::new());
        assert!(page.data.is_empty());
        assert_eq!(page.meta.last_page, 0);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let page = PageRequest::new(9, 5).paginate((1..=12).collect::<Vec<_>>());
        assert!(page.data.is_empty());
        assert_eq!(page.meta.total, 12);
    }

    #[test]
    fn test_huge_page_number_is_empty() {
        let request = PageRequest::new(usize::MAX, 20);
        assert_eq!(request.offset(), usize::MAX);

        let page = request.paginate((1..=12).collect::<Vec<_>>());
        assert!(page.data.is_empty());
        assert_eq!(page.meta.current_page, usize::MAX);
        assert_eq!(page.meta.last_page, 1);
    }

    #[test]
    fn test_sale_filter_is_inclusive() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
        let filter = SaleFilter {
            start_date: Some(day(2)),
            end_date: Some(day(4)),
            ..Default::default()
        };
        assert!(!filter.contains(day(1)));
        assert!(filter.contains(day(2)));
        assert!(filter.contains(day(4)));
        assert!(!filter.contains(day(5)));
        assert!(SaleFilter::default().contains(day(1)));
    }
}
