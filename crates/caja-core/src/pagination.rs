//! # Pagination
//!
//! Offset/limit paging. Default page size is 10; anything above 100 is
//! clamped to 100, and a page below 1 is treated as page 1.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page request as it arrives from a query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, TS)]
#[ts(export)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        PageRequest {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.limit() as u64
    }
}

/// Paging metadata returned alongside results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(request: &PageRequest, total: u64) -> Self {
        let limit = request.limit();
        PageMeta {
            page: request.page(),
            limit,
            total,
            total_pages: total.div_ceil(limit as u64),
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total: u64) -> Self {
        Page {
            items,
            pagination: PageMeta::new(request, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = PageRequest::default();
        assert_eq!(req.page(), 1);
        assert_eq!(req.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(PageRequest::new(1, 500).limit(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(0, 0).page(), 1);
        assert_eq!(PageRequest::new(0, 0).limit(), 1);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let req = PageRequest::new(1, 10);
        assert_eq!(PageMeta::new(&req, 0).total_pages, 0);
        assert_eq!(PageMeta::new(&req, 10).total_pages, 1);
        assert_eq!(PageMeta::new(&req, 11).total_pages, 2);
    }
}
