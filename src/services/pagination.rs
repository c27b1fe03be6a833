use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Request for one page of a table screen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageQuery {
    /// 1-based page number
    #[serde(default = "default_page")]
    pub page: u64,
    /// Rows per page; the service default applies when absent
    #[serde(default)]
    pub per_page: Option<u64>,
    /// Free-text search over the table's searchable columns
    #[serde(default)]
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}

impl Default for PageQuery {
    fn default() -> Self {
        Self::new(default_page())
    }
}

impl PageQuery {
    pub fn new(page: u64) -> Self {
        Self {
            page,
            per_page: None,
            search: None,
        }
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Resolves the page window, capping the size at `max_per_page`.
    pub fn window(&self, default_per_page: u64, max_per_page: u64) -> Result<PageWindow, ServiceError> {
        if self.page == 0 {
            return Err(ServiceError::InvalidInput(
                "Page numbers start at 1".to_string(),
            ));
        }
        let per_page = match self.per_page {
            Some(0) => {
                return Err(ServiceError::InvalidInput(
                    "Page size must be positive".to_string(),
                ))
            }
            Some(size) => size.min(max_per_page),
            None => default_per_page.min(max_per_page),
        };
        Ok(PageWindow {
            page: self.page,
            per_page,
        })
    }
}

/// A validated page number and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub per_page: u64,
}

impl PageWindow {
    /// Calculate zero-based offset for pagination
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

/// One page of rows plus the totals a table footer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total: u64) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + window.per_page - 1) / window.per_page
        };
        Self {
            items,
            page: window.page,
            per_page: window.per_page,
            total,
            total_pages,
            has_next: window.page < total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn window_defaults_and_caps() {
        let window = PageQuery::new(3).window(10, 100).unwrap();
        assert_eq!(window.per_page, 10);
        assert_eq!(window.offset(), 20);

        let capped = PageQuery::new(1).per_page(500).window(10, 100).unwrap();
        assert_eq!(capped.per_page, 100);
    }

    #[test]
    fn zero_page_or_size_is_invalid() {
        assert_matches!(PageQuery::new(0).window(10, 100), Err(ServiceError::InvalidInput(_)));
        assert_matches!(
            PageQuery::new(1).per_page(0).window(10, 100),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn totals_and_next_flag() {
        let window = PageWindow { page: 2, per_page: 10 };
        let page = Page::new(vec![1, 2, 3], window, 23);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);

        let last = Page::new(vec![1], PageWindow { page: 3, per_page: 10 }, 23);
        assert!(!last.has_next);

        let empty: Page<u8> = Page::new(vec![], PageWindow { page: 1, per_page: 10 }, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }
}
