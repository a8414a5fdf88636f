//! # Repository Module
//!
//! The Rule Store: repositories over the tax rule tables.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Rule Store Repositories                              │
//! │                                                                         │
//! │  TaxService / ActivationResolver                                       │
//! │       │                                                                 │
//! │       │  db.tax_classes().find_active(&scope)                          │
//! │       ▼                                                                 │
//! │  TaxClassRepository                                                    │
//! │  ├── create / update        (single active class per scope)           │
//! │  ├── soft_delete            (cascades to options)                      │
//! │  ├── list                   (filter, sort, paginate)                   │
//! │  └── find_active            (class + options, repairs conflicts)       │
//! │                                                                         │
//! │  TaxClassOptionRepository   GeographyRepository                        │
//! │  ├── create / update        ├── countries / states / cities           │
//! │  ├── soft_delete            └── validate_scope                        │
//! │  └── list_by_class                                                     │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories return plain `levy-core` values; relationships (class to
//! options, option to geography) are explicit lookups, never lazy loads.
//!
//! ## Available Repositories
//!
//! - [`TaxClassRepository`](tax_class::TaxClassRepository) - Tax class CRUD and activation
//! - [`TaxClassOptionRepository`](tax_option::TaxClassOptionRepository) - Option CRUD
//! - [`GeographyRepository`](geography::GeographyRepository) - Reference geography

use serde::{Deserialize, Serialize};

pub mod geography;
pub mod tax_class;
pub mod tax_option;

/// Largest page a list query may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Page size used when none is given.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// One page of a list query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matching rows across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_math() {
        let page = Page {
            items: vec![1, 2],
            total: 5,
            page: 1,
            per_page: 2,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());

        let last = Page {
            items: vec![5],
            total: 5,
            page: 3,
            per_page: 2,
        };
        assert!(!last.has_next());
    }
}
