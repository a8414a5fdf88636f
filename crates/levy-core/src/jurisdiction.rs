//! # Jurisdiction Matcher
//!
//! Decides whether a rule's geographic scope applies to an order's location.
//!
//! ## Matching Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pure conjunction over the fields the rule sets:                        │
//! │                                                                         │
//! │   rule field      order field        result                             │
//! │   ──────────      ───────────        ──────                             │
//! │   None            anything           ✓ (wildcard)                       │
//! │   Some("AU")      "AU"               ✓                                  │
//! │   Some("AU")      "US"               ✗                                  │
//! │   Some("2000")    None / ""          ✗ (missing ⇒ no match)             │
//! │                                                                         │
//! │  No "closest match" ranking: every matching rule applies.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Postal codes compare exactly, no prefix or range matching.

use crate::order::Jurisdiction;
use crate::types::{GeoScope, TaxClassOption};

/// Returns true when every field `scope` constrains is present and equal in
/// `jurisdiction`.
pub fn matches(scope: &GeoScope, jurisdiction: &Jurisdiction) -> bool {
    field_matches(&scope.country_id, Some(jurisdiction.country_id.as_str()))
        && field_matches(&scope.state_id, jurisdiction.state_id.as_deref())
        && field_matches(&scope.city_id, jurisdiction.city_id.as_deref())
        && field_matches(&scope.postal_code, jurisdiction.postal_code.as_deref())
}

fn field_matches(required: &Option<String>, actual: Option<&str>) -> bool {
    match required {
        None => true,
        Some(required) => match actual {
            Some(actual) if !actual.is_empty() => actual == required,
            _ => false,
        },
    }
}

impl TaxClassOption {
    /// Whether this rule applies at `jurisdiction`.
    pub fn applies_to(&self, jurisdiction: &Jurisdiction) -> bool {
        matches(&self.scope, jurisdiction)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
