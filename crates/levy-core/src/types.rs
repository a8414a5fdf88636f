//! # Domain Types
//!
//! Rule records and their write inputs.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Rule Types                                      │
//! │                                                                         │
//! │  ┌─────────────────┐ 1     * ┌──────────────────┐                       │
//! │  │    TaxClass     │─────────│  TaxClassOption  │                       │
//! │  │  ─────────────  │         │  ──────────────  │                       │
//! │  │  id (UUID)      │         │  class_id (FK)   │                       │
//! │  │  name           │         │  tax_name        │                       │
//! │  │  is_activated   │         │  scope: GeoScope │──► Country/State/City │
//! │  │  vendor_id?     │         │  priority, rate  │                       │
//! │  └─────────────────┘         │  compound/ship   │                       │
//! │                              └──────────────────┘                       │
//! │                                                                         │
//! │  vendor_id = None  ⇒  marketplace default scope                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are soft-deleted (`deleted` + `deleted_at`) so breakdowns attached
//! to old orders stay explainable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (e.g., Australian GST)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Converts an admin-entered percentage (`10.0` = 10%) to basis points.
    ///
    /// Rejects NaN, infinities and negative values. Precision finer than a
    /// basis point is rounded half away from zero.
    pub fn try_from_percentage(pct: f64) -> Result<Self, ValidationError> {
        if !pct.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: "rate".to_string(),
                reason: "must be a finite number".to_string(),
            });
        }
        if pct < 0.0 {
            return Err(ValidationError::non_negative("rate"));
        }

        let bps = (pct * 100.0).round();
        if bps > u32::MAX as f64 {
            return Err(ValidationError::OutOfRange {
                field: "rate".to_string(),
                min: 0,
                max: (u32::MAX / 100) as i64,
            });
        }

        Ok(TaxRate(bps as u32))
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Vendor Scope
// =============================================================================

/// The owner scope of a tax class: one vendor, or the marketplace default.
///
/// At most one non-deleted class per scope may be activated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum VendorScope {
    /// Marketplace-wide default (vendor absent).
    Marketplace,
    /// A single vendor's own rules.
    Vendor(String),
}

impl VendorScope {
    /// Maps an optional vendor id to its scope. Blank ids mean "no vendor".
    pub fn from_vendor(vendor_id: Option<&str>) -> Self {
        match vendor_id.map(str::trim) {
            Some(id) if !id.is_empty() => VendorScope::Vendor(id.to_string()),
            _ => VendorScope::Marketplace,
        }
    }

    /// Returns the vendor id, `None` for the marketplace scope.
    pub fn vendor_id(&self) -> Option<&str> {
        match self {
            VendorScope::Marketplace => None,
            VendorScope::Vendor(id) => Some(id),
        }
    }

    pub fn is_marketplace(&self) -> bool {
        matches!(self, VendorScope::Marketplace)
    }
}

impl fmt::Display for VendorScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VendorScope::Marketplace => f.write_str("marketplace"),
            VendorScope::Vendor(id) => write!(f, "vendor:{}", id),
        }
    }
}

// =============================================================================
// Geographic Scope
// =============================================================================

/// Where a rule applies. Every `None` field is a wildcard at that level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GeoScope {
    pub country_id: Option<String>,
    pub state_id: Option<String>,
    pub city_id: Option<String>,
    pub postal_code: Option<String>,
}

impl GeoScope {
    /// A scope with every field unset: matches every jurisdiction.
    pub fn global() -> Self {
        GeoScope::default()
    }

    pub fn country(country_id: impl Into<String>) -> Self {
        GeoScope {
            country_id: Some(country_id.into()),
            ..GeoScope::default()
        }
    }

    pub fn with_state(mut self, state_id: impl Into<String>) -> Self {
        self.state_id = Some(state_id.into());
        self
    }

    pub fn with_city(mut self, city_id: impl Into<String>) -> Self {
        self.city_id = Some(city_id.into());
        self
    }

    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }

    pub fn is_global(&self) -> bool {
        self.country_id.is_none()
            && self.state_id.is_none()
            && self.city_id.is_none()
            && self.postal_code.is_none()
    }
}

// =============================================================================
// Tax Class
// =============================================================================

/// A named set of tax rules owned by a vendor or by the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxClass {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, unique among non-deleted classes of the same scope.
    pub name: String,

    /// Whether this is the scope's active rule-set.
    pub is_activated: bool,

    /// Owning vendor; `None` for the marketplace default.
    pub vendor_id: Option<String>,

    pub deleted: bool,

    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TaxClass {
    pub fn scope(&self) -> VendorScope {
        VendorScope::from_vendor(self.vendor_id.as_deref())
    }
}

// =============================================================================
// Tax Class Option
// =============================================================================

/// One tax rule belonging to exactly one [`TaxClass`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxClassOption {
    pub id: String,

    /// Owning tax class.
    pub class_id: String,

    /// Display label on the breakdown, e.g. "GST".
    pub tax_name: String,

    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub scope: GeoScope,

    /// Application order; lower applies first.
    pub priority: u32,

    /// Base includes merchandise tax from earlier lines.
    pub is_compound: bool,

    /// Taxes shipping cost instead of merchandise.
    pub is_shipping: bool,

    #[cfg_attr(feature = "sqlx", sqlx(rename = "rate_bps"))]
    pub rate: TaxRate,

    /// Mirrors the parent class's vendor.
    pub vendor_id: Option<String>,

    pub deleted: bool,

    #[ts(as = "Option<String>")]
    pub deleted_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Active Tax Class
// =============================================================================

/// A tax class joined with its live options: what the composer consumes.
///
/// Options keep creation order; the composer relies on it for priority ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActiveTaxClass {
    pub class: TaxClass,
    pub options: Vec<TaxClassOption>,
}

impl ActiveTaxClass {
    /// Joins a class with its options, dropping soft-deleted ones.
    ///
    /// ## Errors
    /// `CoreError::ForeignOption` if an option belongs to another class.
    pub fn new(class: TaxClass, options: Vec<TaxClassOption>) -> CoreResult<Self> {
        if let Some(foreign) = options.iter().find(|o| o.class_id != class.id) {
            return Err(CoreError::ForeignOption {
                option_id: foreign.id.clone(),
                expected: class.id.clone(),
                actual: foreign.class_id.clone(),
            });
        }

        let options = options.into_iter().filter(|o| !o.deleted).collect();
        Ok(ActiveTaxClass { class, options })
    }
}

// =============================================================================
// Geography
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Country {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct State {
    pub id: String,
    pub country_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct City {
    pub id: String,
    pub state_id: String,
    pub name: String,
}

// =============================================================================
// Write Inputs
// =============================================================================

/// Input for creating a tax class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTaxClass {
    pub name: String,
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub is_activated: bool,
}

/// Partial update of a tax class. The owner scope is immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxClassUpdate {
    pub name: Option<String>,
    pub is_activated: Option<bool>,
}

/// Input for creating a tax class option.
///
/// Numeric fields are wider than the stored types so that negative input
/// surfaces as a validation error instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTaxClassOption {
    pub class_id: String,
    pub tax_name: String,
    #[serde(flatten)]
    pub scope: GeoScope,
    pub priority: i64,
    #[serde(default)]
    pub is_compound: bool,
    #[serde(default)]
    pub is_shipping: bool,
    /// Percentage, e.g. `10.0` for 10%.
    pub rate: f64,
}

/// Partial update of a tax class option.
///
/// `scope`, when present, replaces all four geographic fields at once so a
/// wildcard can be restored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxClassOptionUpdate {
    pub tax_name: Option<String>,
    pub scope: Option<GeoScope>,
    pub priority: Option<i64>,
    pub is_compound: Option<bool>,
    pub is_shipping: Option<bool>,
    pub rate: Option<f64>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn class(id: &str) -> TaxClass {
        let now = Utc::now();
        TaxClass {
            id: id.to_string(),
            name: "Standard".to_string(),
            is_activated: true,
            vendor_id: None,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn option(id: &str, class_id: &str, deleted: bool) -> TaxClassOption {
        let now = Utc::now();
        TaxClassOption {
            id: id.to_string(),
            class_id: class_id.to_string(),
            tax_name: "GST".to_string(),
            scope: GeoScope::country("AU"),
            priority: 1,
            is_compound: false,
            is_shipping: false,
            rate: TaxRate::from_bps(1000),
            vendor_id: None,
            deleted,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::try_from_percentage(10.0).unwrap().bps(), 1000);
        assert_eq!(TaxRate::try_from_percentage(8.25).unwrap().bps(), 825);
        assert_eq!(TaxRate::try_from_percentage(0.0).unwrap().bps(), 0);
        assert!((TaxRate::from_bps(825).percentage() - 8.25).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_rejects_bad_percentages() {
        assert_eq!(
            TaxRate::try_from_percentage(-1.0),
            Err(ValidationError::non_negative("rate"))
        );
        assert!(TaxRate::try_from_percentage(f64::NAN).is_err());
        assert!(TaxRate::try_from_percentage(f64::INFINITY).is_err());
        assert!(TaxRate::try_from_percentage(1e12).is_err());
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::from_bps(1000).to_string(), "10.00%");
        assert_eq!(TaxRate::from_bps(825).to_string(), "8.25%");
    }

    #[test]
    fn test_vendor_scope() {
        assert_eq!(VendorScope::from_vendor(None), VendorScope::Marketplace);
        assert_eq!(VendorScope::from_vendor(Some("  ")), VendorScope::Marketplace);
        let scope = VendorScope::from_vendor(Some("v-1"));
        assert_eq!(scope.vendor_id(), Some("v-1"));
        assert_eq!(scope.to_string(), "vendor:v-1");
        assert_eq!(VendorScope::Marketplace.to_string(), "marketplace");
    }

    #[test]
    fn test_geo_scope_builders() {
        assert!(GeoScope::global().is_global());
        let scope = GeoScope::country("AU").with_state("NSW").with_postal_code("2000");
        assert_eq!(scope.country_id.as_deref(), Some("AU"));
        assert_eq!(scope.state_id.as_deref(), Some("NSW"));
        assert_eq!(scope.city_id, None);
        assert!(!scope.is_global());
    }

    #[test]
    fn test_active_class_drops_deleted_options() {
        let active = ActiveTaxClass::new(
            class("c1"),
            vec![option("o1", "c1", false), option("o2", "c1", true)],
        )
        .unwrap();
        assert_eq!(active.options.len(), 1);
        assert_eq!(active.options[0].id, "o1");
    }

    #[test]
    fn test_active_class_rejects_foreign_option() {
        let err = ActiveTaxClass::new(class("c1"), vec![option("o1", "c2", false)]).unwrap_err();
        assert!(matches!(err, CoreError::ForeignOption { .. }));
    }

    #[test]
    fn test_option_serializes_flat_scope() {
        let json = serde_json::to_value(option("o1", "c1", false)).unwrap();
        assert_eq!(json["country_id"], "AU");
        assert!(json.get("scope").is_none());
    }
}
