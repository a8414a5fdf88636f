//! # Order Context & Tax Breakdown
//!
//! The two ephemeral values exchanged with collaborators (checkout, refunds,
//! audits). Neither is persisted by this workspace; checkout stores the
//! breakdown next to its order record.
//!
//! ```text
//!  checkout ──► OrderContext ──► TaxService::compute_tax ──► TaxBreakdown ──► checkout
//!                 subtotal                                     lines[]
//!                 shipping_cost                                total_tax
//!                 jurisdiction                                 total_shipping_tax
//!                 vendor_id?                                   grand_total
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::TaxRate;

// =============================================================================
// Jurisdiction
// =============================================================================

/// The buyer's location, as far as the storefront knows it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Jurisdiction {
    pub country_id: String,
    pub state_id: Option<String>,
    pub city_id: Option<String>,
    pub postal_code: Option<String>,
}

impl Jurisdiction {
    pub fn country(country_id: impl Into<String>) -> Self {
        Jurisdiction {
            country_id: country_id.into(),
            ..Jurisdiction::default()
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
}

// =============================================================================
// Order Context
// =============================================================================

/// Everything the tax engine needs to know about an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderContext {
    /// Merchandise amount before tax.
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub jurisdiction: Jurisdiction,
    /// Selling vendor; `None` uses the marketplace default directly.
    pub vendor_id: Option<String>,
}

impl OrderContext {
    pub fn new(subtotal: Money, shipping_cost: Money, jurisdiction: Jurisdiction) -> Self {
        OrderContext {
            subtotal,
            shipping_cost,
            jurisdiction,
            vendor_id: None,
        }
    }

    pub fn for_vendor(mut self, vendor_id: impl Into<String>) -> Self {
        self.vendor_id = Some(vendor_id.into());
        self
    }
}

// =============================================================================
// Tax Breakdown
// =============================================================================

/// One applied rule on the breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxLine {
    /// The TaxClassOption that produced this line.
    pub option_id: String,
    pub tax_name: String,
    pub rate: TaxRate,
    pub base_amount: Money,
    pub tax_amount: Money,
    pub is_shipping: bool,
    pub is_compound: bool,
}

/// The result handed back to checkout.
///
/// `total_tax` includes `total_shipping_tax`;
/// `grand_total = subtotal + shipping_cost + total_tax`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    /// Class the lines came from; `None` when no class applied.
    pub tax_class_id: Option<String>,
    /// Lines in application order.
    pub lines: Vec<TaxLine>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub total_tax: Money,
    pub total_shipping_tax: Money,
    pub grand_total: Money,
}

impl TaxBreakdown {
    /// A breakdown with no lines: used when no tax class applies.
    pub fn zero(order: &OrderContext) -> Self {
        TaxBreakdown {
            tax_class_id: None,
            lines: Vec::new(),
            subtotal: order.subtotal,
            shipping_cost: order.shipping_cost,
            total_tax: Money::zero(),
            total_shipping_tax: Money::zero(),
            grand_total: order.subtotal + order.shipping_cost,
        }
    }

    /// Records which class produced the lines.
    pub fn with_tax_class(mut self, class_id: impl Into<String>) -> Self {
        self.tax_class_id = Some(class_id.into());
        self
    }

    /// Tax charged on merchandise only.
    pub fn total_merchandise_tax(&self) -> Money {
        self.total_tax - self.total_shipping_tax
    }

    pub fn is_zero(&self) -> bool {
        self.lines.is_empty() && self.total_tax.is_zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_breakdown() {
        let order = OrderContext::new(
            Money::from_cents(100_000),
            Money::from_cents(5_000),
            Jurisdiction::country("US"),
        );
        let breakdown = TaxBreakdown::zero(&order);

        assert!(breakdown.is_zero());
        assert_eq!(breakdown.tax_class_id, None);
        assert_eq!(breakdown.grand_total.cents(), 105_000);
        assert_eq!(breakdown.total_merchandise_tax(), Money::zero());
    }

    #[test]
    fn test_order_context_json_shape() {
        let order = OrderContext::new(
            Money::from_cents(1_000),
            Money::zero(),
            Jurisdiction::country("AU").with_state("NSW"),
        )
        .for_vendor("v-1");

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["subtotal"], 1000);
        assert_eq!(json["jurisdiction"]["state_id"], "NSW");
        assert_eq!(json["jurisdiction"]["postal_code"], serde_json::Value::Null);
        assert_eq!(json["vendor_id"], "v-1");

        let back: OrderContext = serde_json::from_value(json).unwrap();
        assert_eq!(back, order);
    }
}
