//! # Tax Composer
//!
//! Turns a class's options and an order into a [`TaxBreakdown`].
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. keep options whose scope matches order.jurisdiction                 │
//! │  2. stable sort by priority (ties keep creation order)                  │
//! │  3. walk in order:                                                      │
//! │                                                                         │
//! │     shipping line     base = shipping_cost                              │
//! │     merchandise line  base = subtotal + (compound ? merch_tax : 0)      │
//! │                                                                         │
//! │     tax = round(base × rate)                                            │
//! │     merchandise line  ⇒ merch_tax += tax                                │
//! │                                                                         │
//! │  Merchandise and shipping are separate tracks: shipping tax never       │
//! │  feeds a compound base and merchandise tax never reaches shipping.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Worked Example (AU / NSW, subtotal 1000.00, shipping 50.00)
//! ```text
//!  prio  name          kind              base      rate   tax
//!  1     GST           merchandise       1000.00   10%    100.00
//!  1     Shipping GST  shipping            50.00   10%      5.00
//!  2     NSW Levy      merch, compound   1100.00    2%     22.00
//!                                                 total    127.00
//!                                           grand total   1177.00
//! ```
//!
//! The function is pure: identical inputs give identical output, which is what
//! lets refunds and audits re-derive a historical breakdown.

use crate::error::ValidationError;
use crate::money::{Money, RoundingMode};
use crate::order::{OrderContext, TaxBreakdown, TaxLine};
use crate::types::TaxClassOption;
use crate::validation::{validate_order_amounts, ValidationResult};

/// Composes the breakdown for `order` from `options`.
///
/// `options` must be in creation order; it decides priority ties.
///
/// ## Errors
/// `ValidationError` for a negative or oversized subtotal or shipping cost,
/// and `OutOfRange` when an extreme rate pushes a line or total past what
/// i64 cents can hold.
pub fn compose(
    options: &[TaxClassOption],
    order: &OrderContext,
    rounding: RoundingMode,
) -> ValidationResult<TaxBreakdown> {
    validate_order_amounts(order)?;

    let mut applicable: Vec<&TaxClassOption> = options
        .iter()
        .filter(|o| !o.deleted && o.applies_to(&order.jurisdiction))
        .collect();
    // sort_by_key is stable
    applicable.sort_by_key(|o| o.priority);

    let mut merchandise_tax = Money::zero();
    let mut lines = Vec::with_capacity(applicable.len());

    for option in applicable {
        let base = if option.is_shipping {
            order.shipping_cost
        } else if option.is_compound {
            order
                .subtotal
                .checked_add(merchandise_tax)
                .ok_or_else(|| overflow("base_amount"))?
        } else {
            order.subtotal
        };

        let tax_amount = base
            .calculate_tax(option.rate, rounding)
            .ok_or_else(|| overflow("tax_amount"))?;

        if !option.is_shipping {
            merchandise_tax = merchandise_tax
                .checked_add(tax_amount)
                .ok_or_else(|| overflow("total_tax"))?;
        }

        lines.push(TaxLine {
            option_id: option.id.clone(),
            tax_name: option.tax_name.clone(),
            rate: option.rate,
            base_amount: base,
            tax_amount,
            is_shipping: option.is_shipping,
            is_compound: option.is_compound,
        });
    }

    let total_shipping_tax = checked_sum(lines.iter().filter(|l| l.is_shipping))
        .ok_or_else(|| overflow("total_shipping_tax"))?;
    let total_tax = merchandise_tax
        .checked_add(total_shipping_tax)
        .ok_or_else(|| overflow("total_tax"))?;
    let grand_total = order
        .subtotal
        .checked_add(order.shipping_cost)
        .and_then(|sum| sum.checked_add(total_tax))
        .ok_or_else(|| overflow("grand_total"))?;

    Ok(TaxBreakdown {
        tax_class_id: None,
        lines,
        subtotal: order.subtotal,
        shipping_cost: order.shipping_cost,
        total_tax,
        total_shipping_tax,
        grand_total,
    })
}

fn checked_sum<'a>(mut lines: impl Iterator<Item = &'a TaxLine>) -> Option<Money> {
    lines.try_fold(Money::zero(), |acc, line| acc.checked_add(line.tax_amount))
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MAX_ORDER_AMOUNT_CENTS;
    use crate::order::Jurisdiction;
    use crate::types::{GeoScope, TaxRate};
    use chrono::Utc;

    fn option(
        id: &str,
        name: &str,
        scope: GeoScope,
        priority: u32,
        is_compound: bool,
        is_shipping: bool,
        rate_bps: u32,
    ) -> TaxClassOption {
        let now = Utc::now();
        TaxClassOption {
            id: id.to_string(),
            class_id: "class-1".to_string(),
            tax_name: name.to_string(),
            scope,
            priority,
            is_compound,
            is_shipping,
            rate: TaxRate::from_bps(rate_bps),
            vendor_id: None,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Options A, B, C of the AU scenario.
    fn au_options() -> Vec<TaxClassOption> {
        vec![
            option("A", "GST", GeoScope::country("AU"), 1, false, false, 1000),
            option(
                "B",
                "NSW Levy",
                GeoScope::country("AU").with_state("NSW"),
                2,
                true,
                false,
                200,
            ),
            option("C", "Shipping GST", GeoScope::country("AU"), 1, false, true, 1000),
        ]
    }

    fn order(jurisdiction: Jurisdiction) -> OrderContext {
        OrderContext::new(Money::from_cents(100_000), Money::from_cents(5_000), jurisdiction)
    }

    fn line<'a>(breakdown: &'a TaxBreakdown, id: &str) -> &'a TaxLine {
        breakdown
            .lines
            .iter()
            .find(|l| l.option_id == id)
            .unwrap()
    }

    #[test]
    fn test_au_nsw_scenario() {
        let order = order(Jurisdiction::country("AU").with_state("NSW"));
        let breakdown = compose(&au_options(), &order, RoundingMode::HalfUp).unwrap();

        let a = line(&breakdown, "A");
        assert_eq!(a.base_amount.cents(), 100_000);
        assert_eq!(a.tax_amount.cents(), 10_000);

        let b = line(&breakdown, "B");
        assert_eq!(b.base_amount.cents(), 110_000);
        assert_eq!(b.tax_amount.cents(), 2_200);
        assert!(b.is_compound);

        let c = line(&breakdown, "C");
        assert_eq!(c.base_amount.cents(), 5_000);
        assert_eq!(c.tax_amount.cents(), 500);
        assert!(c.is_shipping);

        assert_eq!(breakdown.total_tax.cents(), 12_700);
        assert_eq!(breakdown.total_shipping_tax.cents(), 500);
        assert_eq!(breakdown.total_merchandise_tax().cents(), 12_200);
        assert_eq!(breakdown.grand_total.cents(), 117_700);
    }

    #[test]
    fn test_country_mismatch_gives_zero_tax() {
        let order = order(Jurisdiction::country("US"));
        let breakdown = compose(&au_options(), &order, RoundingMode::HalfUp).unwrap();

        assert!(breakdown.lines.is_empty());
        assert_eq!(breakdown.total_tax, Money::zero());
        assert_eq!(breakdown.grand_total.cents(), 105_000);
    }

    #[test]
    fn test_postal_constrained_option_needs_order_postal_code() {
        let options = vec![option(
            "P",
            "City Levy",
            GeoScope::country("AU").with_postal_code("2000"),
            1,
            false,
            false,
            100,
        )];

        let without = compose(&options, &order(Jurisdiction::country("AU")), RoundingMode::HalfUp)
            .unwrap();
        assert!(without.lines.is_empty());

        let with = compose(
            &options,
            &order(Jurisdiction::country("AU").with_postal_code("2000")),
            RoundingMode::HalfUp,
        )
        .unwrap();
        assert_eq!(with.lines.len(), 1);
        assert_eq!(with.total_tax.cents(), 1_000);
    }

    #[test]
    fn test_priority_order_independent_of_input_order() {
        let first = option("P1", "First", GeoScope::global(), 1, false, false, 500);
        let second = option("P2", "Second", GeoScope::global(), 2, false, false, 500);
        let order = order(Jurisdiction::country("AU"));

        for options in [vec![first.clone(), second.clone()], vec![second, first]] {
            let breakdown = compose(&options, &order, RoundingMode::HalfUp).unwrap();
            let ids: Vec<&str> = breakdown.lines.iter().map(|l| l.option_id.as_str()).collect();
            assert_eq!(ids, vec!["P1", "P2"]);
        }
    }

    #[test]
    fn test_priority_ties_keep_creation_order() {
        let options = vec![
            option("T1", "One", GeoScope::global(), 5, false, false, 100),
            option("T2", "Two", GeoScope::global(), 5, false, false, 100),
            option("T0", "Zero", GeoScope::global(), 0, false, false, 100),
            option("T3", "Three", GeoScope::global(), 5, false, false, 100),
        ];
        let breakdown = compose(&options, &order(Jurisdiction::country("AU")), RoundingMode::HalfUp)
            .unwrap();
        let ids: Vec<&str> = breakdown.lines.iter().map(|l| l.option_id.as_str()).collect();
        assert_eq!(ids, vec!["T0", "T1", "T2", "T3"]);
    }

    #[test]
    fn test_non_compound_line_never_includes_prior_tax() {
        let options = vec![
            option("A", "First", GeoScope::global(), 1, false, false, 1000),
            option("B", "Second", GeoScope::global(), 2, false, false, 1000),
        ];
        let breakdown = compose(&options, &order(Jurisdiction::country("AU")), RoundingMode::HalfUp)
            .unwrap();
        assert_eq!(line(&breakdown, "B").base_amount.cents(), 100_000);
        assert_eq!(breakdown.total_tax.cents(), 20_000);
    }

    #[test]
    fn test_compounding_accumulates_over_compound_lines() {
        // A: 10% of 1000 = 100; B (compound): 10% of 1100 = 110;
        // C (compound): 10% of 1000 + 100 + 110 = 121
        let options = vec![
            option("A", "A", GeoScope::global(), 1, false, false, 1000),
            option("B", "B", GeoScope::global(), 2, true, false, 1000),
            option("C", "C", GeoScope::global(), 3, true, false, 1000),
        ];
        let breakdown = compose(&options, &order(Jurisdiction::country("AU")), RoundingMode::HalfUp)
            .unwrap();
        assert_eq!(line(&breakdown, "B").base_amount.cents(), 110_000);
        assert_eq!(line(&breakdown, "C").base_amount.cents(), 121_000);
        assert_eq!(line(&breakdown, "C").tax_amount.cents(), 12_100);
    }

    #[test]
    fn test_compound_before_any_merchandise_tax_uses_subtotal() {
        let options = vec![option("B", "B", GeoScope::global(), 1, true, false, 1000)];
        let breakdown = compose(&options, &order(Jurisdiction::country("AU")), RoundingMode::HalfUp)
            .unwrap();
        assert_eq!(line(&breakdown, "B").base_amount.cents(), 100_000);
    }

    #[test]
    fn test_shipping_and_merchandise_tracks_never_cross() {
        let options = vec![
            option("S1", "Ship", GeoScope::global(), 1, false, true, 1000),
            option("M1", "Merch", GeoScope::global(), 2, true, false, 1000),
            option("S2", "Ship compound", GeoScope::global(), 3, true, true, 1000),
        ];
        let breakdown = compose(&options, &order(Jurisdiction::country("AU")), RoundingMode::HalfUp)
            .unwrap();

        // Shipping tax (5.00) never reaches the merchandise compound base
        assert_eq!(line(&breakdown, "M1").base_amount.cents(), 100_000);
        // Merchandise tax (100.00) never reaches the shipping base
        assert_eq!(line(&breakdown, "S2").base_amount.cents(), 5_000);
        assert_eq!(breakdown.total_shipping_tax.cents(), 1_000);
        assert_eq!(breakdown.total_tax.cents(), 11_000);
    }

    #[test]
    fn test_deleted_options_are_ignored() {
        let mut options = au_options();
        options[1].deleted = true;
        let breakdown = compose(
            &options,
            &order(Jurisdiction::country("AU").with_state("NSW")),
            RoundingMode::HalfUp,
        )
        .unwrap();
        assert_eq!(breakdown.lines.len(), 2);
        assert_eq!(breakdown.total_tax.cents(), 10_500);
    }

    #[test]
    fn test_rounding_mode_is_applied_per_line() {
        // 10.00 at 8.25% = 0.825
        let options = vec![option("R", "R", GeoScope::global(), 1, false, false, 825)];
        let order = OrderContext::new(
            Money::from_cents(1_000),
            Money::zero(),
            Jurisdiction::country("US"),
        );

        let up = compose(&options, &order, RoundingMode::HalfUp).unwrap();
        let even = compose(&options, &order, RoundingMode::HalfEven).unwrap();
        assert_eq!(up.total_tax.cents(), 83);
        assert_eq!(even.total_tax.cents(), 82);
    }

    #[test]
    fn test_compose_is_deterministic() {
        let options = au_options();
        let order = order(Jurisdiction::country("AU").with_state("NSW"));
        let first = compose(&options, &order, RoundingMode::HalfUp).unwrap();
        for _ in 0..10 {
            assert_eq!(compose(&options, &order, RoundingMode::HalfUp).unwrap(), first);
        }
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let mut bad = order(Jurisdiction::country("AU"));
        bad.subtotal = Money::from_cents(-1);
        assert_eq!(
            compose(&au_options(), &bad, RoundingMode::HalfUp),
            Err(ValidationError::non_negative("subtotal"))
        );

        let mut bad = order(Jurisdiction::country("AU"));
        bad.shipping_cost = Money::from_cents(-1);
        assert_eq!(
            compose(&au_options(), &bad, RoundingMode::HalfUp),
            Err(ValidationError::non_negative("shipping_cost"))
        );
    }

    #[test]
    fn test_oversized_amounts_rejected() {
        let mut huge = order(Jurisdiction::country("AU"));
        huge.subtotal = Money::from_cents(i64::MAX);
        huge.shipping_cost = Money::from_cents(1);
        assert!(matches!(
            compose(&[], &huge, RoundingMode::HalfUp),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "subtotal"
        ));
    }

    #[test]
    fn test_extreme_rate_overflow_is_an_error_not_a_negative_tax() {
        let options = vec![option("A", "Huge", GeoScope::global(), 1, false, false, u32::MAX)];
        let mut big = order(Jurisdiction::country("AU"));
        big.subtotal = Money::from_cents(MAX_ORDER_AMOUNT_CENTS);

        assert!(matches!(
            compose(&options, &big, RoundingMode::HalfUp),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "tax_amount"
        ));
    }

    #[test]
    fn test_large_amounts_within_ceiling_compose() {
        // 10000% on the largest accepted subtotal still fits
        let options = vec![option("A", "Steep", GeoScope::global(), 1, false, false, 1_000_000)];
        let mut big = order(Jurisdiction::country("AU"));
        big.subtotal = Money::from_cents(MAX_ORDER_AMOUNT_CENTS);

        let breakdown = compose(&options, &big, RoundingMode::HalfUp).unwrap();
        assert_eq!(breakdown.total_tax.cents(), MAX_ORDER_AMOUNT_CENTS * 100);
        assert!(!breakdown.total_tax.is_negative());
        assert_eq!(
            breakdown.grand_total.cents(),
            MAX_ORDER_AMOUNT_CENTS * 101 + 5_000
        );
    }

    #[test]
    fn test_empty_options() {
        let order = order(Jurisdiction::country("AU"));
        let breakdown = compose(&[], &order, RoundingMode::HalfUp).unwrap();
        assert_eq!(breakdown, TaxBreakdown::zero(&order));
    }
}
