//! # Money Module
//!
//! Provides the `Money` type and the rounding rule used for percentage tax.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    1000.00 at 10%  →  100000 cents × 1000 bps / 10000 = 10000 cents     │
//! │    Every intermediate value is an integer; rounding happens once,      │
//! │    explicitly, per tax line.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use levy_core::money::{Money, RoundingMode};
//! use levy_core::types::TaxRate;
//!
//! let base = Money::from_cents(100_000); // 1000.00
//! let tax = base.calculate_tax(TaxRate::from_bps(1000), RoundingMode::HalfUp);
//! assert_eq!(tax.map(|t| t.cents()), Some(10_000)); // 100.00
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

/// Basis points in 100%.
const BPS_DENOMINATOR: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are representable so they can be
///   *rejected* with a proper validation error instead of wrapping.
/// - **Currency-agnostic**: currency conversion is not this crate's concern,
///   so Display prints the bare amount.
///
/// ## Where Money Flows
/// ```text
/// OrderContext.subtotal ──┐
///                         ├──► compose() ──► TaxLine.base_amount / tax_amount
/// OrderContext.shipping ──┘                        │
///                                                  ▼
///                              TaxBreakdown.total_tax / grand_total
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use levy_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(1000, 0).cents(), 100_000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Calculates `self × rate` rounded to the smallest currency unit.
    ///
    /// ## Implementation
    /// Integer math on i128: `amount_cents × bps / 10000`, with the remainder
    /// resolved by `rounding`. The product cannot overflow i128; the result
    /// is `None` when it does not fit back into i64 cents.
    ///
    /// ## Example
    /// ```rust
    /// use levy_core::money::{Money, RoundingMode};
    /// use levy_core::types::TaxRate;
    ///
    /// let price = Money::from_cents(1000); // 10.00
    /// let rate = TaxRate::from_bps(825);   // 8.25%
    ///
    /// // 10.00 × 8.25% = 0.825
    /// assert_eq!(price.calculate_tax(rate, RoundingMode::HalfUp).unwrap().cents(), 83);
    /// assert_eq!(price.calculate_tax(rate, RoundingMode::HalfEven).unwrap().cents(), 82);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate, rounding: RoundingMode) -> Option<Money> {
        let numerator = self.0 as i128 * rate.bps() as i128;
        let cents = rounding.divide(numerator, BPS_DENOMINATOR);
        i64::try_from(cents).ok().map(Money::from_cents)
    }
}

// =============================================================================
// Rounding Mode
// =============================================================================

/// How a fractional minor unit is resolved on each tax line.
///
/// Rounding law differs per deployment, so this is configuration, never a
/// constant baked into the composer.
///
/// ```text
///  value   HalfUp   HalfEven   Down
///  0.5       1         0        0
///  1.5       2         2        1
///  2.5       3         2        2
///  2.4       2         2        2
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round half away from zero (standard commercial rounding).
    #[default]
    HalfUp,
    /// Round half to even (bankers rounding).
    HalfEven,
    /// Truncate toward zero.
    Down,
}

impl RoundingMode {
    /// Divides `numerator` by a positive `denominator`, resolving the
    /// remainder according to this mode.
    pub fn divide(&self, numerator: i128, denominator: i128) -> i128 {
        debug_assert!(denominator > 0);

        let quotient = numerator / denominator;
        let remainder = numerator % denominator;
        if remainder == 0 {
            return quotient;
        }

        let away = quotient + numerator.signum();
        let twice = remainder.abs() * 2;

        match self {
            RoundingMode::Down => quotient,
            RoundingMode::HalfUp => {
                if twice >= denominator {
                    away
                } else {
                    quotient
                }
            }
            RoundingMode::HalfEven => {
                if twice > denominator || (twice == denominator && quotient % 2 != 0) {
                    away
                } else {
                    quotient
                }
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingMode::HalfUp => "half_up",
            RoundingMode::HalfEven => "half_even",
            RoundingMode::Down => "down",
        }
    }
}

impl FromStr for RoundingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half_up" => Ok(RoundingMode::HalfUp),
            "half_even" => Ok(RoundingMode::HalfEven),
            "down" => Ok(RoundingMode::Down),
            _ => Err(ValidationError::NotAllowed {
                field: "rounding".to_string(),
                allowed: vec![
                    "half_up".to_string(),
                    "half_even".to_string(),
                    "down".to_string(),
                ],
            }),
        }
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the bare amount with two decimals, e.g. `1177.00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
