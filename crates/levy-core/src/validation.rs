//! # Validation Module
//!
//! Input validation for rule writes and order contexts.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure)                                           │
//! │  ├── names, rates, priorities, order amounts                           │
//! │  └── scope shape (state needs country, city needs state)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Rule Store (levy-db)                                         │
//! │  ├── geography ids exist and agree with each other                     │
//! │  ├── class name unique within its vendor scope                         │
//! │  └── single active class per scope                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── NOT NULL, foreign keys, CHECK (rate_bps >= 0, priority >= 0)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::order::OrderContext;
use crate::types::{GeoScope, NewTaxClassOption, TaxRate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted class or tax name.
pub const MAX_NAME_LEN: usize = 100;

/// Longest accepted postal code.
pub const MAX_POSTAL_CODE_LEN: usize = 20;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a tax class name and returns it trimmed.
///
/// ## Example
/// ```rust
/// use levy_core::validation::validate_class_name;
///
/// assert_eq!(validate_class_name("  Standard ").unwrap(), "Standard");
/// assert!(validate_class_name("").is_err());
/// ```
pub fn validate_class_name(name: &str) -> ValidationResult<String> {
    validate_name("name", name)
}

/// Validates a tax display label (e.g. "GST") and returns it trimmed.
pub fn validate_tax_name(name: &str) -> ValidationResult<String> {
    validate_name("tax_name", name)
}

fn validate_name(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(value.to_string())
}

/// Validates a UUID string format.
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a rule priority.
///
/// ## Rules
/// - Must be non-negative
/// - Must fit in u32
pub fn validate_priority(priority: i64) -> ValidationResult<u32> {
    if priority < 0 {
        return Err(ValidationError::non_negative("priority"));
    }

    u32::try_from(priority).map_err(|_| ValidationError::OutOfRange {
        field: "priority".to_string(),
        min: 0,
        max: u32::MAX as i64,
    })
}

/// Validates a percentage rate and converts it to basis points.
pub fn validate_rate(rate: f64) -> ValidationResult<TaxRate> {
    TaxRate::try_from_percentage(rate)
}

/// Largest subtotal or shipping cost accepted, in cents (one trillion
/// currency units).
pub const MAX_ORDER_AMOUNT_CENTS: i64 = 100_000_000_000_000;

/// Rejects negative subtotal or shipping cost, and amounts above
/// [`MAX_ORDER_AMOUNT_CENTS`].
pub fn validate_order_amounts(order: &OrderContext) -> ValidationResult<()> {
    validate_amount("subtotal", order.subtotal)?;
    validate_amount("shipping_cost", order.shipping_cost)
}

fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::non_negative(field));
    }

    if amount.cents() > MAX_ORDER_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_ORDER_AMOUNT_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Scope Validators
// =============================================================================

/// Normalizes and shape-checks a geographic scope.
///
/// ## Rules
/// - Blank fields become wildcards (`None`)
/// - A state requires a country, a city requires a state
/// - Postal code at most 20 characters
///
/// Whether the ids actually exist is checked by the Rule Store.
pub fn validate_scope(scope: &GeoScope) -> ValidationResult<GeoScope> {
    let scope = GeoScope {
        country_id: normalize(&scope.country_id),
        state_id: normalize(&scope.state_id),
        city_id: normalize(&scope.city_id),
        postal_code: normalize(&scope.postal_code),
    };

    if scope.state_id.is_some() && scope.country_id.is_none() {
        return Err(ValidationError::Inconsistent {
            field: "state_id".to_string(),
            reason: "a state requires a country_id".to_string(),
        });
    }

    if scope.city_id.is_some() && scope.state_id.is_none() {
        return Err(ValidationError::Inconsistent {
            field: "city_id".to_string(),
            reason: "a city requires a state_id".to_string(),
        });
    }

    if let Some(postal_code) = &scope.postal_code {
        if postal_code.chars().count() > MAX_POSTAL_CODE_LEN {
            return Err(ValidationError::TooLong {
                field: "postal_code".to_string(),
                max: MAX_POSTAL_CODE_LEN,
            });
        }
    }

    Ok(scope)
}

fn normalize(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Option Input
// =============================================================================

/// A [`NewTaxClassOption`] that passed every pure check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOption {
    pub class_id: String,
    pub tax_name: String,
    pub scope: GeoScope,
    pub priority: u32,
    pub is_compound: bool,
    pub is_shipping: bool,
    pub rate: TaxRate,
}

/// Runs all pure checks on an option write.
pub fn validate_new_option(input: &NewTaxClassOption) -> ValidationResult<ValidatedOption> {
    if input.class_id.trim().is_empty() {
        return Err(ValidationError::required("class_id"));
    }

    Ok(ValidatedOption {
        class_id: input.class_id.trim().to_string(),
        tax_name: validate_tax_name(&input.tax_name)?,
        scope: validate_scope(&input.scope)?,
        priority: validate_priority(input.priority)?,
        is_compound: input.is_compound,
        is_shipping: input.is_shipping,
        rate: validate_rate(input.rate)?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
