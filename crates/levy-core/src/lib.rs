//! # levy-core: Pure Tax Resolution Logic
//!
//! This crate is the **heart** of Levy. It decides which tax rules apply to
//! an order and what they cost, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Levy Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Collaborators (checkout, admin API, refunds)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ OrderContext / TaxBreakdown            │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        levy-db: TaxService, Rule Store, Resolver, Cache         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ActiveTaxClass (plain values)          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ levy-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌───────────┐ ┌─────────┐ │   │
//! │  │  │ jurisdiction │  │   compose    │  │   money   │ │validation│ │   │
//! │  │  │   matches()  │─►│  compose()   │─►│ rounding  │ │  rules   │ │   │
//! │  │  └──────────────┘  └──────────────┘  └───────────┘ └─────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CACHE • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Rule records (TaxClass, TaxClassOption, geography, inputs)
//! - [`order`] - OrderContext in, TaxBreakdown out
//! - [`money`] - Integer money and the rounding configuration point
//! - [`jurisdiction`] - Jurisdiction Matcher
//! - [`compose`] - Tax Composer
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use levy_core::{compose, GeoScope, Jurisdiction, Money, OrderContext, RoundingMode, TaxClassOption, TaxRate};
//!
//! let now = Utc::now();
//! let gst = TaxClassOption {
//!     id: "gst".into(),
//!     class_id: "standard".into(),
//!     tax_name: "GST".into(),
//!     scope: GeoScope::country("AU"),
//!     priority: 1,
//!     is_compound: false,
//!     is_shipping: false,
//!     rate: TaxRate::from_bps(1000),
//!     vendor_id: None,
//!     deleted: false,
//!     deleted_at: None,
//!     created_at: now,
//!     updated_at: now,
//! };
//!
//! let order = OrderContext::new(
//!     Money::from_cents(100_000),
//!     Money::from_cents(5_000),
//!     Jurisdiction::country("AU"),
//! );
//!
//! let breakdown = compose(&[gst], &order, RoundingMode::HalfUp).unwrap();
//! assert_eq!(breakdown.total_tax.cents(), 10_000);
//! assert_eq!(breakdown.grand_total.cents(), 115_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod compose;
pub mod error;
pub mod jurisdiction;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use compose::compose;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, RoundingMode};
pub use order::{Jurisdiction, OrderContext, TaxBreakdown, TaxLine};
pub use types::*;
