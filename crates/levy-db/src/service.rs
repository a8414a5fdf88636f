//! # Tax Service
//!
//! The boundary collaborators call: checkout computes tax, the admin API
//! manages rules.
//!
//! ## Request Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          TaxService                                     │
//! │                                                                         │
//! │  compute_tax(order)                                                    │
//! │    validate amounts ─► resolver ─► compose(options, order, rounding)   │
//! │                          │                                             │
//! │                          └─ NotFound ─► warn! + zero breakdown         │
//! │                                                                         │
//! │  create/update/delete class or option                                  │
//! │    Rule Store write ─► invalidate(owner scope) ─► return               │
//! │                                                                         │
//! │  The write is acknowledged only after its scope's cache entry is gone, │
//! │  so the author's next read always sees it.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use levy_core::validation::{validate_new_option, validate_order_amounts};
use levy_core::{
    compose, ActiveTaxClass, NewTaxClass, NewTaxClassOption, OrderContext, RoundingMode,
    TaxBreakdown, TaxClass, TaxClassOption, TaxClassOptionUpdate, TaxClassUpdate, VendorScope,
};
use tracing::{debug, info, warn};

use crate::cache::{build_cache, TaxClassCache};
use crate::config::LevyConfig;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::tax_class::TaxClassQuery;
use crate::repository::Page;
use crate::resolver::ActivationResolver;
use crate::retry::retry_once;

/// Tax resolution and rule management over one database and one cache.
///
/// ## Usage
/// ```rust,ignore
/// let service = TaxService::connect(&LevyConfig::load()?).await?;
///
/// let breakdown = service.compute_tax(&order).await?;
/// println!("tax: {}", breakdown.total_tax);
/// ```
#[derive(Clone)]
pub struct TaxService {
    db: Database,
    resolver: ActivationResolver,
    rounding: RoundingMode,
}

impl TaxService {
    pub fn new(db: Database, cache: Arc<dyn TaxClassCache>, rounding: RoundingMode) -> Self {
        let resolver = ActivationResolver::new(db.tax_classes(), cache);
        TaxService {
            db,
            resolver,
            rounding,
        }
    }

    /// Opens the database, runs migrations and picks the cache backend.
    pub async fn connect(config: &LevyConfig) -> DbResult<Self> {
        let db = Database::new(config.db_config()).await?;
        let cache = build_cache(config.redis_url.as_deref(), config.cache_ttl).await?;

        info!(rounding = %config.rounding, "Tax service ready");
        Ok(TaxService::new(db, cache, config.rounding))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Active class for a vendor, falling back to the marketplace default.
    pub async fn resolve_active_class(&self, vendor_id: Option<&str>) -> DbResult<ActiveTaxClass> {
        self.resolver.resolve_active_class(vendor_id).await
    }

    /// Computes the tax breakdown for an order.
    ///
    /// A missing tax class never fails checkout: the order gets a zero
    /// breakdown and a warning goes to the logs for vendor follow-up.
    ///
    /// ## Returns
    /// * `Err(DbError::Validation)` - negative subtotal or shipping cost
    /// * `Err(..)` - storage failure after one retry
    pub async fn compute_tax(&self, order: &OrderContext) -> DbResult<TaxBreakdown> {
        validate_order_amounts(order)?;

        let active = match self.resolver.resolve_active_class(order.vendor_id.as_deref()).await {
            Ok(active) => active,
            Err(DbError::NotFound { .. }) => {
                warn!(
                    vendor_id = ?order.vendor_id,
                    "No active tax class for vendor or marketplace, applying zero tax"
                );
                return Ok(TaxBreakdown::zero(order));
            }
            Err(err) => return Err(err),
        };

        let breakdown =
            compose(&active.options, order, self.rounding)?.with_tax_class(active.class.id.clone());

        debug!(
            vendor_id = ?order.vendor_id,
            class_id = %active.class.id,
            lines = breakdown.lines.len(),
            total_tax = %breakdown.total_tax,
            "Tax computed"
        );
        Ok(breakdown)
    }

    /// Composes `order` against a specific class, active or not.
    ///
    /// Lets an admin check a draft class before activating it. Bypasses the
    /// cache and the vendor fallback.
    pub async fn preview_tax(
        &self,
        class_id: &str,
        order: &OrderContext,
    ) -> DbResult<TaxBreakdown> {
        validate_order_amounts(order)?;

        let class = self.get_class(class_id).await?;
        let options = self.list_options(&class.id).await?;

        Ok(compose(&options, order, self.rounding)?.with_tax_class(class.id))
    }

    // =========================================================================
    // Tax Classes
    // =========================================================================

    pub async fn create_class(&self, input: NewTaxClass) -> DbResult<TaxClass> {
        let class = self.db.tax_classes().create(&input).await?;
        self.resolver.invalidate(&class.scope()).await?;
        Ok(class)
    }

    /// Renames and/or (de)activates a class.
    pub async fn update_class(&self, id: &str, update: TaxClassUpdate) -> DbResult<TaxClass> {
        let class = self.db.tax_classes().update(id, &update).await?;
        self.resolver.invalidate(&class.scope()).await?;
        Ok(class)
    }

    /// Soft-deletes a class together with its options.
    pub async fn delete_class(&self, id: &str) -> DbResult<TaxClass> {
        let class = self.db.tax_classes().soft_delete(id).await?;
        self.resolver.invalidate(&class.scope()).await?;
        Ok(class)
    }

    pub async fn get_class(&self, id: &str) -> DbResult<TaxClass> {
        let classes = self.db.tax_classes();
        retry_once("get_class", || classes.get_by_id(id))
            .await?
            .ok_or_else(|| DbError::not_found("TaxClass", id))
    }

    pub async fn list_classes(&self, query: &TaxClassQuery) -> DbResult<Page<TaxClass>> {
        let classes = self.db.tax_classes();
        retry_once("list_classes", || classes.list(query)).await
    }

    // =========================================================================
    // Tax Class Options
    // =========================================================================

    pub async fn create_option(&self, input: NewTaxClassOption) -> DbResult<TaxClassOption> {
        let validated = validate_new_option(&input)?;
        let option = self.db.tax_options().create(&validated).await?;
        self.invalidate_option_scope(&option).await?;
        Ok(option)
    }

    pub async fn update_option(
        &self,
        id: &str,
        update: TaxClassOptionUpdate,
    ) -> DbResult<TaxClassOption> {
        let option = self.db.tax_options().update(id, &update).await?;
        self.invalidate_option_scope(&option).await?;
        Ok(option)
    }

    pub async fn delete_option(&self, id: &str) -> DbResult<TaxClassOption> {
        let option = self.db.tax_options().soft_delete(id).await?;
        self.invalidate_option_scope(&option).await?;
        Ok(option)
    }

    /// Live options of a class in creation order.
    pub async fn list_options(&self, class_id: &str) -> DbResult<Vec<TaxClassOption>> {
        let options = self.db.tax_options();
        retry_once("list_options", || options.list_active_by_class(class_id)).await
    }

    /// Every option of a class, soft-deleted ones included.
    pub async fn option_history(&self, class_id: &str) -> DbResult<Vec<TaxClassOption>> {
        let options = self.db.tax_options();
        retry_once("option_history", || options.list_by_class(class_id)).await
    }

    async fn invalidate_option_scope(&self, option: &TaxClassOption) -> DbResult<()> {
        let scope = VendorScope::from_vendor(option.vendor_id.as_deref());
        self.resolver.invalidate(&scope).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
