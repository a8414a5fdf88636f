//! # Tax Class Activation Resolver
//!
//! Picks the rule-set that governs an order: the vendor's own active class,
//! else the marketplace default, else nothing.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    resolve_active_class(vendor_id)                      │
//! │                                                                         │
//! │  scope = Vendor(id) ───► lookup(scope)                                 │
//! │                            │ cache hit?  ── yes ──► entry              │
//! │                            │ no                                        │
//! │                            ▼                                           │
//! │                          find_active(scope)  (retried once)            │
//! │                            │                                           │
//! │                            ▼                                           │
//! │                          cache.put(scope, entry)   ← negative too      │
//! │                                                                         │
//! │  entry empty? ──► lookup(Marketplace)  (same steps)                    │
//! │  still empty? ──► DbError::NotFound   (caller applies zero tax)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolver never writes rules. Cache trouble on the read path is
//! logged and absorbed; only invalidation failures surface, because a
//! stale entry after a write would hide that write from its author.

use std::sync::Arc;

use levy_core::{ActiveTaxClass, VendorScope};
use tracing::{debug, warn};

use crate::cache::{ScopeEntry, TaxClassCache};
use crate::error::{DbError, DbResult};
use crate::repository::tax_class::TaxClassRepository;
use crate::retry::retry_once;

/// Resolves the active tax class for a vendor, through the cache.
#[derive(Clone)]
pub struct ActivationResolver {
    classes: TaxClassRepository,
    cache: Arc<dyn TaxClassCache>,
}

impl ActivationResolver {
    pub fn new(classes: TaxClassRepository, cache: Arc<dyn TaxClassCache>) -> Self {
        ActivationResolver { classes, cache }
    }

    /// Returns the active class (with live options) that applies to
    /// `vendor_id`, falling back to the marketplace default.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - neither scope has an active class
    pub async fn resolve_active_class(&self, vendor_id: Option<&str>) -> DbResult<ActiveTaxClass> {
        let scope = VendorScope::from_vendor(vendor_id);

        if let Some(active) = self.lookup(&scope).await? {
            return Ok(active);
        }

        if !scope.is_marketplace() {
            debug!(scope = %scope, "No vendor class, falling back to marketplace default");
            if let Some(active) = self.lookup(&VendorScope::Marketplace).await? {
                return Ok(active);
            }
        }

        Err(DbError::not_found("active TaxClass", scope.to_string()))
    }

    /// Drops the cached entry of `scope`, retrying once on failure.
    pub async fn invalidate(&self, scope: &VendorScope) -> DbResult<()> {
        if let Err(first) = self.cache.invalidate(scope).await {
            warn!(scope = %scope, error = %first, "Cache invalidation failed, retrying once");
            self.cache.invalidate(scope).await?;
        }
        debug!(scope = %scope, "Cache entry invalidated");
        Ok(())
    }

    /// Active class of exactly `scope`, no fallback.
    async fn lookup(&self, scope: &VendorScope) -> DbResult<Option<ActiveTaxClass>> {
        match self.cache.get(scope).await {
            Ok(Some(entry)) => {
                debug!(scope = %scope, "Active class cache hit");
                return Ok(entry.active);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(scope = %scope, error = %err, "Cache read failed, reading the rule store");
            }
        }

        let active = retry_once("find_active", || self.classes.find_active(scope)).await?;

        let entry = match &active {
            Some(found) => ScopeEntry::found(found.clone()),
            None => ScopeEntry::missing(),
        };
        if let Err(err) = self.cache.put(scope, entry).await {
            warn!(scope = %scope, error = %err, "Cache populate failed, continuing uncached");
        }

        Ok(active)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryTaxClassCache;
    use crate::pool::{Database, DbConfig};
    use levy_core::NewTaxClass;

    async fn setup() -> (Database, Arc<InMemoryTaxClassCache>, ActivationResolver) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let cache = Arc::new(InMemoryTaxClassCache::default());
        let resolver = ActivationResolver::new(db.tax_classes(), cache.clone());
        (db, cache, resolver)
    }

    async fn create(db: &Database, name: &str, vendor_id: Option<&str>) -> String {
        db.tax_classes()
            .create(&NewTaxClass {
                name: name.to_string(),
                vendor_id: vendor_id.map(str::to_string),
                is_activated: true,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_vendor_class_wins() {
        let (db, _cache, resolver) = setup().await;
        create(&db, "Market", None).await;
        let vendor_class = create(&db, "Vendor", Some("v-1")).await;

        let active = resolver.resolve_active_class(Some("v-1")).await.unwrap();
        assert_eq!(active.class.id, vendor_class);
    }

    #[tokio::test]
    async fn test_falls_back_to_marketplace() {
        let (db, cache, resolver) = setup().await;
        let market = create(&db, "Market", None).await;

        let active = resolver.resolve_active_class(Some("v-9")).await.unwrap();
        assert_eq!(active.class.id, market);

        // Both scopes are cached: the vendor one as a negative entry.
        let vendor_entry = cache.get(&VendorScope::Vendor("v-9".into())).await.unwrap();
        assert_eq!(vendor_entry, Some(ScopeEntry::missing()));
        assert!(cache.get(&VendorScope::Marketplace).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_not_found_without_any_class() {
        let (_db, _cache, resolver) = setup().await;

        assert!(resolver.resolve_active_class(Some("v-1")).await.unwrap_err().is_not_found());
        assert!(resolver.resolve_active_class(None).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_cache_serves_until_invalidated() {
        let (db, _cache, resolver) = setup().await;
        let first = create(&db, "First", None).await;
        assert_eq!(resolver.resolve_active_class(None).await.unwrap().class.id, first);

        // Written behind the resolver: the cached entry still answers.
        let second = create(&db, "Second", None).await;
        assert_eq!(resolver.resolve_active_class(None).await.unwrap().class.id, first);

        resolver.invalidate(&VendorScope::Marketplace).await.unwrap();
        assert_eq!(resolver.resolve_active_class(None).await.unwrap().class.id, second);
    }
}
