//! # Active Tax Class Cache
//!
//! Short-lived cache of "active class + options" per vendor scope.
//!
//! ## Cache Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scope-Keyed Cache                                  │
//! │                                                                         │
//! │  Key: VendorScope          Value: ScopeEntry { active: Option<..> }    │
//! │  ─────────────────          ─────────────────────────────────────       │
//! │  marketplace          ──►  Some(default class + options)               │
//! │  vendor:v-1           ──►  Some(v-1 class + options)                   │
//! │  vendor:v-2           ──►  None  (negative entry: no class of its own) │
//! │                                                                         │
//! │  read  ─► miss ─► Rule Store ─► put                                    │
//! │  write ─► Rule Store ─► invalidate(scope) ─► acknowledge               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are deleted on writes, never updated in place. Each entry depends
//! only on its own scope's records, so a marketplace write never has to touch
//! vendor entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use levy_core::{ActiveTaxClass, VendorScope};
use redis::{aio::ConnectionManager, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Errors raised by a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend failed: {0}")]
    Backend(String),

    #[error("cache value could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

pub type CacheResult<T> = Result<T, CacheError>;

/// What the Rule Store said about one scope when the entry was filled.
///
/// `active: None` is a negative entry: the scope has no active class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeEntry {
    pub active: Option<ActiveTaxClass>,
}

impl ScopeEntry {
    pub fn found(active: ActiveTaxClass) -> Self {
        ScopeEntry {
            active: Some(active),
        }
    }

    pub fn missing() -> Self {
        ScopeEntry { active: None }
    }
}

/// Cache of active tax classes keyed by vendor scope.
///
/// `get` returns `Ok(None)` on a miss and `Ok(Some(entry))` on a hit.
#[async_trait]
pub trait TaxClassCache: Send + Sync {
    async fn get(&self, scope: &VendorScope) -> CacheResult<Option<ScopeEntry>>;

    async fn put(&self, scope: &VendorScope, entry: ScopeEntry) -> CacheResult<()>;

    async fn invalidate(&self, scope: &VendorScope) -> CacheResult<()>;
}

// =============================================================================
// In-Memory Cache
// =============================================================================

/// Process-local cache for tests and single-node deployments.
#[derive(Debug)]
pub struct InMemoryTaxClassCache {
    ttl: Duration,
    entries: RwLock<HashMap<VendorScope, (Instant, ScopeEntry)>>,
}

impl InMemoryTaxClassCache {
    pub fn new(ttl: Duration) -> Self {
        InMemoryTaxClassCache {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries. Expired ones linger until the next `put`
    /// or a `get` of their scope.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryTaxClassCache {
    fn default() -> Self {
        InMemoryTaxClassCache::new(Duration::from_secs(300))
    }
}

#[async_trait]
impl TaxClassCache for InMemoryTaxClassCache {
    async fn get(&self, scope: &VendorScope) -> CacheResult<Option<ScopeEntry>> {
        {
            let entries = self.entries.read().await;
            match entries.get(scope) {
                None => return Ok(None),
                Some((stored_at, entry)) if stored_at.elapsed() < self.ttl => {
                    return Ok(Some(entry.clone()));
                }
                Some(_) => {}
            }
        }

        // Expired: drop it unless a fresh put raced in
        let mut entries = self.entries.write().await;
        if let Some((stored_at, _)) = entries.get(scope) {
            if stored_at.elapsed() >= self.ttl {
                entries.remove(scope);
            }
        }
        Ok(None)
    }

    async fn put(&self, scope: &VendorScope, entry: ScopeEntry) -> CacheResult<()> {
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        entries.insert(scope.clone(), (Instant::now(), entry));
        Ok(())
    }

    async fn invalidate(&self, scope: &VendorScope) -> CacheResult<()> {
        self.entries.write().await.remove(scope);
        Ok(())
    }
}

// =============================================================================
// Redis Cache
// =============================================================================

/// Shared cache for multi-node deployments.
///
/// Values are JSON-encoded [`ScopeEntry`] stored under `levy:active:<scope>`
/// with `SET .. EX ttl`; invalidation is a `DEL`.
#[derive(Clone)]
pub struct RedisTaxClassCache {
    _client: Client,
    manager: ConnectionManager,
    ttl_secs: u64,
}

impl RedisTaxClassCache {
    pub async fn connect(url: &str, ttl: Duration) -> CacheResult<Self> {
        info!(url = %url, "Connecting to Redis cache");
        let client = Client::open(url)?;

        // ConnectionManager reconnects on its own.
        let manager = client.get_connection_manager().await?;

        info!("Redis cache connected");

        Ok(RedisTaxClassCache {
            _client: client,
            manager,
            ttl_secs: ttl.as_secs().max(1),
        })
    }

    pub fn key(scope: &VendorScope) -> String {
        format!("levy:active:{}", scope)
    }
}

#[async_trait]
impl TaxClassCache for RedisTaxClassCache {
    async fn get(&self, scope: &VendorScope) -> CacheResult<Option<ScopeEntry>> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(scope))
            .query_async(&mut conn)
            .await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, scope: &VendorScope, entry: ScopeEntry) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let json = serde_json::to_string(&entry)?;

        let _: () = redis::cmd("SET")
            .arg(Self::key(scope))
            .arg(json)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, scope: &VendorScope) -> CacheResult<()> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(Self::key(scope))
            .query_async(&mut conn)
            .await?;
        debug!(scope = %scope, "Invalidated cached active class");
        Ok(())
    }
}

/// Picks the cache backend: Redis when a URL is configured, memory otherwise.
pub async fn build_cache(
    redis_url: Option<&str>,
    ttl: Duration,
) -> DbResult<Arc<dyn TaxClassCache>> {
    match redis_url {
        Some(url) => {
            let cache = RedisTaxClassCache::connect(url, ttl)
                .await
                .map_err(|e| DbError::Cache(e.to_string()))?;
            Ok(Arc::new(cache))
        }
        None => {
            info!(ttl_secs = ttl.as_secs(), "Using in-memory tax class cache");
            Ok(Arc::new(InMemoryTaxClassCache::new(ttl)))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use levy_core::TaxClass;

    fn active(vendor_id: Option<&str>) -> ActiveTaxClass {
        let now = Utc::now();
        let class = TaxClass {
            id: "c-1".to_string(),
            name: "Standard".to_string(),
            is_activated: true,
            vendor_id: vendor_id.map(str::to_string),
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        ActiveTaxClass::new(class, Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_put_get_invalidate() {
        let cache = InMemoryTaxClassCache::default();
        let scope = VendorScope::Vendor("v-1".to_string());

        assert_eq!(cache.get(&scope).await.unwrap(), None);

        cache
            .put(&scope, ScopeEntry::found(active(Some("v-1"))))
            .await
            .unwrap();
        let hit = cache.get(&scope).await.unwrap().unwrap();
        assert_eq!(hit.active.unwrap().class.id, "c-1");

        cache.invalidate(&scope).await.unwrap();
        assert_eq!(cache.get(&scope).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_negative_entries_are_hits() {
        let cache = InMemoryTaxClassCache::default();
        let scope = VendorScope::Vendor("v-2".to_string());

        cache.put(&scope, ScopeEntry::missing()).await.unwrap();
        assert_eq!(cache.get(&scope).await.unwrap(), Some(ScopeEntry::missing()));
    }

    #[tokio::test]
    async fn test_in_memory_scopes_are_independent() {
        let cache = InMemoryTaxClassCache::default();
        let vendor = VendorScope::Vendor("v-1".to_string());

        cache.put(&VendorScope::Marketplace, ScopeEntry::found(active(None))).await.unwrap();
        cache.put(&vendor, ScopeEntry::missing()).await.unwrap();

        cache.invalidate(&VendorScope::Marketplace).await.unwrap();
        assert_eq!(cache.get(&VendorScope::Marketplace).await.unwrap(), None);
        assert!(cache.get(&vendor).await.unwrap().is_some());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_in_memory_entries_expire() {
        let cache = InMemoryTaxClassCache::new(Duration::ZERO);
        cache.put(&VendorScope::Marketplace, ScopeEntry::missing()).await.unwrap();
        assert_eq!(cache.get(&VendorScope::Marketplace).await.unwrap(), None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_in_memory_put_sweeps_expired_scopes() {
        let cache = InMemoryTaxClassCache::new(Duration::from_millis(20));
        for n in 0..10 {
            let scope = VendorScope::Vendor(format!("v-{}", n));
            cache.put(&scope, ScopeEntry::missing()).await.unwrap();
        }
        assert_eq!(cache.len().await, 10);

        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.put(&VendorScope::Marketplace, ScopeEntry::missing()).await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&VendorScope::Marketplace).await.unwrap().is_some());
    }

    #[test]
    fn test_redis_keys() {
        assert_eq!(
            RedisTaxClassCache::key(&VendorScope::Marketplace),
            "levy:active:marketplace"
        );
        assert_eq!(
            RedisTaxClassCache::key(&VendorScope::Vendor("v-9".to_string())),
            "levy:active:vendor:v-9"
        );
    }

    #[test]
    fn test_scope_entry_json() {
        let json = serde_json::to_string(&ScopeEntry::missing()).unwrap();
        assert_eq!(json, r#"{"active":null}"#);
        let back: ScopeEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ScopeEntry::missing());
    }

    #[tokio::test]
    async fn test_build_cache_defaults_to_memory() {
        let cache = build_cache(None, Duration::from_secs(60)).await.unwrap();
        cache.put(&VendorScope::Marketplace, ScopeEntry::missing()).await.unwrap();
        assert!(cache.get(&VendorScope::Marketplace).await.unwrap().is_some());
    }
}
