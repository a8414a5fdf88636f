//! # Database Pool Management
//!
//! Opens the SQLite rule store and hands out repositories over one shared
//! pool.
//!
//! ## Who Holds A Connection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SqlitePool (max_connections, acquire_timeout)                          │
//! │                                                                         │
//! │  compute_tax   ──► find_active            short read                    │
//! │  admin reads   ──► get / list             short read                    │
//! │  admin writes  ──► one transaction        activation, cascade delete    │
//! │                                                                         │
//! │  A caller that cannot get a connection within acquire_timeout sees      │
//! │  DbError::PoolExhausted, which the service retries once.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! WAL journaling lets checkout reads continue while an activation
//! transaction is open.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::geography::GeographyRepository;
use crate::repository::tax_class::TaxClassRepository;
use crate::repository::tax_option::TaxClassOptionRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings for the rule store.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/levy/levy.db")
///     .max_connections(8)
///     .acquire_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first use.
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// How long a caller waits for a free connection.
    /// Default: 30 seconds
    pub acquire_timeout: Duration,

    /// Idle connections above one are closed after this long.
    /// Default: 10 minutes
    pub idle_timeout: Duration,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Private in-memory store (for tests).
    ///
    /// An in-memory SQLite database lives and dies with its connection, so
    /// the pool is pinned to exactly one.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle on the migrated rule store.
///
/// Cheap to clone: every clone shares one pool. Repositories are created
/// on demand and hold their own pool handle.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("levy.db")).await?;
/// let active = db.tax_classes().find_active(&VendorScope::Marketplace).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the store and applies pending migrations.
    ///
    /// Connections run in WAL mode with NORMAL synchronous and foreign keys
    /// on; the option table's references to classes and geography depend
    /// on the latter.
    ///
    /// ## Returns
    /// * `Err(DbError::ConnectionFailed)` - bad path or unopenable file
    /// * `Err(DbError::MigrationFailed)` - schema could not be applied
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening rule store");

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(
            max_connections = config.max_connections,
            acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
            "Pool created"
        );

        migrations::run_migrations(&pool).await?;

        Ok(Database { pool })
    }

    /// Raw pool, for diagnostics and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn tax_classes(&self) -> TaxClassRepository {
        TaxClassRepository::new(self.pool.clone())
    }

    pub fn tax_options(&self) -> TaxClassOptionRepository {
        TaxClassOptionRepository::new(self.pool.clone())
    }

    pub fn geography(&self) -> GeographyRepository {
        GeographyRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        info!("Closing rule store");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
