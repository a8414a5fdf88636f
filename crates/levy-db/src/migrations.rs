//! # Rule Store Schema
//!
//! The SQL under `migrations/sqlite/` is compiled into the crate and applied
//! by [`Database::new`](crate::pool::Database::new) before any repository
//! is handed out.
//!
//! ```text
//!  001_initial_schema.sql
//!    countries ◄── states ◄── cities
//!        ▲            ▲          ▲
//!        └────────────┴──────────┴──── tax_class_options ───► tax_classes
//! ```
//!
//! Schema changes go in a new numbered file; an applied file is never
//! edited, since sqlx checks its checksum on every start.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every pending migration, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(migrations = MIGRATOR.migrations.len(), "Rule store schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    // _sqlx_migrations only exists after the first run
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied.max(0) as usize))
}
