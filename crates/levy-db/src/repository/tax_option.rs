//! # Tax Class Option Repository
//!
//! Database operations for the rules inside a tax class.
//!
//! Every write checks, in one transaction, that the parent class is live and
//! that the scope's geography ids exist and nest. The option's `vendor_id`
//! always mirrors its parent class.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::geography::check_scope_references;
use crate::repository::tax_class::fetch_live;
use levy_core::validation::{validate_new_option, ValidatedOption};
use levy_core::{NewTaxClassOption, TaxClass, TaxClassOption, TaxClassOptionUpdate, ValidationError};

const OPTION_COLUMNS: &str = "id, class_id, tax_name, country_id, state_id, city_id, postal_code, \
     priority, is_compound, is_shipping, rate_bps, vendor_id, \
     deleted, deleted_at, created_at, updated_at";

/// Repository for tax class option database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = TaxClassOptionRepository::new(pool);
///
/// let validated = validate_new_option(&input)?;
/// let option = repo.create(&validated).await?;
///
/// let live = repo.list_active_by_class(&option.class_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TaxClassOptionRepository {
    pool: SqlitePool,
}

impl TaxClassOptionRepository {
    /// Creates a new TaxClassOptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxClassOptionRepository { pool }
    }

    /// Gets a live option by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxClassOption>> {
        let mut conn = self.pool.acquire().await?;
        fetch_live_option(&mut *conn, id).await
    }

    /// Creates an option under a live class.
    ///
    /// ## Returns
    /// * `Ok(TaxClassOption)` - Inserted option
    /// * `Err(DbError::Validation)` - Unknown/deleted class, or bad geography
    pub async fn create(&self, input: &ValidatedOption) -> DbResult<TaxClassOption> {
        debug!(class_id = %input.class_id, tax_name = %input.tax_name, "Creating tax class option");

        let mut tx = self.pool.begin().await?;

        let class = parent_class(&mut *tx, &input.class_id).await?;
        check_scope_references(&mut *tx, &input.scope).await?;

        let now = Utc::now();
        let option = TaxClassOption {
            id: generate_tax_option_id(),
            class_id: class.id,
            tax_name: input.tax_name.clone(),
            scope: input.scope.clone(),
            priority: input.priority,
            is_compound: input.is_compound,
            is_shipping: input.is_shipping,
            rate: input.rate,
            vendor_id: class.vendor_id,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO tax_class_options (
                id, class_id, tax_name,
                country_id, state_id, city_id, postal_code,
                priority, is_compound, is_shipping, rate_bps, vendor_id,
                deleted, deleted_at, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12,
                0, NULL, ?13, ?14
            )
            "#,
        )
        .bind(&option.id)
        .bind(&option.class_id)
        .bind(&option.tax_name)
        .bind(&option.scope.country_id)
        .bind(&option.scope.state_id)
        .bind(&option.scope.city_id)
        .bind(&option.scope.postal_code)
        .bind(i64::from(option.priority))
        .bind(option.is_compound)
        .bind(option.is_shipping)
        .bind(i64::from(option.rate.bps()))
        .bind(&option.vendor_id)
        .bind(option.created_at)
        .bind(option.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %option.id,
            class_id = %option.class_id,
            rate = %option.rate,
            "Tax class option created"
        );
        Ok(option)
    }

    /// Applies a partial update.
    ///
    /// Unset fields keep their stored value; the merged option is validated
    /// as a whole, so an update can never leave an invalid rule behind.
    ///
    /// ## Returns
    /// * `Ok(TaxClassOption)` - Updated option
    /// * `Err(DbError::NotFound)` - Option doesn't exist or is deleted
    /// * `Err(DbError::Validation)` - Merged option is invalid
    pub async fn update(
        &self,
        id: &str,
        update: &TaxClassOptionUpdate,
    ) -> DbResult<TaxClassOption> {
        debug!(id = %id, "Updating tax class option");

        let mut tx = self.pool.begin().await?;

        let existing = fetch_live_option(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("TaxClassOption", id))?;

        let merged = validate_new_option(&NewTaxClassOption {
            class_id: existing.class_id.clone(),
            tax_name: update.tax_name.clone().unwrap_or(existing.tax_name),
            scope: update.scope.clone().unwrap_or(existing.scope),
            priority: update.priority.unwrap_or(i64::from(existing.priority)),
            is_compound: update.is_compound.unwrap_or(existing.is_compound),
            is_shipping: update.is_shipping.unwrap_or(existing.is_shipping),
            rate: update.rate.unwrap_or(existing.rate.percentage()),
        })?;

        check_scope_references(&mut *tx, &merged.scope).await?;

        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE tax_class_options SET
                tax_name = ?2,
                country_id = ?3,
                state_id = ?4,
                city_id = ?5,
                postal_code = ?6,
                priority = ?7,
                is_compound = ?8,
                is_shipping = ?9,
                rate_bps = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&merged.tax_name)
        .bind(&merged.scope.country_id)
        .bind(&merged.scope.state_id)
        .bind(&merged.scope.city_id)
        .bind(&merged.scope.postal_code)
        .bind(i64::from(merged.priority))
        .bind(merged.is_compound)
        .bind(merged.is_shipping)
        .bind(i64::from(merged.rate.bps()))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TaxClassOption {
            id: existing.id,
            class_id: existing.class_id,
            tax_name: merged.tax_name,
            scope: merged.scope,
            priority: merged.priority,
            is_compound: merged.is_compound,
            is_shipping: merged.is_shipping,
            rate: merged.rate,
            vendor_id: existing.vendor_id,
            deleted: false,
            deleted_at: None,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    /// Soft-deletes an option.
    ///
    /// ## Returns
    /// * `Ok(TaxClassOption)` - The option as it was deleted
    /// * `Err(DbError::NotFound)` - Option doesn't exist or is already deleted
    pub async fn soft_delete(&self, id: &str) -> DbResult<TaxClassOption> {
        debug!(id = %id, "Soft-deleting tax class option");

        let now = Utc::now();

        let option = sqlx::query_as::<_, TaxClassOption>(&format!(
            r#"
            UPDATE tax_class_options SET
                deleted = 1,
                deleted_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND deleted = 0
            RETURNING {}
            "#,
            OPTION_COLUMNS
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        option.ok_or_else(|| DbError::not_found("TaxClassOption", id))
    }

    /// Every option ever created under a class, soft-deleted ones included,
    /// in creation order. Used to explain historical breakdowns.
    pub async fn list_by_class(&self, class_id: &str) -> DbResult<Vec<TaxClassOption>> {
        let options = sqlx::query_as::<_, TaxClassOption>(&format!(
            r#"
            SELECT {}
            FROM tax_class_options
            WHERE class_id = ?1
            ORDER BY created_at ASC, rowid ASC
            "#,
            OPTION_COLUMNS
        ))
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(options)
    }

    /// Live options of a class in creation order: what the composer sees.
    pub async fn list_active_by_class(&self, class_id: &str) -> DbResult<Vec<TaxClassOption>> {
        let options = sqlx::query_as::<_, TaxClassOption>(&format!(
            r#"
            SELECT {}
            FROM tax_class_options
            WHERE class_id = ?1 AND deleted = 0
            ORDER BY created_at ASC, rowid ASC
            "#,
            OPTION_COLUMNS
        ))
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        debug!(class_id = %class_id, count = options.len(), "Loaded live options");
        Ok(options)
    }
}

async fn fetch_live_option(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<TaxClassOption>> {
    let option = sqlx::query_as::<_, TaxClassOption>(&format!(
        "SELECT {} FROM tax_class_options WHERE id = ?1 AND deleted = 0",
        OPTION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(option)
}

/// The live class an option write targets; a missing parent is bad input.
async fn parent_class(conn: &mut SqliteConnection, class_id: &str) -> DbResult<TaxClass> {
    fetch_live(conn, class_id).await?.ok_or_else(|| {
        ValidationError::UnknownReference {
            field: "class_id".to_string(),
            entity: "TaxClass".to_string(),
            id: class_id.to_string(),
        }
        .into()
    })
}

/// Helper to generate a new option ID.
pub fn generate_tax_option_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
