//! # Tax Class Repository
//!
//! Database operations for tax classes.
//!
//! ## Key Operations
//! - CRUD with soft delete (cascading to options)
//! - Single active class per vendor scope
//! - Filtered, sorted, paginated listing
//! - `find_active`: the Rule Store half of the Activation Resolver
//!
//! ## Single Active Class
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Activation Within One Scope                          │
//! │                                                                         │
//! │  activate(B)                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │    UPDATE tax_classes SET is_activated = 0                             │
//! │      WHERE vendor_id IS <scope> AND id != B  RETURNING id   → [A]      │
//! │    UPDATE tax_classes SET is_activated = 1 WHERE id = B                │
//! │  COMMIT                                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  warn!(deactivated = A)   ← conflict repaired, not rejected            │
//! │                                                                         │
//! │  find_active(scope) sees two actives anyway (e.g. a raw import)?       │
//! │    keep the most recently updated, deactivate the rest, warn!          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `vendor_id IS ?` is SQLite's NULL-safe equality, so the marketplace scope
//! (`vendor_id = NULL`) uses the same statements as vendor scopes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::tax_option::TaxClassOptionRepository;
use crate::repository::{Page, DEFAULT_PER_PAGE, MAX_PER_PAGE};
use levy_core::validation::validate_class_name;
use levy_core::{ActiveTaxClass, NewTaxClass, TaxClass, TaxClassUpdate, VendorScope};

const CLASS_COLUMNS: &str =
    "id, name, is_activated, vendor_id, deleted, deleted_at, created_at, updated_at";

// =============================================================================
// List Query
// =============================================================================

/// Column a class listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Filter, sort and pagination for [`TaxClassRepository::list`].
///
/// ## Example
/// ```rust,ignore
/// let query = TaxClassQuery::new()
///     .scope(VendorScope::Vendor("v-1".into()))
///     .name_contains("retail")
///     .sort_by(SortField::Name, SortDirection::Asc)
///     .page(2, 50);
/// let page = db.tax_classes().list(&query).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxClassQuery {
    /// Restrict to one owner scope; `None` lists every scope.
    pub scope: Option<VendorScope>,
    /// Case-insensitive substring of the class name.
    pub name_contains: Option<String>,
    pub is_activated: Option<bool>,
    pub sort: SortField,
    pub direction: SortDirection,
    /// 1-based; 0 is read as 1.
    pub page: u32,
    /// Clamped to `1..=100`.
    pub per_page: u32,
}

impl Default for TaxClassQuery {
    fn default() -> Self {
        TaxClassQuery {
            scope: None,
            name_contains: None,
            is_activated: None,
            sort: SortField::default(),
            direction: SortDirection::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl TaxClassQuery {
    pub fn new() -> Self {
        TaxClassQuery::default()
    }

    pub fn scope(mut self, scope: VendorScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn name_contains(mut self, fragment: impl Into<String>) -> Self {
        self.name_contains = Some(fragment.into());
        self
    }

    pub fn activated(mut self, is_activated: bool) -> Self {
        self.is_activated = Some(is_activated);
        self
    }

    pub fn sort_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort = field;
        self.direction = direction;
        self
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    pub fn effective_page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn effective_per_page(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    fn offset(&self) -> i64 {
        i64::from(self.effective_page() - 1) * i64::from(self.effective_per_page())
    }

    fn push_filters(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(scope) = &self.scope {
            qb.push(" AND vendor_id IS ")
                .push_bind(scope.vendor_id().map(str::to_string));
        }

        if let Some(fragment) = self.name_contains.as_deref().map(str::trim) {
            if !fragment.is_empty() {
                qb.push(" AND name LIKE ")
                    .push_bind(format!("%{}%", escape_like(fragment)))
                    .push(" ESCAPE '\\'");
            }
        }

        if let Some(is_activated) = self.is_activated {
            qb.push(" AND is_activated = ").push_bind(is_activated);
        }
    }
}

fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for tax class database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = TaxClassRepository::new(pool);
///
/// let class = repo.create(&NewTaxClass {
///     name: "Standard".into(),
///     vendor_id: None,
///     is_activated: true,
/// }).await?;
///
/// let active = repo.find_active(&VendorScope::Marketplace).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TaxClassRepository {
    pool: SqlitePool,
}

impl TaxClassRepository {
    /// Creates a new TaxClassRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TaxClassRepository { pool }
    }

    /// Gets a live (non-deleted) tax class by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(TaxClass))` - Class found
    /// * `Ok(None)` - Class not found or soft-deleted
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TaxClass>> {
        let mut conn = self.pool.acquire().await?;
        fetch_live(&mut *conn, id).await
    }

    /// Creates a tax class.
    ///
    /// A blank `vendor_id` is stored as the marketplace scope. When the new
    /// class is activated, every other active class of its scope is
    /// deactivated in the same transaction.
    ///
    /// ## Returns
    /// * `Ok(TaxClass)` - Inserted class
    /// * `Err(DbError::Validation)` - Blank or overlong name
    /// * `Err(DbError::UniqueViolation)` - Name taken in this scope
    pub async fn create(&self, input: &NewTaxClass) -> DbResult<TaxClass> {
        let name = validate_class_name(&input.name)?;
        let scope = VendorScope::from_vendor(input.vendor_id.as_deref());
        let now = Utc::now();

        let class = TaxClass {
            id: generate_tax_class_id(),
            name,
            is_activated: input.is_activated,
            vendor_id: scope.vendor_id().map(str::to_string),
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %class.id, scope = %scope, name = %class.name, "Creating tax class");

        let mut tx = self.pool.begin().await?;

        ensure_unique_name(&mut *tx, &scope, &class.name, None).await?;

        if class.is_activated {
            let deactivated = deactivate_others(&mut *tx, &scope, &class.id, now).await?;
            report_deactivated(&scope, &class.id, &deactivated);
        }

        sqlx::query(
            r#"
            INSERT INTO tax_classes (
                id, name, is_activated, vendor_id,
                deleted, deleted_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, ?6)
            "#,
        )
        .bind(&class.id)
        .bind(&class.name)
        .bind(class.is_activated)
        .bind(&class.vendor_id)
        .bind(class.created_at)
        .bind(class.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %class.id, scope = %scope, "Tax class created");
        Ok(class)
    }

    /// Renames and/or (de)activates a tax class.
    ///
    /// The owner scope never changes. Activating deactivates the rest of
    /// the scope in the same transaction.
    ///
    /// ## Returns
    /// * `Ok(TaxClass)` - Updated class
    /// * `Err(DbError::NotFound)` - Class doesn't exist or is deleted
    /// * `Err(DbError::UniqueViolation)` - New name taken in this scope
    pub async fn update(&self, id: &str, update: &TaxClassUpdate) -> DbResult<TaxClass> {
        debug!(id = %id, "Updating tax class");

        let mut tx = self.pool.begin().await?;

        let mut class = fetch_live(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("TaxClass", id))?;
        let scope = class.scope();
        let now = Utc::now();

        if let Some(name) = &update.name {
            let name = validate_class_name(name)?;
            ensure_unique_name(&mut *tx, &scope, &name, Some(&class.id)).await?;
            class.name = name;
        }

        if let Some(is_activated) = update.is_activated {
            if is_activated {
                let deactivated = deactivate_others(&mut *tx, &scope, &class.id, now).await?;
                report_deactivated(&scope, &class.id, &deactivated);
            }
            class.is_activated = is_activated;
        }

        class.updated_at = now;

        sqlx::query(
            r#"
            UPDATE tax_classes SET
                name = ?2,
                is_activated = ?3,
                updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&class.id)
        .bind(&class.name)
        .bind(class.is_activated)
        .bind(class.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(class)
    }

    /// Soft-deletes a tax class and all of its options.
    ///
    /// A deleted class is also deactivated, so its scope falls back to the
    /// marketplace default (or to zero tax).
    ///
    /// ## Returns
    /// * `Ok(TaxClass)` - The class as it was deleted
    /// * `Err(DbError::NotFound)` - Class doesn't exist or is already deleted
    pub async fn soft_delete(&self, id: &str) -> DbResult<TaxClass> {
        debug!(id = %id, "Soft-deleting tax class");

        let mut tx = self.pool.begin().await?;

        let mut class = fetch_live(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("TaxClass", id))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE tax_classes SET
                deleted = 1,
                is_activated = 0,
                deleted_at = ?2,
                updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let options = sqlx::query(
            r#"
            UPDATE tax_class_options SET
                deleted = 1,
                deleted_at = ?2,
                updated_at = ?2
            WHERE class_id = ?1 AND deleted = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            id = %id,
            options = options.rows_affected(),
            "Tax class soft-deleted with its options"
        );

        class.deleted = true;
        class.is_activated = false;
        class.deleted_at = Some(now);
        class.updated_at = now;
        Ok(class)
    }

    /// Lists live classes matching `query`.
    pub async fn list(&self, query: &TaxClassQuery) -> DbResult<Page<TaxClass>> {
        let mut count_qb =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM tax_classes WHERE deleted = 0");
        query.push_filters(&mut count_qb);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM tax_classes WHERE deleted = 0",
            CLASS_COLUMNS
        ));
        query.push_filters(&mut qb);
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            query.sort.column(),
            query.direction.keyword()
        ));
        qb.push(" LIMIT ")
            .push_bind(i64::from(query.effective_per_page()))
            .push(" OFFSET ")
            .push_bind(query.offset());

        let items = qb.build_query_as::<TaxClass>().fetch_all(&self.pool).await?;

        debug!(count = items.len(), total = total, "Listed tax classes");

        Ok(Page {
            items,
            total: total.max(0) as u64,
            page: query.effective_page(),
            per_page: query.effective_per_page(),
        })
    }

    /// Finds the active class of exactly this scope, joined with its live
    /// options in creation order. No marketplace fallback happens here.
    ///
    /// If the scope has more than one active class, the most recently
    /// updated one is kept and the others are deactivated before returning.
    pub async fn find_active(&self, scope: &VendorScope) -> DbResult<Option<ActiveTaxClass>> {
        let actives = sqlx::query_as::<_, TaxClass>(&format!(
            r#"
            SELECT {}
            FROM tax_classes
            WHERE vendor_id IS ?1 AND is_activated = 1 AND deleted = 0
            ORDER BY updated_at DESC, created_at DESC, id DESC
            "#,
            CLASS_COLUMNS
        ))
        .bind(scope.vendor_id())
        .fetch_all(&self.pool)
        .await?;

        let mut actives = actives.into_iter();
        let Some(class) = actives.next() else {
            debug!(scope = %scope, "No active tax class");
            return Ok(None);
        };

        let extra = actives.count();
        if extra != 0 {
            warn!(
                scope = %scope,
                kept = %class.id,
                extra,
                "Multiple active tax classes found, repairing"
            );
            let mut tx = self.pool.begin().await?;
            let deactivated = deactivate_others(&mut *tx, scope, &class.id, Utc::now()).await?;
            tx.commit().await?;
            report_deactivated(scope, &class.id, &deactivated);
        }

        let options = TaxClassOptionRepository::new(self.pool.clone())
            .list_active_by_class(&class.id)
            .await?;

        Ok(Some(ActiveTaxClass::new(class, options)?))
    }

    /// Counts live classes (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tax_classes WHERE deleted = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_live(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<TaxClass>> {
    let class = sqlx::query_as::<_, TaxClass>(&format!(
        "SELECT {} FROM tax_classes WHERE id = ?1 AND deleted = 0",
        CLASS_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(class)
}

async fn ensure_unique_name(
    conn: &mut SqliteConnection,
    scope: &VendorScope,
    name: &str,
    exclude_id: Option<&str>,
) -> DbResult<()> {
    let taken: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM tax_classes
        WHERE deleted = 0
          AND vendor_id IS ?1
          AND name = ?2 COLLATE NOCASE
          AND id IS NOT ?3
        "#,
    )
    .bind(scope.vendor_id())
    .bind(name)
    .bind(exclude_id)
    .fetch_one(&mut *conn)
    .await?;

    if taken > 0 {
        return Err(DbError::duplicate("name", name));
    }

    Ok(())
}

/// Deactivates every active class of `scope` except `keep_id`.
///
/// ## Returns
/// Ids of the classes that were deactivated.
async fn deactivate_others(
    conn: &mut SqliteConnection,
    scope: &VendorScope,
    keep_id: &str,
    now: DateTime<Utc>,
) -> DbResult<Vec<String>> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        UPDATE tax_classes SET
            is_activated = 0,
            updated_at = ?3
        WHERE vendor_id IS ?1
          AND id != ?2
          AND is_activated = 1
          AND deleted = 0
        RETURNING id
        "#,
    )
    .bind(scope.vendor_id())
    .bind(keep_id)
    .bind(now)
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

fn report_deactivated(scope: &VendorScope, kept: &str, deactivated: &[String]) {
    for id in deactivated {
        warn!(
            scope = %scope,
            activated = %kept,
            deactivated = %id,
            "Activation conflict repaired: previous active class deactivated"
        );
    }
}

/// Helper to generate a new tax class ID.
pub fn generate_tax_class_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> (Database, TaxClassRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tax_classes();
        (db, repo)
    }

    fn new_class(name: &str, vendor_id: Option<&str>, is_activated: bool) -> NewTaxClass {
        NewTaxClass {
            name: name.to_string(),
            vendor_id: vendor_id.map(str::to_string),
            is_activated,
        }
    }

    fn activate() -> TaxClassUpdate {
        TaxClassUpdate {
            name: None,
            is_activated: Some(true),
        }
    }

    fn rename(name: &str) -> TaxClassUpdate {
        TaxClassUpdate {
            name: Some(name.to_string()),
            is_activated: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_db, repo) = setup().await;

        let class = repo.create(&new_class("  Standard ", None, true)).await.unwrap();
        assert_eq!(class.name, "Standard");
        assert_eq!(class.vendor_id, None);

        let loaded = repo.get_by_id(&class.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, class.id);
        assert!(loaded.is_activated);
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_vendor_is_marketplace() {
        let (_db, repo) = setup().await;

        let class = repo.create(&new_class("Default", Some("  "), false)).await.unwrap();
        assert_eq!(class.vendor_id, None);
        assert_eq!(class.scope(), VendorScope::Marketplace);
    }

    #[tokio::test]
    async fn test_name_unique_per_scope() {
        let (_db, repo) = setup().await;

        repo.create(&new_class("Standard", None, false)).await.unwrap();
        repo.create(&new_class("Standard", Some("v-1"), false)).await.unwrap();
        repo.create(&new_class("Standard", Some("v-2"), false)).await.unwrap();

        let err = repo.create(&new_class("standard", Some("v-1"), false)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let err = repo.create(&new_class("", None, false)).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_deleted_name_can_be_reused() {
        let (_db, repo) = setup().await;

        let old = repo.create(&new_class("Standard", None, false)).await.unwrap();
        repo.soft_delete(&old.id).await.unwrap();
        repo.create(&new_class("Standard", None, false)).await.unwrap();
    }

    #[tokio::test]
    async fn test_activation_deactivates_previous_in_scope_only() {
        let (_db, repo) = setup().await;

        let a = repo.create(&new_class("A", Some("v-1"), true)).await.unwrap();
        let other = repo.create(&new_class("Other", Some("v-2"), true)).await.unwrap();
        let market = repo.create(&new_class("Market", None, true)).await.unwrap();

        let b = repo.create(&new_class("B", Some("v-1"), true)).await.unwrap();

        assert!(!repo.get_by_id(&a.id).await.unwrap().unwrap().is_activated);
        assert!(repo.get_by_id(&b.id).await.unwrap().unwrap().is_activated);
        assert!(repo.get_by_id(&other.id).await.unwrap().unwrap().is_activated);
        assert!(repo.get_by_id(&market.id).await.unwrap().unwrap().is_activated);

        // Switch back through update
        repo.update(&a.id, &activate()).await.unwrap();
        assert!(repo.get_by_id(&a.id).await.unwrap().unwrap().is_activated);
        assert!(!repo.get_by_id(&b.id).await.unwrap().unwrap().is_activated);
    }

    #[tokio::test]
    async fn test_update_rename() {
        let (_db, repo) = setup().await;

        let a = repo.create(&new_class("A", None, false)).await.unwrap();
        repo.create(&new_class("B", None, false)).await.unwrap();

        let renamed = repo.update(&a.id, &rename("Retail")).await.unwrap();
        assert_eq!(renamed.name, "Retail");

        // Renaming to itself is not a conflict
        repo.update(&a.id, &rename("Retail")).await.unwrap();

        let err = repo.update(&a.id, &rename("B")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let err = repo.update("missing", &TaxClassUpdate::default()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_soft_delete() {
        let (_db, repo) = setup().await;

        let class = repo.create(&new_class("Standard", None, true)).await.unwrap();
        let deleted = repo.soft_delete(&class.id).await.unwrap();
        assert!(deleted.deleted);
        assert!(!deleted.is_activated);
        assert!(deleted.deleted_at.is_some());

        assert!(repo.get_by_id(&class.id).await.unwrap().is_none());
        assert!(repo.find_active(&VendorScope::Marketplace).await.unwrap().is_none());
        assert!(repo.soft_delete(&class.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_find_active_repairs_double_activation() {
        let (db, repo) = setup().await;

        let older = repo.create(&new_class("Older", Some("v-1"), true)).await.unwrap();
        let newer = repo.create(&new_class("Newer", Some("v-1"), false)).await.unwrap();

        // Activate behind the repository's back.
        sqlx::query("UPDATE tax_classes SET is_activated = 1, updated_at = ?2 WHERE id = ?1")
            .bind(&newer.id)
            .bind(Utc::now() + chrono::Duration::seconds(5))
            .execute(db.pool())
            .await
            .unwrap();

        let scope = VendorScope::Vendor("v-1".to_string());
        let active = repo.find_active(&scope).await.unwrap().unwrap();
        assert_eq!(active.class.id, newer.id);

        let page = repo
            .list(&TaxClassQuery::new().scope(scope.clone()).activated(true))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(!repo.get_by_id(&older.id).await.unwrap().unwrap().is_activated);
    }

    #[tokio::test]
    async fn test_find_active_is_scope_exact() {
        let (_db, repo) = setup().await;

        repo.create(&new_class("Market", None, true)).await.unwrap();

        let vendor = VendorScope::Vendor("v-1".to_string());
        assert!(repo.find_active(&vendor).await.unwrap().is_none());
        assert!(repo.find_active(&VendorScope::Marketplace).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_filter_sort_paginate() {
        let (_db, repo) = setup().await;

        for name in ["Charlie", "alpha", "Bravo", "Delta_1"] {
            repo.create(&new_class(name, Some("v-1"), false)).await.unwrap();
        }
        repo.create(&new_class("Echo", Some("v-2"), true)).await.unwrap();

        let scope = VendorScope::Vendor("v-1".to_string());

        let page = repo
            .list(
                &TaxClassQuery::new()
                    .scope(scope.clone())
                    .sort_by(SortField::Name, SortDirection::Asc)
                    .page(1, 2),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages(), 2);
        let names: Vec<_> = page.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bravo", "Charlie"]);

        let page = repo
            .list(&TaxClassQuery::new().scope(scope.clone()).name_contains("HA"))
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        // '_' is literal, not a wildcard
        let page = repo
            .list(&TaxClassQuery::new().name_contains("a_"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Delta_1");

        let page = repo.list(&TaxClassQuery::new().activated(true)).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Echo");
    }

    #[tokio::test]
    async fn test_list_clamps_paging() {
        let (_db, repo) = setup().await;
        repo.create(&new_class("Only", None, false)).await.unwrap();

        let page = repo.list(&TaxClassQuery::new().page(0, 1000)).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, MAX_PER_PAGE);
        assert_eq!(page.items.len(), 1);

        let page = repo.list(&TaxClassQuery::new().page(3, 0)).await.unwrap();
        assert_eq!(page.per_page, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
