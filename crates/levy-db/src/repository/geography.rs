//! # Geography Repository
//!
//! Countries, states and cities that option scopes refer to.
//!
//! Geography is reference data: rows are inserted by seeding or an import
//! job and never soft-deleted. Its one job in tax resolution is to reject
//! option scopes that point at places that do not exist or do not nest.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use levy_core::{City, Country, GeoScope, State, ValidationError};

/// Repository for geography reference data.
#[derive(Debug, Clone)]
pub struct GeographyRepository {
    pool: SqlitePool,
}

impl GeographyRepository {
    /// Creates a new GeographyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        GeographyRepository { pool }
    }

    /// Inserts a country.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - id already exists
    pub async fn insert_country(&self, country: &Country) -> DbResult<()> {
        debug!(id = %country.id, "Inserting country");

        sqlx::query("INSERT INTO countries (id, name) VALUES (?1, ?2)")
            .bind(&country.id)
            .bind(&country.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts a state.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - country doesn't exist
    pub async fn insert_state(&self, state: &State) -> DbResult<()> {
        debug!(id = %state.id, country_id = %state.country_id, "Inserting state");

        sqlx::query("INSERT INTO states (id, country_id, name) VALUES (?1, ?2, ?3)")
            .bind(&state.id)
            .bind(&state.country_id)
            .bind(&state.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Inserts a city.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - state doesn't exist
    pub async fn insert_city(&self, city: &City) -> DbResult<()> {
        debug!(id = %city.id, state_id = %city.state_id, "Inserting city");

        sqlx::query("INSERT INTO cities (id, state_id, name) VALUES (?1, ?2, ?3)")
            .bind(&city.id)
            .bind(&city.state_id)
            .bind(&city.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn get_country(&self, id: &str) -> DbResult<Option<Country>> {
        let mut conn = self.pool.acquire().await?;
        fetch_country(&mut *conn, id).await
    }

    pub async fn get_state(&self, id: &str) -> DbResult<Option<State>> {
        let mut conn = self.pool.acquire().await?;
        fetch_state(&mut *conn, id).await
    }

    pub async fn get_city(&self, id: &str) -> DbResult<Option<City>> {
        let mut conn = self.pool.acquire().await?;
        fetch_city(&mut *conn, id).await
    }

    /// Lists the states of a country, ordered by name.
    pub async fn list_states(&self, country_id: &str) -> DbResult<Vec<State>> {
        let states = sqlx::query_as::<_, State>(
            "SELECT id, country_id, name FROM states WHERE country_id = ?1 ORDER BY name",
        )
        .bind(country_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(states)
    }

    /// Checks that every id in `scope` exists and that they nest.
    ///
    /// ## Rules
    /// - `country_id`, `state_id`, `city_id` must each exist when set
    /// - the state must belong to the country
    /// - the city must belong to the state
    ///
    /// `postal_code` is free text and not checked here.
    pub async fn validate_scope(&self, scope: &GeoScope) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        check_scope_references(&mut *conn, scope).await
    }
}

/// [`GeographyRepository::validate_scope`] on an existing connection, so
/// option writes can run it inside their own transaction.
pub(crate) async fn check_scope_references(
    conn: &mut SqliteConnection,
    scope: &GeoScope,
) -> DbResult<()> {
    if let Some(country_id) = &scope.country_id {
        if fetch_country(conn, country_id).await?.is_none() {
            return Err(unknown("country_id", "Country", country_id));
        }
    }

    if let Some(state_id) = &scope.state_id {
        let state = fetch_state(conn, state_id)
            .await?
            .ok_or_else(|| unknown("state_id", "State", state_id))?;

        if let Some(country_id) = &scope.country_id {
            if &state.country_id != country_id {
                return Err(ValidationError::Inconsistent {
                    field: "state_id".to_string(),
                    reason: format!("state '{}' is not in country '{}'", state_id, country_id),
                }
                .into());
            }
        }
    }

    if let Some(city_id) = &scope.city_id {
        let city = fetch_city(conn, city_id)
            .await?
            .ok_or_else(|| unknown("city_id", "City", city_id))?;

        if let Some(state_id) = &scope.state_id {
            if &city.state_id != state_id {
                return Err(ValidationError::Inconsistent {
                    field: "city_id".to_string(),
                    reason: format!("city '{}' is not in state '{}'", city_id, state_id),
                }
                .into());
            }
        }
    }

    Ok(())
}

fn unknown(field: &str, entity: &str, id: &str) -> DbError {
    ValidationError::UnknownReference {
        field: field.to_string(),
        entity: entity.to_string(),
        id: id.to_string(),
    }
    .into()
}

async fn fetch_country(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Country>> {
    let country = sqlx::query_as::<_, Country>("SELECT id, name FROM countries WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(country)
}

async fn fetch_state(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<State>> {
    let state =
        sqlx::query_as::<_, State>("SELECT id, country_id, name FROM states WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(state)
}

async fn fetch_city(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<City>> {
    let city = sqlx::query_as::<_, City>("SELECT id, state_id, name FROM cities WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(city)
}

// =============================================================================
// Unit Tests
// =============================================================================
