//! Diesel-backed persistence for city rows.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tracing::{debug, info, instrument};

use crate::db::{City, CityChangeset, DbError, NewCity, schema};

/// Persistence gateway for the `cities` table.
///
/// Row operations take a caller-supplied connection so the service layer
/// can combine them with alliance mutations in a single transaction.
#[derive(Debug, Clone)]
pub struct CityStore {
    db_path: String,
}

impl CityStore {
    /// Creates a store for the database at the given path.
    ///
    /// Use `":memory:"` for a throwaway database.
    pub fn new(db_path: String) -> Self {
        info!(path = %db_path, "Creating CityStore");
        Self { db_path }
    }

    /// Establishes a database connection with pragmas applied.
    ///
    /// `busy_timeout` bounds blocking when a concurrent writer holds the
    /// database lock, so conflicting units of work serialize instead of
    /// failing immediately.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened.
    #[instrument(skip(self))]
    pub fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("failed to connect to '{}': {e}", self.db_path)))?;
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(DbError::from)?;
        Ok(conn)
    }

    /// Inserts a city row and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    #[instrument(skip(self, conn, new_city), fields(name = %new_city.name()))]
    pub fn insert(
        &self,
        conn: &mut SqliteConnection,
        new_city: NewCity,
    ) -> Result<City, DbError> {
        let city = diesel::insert_into(schema::cities::table)
            .values(&new_city)
            .returning(City::as_returning())
            .get_result(conn)?;

        info!(city_uuid = %city.city_uuid(), name = %city.name(), "City inserted");
        Ok(city)
    }

    /// Fetches a city by id. Returns `None` if no row exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    #[instrument(skip(self, conn))]
    pub fn get(
        &self,
        conn: &mut SqliteConnection,
        city_uuid: &str,
    ) -> Result<Option<City>, DbError> {
        let city = schema::cities::table
            .find(city_uuid)
            .first::<City>(conn)
            .optional()?;
        Ok(city)
    }

    /// Lists cities ordered by name, skipping `skip` rows and returning at
    /// most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    #[instrument(skip(self, conn))]
    pub fn list(
        &self,
        conn: &mut SqliteConnection,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<City>, DbError> {
        let cities = schema::cities::table
            .order(schema::cities::name.asc())
            .offset(skip)
            .limit(limit)
            .load::<City>(conn)?;

        debug!(count = cities.len(), "Cities loaded");
        Ok(cities)
    }

    /// Applies the supplied fields to an existing row; absent fields stay
    /// unchanged. Returns `None` if no row exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the update fails.
    #[instrument(skip(self, conn, changes))]
    pub fn update_fields(
        &self,
        conn: &mut SqliteConnection,
        city_uuid: &str,
        changes: CityChangeset,
    ) -> Result<Option<City>, DbError> {
        let city = diesel::update(schema::cities::table.find(city_uuid))
            .set(&changes)
            .returning(City::as_returning())
            .get_result(conn)
            .optional()?;

        if city.is_some() {
            info!(city_uuid = %city_uuid, "City updated");
        }
        Ok(city)
    }

    /// Deletes a city row, returning its previous state. Returns `None` if
    /// no row exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the delete fails.
    #[instrument(skip(self, conn))]
    pub fn delete(
        &self,
        conn: &mut SqliteConnection,
        city_uuid: &str,
    ) -> Result<Option<City>, DbError> {
        let Some(city) = self.get(conn, city_uuid)? else {
            return Ok(None);
        };

        diesel::delete(schema::cities::table.find(city_uuid)).execute(conn)?;
        info!(city_uuid = %city_uuid, "City deleted");
        Ok(Some(city))
    }
}
