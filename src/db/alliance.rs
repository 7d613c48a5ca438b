//! Symmetric alliance graph maintenance.
//!
//! Every alliance between two cities is stored as two directed rows, one
//! per endpoint, so the relation is queryable from either side. The
//! invariants enforced here: if (A, B) exists then (B, A) exists, no city
//! allies with itself, and no directed pair is duplicated. All mutations
//! take a caller-supplied connection and run inside the service layer's
//! transaction alongside city row mutations, so a failed replace leaves
//! no trace.

use std::collections::HashMap;

use diesel::prelude::*;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::db::models::parse_uuid;
use crate::db::{Alliance, NewAlliance, schema};
use crate::error::CityError;

/// Maintains the symmetric alliance invariants over the `alliances` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllianceManager;

impl AllianceManager {
    /// Creates a new manager.
    pub fn new() -> Self {
        Self
    }

    /// Lists the allies of a city ordered by row id, which is insertion
    /// order and therefore matches the order supplied by the caller at
    /// create/replace time.
    ///
    /// # Errors
    ///
    /// Returns [`CityError::Store`] if the query fails.
    #[instrument(skip(self, conn))]
    pub fn list_allies(
        &self,
        conn: &mut SqliteConnection,
        city_uuid: &Uuid,
    ) -> Result<Vec<Uuid>, CityError> {
        let stored: Vec<String> = schema::alliances::table
            .filter(schema::alliances::city_uuid.eq(city_uuid.to_string()))
            .order(schema::alliances::id.asc())
            .select(schema::alliances::ally_uuid)
            .load(conn)?;

        let allies = stored
            .iter()
            .map(|s| parse_uuid(s))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(city_uuid = %city_uuid, count = allies.len(), "Allies loaded");
        Ok(allies)
    }

    /// Collects the allies of a batch of cities in one query, keyed by
    /// city id. Cities without allies are absent from the returned map.
    ///
    /// # Errors
    ///
    /// Returns [`CityError::Store`] if the query fails.
    #[instrument(skip(self, conn, city_uuids), fields(count = city_uuids.len()))]
    pub fn allies_by_city(
        &self,
        conn: &mut SqliteConnection,
        city_uuids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Uuid>>, CityError> {
        if city_uuids.is_empty() {
            return Ok(HashMap::new());
        }

        let keys: Vec<String> = city_uuids.iter().map(Uuid::to_string).collect();
        let rows: Vec<Alliance> = schema::alliances::table
            .filter(schema::alliances::city_uuid.eq_any(keys))
            .order(schema::alliances::id.asc())
            .select(Alliance::as_select())
            .load(conn)?;

        let mut grouped: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in &rows {
            grouped
                .entry(parse_uuid(row.city_uuid())?)
                .or_default()
                .push(parse_uuid(row.ally_uuid())?);
        }
        Ok(grouped)
    }

    /// Returns the candidate ids that do not resolve to an existing city,
    /// deduplicated and in candidate order. A non-empty result means the
    /// calling workflow must fail without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`CityError::Store`] if the lookup fails.
    #[instrument(skip(self, conn, candidates), fields(count = candidates.len()))]
    pub fn validate_allies_exist(
        &self,
        conn: &mut SqliteConnection,
        candidates: &[Uuid],
    ) -> Result<Vec<Uuid>, CityError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = candidates.iter().map(Uuid::to_string).collect();
        let found: Vec<String> = schema::cities::table
            .filter(schema::cities::city_uuid.eq_any(keys))
            .select(schema::cities::city_uuid)
            .load(conn)?;

        let mut missing: Vec<Uuid> = Vec::new();
        for candidate in candidates {
            if !found.contains(&candidate.to_string()) && !missing.contains(candidate) {
                missing.push(*candidate);
            }
        }

        if !missing.is_empty() {
            warn!(missing = ?missing, "Ally validation failed");
        }
        Ok(missing)
    }

    /// Replaces the alliance set of a city with exactly `new_allies`.
    ///
    /// The existing symmetric pairs are removed entirely, including the
    /// reverse rows held by former partners, then both directed rows are
    /// inserted per new ally in the supplied order. Duplicate inserts are
    /// no-ops, which makes the replace idempotent. Former partners not in
    /// the new set lose this city as an ally; their other alliances are
    /// untouched.
    ///
    /// # Errors
    ///
    /// [`CityError::SelfAlliance`] if `new_allies` contains the city
    /// itself, [`CityError::InvalidAllies`] if any id does not resolve to
    /// an existing city. Validation precedes mutation, and the surrounding
    /// transaction discards partial work on failure, so an error leaves
    /// the alliance set unchanged.
    #[instrument(skip(self, conn, new_allies), fields(city_uuid = %city_uuid, count = new_allies.len()))]
    pub fn replace_alliances(
        &self,
        conn: &mut SqliteConnection,
        city_uuid: &Uuid,
        new_allies: &[Uuid],
    ) -> Result<(), CityError> {
        if new_allies.contains(city_uuid) {
            return Err(CityError::SelfAlliance {
                city_uuid: *city_uuid,
            });
        }

        let missing = self.validate_allies_exist(conn, new_allies)?;
        if !missing.is_empty() {
            return Err(CityError::InvalidAllies { missing });
        }

        self.delete_all_for(conn, city_uuid)?;

        for ally_uuid in new_allies {
            self.insert_pair(conn, city_uuid, ally_uuid)?;
        }

        info!(city_uuid = %city_uuid, allies = new_allies.len(), "Alliance set replaced");
        Ok(())
    }

    /// Removes every directed row where the city is either endpoint.
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`CityError::Store`] if the delete fails.
    #[instrument(skip(self, conn))]
    pub fn delete_all_for(
        &self,
        conn: &mut SqliteConnection,
        city_uuid: &Uuid,
    ) -> Result<usize, CityError> {
        let key = city_uuid.to_string();
        let removed = diesel::delete(
            schema::alliances::table.filter(
                schema::alliances::city_uuid
                    .eq(key.clone())
                    .or(schema::alliances::ally_uuid.eq(key)),
            ),
        )
        .execute(conn)?;

        debug!(city_uuid = %city_uuid, removed, "Directed alliance rows removed");
        Ok(removed)
    }

    /// Inserts both directed rows of one alliance, tolerating duplicates.
    fn insert_pair(
        &self,
        conn: &mut SqliteConnection,
        city_uuid: &Uuid,
        ally_uuid: &Uuid,
    ) -> Result<(), CityError> {
        for (from, to) in [(city_uuid, ally_uuid), (ally_uuid, city_uuid)] {
            diesel::insert_into(schema::alliances::table)
                .values(&NewAlliance::new(from.to_string(), to.to_string()))
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        Ok(())
    }
}
