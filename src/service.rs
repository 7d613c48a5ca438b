//! City use-case orchestration with transactional semantics.
//!
//! Every mutating operation runs as one unit of work: a single database
//! transaction spanning the city row mutation and all alliance mutations,
//! rolled back in full on any failure. Reads run in a deferred
//! transaction so a listing never observes a half-written alliance pair.

use chrono::Utc;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{AllianceManager, Beauty, City, CityChangeset, CityStore, NewCity};
use crate::error::CityError;
use crate::power::AlliedPowerCalculator;

/// Validated command for creating a city.
///
/// Field ranges are checked at the request boundary before this type is
/// constructed.
#[derive(Debug, Clone, Getters, new)]
pub struct NewCityData {
    name: String,
    beauty: Option<Beauty>,
    population: i64,
    geo_location_latitude: f64,
    geo_location_longitude: f64,
    allied_cities: Option<Vec<Uuid>>,
}

/// Validated partial-update command.
///
/// `None` fields are left untouched. `allied_cities: Some(vec![])` clears
/// the alliance set; `None` leaves it alone.
#[derive(Debug, Clone, Default, Getters, new)]
pub struct CityPatch {
    name: Option<String>,
    beauty: Option<Beauty>,
    population: Option<i64>,
    geo_location_latitude: Option<f64>,
    geo_location_longitude: Option<f64>,
    allied_cities: Option<Vec<Uuid>>,
}

/// A city with its current allies in display order.
#[derive(Debug, Clone, Getters)]
pub struct CityRecord {
    city_uuid: Uuid,
    name: String,
    beauty: Option<Beauty>,
    population: i64,
    geo_location_latitude: f64,
    geo_location_longitude: f64,
    allied_cities: Vec<Uuid>,
}

impl CityRecord {
    fn from_row(city: &City, allied_cities: Vec<Uuid>) -> Result<Self, CityError> {
        Ok(Self {
            city_uuid: city.parse_uuid()?,
            name: city.name().clone(),
            beauty: city.parse_beauty()?,
            population: *city.population(),
            geo_location_latitude: *city.geo_location_latitude(),
            geo_location_longitude: *city.geo_location_longitude(),
            allied_cities,
        })
    }
}

/// Read-only derived view combining a city with its allied power. Never
/// persisted.
#[derive(Debug, Clone, Getters)]
pub struct AlliedPowerView {
    city: CityRecord,
    allied_power: i64,
}

/// Orchestrates [`CityStore`], [`AllianceManager`] and
/// [`AlliedPowerCalculator`] into the create/read/list/update/delete
/// use-cases.
///
/// Holds no state between requests beyond the store's connection path, so
/// it is cheap to clone into request handlers.
#[derive(Debug, Clone)]
pub struct CityService {
    store: CityStore,
    alliances: AllianceManager,
    calculator: AlliedPowerCalculator,
}

impl CityService {
    /// Creates a service backed by the given store.
    pub fn new(store: CityStore) -> Self {
        info!("Creating CityService");
        Self {
            store,
            alliances: AllianceManager::new(),
            calculator: AlliedPowerCalculator::new(),
        }
    }

    /// Creates a city, optionally allied to existing cities, as one unit
    /// of work.
    ///
    /// # Errors
    ///
    /// [`CityError::InvalidAllies`] or [`CityError::SelfAlliance`] roll
    /// the whole creation back; nothing is persisted.
    #[instrument(skip(self, data), fields(name = %data.name()))]
    pub fn create(&self, data: NewCityData) -> Result<CityRecord, CityError> {
        let mut conn = self.store.connection()?;
        conn.immediate_transaction(|conn| {
            let city_uuid = Uuid::new_v4();
            let row = self.store.insert(
                conn,
                NewCity::new(
                    city_uuid.to_string(),
                    data.name().clone(),
                    data.beauty().map(|b| b.to_db_string().to_string()),
                    *data.population(),
                    *data.geo_location_latitude(),
                    *data.geo_location_longitude(),
                ),
            )?;

            if let Some(allies) = data.allied_cities() {
                self.alliances.replace_alliances(conn, &city_uuid, allies)?;
            }

            let allies = self.alliances.list_allies(conn, &city_uuid)?;
            let record = CityRecord::from_row(&row, allies)?;
            info!(city_uuid = %city_uuid, "City created");
            Ok(record)
        })
    }

    /// Fetches a city with its live ally list.
    ///
    /// # Errors
    ///
    /// [`CityError::NotFound`] if no such city exists.
    #[instrument(skip(self))]
    pub fn get(&self, city_uuid: Uuid) -> Result<CityRecord, CityError> {
        let mut conn = self.store.connection()?;
        conn.transaction(|conn| self.load_record(conn, &city_uuid))
    }

    /// Fetches a city together with its allied-power aggregate.
    ///
    /// # Errors
    ///
    /// [`CityError::NotFound`] if no such city exists;
    /// [`CityError::DataIntegrity`] if an alliance references a city that
    /// has vanished.
    #[instrument(skip(self))]
    pub fn get_with_power(&self, city_uuid: Uuid) -> Result<AlliedPowerView, CityError> {
        let mut conn = self.store.connection()?;
        conn.transaction(|conn| {
            let row = self
                .store
                .get(conn, &city_uuid.to_string())?
                .ok_or(CityError::NotFound { city_uuid })?;

            let ally_ids = self.alliances.list_allies(conn, &city_uuid)?;
            let mut ally_rows = Vec::with_capacity(ally_ids.len());
            for ally_uuid in &ally_ids {
                let ally = self
                    .store
                    .get(conn, &ally_uuid.to_string())?
                    .ok_or(CityError::DataIntegrity {
                        ally_uuid: *ally_uuid,
                    })?;
                ally_rows.push(ally);
            }

            let allied_power = self.calculator.compute(&row, &ally_rows);
            let city = CityRecord::from_row(&row, ally_ids)?;
            Ok(AlliedPowerView { city, allied_power })
        })
    }

    /// Lists cities ordered by name, each annotated with its allies. The
    /// ally annotation is a single aggregate query per page, not one
    /// query per city.
    ///
    /// # Errors
    ///
    /// Returns [`CityError::Store`] if a query fails.
    #[instrument(skip(self))]
    pub fn list(&self, skip: i64, limit: i64) -> Result<Vec<CityRecord>, CityError> {
        let mut conn = self.store.connection()?;
        conn.transaction(|conn| {
            let rows = self.store.list(conn, skip, limit)?;
            let ids = rows
                .iter()
                .map(City::parse_uuid)
                .collect::<Result<Vec<_>, _>>()?;
            let mut allies = self.alliances.allies_by_city(conn, &ids)?;

            rows.iter()
                .zip(ids)
                .map(|(row, id)| CityRecord::from_row(row, allies.remove(&id).unwrap_or_default()))
                .collect()
        })
    }

    /// Applies a partial update as one unit of work. Alliances are
    /// replaced only when `allied_cities` is present in the patch, and
    /// cleared when it is an explicit empty list.
    ///
    /// # Errors
    ///
    /// [`CityError::NotFound`] if no such city exists; ally validation
    /// failures roll back the field update too.
    #[instrument(skip(self, patch))]
    pub fn update(&self, city_uuid: Uuid, patch: CityPatch) -> Result<CityRecord, CityError> {
        let mut conn = self.store.connection()?;
        conn.immediate_transaction(|conn| {
            let changes = CityChangeset::new(
                patch.name().clone(),
                patch.beauty().map(|b| b.to_db_string().to_string()),
                *patch.population(),
                *patch.geo_location_latitude(),
                *patch.geo_location_longitude(),
                Utc::now().naive_utc(),
            );
            let row = self
                .store
                .update_fields(conn, &city_uuid.to_string(), changes)?
                .ok_or(CityError::NotFound { city_uuid })?;

            if let Some(allies) = patch.allied_cities() {
                self.alliances.replace_alliances(conn, &city_uuid, allies)?;
            }

            let allies = self.alliances.list_allies(conn, &city_uuid)?;
            CityRecord::from_row(&row, allies)
        })
    }

    /// Deletes a city and every alliance it participates in, returning
    /// its last-known state (including the allies it had at deletion).
    ///
    /// # Errors
    ///
    /// [`CityError::NotFound`] if no such city exists.
    #[instrument(skip(self))]
    pub fn delete(&self, city_uuid: Uuid) -> Result<CityRecord, CityError> {
        let mut conn = self.store.connection()?;
        conn.immediate_transaction(|conn| {
            let allies = self.alliances.list_allies(conn, &city_uuid)?;
            self.alliances.delete_all_for(conn, &city_uuid)?;
            let row = self
                .store
                .delete(conn, &city_uuid.to_string())?
                .ok_or(CityError::NotFound { city_uuid })?;

            let record = CityRecord::from_row(&row, allies)?;
            info!(city_uuid = %city_uuid, "City and its alliances deleted");
            Ok(record)
        })
    }

    fn load_record(
        &self,
        conn: &mut SqliteConnection,
        city_uuid: &Uuid,
    ) -> Result<CityRecord, CityError> {
        let row = self
            .store
            .get(conn, &city_uuid.to_string())?
            .ok_or(CityError::NotFound {
                city_uuid: *city_uuid,
            })?;
        let allies = self.alliances.list_allies(conn, city_uuid)?;
        CityRecord::from_row(&row, allies)
    }
}
