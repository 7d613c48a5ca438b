//! Database models and domain value types for cities and alliances.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{DbError, schema};

/// City database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::cities)]
#[diesel(primary_key(city_uuid))]
pub struct City {
    city_uuid: String,
    name: String,
    beauty: Option<String>,
    population: i64,
    geo_location_latitude: f64,
    geo_location_longitude: f64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl City {
    /// Parses the stored primary key into a [`Uuid`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored value is not a valid uuid.
    pub fn parse_uuid(&self) -> Result<Uuid, DbError> {
        parse_uuid(&self.city_uuid)
    }

    /// Parses the stored beauty column into a [`Beauty`] value.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the stored string is not a valid beauty value.
    pub fn parse_beauty(&self) -> Result<Option<Beauty>, DbError> {
        self.beauty.as_deref().map(Beauty::from_db_string).transpose()
    }

    /// Coordinates as a `(latitude, longitude)` pair in degrees.
    pub fn coordinates(&self) -> (f64, f64) {
        (self.geo_location_latitude, self.geo_location_longitude)
    }
}

/// Parses a stored uuid column value.
pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::new(format!("malformed uuid '{value}': {e}")))
}

/// Insertable city model; timestamps are defaulted by the database.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::cities)]
pub struct NewCity {
    city_uuid: String,
    name: String,
    beauty: Option<String>,
    population: i64,
    geo_location_latitude: f64,
    geo_location_longitude: f64,
}

/// Changeset for partial city updates.
///
/// `None` fields are left untouched; `updated_at` is always bumped so the
/// changeset is never empty.
#[derive(Debug, Clone, AsChangeset, new)]
#[diesel(table_name = schema::cities)]
pub struct CityChangeset {
    name: Option<String>,
    beauty: Option<String>,
    population: Option<i64>,
    geo_location_latitude: Option<f64>,
    geo_location_longitude: Option<f64>,
    updated_at: NaiveDateTime,
}

/// Directed alliance row. A full alliance is two of these, one per
/// direction, so the relation is queryable from either endpoint.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::alliances)]
pub struct Alliance {
    id: i32,
    city_uuid: String,
    ally_uuid: String,
}

/// Insertable directed alliance row.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::alliances)]
pub struct NewAlliance {
    city_uuid: String,
    ally_uuid: String,
}

/// How attractive a city is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Beauty {
    /// Nothing to look at.
    Ugly,
    /// Unremarkable either way.
    Average,
    /// A sight worth the trip.
    Gorgeous,
}

impl Beauty {
    /// Converts to the string stored in the database.
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Ugly => "Ugly",
            Self::Average => "Average",
            Self::Gorgeous => "Gorgeous",
        }
    }

    /// Parses from the string stored in the database.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the string is not a valid beauty value.
    pub fn from_db_string(s: &str) -> Result<Self, DbError> {
        match s {
            "Ugly" => Ok(Self::Ugly),
            "Average" => Ok(Self::Average),
            "Gorgeous" => Ok(Self::Gorgeous),
            _ => Err(DbError::new(format!("invalid beauty value: '{s}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Beauty;

    #[test]
    fn beauty_round_trips_through_db_strings() {
        for beauty in [Beauty::Ugly, Beauty::Average, Beauty::Gorgeous] {
            let parsed = Beauty::from_db_string(beauty.to_db_string()).expect("Parse failed");
            assert_eq!(beauty, parsed);
        }
    }

    #[test]
    fn beauty_rejects_unknown_strings() {
        assert!(Beauty::from_db_string("Stunning").is_err());
    }

    #[test]
    fn uuid_parsing_rejects_garbage() {
        assert!(super::parse_uuid("not-a-uuid").is_err());
    }
}
