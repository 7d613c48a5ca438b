//! Domain error taxonomy for city and alliance operations.

use derive_more::{Display, Error};
use uuid::Uuid;

use crate::db::DbError;

/// Errors surfaced by [`CityService`](crate::CityService) operations.
///
/// Every persistence failure inside a unit of work rolls the transaction
/// back before the error leaves the service.
#[derive(Debug, Clone, Display, Error)]
pub enum CityError {
    /// One or more ally ids do not resolve to an existing city.
    #[display("Invalid ally UUIDs: {}", join_uuids(missing))]
    InvalidAllies {
        /// The ids that could not be resolved.
        #[error(not(source))]
        missing: Vec<Uuid>,
    },

    /// A city cannot be allied with itself.
    #[display("City with UUID {city_uuid} cannot ally with itself.")]
    SelfAlliance {
        /// The offending city id.
        #[error(not(source))]
        city_uuid: Uuid,
    },

    /// The targeted city does not exist.
    #[display("City with UUID {city_uuid} does not exist.")]
    NotFound {
        /// The missing city id.
        #[error(not(source))]
        city_uuid: Uuid,
    },

    /// An alliance references a city that no longer exists. The symmetric
    /// invariant was violated outside this service; callers surface this
    /// generically.
    #[display("alliance references missing city {ally_uuid}")]
    DataIntegrity {
        /// The unresolvable ally id.
        #[error(not(source))]
        ally_uuid: Uuid,
    },

    /// The persistence layer failed.
    #[display("{_0}")]
    Store(DbError),
}

fn join_uuids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<DbError> for CityError {
    fn from(err: DbError) -> Self {
        Self::Store(err)
    }
}

impl From<diesel::result::Error> for CityError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::Store(DbError::from(err))
    }
}
