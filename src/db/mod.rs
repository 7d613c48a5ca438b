//! Database persistence layer for city rows and alliance pairs.

mod alliance;
mod error;
mod models;
mod schema; // Diesel generated schema - internal use only
mod store;

pub use alliance::AllianceManager;
pub use error::DbError;
pub use models::{Alliance, Beauty, City, CityChangeset, NewAlliance, NewCity};
pub use store::CityStore;
