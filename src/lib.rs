//! City registry - alliance-aware city CRUD with an allied-power metric.
//!
//! # Architecture
//!
//! - **db**: diesel persistence for city rows ([`CityStore`]) and the
//!   symmetric alliance table ([`AllianceManager`])
//! - **service**: transactional use-case orchestration ([`CityService`])
//! - **power**: distance-weighted allied-power aggregation
//! - **geo**: great-circle distance
//! - **server**: axum REST surface and request validation boundary
//!
//! # Example
//!
//! ```no_run
//! use city_registry::{CityService, CityStore, router};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let service = CityService::new(CityStore::new("city_registry.db".to_string()));
//! let app = router(service);
//!
//! let listener = tokio::net::TcpListener::bind(("127.0.0.1", 3000)).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod db;
mod error;
mod geo;
mod power;
mod server;
mod service;

/// Command-line interface.
pub mod cli;

// Crate-level exports - persistence layer
pub use db::{Alliance, AllianceManager, Beauty, City, CityStore, DbError, NewCity};

// Crate-level exports - domain errors
pub use error::CityError;

// Crate-level exports - distance and power
pub use geo::distance_km;
pub use power::AlliedPowerCalculator;

// Crate-level exports - service layer
pub use service::{AlliedPowerView, CityPatch, CityRecord, CityService, NewCityData};

// Crate-level exports - REST surface
pub use server::{
    ApiError, CityResponse, CityWithPowerResponse, CreateCityRequest, ErrorBody, Pagination,
    UpdateCityRequest, ValidationError, router,
};
