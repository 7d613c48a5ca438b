//! REST surface over the city service.
//!
//! This layer owns request validation and the mapping from domain errors
//! to HTTP responses. Only range-checked, well-typed values are handed to
//! [`CityService`]; validation failures never reach the transactional
//! core.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::db::{Beauty, DbError};
use crate::error::CityError;
use crate::service::{AlliedPowerView, CityPatch, CityRecord, CityService, NewCityData};

const MAX_NAME_LEN: usize = 64;
const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A request field that failed range or shape validation.
#[derive(Debug, Clone, Display, Error)]
#[display("{field}: {message}")]
pub struct ValidationError {
    /// Offending field name.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: &'static str,
}

impl ValidationError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new(
            "name",
            "City Name cannot be an empty string.",
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            "name",
            "City Name cannot exceed 64 characters.",
        ));
    }
    Ok(())
}

fn validate_population(population: i64) -> Result<(), ValidationError> {
    if population < 0 {
        return Err(ValidationError::new(
            "population",
            "Population cannot be a negative value.",
        ));
    }
    Ok(())
}

fn validate_latitude(latitude: f64) -> Result<(), ValidationError> {
    if !LATITUDE_RANGE.contains(&latitude) {
        return Err(ValidationError::new(
            "geo_location_latitude",
            "Latitude needs to be in -90.0 - 90.0 range.",
        ));
    }
    Ok(())
}

fn validate_longitude(longitude: f64) -> Result<(), ValidationError> {
    if !LONGITUDE_RANGE.contains(&longitude) {
        return Err(ValidationError::new(
            "geo_location_longitude",
            "Longitude needs to be in -180.0 - 180.0 range.",
        ));
    }
    Ok(())
}

/// Body for `POST /cities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCityRequest {
    /// City display name (non-empty, at most 64 characters).
    pub name: String,
    /// Optional beauty rating.
    #[serde(default)]
    pub beauty: Option<Beauty>,
    /// Inhabitant count (non-negative).
    pub population: i64,
    /// Latitude in degrees, -90..90.
    pub geo_location_latitude: f64,
    /// Longitude in degrees, -180..180.
    pub geo_location_longitude: f64,
    /// Existing cities to ally with, in display order.
    #[serde(default)]
    pub allied_cities: Option<Vec<Uuid>>,
}

impl CreateCityRequest {
    /// Range-checks all fields and produces the service command.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for the first field out of range.
    pub fn validate(self) -> Result<NewCityData, ValidationError> {
        validate_name(&self.name)?;
        validate_population(self.population)?;
        validate_latitude(self.geo_location_latitude)?;
        validate_longitude(self.geo_location_longitude)?;
        Ok(NewCityData::new(
            self.name,
            self.beauty,
            self.population,
            self.geo_location_latitude,
            self.geo_location_longitude,
            self.allied_cities,
        ))
    }
}

/// Body for `PUT /cities/{id}`.
///
/// Absent fields are left unchanged; an explicit empty `allied_cities`
/// clears the alliance set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCityRequest {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New beauty rating.
    #[serde(default)]
    pub beauty: Option<Beauty>,
    /// New inhabitant count.
    #[serde(default)]
    pub population: Option<i64>,
    /// New latitude in degrees.
    #[serde(default)]
    pub geo_location_latitude: Option<f64>,
    /// New longitude in degrees.
    #[serde(default)]
    pub geo_location_longitude: Option<f64>,
    /// Replacement alliance set, in display order.
    #[serde(default)]
    pub allied_cities: Option<Vec<Uuid>>,
}

impl UpdateCityRequest {
    /// Range-checks the supplied fields and produces the service patch.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for the first supplied field out of
    /// range.
    pub fn validate(self) -> Result<CityPatch, ValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(population) = self.population {
            validate_population(population)?;
        }
        if let Some(latitude) = self.geo_location_latitude {
            validate_latitude(latitude)?;
        }
        if let Some(longitude) = self.geo_location_longitude {
            validate_longitude(longitude)?;
        }
        Ok(CityPatch::new(
            self.name,
            self.beauty,
            self.population,
            self.geo_location_latitude,
            self.geo_location_longitude,
            self.allied_cities,
        ))
    }
}

/// Pagination parameters for `GET /cities`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Rows to skip from the start of the name-ordered listing.
    #[serde(default)]
    pub skip: i64,
    /// Maximum rows to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

impl Pagination {
    fn validate(self) -> Result<Self, ValidationError> {
        if self.skip < 0 {
            return Err(ValidationError::new("skip", "skip cannot be negative."));
        }
        if self.limit < 0 {
            return Err(ValidationError::new("limit", "limit cannot be negative."));
        }
        Ok(self)
    }
}

/// City representation returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityResponse {
    /// Server-generated city id.
    pub city_uuid: Uuid,
    /// City display name.
    pub name: String,
    /// Beauty rating, if any.
    pub beauty: Option<Beauty>,
    /// Inhabitant count.
    pub population: i64,
    /// Latitude in degrees.
    pub geo_location_latitude: f64,
    /// Longitude in degrees.
    pub geo_location_longitude: f64,
    /// Current allies in display order.
    pub allied_cities: Vec<Uuid>,
}

impl From<CityRecord> for CityResponse {
    fn from(record: CityRecord) -> Self {
        Self {
            city_uuid: *record.city_uuid(),
            name: record.name().clone(),
            beauty: *record.beauty(),
            population: *record.population(),
            geo_location_latitude: *record.geo_location_latitude(),
            geo_location_longitude: *record.geo_location_longitude(),
            allied_cities: record.allied_cities().clone(),
        }
    }
}

/// City plus its allied-power aggregate, returned by `GET /cities/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityWithPowerResponse {
    /// The city itself.
    #[serde(flatten)]
    pub city: CityResponse,
    /// Derived allied power.
    pub allied_power: i64,
}

impl From<AlliedPowerView> for CityWithPowerResponse {
    fn from(view: AlliedPowerView) -> Self {
        Self {
            allied_power: *view.allied_power(),
            city: view.city().clone().into(),
        }
    }
}

/// Error envelope matching the wire format `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub detail: String,
}

/// Failures surfaced by the REST layer.
#[derive(Debug, Display, Error, From)]
pub enum ApiError {
    /// Request payload failed range or shape validation.
    #[display("{_0}")]
    Validation(ValidationError),
    /// The underlying city operation failed.
    #[display("{_0}")]
    City(CityError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::Validation(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            Self::City(CityError::InvalidAllies { .. } | CityError::SelfAlliance { .. }) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::City(CityError::NotFound { .. }) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::City(err @ (CityError::DataIntegrity { .. } | CityError::Store(_))) => {
                error!(error = %err, "Internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

fn join_error(err: tokio::task::JoinError) -> ApiError {
    ApiError::City(CityError::Store(DbError::new(format!(
        "blocking task failed: {err}"
    ))))
}

/// `POST /cities` - create a city, optionally allied to existing ones.
#[instrument(skip(service, payload), fields(name = %payload.name))]
async fn create_city(
    State(service): State<CityService>,
    Json(payload): Json<CreateCityRequest>,
) -> Result<(StatusCode, Json<CityResponse>), ApiError> {
    let data = payload.validate()?;
    let record = tokio::task::spawn_blocking(move || service.create(data))
        .await
        .map_err(join_error)??;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// `GET /cities` - list cities ordered by name.
#[instrument(skip(service))]
async fn list_cities(
    State(service): State<CityService>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<CityResponse>>, ApiError> {
    let Pagination { skip, limit } = pagination.validate()?;
    let records = tokio::task::spawn_blocking(move || service.list(skip, limit))
        .await
        .map_err(join_error)??;
    Ok(Json(records.into_iter().map(CityResponse::from).collect()))
}

/// `GET /cities/{id}` - fetch one city with its allied power.
#[instrument(skip(service))]
async fn get_city(
    State(service): State<CityService>,
    Path(city_id): Path<Uuid>,
) -> Result<Json<CityWithPowerResponse>, ApiError> {
    let view = tokio::task::spawn_blocking(move || service.get_with_power(city_id))
        .await
        .map_err(join_error)??;
    Ok(Json(view.into()))
}

/// `PUT /cities/{id}` - partially update a city.
#[instrument(skip(service, payload))]
async fn update_city(
    State(service): State<CityService>,
    Path(city_id): Path<Uuid>,
    Json(payload): Json<UpdateCityRequest>,
) -> Result<Json<CityResponse>, ApiError> {
    let patch = payload.validate()?;
    let record = tokio::task::spawn_blocking(move || service.update(city_id, patch))
        .await
        .map_err(join_error)??;
    Ok(Json(record.into()))
}

/// `DELETE /cities/{id}` - delete a city and its alliances.
#[instrument(skip(service))]
async fn delete_city(
    State(service): State<CityService>,
    Path(city_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let record = tokio::task::spawn_blocking(move || service.delete(city_id))
        .await
        .map_err(join_error)??;
    debug!(city_uuid = %record.city_uuid(), "City removed");
    Ok(StatusCode::NO_CONTENT)
}

/// Builds the REST router over a city service.
pub fn router(service: CityService) -> Router {
    Router::new()
        .route("/cities", post(create_city).get(list_cities))
        .route(
            "/cities/{city_id}",
            get(get_city).put(update_city).delete(delete_city),
        )
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, population: i64, latitude: f64, longitude: f64) -> CreateCityRequest {
        CreateCityRequest {
            name: name.to_string(),
            beauty: Some(Beauty::Average),
            population,
            geo_location_latitude: latitude,
            geo_location_longitude: longitude,
            allied_cities: None,
        }
    }

    #[test]
    fn accepts_boundary_coordinates() {
        assert!(request("Quito", 2_011_388, 90.0, -180.0).validate().is_ok());
        assert!(request("Quito", 2_011_388, -90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        let err = request("   ", 100, 0.0, 0.0).validate().expect_err("empty name");
        assert_eq!(err.field, "name");
    }

    #[test]
    fn rejects_name_longer_than_64_chars() {
        let err = request(&"x".repeat(65), 100, 0.0, 0.0)
            .validate()
            .expect_err("long name");
        assert_eq!(err.field, "name");
    }

    #[test]
    fn rejects_negative_population() {
        let err = request("City", -1, 0.0, 0.0).validate().expect_err("population");
        assert_eq!(err.field, "population");
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let lat = request("City", 100, 212.432, 0.0).validate().expect_err("latitude");
        assert_eq!(lat.field, "geo_location_latitude");

        let long = request("City", 100, 0.0, 554.234).validate().expect_err("longitude");
        assert_eq!(long.field, "geo_location_longitude");
    }

    #[test]
    fn update_validates_only_supplied_fields() {
        let patch = UpdateCityRequest {
            population: Some(123),
            ..UpdateCityRequest::default()
        };
        assert!(patch.validate().is_ok());

        let bad = UpdateCityRequest {
            geo_location_latitude: Some(-91.0),
            ..UpdateCityRequest::default()
        };
        assert!(bad.validate().is_err());
    }
}
