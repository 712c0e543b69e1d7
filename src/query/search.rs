//! Request parameters, response bodies and error mapping for the query API.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use toponym::disambiguation::{DisambiguationError, DisambiguationQuery, ScoredCandidate};
use toponym::models::{Coordinates, GeoRecord};

/// Upper bound on ids or points accepted by one lookup request
pub const MAX_LOOKUP_ITEMS: usize = 1000;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct SearchQueryParams {
    /// Search text
    pub name: String,
    /// Number of results
    pub limit: Option<usize>,
}

impl SearchQueryParams {
    pub fn size(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct DisambiguateParams {
    /// Place name to resolve
    pub name: String,
    /// ISO country code filter
    pub country_code: Option<String>,
    /// First-level admin code filter
    pub admin1_code: Option<String>,
    /// Reference point latitude
    pub lat: Option<f64>,
    /// Reference point longitude
    pub lon: Option<f64>,
    /// Number of results
    pub limit: Option<usize>,
}

impl From<DisambiguateParams> for DisambiguationQuery {
    fn from(params: DisambiguateParams) -> Self {
        DisambiguationQuery {
            name: params.name,
            country_code: params.country_code,
            admin1_code: params.admin1_code,
            latitude: params.lat,
            longitude: params.lon,
            limit: params.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub geonameids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct LocationsRequest {
    pub locations: Vec<Location>,
}

impl LocationsRequest {
    pub fn points(&self) -> Vec<Coordinates> {
        self.locations
            .iter()
            .map(|l| Coordinates::new(l.latitude, l.longitude))
            .collect()
    }
}

#[derive(Serialize)]
pub struct RecordsResponse {
    pub features: Vec<GeoRecord>,
    pub took_ms: u128,
}

#[derive(Serialize)]
pub struct DisambiguateResponse {
    pub results: Vec<ScoredCandidate>,
    pub took_ms: u128,
}

pub type ApiError = (StatusCode, String);

/// Reject lookups with no items or too many items
pub fn check_lookup_size(count: usize, what: &str) -> Result<(), ApiError> {
    if count == 0 {
        return Err((StatusCode::BAD_REQUEST, format!("No {} given", what)));
    }
    if count > MAX_LOOKUP_ITEMS {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("At most {} {} per request", MAX_LOOKUP_ITEMS, what),
        ));
    }
    Ok(())
}

/// HTTP status for a failed disambiguation
pub fn disambiguation_status(err: &DisambiguationError) -> StatusCode {
    match err {
        DisambiguationError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        DisambiguationError::CandidateSourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn not_found(msg: &str) -> ApiError {
    (StatusCode::NOT_FOUND, msg.to_string())
}
