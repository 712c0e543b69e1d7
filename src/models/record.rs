//! Gazetteer record structure shared by ingest, storage and ranking.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Geographic point (lat/lon) in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components fall inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// One GeoNames gazetteer entry.
///
/// Field names follow the GeoNames dump columns so that the stored
/// documents and API responses stay recognisable to GeoNames users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    /// Unique GeoNames identifier
    pub geonameid: u64,

    /// Name of the place (UTF-8)
    pub name: String,

    /// Name in plain ASCII characters
    pub asciiname: String,

    /// Alternate names, comma separated in the dump
    #[serde(default)]
    pub alternatenames: Vec<String>,

    pub latitude: f64,
    pub longitude: f64,

    /// Single letter feature class (e.g. "P" populated place, "A" admin division)
    pub feature_class: String,

    /// Feature code within the class (e.g. "PPLC", "ADM1")
    pub feature_code: String,

    /// ISO-3166 2-letter country code
    pub country_code: String,

    /// Alternate country codes
    #[serde(default)]
    pub cc2: Vec<String>,

    pub admin1_code: String,
    pub admin2_code: String,
    pub admin3_code: String,
    pub admin4_code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<u64>,

    /// Elevation in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<i32>,

    /// Digital elevation model (srtm3 or gtopo30) in meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dem: Option<i32>,

    /// IANA timezone identifier
    pub timezone: String,

    /// Date of last modification upstream
    pub modification_date: NaiveDate,
}

impl GeoRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Document shape indexed into Elasticsearch.
///
/// The record is flattened so that `_source` deserializes straight back into
/// a [`GeoRecord`]; the extra fields are ignored on the way out.
#[derive(Debug, Clone, Serialize)]
pub struct GeoDocument {
    #[serde(flatten)]
    pub record: GeoRecord,

    /// geo_point for distance and bounding box queries
    pub location: Coordinates,

    /// Dump the record was last imported from (e.g. "US", "allCountries")
    pub source: String,

    /// Import timestamp for refresh tracking
    pub import_timestamp: DateTime<Utc>,
}

impl GeoDocument {
    pub fn new(record: GeoRecord, source: &str, import_timestamp: DateTime<Utc>) -> Self {
        Self {
            location: record.coordinates(),
            record,
            source: source.to_string(),
            import_timestamp,
        }
    }
}
