//! Core data models for the gazetteer.

pub mod record;

pub use record::{Coordinates, GeoDocument, GeoRecord};
