//! Toponym - GeoNames gazetteer search and place name disambiguation
//!
//! This library provides shared types and modules for the ingest and query binaries.

pub mod disambiguation;
pub mod elasticsearch;
pub mod models;
pub mod scoring;

pub use disambiguation::{
    Disambiguation, DisambiguationEngine, DisambiguationError, DisambiguationQuery,
    ScoredCandidate,
};
pub use models::{Coordinates, GeoRecord};
