//! Per-candidate scorers combined by the disambiguation engine.
//!
//! All scorers are pure functions over borrowed inputs and can be evaluated
//! concurrently across candidates.

mod attributes;
mod proximity;
mod similarity;

pub use attributes::{feature_score, population_score, score_attributes};
pub use proximity::{distance_km, score_proximity};
pub use similarity::score_name;
