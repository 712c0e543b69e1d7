//! Confidence-ranked place name disambiguation.
//!
//! The engine asks a [`CandidateSource`] for a fixed window of candidates,
//! scores each one on name similarity, prominence and proximity, and returns
//! the best K in descending confidence order.

mod engine;
mod error;
mod query;
mod source;

pub use engine::{
    rank, Disambiguation, DisambiguationEngine, EngineConfig, ScoreBreakdown, ScoredCandidate,
};
pub use error::DisambiguationError;
pub use query::DisambiguationQuery;
pub use source::{CandidateFilters, CandidateSource, InMemoryCandidateSource};
