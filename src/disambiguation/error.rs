use thiserror::Error;

/// Failures of a disambiguation request.
///
/// An empty candidate pool is not an error; see
/// [`Disambiguation::NotFound`](super::Disambiguation::NotFound).
#[derive(Debug, Error)]
pub enum DisambiguationError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("candidate source unavailable: {0}")]
    CandidateSourceUnavailable(#[source] anyhow::Error),
}

impl DisambiguationError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }
}
