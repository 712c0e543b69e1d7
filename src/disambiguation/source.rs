//! Candidate retrieval boundary consumed by the engine.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::GeoRecord;

/// Exact-equality filters applied by the search backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFilters {
    pub country_code: Option<String>,
    pub admin1_code: Option<String>,
}

impl CandidateFilters {
    pub fn matches(&self, record: &GeoRecord) -> bool {
        let country_ok = self
            .country_code
            .as_ref()
            .map_or(true, |c| *c == record.country_code);
        let admin1_ok = self
            .admin1_code
            .as_ref()
            .map_or(true, |a| *a == record.admin1_code);
        country_ok && admin1_ok
    }
}

/// Text search backend returning plausible matches for a name.
///
/// Implementations own the matching semantics (tokenization, fuzziness) and
/// any retry policy. The result is treated as an unordered pool.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn find_candidates(
        &self,
        text: &str,
        filters: &CandidateFilters,
        max_results: usize,
    ) -> Result<Vec<GeoRecord>>;
}

#[async_trait]
impl<T: CandidateSource + ?Sized> CandidateSource for Arc<T> {
    async fn find_candidates(
        &self,
        text: &str,
        filters: &CandidateFilters,
        max_results: usize,
    ) -> Result<Vec<GeoRecord>> {
        (**self).find_candidates(text, filters, max_results).await
    }
}

/// Candidate source over records held in memory.
///
/// A record matches when every whitespace-separated query token equals a
/// token of its name, ASCII name or one of its alternate names, ignoring
/// case. Results keep corpus order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCandidateSource {
    records: Vec<GeoRecord>,
}

impl InMemoryCandidateSource {
    pub fn new(records: Vec<GeoRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matches_text(record: &GeoRecord, tokens: &[String]) -> bool {
        std::iter::once(&record.name)
            .chain(std::iter::once(&record.asciiname))
            .chain(record.alternatenames.iter())
            .any(|name| {
                let name_tokens = tokenize(name);
                tokens.iter().all(|t| name_tokens.contains(t))
            })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl CandidateSource for InMemoryCandidateSource {
    async fn find_candidates(
        &self,
        text: &str,
        filters: &CandidateFilters,
        max_results: usize,
    ) -> Result<Vec<GeoRecord>> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .records
            .iter()
            .filter(|r| filters.matches(r))
            .filter(|r| Self::matches_text(r, &tokens))
            .take(max_results)
            .cloned()
            .collect())
    }
}
