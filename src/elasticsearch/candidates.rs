//! Candidate retrieval for disambiguation backed by the geonames index.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use super::search::search_records;
use super::EsClient;
use crate::disambiguation::{CandidateFilters, CandidateSource};
use crate::models::GeoRecord;

/// Fuzzy name search with exact country/admin1 filters
#[derive(Clone)]
pub struct EsCandidateSource {
    client: EsClient,
}

impl EsCandidateSource {
    pub fn new(client: EsClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &EsClient {
        &self.client
    }
}

/// Build the candidate query body.
///
/// Scoring is left to Elasticsearch only to pick which `max_results`
/// documents come back; the engine re-ranks them.
pub fn candidate_query(text: &str, filters: &CandidateFilters, max_results: usize) -> Value {
    let mut filter_clauses = Vec::new();

    if let Some(ref country) = filters.country_code {
        filter_clauses.push(json!({ "term": { "country_code": country } }));
    }
    if let Some(ref admin1) = filters.admin1_code {
        filter_clauses.push(json!({ "term": { "admin1_code": admin1 } }));
    }

    json!({
        "query": {
            "bool": {
                "must": {
                    "multi_match": {
                        "query": text,
                        "fields": ["name^3", "asciiname^2", "alternatenames"],
                        "fuzziness": "AUTO",
                        "operator": "and"
                    }
                },
                "filter": filter_clauses
            }
        },
        "size": max_results
    })
}

#[async_trait]
impl CandidateSource for EsCandidateSource {
    async fn find_candidates(
        &self,
        text: &str,
        filters: &CandidateFilters,
        max_results: usize,
    ) -> Result<Vec<GeoRecord>> {
        let body = candidate_query(text, filters, max_results);
        search_records(&self.client, body).await
    }
}
