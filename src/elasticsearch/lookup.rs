//! Direct record lookups that need no ranking.

use anyhow::{Context, Result};
use elasticsearch::GetParts;
use serde_json::{json, Value};

use super::search::search_records;
use super::EsClient;
use crate::models::{Coordinates, GeoRecord};

impl EsClient {
    /// Fetch a single record by GeoNames id
    pub async fn get_by_id(&self, geonameid: u64) -> Result<Option<GeoRecord>> {
        let id = geonameid.to_string();
        let response = self
            .client()
            .get(GetParts::IndexId(&self.index_name, &id))
            .send()
            .await
            .context("Get request failed")?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }

        let body = response.json::<Value>().await?;
        if !body["found"].as_bool().unwrap_or(false) {
            return Ok(None);
        }

        let record = serde_json::from_value(body["_source"].clone())
            .with_context(|| format!("Failed to decode document {}", id))?;
        Ok(Some(record))
    }

    /// Fetch every record whose id is in `ids`; unknown ids are ignored
    pub async fn get_by_ids(&self, ids: &[u64]) -> Result<Vec<GeoRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        search_records(self, ids_query(ids)).await
    }

    /// Fetch records located exactly at any of the given points
    pub async fn get_by_locations(&self, points: &[Coordinates], limit: usize) -> Result<Vec<GeoRecord>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }
        search_records(self, locations_query(points, limit)).await
    }

    /// Plain relevance-ordered text search over names
    pub async fn search_by_name(&self, text: &str, limit: usize) -> Result<Vec<GeoRecord>> {
        search_records(self, name_query(text, limit)).await
    }
}

fn ids_query(ids: &[u64]) -> Value {
    json!({
        "query": { "terms": { "geonameid": ids } },
        "size": ids.len()
    })
}

fn locations_query(points: &[Coordinates], limit: usize) -> Value {
    let should: Vec<Value> = points
        .iter()
        .map(|p| {
            json!({
                "bool": {
                    "filter": [
                        { "term": { "latitude": p.lat } },
                        { "term": { "longitude": p.lon } }
                    ]
                }
            })
        })
        .collect();

    json!({
        "query": {
            "bool": {
                "should": should,
                "minimum_should_match": 1
            }
        },
        "size": limit
    })
}

fn name_query(text: &str, limit: usize) -> Value {
    json!({
        "query": {
            "match": {
                "name": { "query": text }
            }
        },
        "size": limit
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_query_sized_to_ids() {
        let body = ids_query(&[1, 2, 3]);
        assert_eq!(body["size"], 3);
        assert_eq!(body["query"]["terms"]["geonameid"], json!([1, 2, 3]));
    }

    #[test]
    fn test_locations_query_one_clause_per_point() {
        let points = [Coordinates::new(48.85341, 2.3488), Coordinates::new(51.50853, -0.12574)];
        let body = locations_query(&points, 100);
        let should = body["query"]["bool"]["should"].as_array().unwrap();

        assert_eq!(should.len(), 2);
        assert_eq!(should[1]["bool"]["filter"][0]["term"]["latitude"], 51.50853);
        assert_eq!(should[1]["bool"]["filter"][1]["term"]["longitude"], -0.12574);
    }

    #[test]
    fn test_name_query() {
        let body = name_query("Springfield", 10);
        assert_eq!(body["query"]["match"]["name"]["query"], "Springfield");
        assert_eq!(body["size"], 10);
    }
}
