//! Search request execution and hit parsing shared by candidate retrieval and lookups.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::EsClient;
use crate::models::GeoRecord;

/// Fields excluded from `_source` in responses
const EXCLUDED_SOURCE_FIELDS: &[&str] = &["location", "source", "import_timestamp"];

/// Run a search body against the index and return the decoded records in hit order
pub(crate) async fn search_records(client: &EsClient, mut body: Value) -> Result<Vec<GeoRecord>> {
    body["_source"] = serde_json::json!({ "excludes": EXCLUDED_SOURCE_FIELDS });

    debug!("Search query: {}", serde_json::to_string_pretty(&body)?);

    let response = client
        .client()
        .search(elasticsearch::SearchParts::Index(&[&client.index_name]))
        .body(body)
        .send()
        .await
        .context("Search request failed")?;

    let status = response.status_code();
    if !status.is_success() {
        let error_body = response.text().await?;
        anyhow::bail!("Search returned {}: {}", status, error_body);
    }

    let response_body = response.json::<Value>().await?;
    Ok(parse_hits(&response_body))
}

/// Decode `hits.hits[]._source` into records, skipping undecodable hits
pub(crate) fn parse_hits(response_body: &Value) -> Vec<GeoRecord> {
    let Some(hits) = response_body["hits"]["hits"].as_array() else {
        return Vec::new();
    };

    hits.iter()
        .filter_map(|hit| match GeoRecord::deserialize(&hit["_source"]) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping undecodable hit {}: {}", hit["_id"], e);
                None
            }
        })
        .collect()
}
