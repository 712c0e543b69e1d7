//! Bulk indexing operations for Elasticsearch.

use anyhow::{bail, Context, Result};
use elasticsearch::http::request::JsonBody;
use elasticsearch::BulkParts;
use tracing::{debug, warn};

use super::EsClient;
use crate::models::GeoDocument;

/// Bulk indexer for efficient document insertion
pub struct BulkIndexer {
    client: EsClient,
    batch_size: usize,
    buffer: Vec<GeoDocument>,
    total_indexed: usize,
    total_errors: usize,
}

impl BulkIndexer {
    /// Create a new bulk indexer
    pub fn new(client: EsClient, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            client,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
            total_indexed: 0,
            total_errors: 0,
        }
    }

    /// Add a document to the buffer, flushing if batch is full
    pub async fn add(&mut self, doc: GeoDocument) -> Result<()> {
        self.buffer.push(doc);

        if self.buffer.len() >= self.batch_size {
            self.flush().await?;
        }

        Ok(())
    }

    /// Flush the buffer to Elasticsearch
    pub async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let docs = std::mem::replace(&mut self.buffer, Vec::with_capacity(self.batch_size));
        let count = docs.len();

        debug!("Flushing {} documents to Elasticsearch", count);

        let body = bulk_body(&docs)?;

        let response = self
            .client
            .client()
            .bulk(BulkParts::Index(&self.client.index_name))
            .body(body)
            .send()
            .await
            .context("Bulk request failed")?;

        let status = response.status_code();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Bulk request rejected with status {}: {}", status, text);
        }

        let response_body = response.json::<serde_json::Value>().await?;

        let error_count = failed_items(&response_body);
        if error_count > 0 {
            self.total_errors += error_count;
            warn!(
                "Bulk request had {} errors out of {} documents",
                error_count, count
            );
        }

        self.total_indexed += count;

        Ok(())
    }

    /// Finish indexing and return statistics
    pub async fn finish(mut self) -> Result<(usize, usize)> {
        self.flush().await?;
        Ok((self.total_indexed, self.total_errors))
    }

    /// Get current statistics
    pub fn stats(&self) -> (usize, usize) {
        (self.total_indexed, self.total_errors)
    }
}

/// Number of items the cluster refused within an accepted bulk response
fn failed_items(response_body: &serde_json::Value) -> usize {
    if !response_body["errors"].as_bool().unwrap_or(false) {
        return 0;
    }
    response_body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|item| item["index"]["error"].is_object())
                .count()
        })
        .unwrap_or(0)
}

/// Action and source line pairs; the GeoNames id is the document id so
/// re-imports overwrite instead of duplicating.
fn bulk_body(docs: &[GeoDocument]) -> Result<Vec<JsonBody<serde_json::Value>>> {
    let mut body: Vec<JsonBody<serde_json::Value>> = Vec::with_capacity(docs.len() * 2);

    for doc in docs {
        body.push(
            serde_json::json!({
                "index": {
                    "_id": doc.record.geonameid.to_string()
                }
            })
            .into(),
        );
        body.push(serde_json::to_value(doc)?.into());
    }

    Ok(body)
}
