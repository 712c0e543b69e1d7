//! Connection to the gazetteer index.

use anyhow::{Context, Result};
use elasticsearch::{
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::IndicesRefreshParts,
    CountParts, Elasticsearch,
};
use url::Url;

/// Elasticsearch handle bound to one gazetteer index
#[derive(Clone)]
pub struct EsClient {
    client: Elasticsearch,
    pub index_name: String,
}

impl EsClient {
    /// Connect to a single node at `es_url`, bypassing any system proxy
    pub async fn new(es_url: &str, index_name: &str) -> Result<Self> {
        let url = Url::parse(es_url)
            .with_context(|| format!("Invalid Elasticsearch URL: {}", es_url))?;
        let transport = TransportBuilder::new(SingleNodeConnectionPool::new(url))
            .disable_proxy()
            .build()
            .context("Failed to build Elasticsearch transport")?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            index_name: index_name.to_string(),
        })
    }

    /// Raw client for requests the wrapper does not cover
    pub fn client(&self) -> &Elasticsearch {
        &self.client
    }

    /// Whether the cluster answers its health endpoint with a success status
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .context("Cluster health request failed")?;

        Ok(response.status_code().is_success())
    }

    /// Number of documents in the gazetteer index
    pub async fn doc_count(&self) -> Result<u64> {
        let response = self
            .client
            .count(CountParts::Index(&[&self.index_name]))
            .send()
            .await
            .context("Count request failed")?;

        let body = response
            .json::<serde_json::Value>()
            .await
            .context("Invalid count response")?;
        Ok(body["count"].as_u64().unwrap_or(0))
    }

    /// Make recently indexed documents visible to search
    pub async fn refresh(&self) -> Result<()> {
        self.client
            .indices()
            .refresh(IndicesRefreshParts::Index(&[&self.index_name]))
            .send()
            .await
            .context("Index refresh failed")?;
        Ok(())
    }
}
