//! Elasticsearch index schema management.

use anyhow::{Context, Result};
use elasticsearch::indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts};
use tracing::info;

use super::EsClient;

/// Schema JSON embedded at compile time
const GEONAMES_MAPPING: &str = include_str!("../../schema/geonames_mapping.json");

/// Parsed index settings and mappings
pub fn geonames_mapping() -> Result<serde_json::Value> {
    serde_json::from_str(GEONAMES_MAPPING).context("Failed to parse geonames_mapping.json")
}

/// Create the geonames index with proper mapping
pub async fn create_index(client: &EsClient, delete_existing: bool) -> Result<()> {
    let es = client.client();
    let index_name = &client.index_name;

    let exists = es
        .indices()
        .exists(IndicesExistsParts::Index(&[index_name]))
        .send()
        .await?
        .status_code()
        .is_success();

    if exists {
        if delete_existing {
            info!("Deleting existing index: {}", index_name);
            es.indices()
                .delete(IndicesDeleteParts::Index(&[index_name]))
                .send()
                .await
                .context("Failed to delete existing index")?;
        } else {
            info!("Index {} already exists, skipping creation", index_name);
            return Ok(());
        }
    }

    let mapping = geonames_mapping()?;

    info!("Creating index: {}", index_name);
    let response = es
        .indices()
        .create(IndicesCreateParts::Index(index_name))
        .body(mapping)
        .send()
        .await
        .context("Failed to create index")?;

    if !response.status_code().is_success() {
        let error_body = response.text().await?;
        anyhow::bail!("Failed to create index: {}", error_body);
    }

    info!("Index {} created successfully", index_name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_covers_query_fields() {
        let mapping = geonames_mapping().unwrap();
        let props = &mapping["mappings"]["properties"];

        for field in [
            "geonameid",
            "name",
            "asciiname",
            "alternatenames",
            "latitude",
            "longitude",
            "country_code",
            "admin1_code",
            "import_timestamp",
        ] {
            assert!(props[field].is_object(), "missing mapping for {}", field);
        }
        assert_eq!(props["location"]["type"], "geo_point");
        assert_eq!(props["country_code"]["type"], "keyword");
        // Stale-document deletion filters on exact dump names
        assert_eq!(props["source"]["type"], "keyword");
    }
}
