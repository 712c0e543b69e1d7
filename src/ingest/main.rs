//! GeoNames ingest pipeline.
//!
//! Reads GeoNames dumps, drops records whose id was already seen, and bulk
//! indexes the rest into Elasticsearch.

mod batch;
mod config;
mod dedup;
mod download;
mod parser;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use clap::Parser;
use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use toponym::elasticsearch::{create_index, BulkIndexer, EsClient};
use toponym::models::GeoDocument;

use crate::config::Config;
use crate::dedup::KeepFirst;
use crate::download::{
    download_dump, dump_source, open_zip, zip_entry_name, DumpFormat, DEFAULT_DUMP_URL,
};
use crate::parser::DumpReader;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Ingest GeoNames dumps into Elasticsearch")]
struct Args {
    /// GeoNames dump to import (.txt, .zip or .gz)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Dump to download when no file is given
    #[arg(long, default_value = DEFAULT_DUMP_URL)]
    url: String,

    /// Batch config (TOML) listing several dumps
    #[arg(long, conflicts_with = "file")]
    config: Option<PathBuf>,

    /// Directory for downloaded dumps
    #[arg(long, default_value = "data")]
    tmp_dir: PathBuf,

    /// Elasticsearch URL
    #[arg(long, default_value = "http://localhost:9200")]
    es_url: String,

    /// Elasticsearch index name
    #[arg(long, default_value = "geonames")]
    index: String,

    /// Delete documents left over from previous imports of the same dumps
    #[arg(long)]
    refresh: bool,

    /// Create/recreate index before import
    #[arg(long)]
    create_index: bool,

    /// Batch size for bulk indexing
    #[arg(long, default_value = "5000")]
    batch_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Toponym Ingest Pipeline");

    let batch_config = match &args.config {
        Some(path) => Some(Config::load_from_file(path)?),
        None => None,
    };

    let (es_url, index) = match &batch_config {
        Some(config) => (config.global.es_url.as_str(), config.global.index.as_str()),
        None => (args.es_url.as_str(), args.index.as_str()),
    };

    let es_client = EsClient::new(es_url, index)
        .await
        .context("Failed to connect to Elasticsearch")?;

    if !es_client.health_check().await? {
        anyhow::bail!("Elasticsearch cluster is not healthy");
    }
    info!("Connected to Elasticsearch");

    if args.create_index {
        create_index(&es_client, true).await?;
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("toponym/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let mut session = IngestSession::new(es_client, args.batch_size);

    match batch_config {
        Some(config) => {
            let failed = batch::run_batch(config, http, &mut session).await?;
            if failed > 0 {
                warn!(
                    "{} dumps failed; their existing documents are left in place",
                    failed
                );
            }
        }
        None => {
            let path = match &args.file {
                Some(path) => path.clone(),
                None => download_dump(&http, &args.url, &args.tmp_dir).await?,
            };
            session.ingest_file(&path).await?;
        }
    }

    session.finish(args.refresh).await
}

/// Indexing state shared by every dump of one run
pub struct IngestSession {
    es_client: EsClient,
    indexer: BulkIndexer,
    dedup: KeepFirst,
    import_start: DateTime<Utc>,
    malformed: usize,
    /// Dumps fully indexed without item errors, eligible for stale deletion
    completed_sources: Vec<String>,
}

impl IngestSession {
    pub fn new(es_client: EsClient, batch_size: usize) -> Self {
        Self {
            indexer: BulkIndexer::new(es_client.clone(), batch_size),
            es_client,
            dedup: KeepFirst::new(),
            // Elasticsearch dates keep millisecond precision
            import_start: Utc::now().trunc_subsecs(3),
            malformed: 0,
            completed_sources: Vec::new(),
        }
    }

    /// Ingest a dump file, unpacking zip or gzip containers
    pub async fn ingest_file(&mut self, path: &Path) -> Result<()> {
        let source = dump_source(path);
        info!("File: {} (source '{}')", path.display(), source);

        match DumpFormat::from_path(path) {
            DumpFormat::Zip => {
                let mut archive = open_zip(path)?;
                let entry_name = zip_entry_name(&archive, path)?;
                info!("Reading {} from archive", entry_name);
                let entry = archive.by_name(&entry_name)?;
                self.ingest_reader(entry, &source).await
            }
            DumpFormat::Gzip => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                self.ingest_reader(GzDecoder::new(BufReader::new(file)), &source)
                    .await
            }
            DumpFormat::Text => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                self.ingest_reader(BufReader::new(file), &source).await
            }
        }
    }

    async fn ingest_reader<R: Read>(&mut self, reader: R, source: &str) -> Result<()> {
        let (_, errors_before) = self.indexer.stats();

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos} lines ({per_sec})")?,
        );

        for result in DumpReader::new(reader) {
            pb.inc(1);

            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    self.malformed += 1;
                    warn!("Skipping line: {:#}", e);
                    continue;
                }
            };

            if let Some(record) = self.dedup.admit(record) {
                self.indexer
                    .add(GeoDocument::new(record, source, self.import_start))
                    .await?;
            }
        }

        // Every document of this dump must be acknowledged before it counts as complete
        self.indexer.flush().await?;
        pb.finish_with_message("Processing complete");

        let (indexed, errors) = self.indexer.stats();
        info!(
            "Progress: {} documents sent ({} errors), {} duplicates, {} malformed lines",
            indexed,
            errors,
            self.dedup.duplicates(),
            self.malformed
        );

        if errors > errors_before {
            warn!(
                "{} documents from '{}' were rejected; skipping stale deletion for it",
                errors - errors_before,
                source
            );
        } else {
            self.completed_sources.push(source.to_string());
        }

        Ok(())
    }

    /// Flush, optionally drop stale documents, and report totals
    pub async fn finish(self, refresh: bool) -> Result<()> {
        let duplicates = self.dedup.duplicates();
        let unique = self.dedup.unique();
        let (indexed, errors) = self.indexer.finish().await?;

        info!("Indexed {} documents ({} errors)", indexed, errors);
        info!(
            "{} unique records, {} duplicates removed, {} malformed lines skipped",
            unique, duplicates, self.malformed
        );

        self.es_client.refresh().await?;

        // Refresh: delete stale documents of each dump that imported cleanly
        if refresh {
            for source in &self.completed_sources {
                info!("Deleting stale documents from previous '{}' import...", source);
                delete_stale_documents(&self.es_client, source, self.import_start).await?;
            }
        }

        let doc_count = self.es_client.doc_count().await?;
        info!("Total documents in index: {}", doc_count);

        Ok(())
    }
}

/// Delete-by-query body matching documents of `source` that the import
/// started at `import_start` did not rewrite
fn stale_documents_query(source: &str, import_start: DateTime<Utc>) -> serde_json::Value {
    serde_json::json!({
        "query": {
            "bool": {
                "filter": [
                    { "term": { "source": source } },
                    { "range": { "import_timestamp": { "lt": import_start.to_rfc3339() } } }
                ]
            }
        }
    })
}

async fn delete_stale_documents(
    client: &EsClient,
    source: &str,
    import_start: DateTime<Utc>,
) -> Result<()> {
    let response = client
        .client()
        .delete_by_query(elasticsearch::DeleteByQueryParts::Index(&[
            &client.index_name
        ]))
        .body(stale_documents_query(source, import_start))
        .send()
        .await
        .context("Delete-by-query request failed")?;

    let status = response.status_code();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        anyhow::bail!("Stale deletion for '{}' failed with {}: {}", source, status, text);
    }

    let body = response.json::<serde_json::Value>().await?;
    let deleted = body["deleted"].as_u64().unwrap_or(0);

    info!("Deleted {} stale '{}' documents", deleted, source);

    Ok(())
}
