use crate::config::{Config, DumpConfig};
use crate::download::download_dump;
use crate::IngestSession;
use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};

struct PreparedDump {
    dump: DumpConfig,
    path: PathBuf,
}

/// Ingest every dump listed in the config into one session.
///
/// Downloads run ahead of indexing: while one dump is being indexed the next
/// one is fetched. A dump that fails to download or ingest is logged and
/// skipped; the number of such dumps is returned.
pub async fn run_batch(
    config: Config,
    http: reqwest::Client,
    session: &mut IngestSession,
) -> Result<usize> {
    info!("Starting batch import for {} dumps", config.dumps.len());

    std::fs::create_dir_all(&config.global.tmp_dir)?;

    // Buffer size 2 lets two downloaded dumps wait while one is indexing
    let (tx, mut rx) = mpsc::channel::<PreparedDump>(2);

    let dumps = config.dumps.clone();
    let tmp_dir = config.global.tmp_dir.clone();

    let producer = tokio::spawn(async move {
        for dump in dumps {
            info!("Preparing dump: {}", dump.name);
            match download_dump(&http, &dump.url, &tmp_dir).await {
                Ok(path) => {
                    if tx.send(PreparedDump { dump, path }).await.is_err() {
                        info!("Receiver dropped, stopping producer.");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to download {}: {:?}", dump.name, e);
                }
            }
        }
    });

    let mut completed = 0usize;
    while let Some(prepared) = rx.recv().await {
        info!("Starting ingest for {}", prepared.dump.name);

        if let Err(e) = session.ingest_file(&prepared.path).await {
            error!("Ingest failed for {}: {:?}", prepared.dump.name, e);
            continue;
        }

        completed += 1;
        info!("Dump {} complete.", prepared.dump.name);
    }

    producer.await?;

    let failed = config.dumps.len().saturating_sub(completed);
    info!(
        "Batch finished: {}/{} dumps ingested",
        completed,
        config.dumps.len()
    );
    Ok(failed)
}
