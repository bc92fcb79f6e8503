use crate::services::ingest_service::IngestService;
use crate::services::staging::STAGING_PREFIX;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tokio::time::{Duration, sleep};

const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// Periodic housekeeping for the ingestion pipeline.
///
/// Drops idle per-video locks and removes staging files a crashed process
/// left behind. Files still owned by a live request are never old enough
/// to match.
pub struct BackgroundWorker {
    ingest: Arc<IngestService>,
    staging_dir: PathBuf,
    max_age: Duration,
    shutdown: watch::Receiver<bool>,
}

impl BackgroundWorker {
    pub fn new(
        ingest: Arc<IngestService>,
        staging_dir: PathBuf,
        max_age: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            ingest,
            staging_dir,
            max_age,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("🚀 Background worker started");

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Background worker shutting down");
                    break;
                }
                _ = sleep(SWEEP_INTERVAL) => {
                    self.perform_cleanup().await;
                }
            }
        }
    }

    async fn perform_cleanup(&self) {
        tracing::debug!("🧹 Running background cleanup tasks...");

        self.ingest.locks().cleanup();

        match sweep_stale_staging(&self.staging_dir, self.max_age).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!("Removed {} stale staging files", removed),
            Err(e) => tracing::error!(
                "Failed to sweep staging dir {}: {}",
                self.staging_dir.display(),
                e
            ),
        }
    }
}

/// Deletes staging files in `dir` whose last modification is older than
/// `max_age`. Returns how many were removed.
pub async fn sweep_stale_staging(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(STAGING_PREFIX) {
            continue;
        }

        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age < max_age {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Could not remove {}: {}", entry.path().display(), e),
        }
    }

    Ok(removed)
}
