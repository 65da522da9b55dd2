use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;
use time::{Duration, PrimitiveDateTime};

use crate::repositories;
use crate::services::storage::{object_key_from_url, StorageService};

/// How often the sweeper runs.
pub(crate) const RETENTION_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);
/// Age after which a submitted file is purged.
pub(crate) const RETENTION_WINDOW: Duration = Duration::hours(24);
pub(crate) const PURGED_FILE_NOTE: &str = "File auto-deleted after 24h";

#[derive(Debug, Clone)]
pub(crate) struct ExpiredFile {
    pub(crate) submission_id: String,
    pub(crate) file_url: String,
}

#[async_trait]
pub(crate) trait RetentionStore: Send + Sync {
    async fn list_expired(&self, cutoff: PrimitiveDateTime) -> Result<Vec<ExpiredFile>>;

    /// Nulls the file reference and records the purge note in the answers.
    async fn clear_file(&self, submission_id: &str, marker: &Value) -> Result<()>;
}

#[async_trait]
pub(crate) trait ObjectRemover: Send + Sync {
    fn bucket(&self) -> &str;

    async fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) scanned: usize,
    pub(crate) purged: usize,
    pub(crate) delete_failures: usize,
    pub(crate) update_failures: usize,
}

pub(crate) fn purge_marker() -> Value {
    json!({ "info": PURGED_FILE_NOTE })
}

/// One pass of the retention sweep.
///
/// The record is cleared even when the object delete fails; delete failures are only logged
/// and counted. A failed record update is skipped so the rest of the batch still runs. Only a
/// failed scan aborts the pass.
pub(crate) async fn sweep_once<S, O>(
    store: &S,
    objects: Option<&O>,
    now: PrimitiveDateTime,
) -> Result<SweepReport>
where
    S: RetentionStore + ?Sized,
    O: ObjectRemover + ?Sized,
{
    let cutoff = now - RETENTION_WINDOW;
    let expired = store.list_expired(cutoff).await.context("Failed to fetch expired submission files")?;

    let mut report = SweepReport { scanned: expired.len(), ..SweepReport::default() };
    let marker = purge_marker();

    for file in &expired {
        match objects {
            Some(objects) => {
                let key = object_key_from_url(&file.file_url, objects.bucket());
                if let Err(err) = objects.remove(key).await {
                    tracing::warn!(
                        submission_id = %file.submission_id,
                        key,
                        error = %err,
                        "Failed to delete submission file from storage"
                    );
                    report.delete_failures += 1;
                }
            }
            None => {
                tracing::warn!(
                    submission_id = %file.submission_id,
                    "Storage is not configured; clearing file reference without deleting the object"
                );
                report.delete_failures += 1;
            }
        }

        if let Err(err) = store.clear_file(&file.submission_id, &marker).await {
            tracing::error!(
                submission_id = %file.submission_id,
                error = %err,
                "Failed to clear expired submission file"
            );
            report.update_failures += 1;
            continue;
        }

        report.purged += 1;
    }

    Ok(report)
}

pub(crate) async fn run_retention(
    db: &PgPool,
    storage: Option<&StorageService>,
    now: PrimitiveDateTime,
) -> Result<SweepReport> {
    let report = sweep_once(db, storage, now).await?;

    tracing::info!(
        scanned = report.scanned,
        purged = report.purged,
        delete_failures = report.delete_failures,
        update_failures = report.update_failures,
        "Retention sweep finished"
    );
    metrics::counter!("retention_runs_total").increment(1);
    metrics::counter!("retention_files_purged_total").increment(report.purged as u64);
    metrics::counter!("retention_file_delete_failures_total")
        .increment(report.delete_failures as u64);

    Ok(report)
}

#[async_trait]
impl RetentionStore for PgPool {
    async fn list_expired(&self, cutoff: PrimitiveDateTime) -> Result<Vec<ExpiredFile>> {
        let rows = repositories::submissions::list_expired_files(self, cutoff).await?;
        Ok(rows
            .into_iter()
            .map(|row| ExpiredFile { submission_id: row.id, file_url: row.file_url })
            .collect())
    }

    async fn clear_file(&self, submission_id: &str, marker: &Value) -> Result<()> {
        let updated = repositories::submissions::clear_file(self, submission_id, marker).await?;
        if !updated {
            tracing::debug!(submission_id, "Submission vanished before its file could be cleared");
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectRemover for StorageService {
    fn bucket(&self) -> &str {
        StorageService::bucket(self)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.delete_object(key).await
    }
}
