//! Batch loading: one atomic, chunked, batch-tracked load per invocation.
//!
//! Order is fixed by the data's dependencies: employees and projects are
//! upserted first, time entries appended last. Everything runs inside a
//! single transaction; any store error rolls the whole invocation back and
//! the result reports `failed` with no partial commits. The batch audit row
//! is written after the transaction resolves so failed loads are auditable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::model::{CleanedBundle, Numbered};
use crate::store::{BatchRecord, Store, StoreTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Completed,
    CompletedWithErrors,
    Failed,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Completed => "completed",
            LoadStatus::CompletedWithErrors => "completed_with_errors",
            LoadStatus::Failed => "failed",
        }
    }
}

/// Per-dataset outcome within one load.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetOutcome {
    pub dataset: String,
    pub rows_processed: u64,
    pub errors: Vec<String>,
}

impl DatasetOutcome {
    fn new(dataset: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            rows_processed: 0,
            errors: Vec::new(),
        }
    }
}

/// What one load invocation did. Callers must inspect `status`; a `failed`
/// load has committed nothing regardless of the per-dataset counts.
#[derive(Debug, Serialize)]
pub struct LoadResult {
    pub batch_id: Uuid,
    pub status: LoadStatus,
    pub datasets: Vec<DatasetOutcome>,
    pub total_rows_processed: u64,
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

pub struct BatchLoader {
    store: Arc<dyn Store>,
    chunk_size: usize,
}

impl BatchLoader {
    pub fn new(store: Arc<dyn Store>, chunk_size: usize) -> Self {
        Self { store, chunk_size }
    }

    /// Load every non-empty dataset of the bundle under one fresh BatchId.
    /// `cancel` is checked between chunks; a set flag aborts with rollback.
    pub async fn load_all(&self, bundle: &CleanedBundle, cancel: Option<&AtomicBool>) -> LoadResult {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        let mut datasets = Vec::new();
        let mut errors = Vec::new();

        let status = match self.run_transaction(batch_id, bundle, cancel, &mut datasets).await {
            Ok(()) => {
                if datasets.iter().any(|d| !d.errors.is_empty()) {
                    LoadStatus::CompletedWithErrors
                } else {
                    LoadStatus::Completed
                }
            }
            Err(e) => {
                errors.push(format!("{:#}", e));
                LoadStatus::Failed
            }
        };

        let finished_at = Utc::now();
        let mut result = LoadResult {
            batch_id,
            status,
            total_rows_processed: datasets.iter().map(|d| d.rows_processed).sum(),
            datasets,
            errors,
            started_at,
            finished_at,
            duration_seconds: timer.elapsed().as_secs_f64(),
        };

        // Audit trail, outside the load transaction. A failure here does not
        // change the load's outcome; it is appended to the error list.
        let audit = BatchRecord {
            batch_id,
            status: status.as_str().to_string(),
            detail: serde_json::json!({
                "datasets": &result.datasets,
                "errors": &result.errors,
                "total_rows_processed": result.total_rows_processed,
            }),
            started_at,
            finished_at,
        };
        if let Err(e) = self.store.record_batch(&audit).await {
            result.errors.push(format!("batch audit write failed: {:#}", e));
        }

        result
    }

    async fn run_transaction(
        &self,
        batch_id: Uuid,
        bundle: &CleanedBundle,
        cancel: Option<&AtomicBool>,
        datasets: &mut Vec<DatasetOutcome>,
    ) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let outcome = self
            .run_datasets(tx.as_mut(), batch_id, bundle, cancel, datasets)
            .await;
        match outcome {
            Ok(()) => tx.commit().await,
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    eprintln!("Warning: rollback failed: {:#}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn run_datasets(
        &self,
        tx: &mut dyn StoreTx,
        batch_id: Uuid,
        bundle: &CleanedBundle,
        cancel: Option<&AtomicBool>,
        datasets: &mut Vec<DatasetOutcome>,
    ) -> Result<()> {
        // Employees and projects first: time entries reference both.
        if let Some(data) = &bundle.employee {
            if !data.records.is_empty() {
                let mut outcome = DatasetOutcome::new("employee");
                for chunk in data.records.chunks(self.chunk_size) {
                    check_cancelled(cancel)?;
                    let records = unwrap_chunk(chunk);
                    match tx.upsert_employees(&records).await {
                        Ok(n) => outcome.rows_processed += n,
                        Err(e) => return fail_dataset(outcome, datasets, e),
                    }
                }
                datasets.push(outcome);
            }
        }

        if let Some(data) = &bundle.project {
            if !data.records.is_empty() {
                let mut outcome = DatasetOutcome::new("project");
                for chunk in data.records.chunks(self.chunk_size) {
                    check_cancelled(cancel)?;
                    let records = unwrap_chunk(chunk);
                    match tx.upsert_projects(&records).await {
                        Ok(n) => outcome.rows_processed += n,
                        Err(e) => return fail_dataset(outcome, datasets, e),
                    }
                }
                datasets.push(outcome);
            }
        }

        if let Some(data) = &bundle.timecard {
            if !data.records.is_empty() {
                let mut outcome = DatasetOutcome::new("timecard");
                let mut expected: u64 = 0;
                for chunk in data.records.chunks(self.chunk_size) {
                    check_cancelled(cancel)?;
                    let records = unwrap_chunk(chunk);
                    expected += records.len() as u64;
                    match tx.append_time_entries(batch_id, &records).await {
                        Ok(n) => outcome.rows_processed += n,
                        Err(e) => return fail_dataset(outcome, datasets, e),
                    }
                }
                if outcome.rows_processed < expected {
                    outcome.errors.push(format!(
                        "{} time entries already recorded, skipped",
                        expected - outcome.rows_processed
                    ));
                }
                datasets.push(outcome);
            }
        }

        Ok(())
    }
}

fn check_cancelled(cancel: Option<&AtomicBool>) -> Result<()> {
    if cancel.map_or(false, |c| c.load(Ordering::Relaxed)) {
        bail!("load cancelled by caller");
    }
    Ok(())
}

fn unwrap_chunk<T: Clone>(chunk: &[Numbered<T>]) -> Vec<T> {
    chunk.iter().map(|n| n.record.clone()).collect()
}

/// Record the failing dataset's partial outcome, then propagate the error so
/// the transaction rolls back and later datasets never run.
fn fail_dataset(
    mut outcome: DatasetOutcome,
    datasets: &mut Vec<DatasetOutcome>,
    e: anyhow::Error,
) -> Result<()> {
    outcome.errors.push(format!("{:#}", e));
    datasets.push(outcome);
    Err(e)
}

// =============================================================================
// TESTS
// =============================================================================
