//! Batched product creation against the catalog store.
//!
//! Records are split into contiguous batches of `batch_size`. Every record in
//! a batch is created concurrently; the next batch starts only after the whole
//! current batch has settled. Progress and counts are published once per
//! settled batch, so observers never see a half-applied batch.
//!
//! A failed create is never retried and never aborts the run. It is logged and
//! kept as a [`RecordFailure`] in the returned [`ImportSummary`].

use crate::import::error::ImportError;
use crate::import::record::ProductRecord;
use crate::import::stats::ImportStats;
use crate::store::ProductStore;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Per-run overrides chosen by the operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportDefaults {
    /// Replaces every record's publish flag when set.
    #[serde(default)]
    pub default_publish: Option<bool>,
    /// Replaces every record's discount (percent, 0–100) when set.
    #[serde(default)]
    pub default_discount: Option<f64>,
}

impl ImportDefaults {
    pub fn validate(&self) -> Result<(), ImportError> {
        match self.default_discount {
            Some(discount) if !discount.is_finite() || !(0.0..=100.0).contains(&discount) => {
                Err(ImportError::InvalidDefaults(format!(
                    "discount must be between 0 and 100, got {discount}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Copy of `record` with overrides applied and `discount_price` computed.
    pub fn apply(&self, record: &ProductRecord) -> ProductRecord {
        let mut record = record.clone();
        if let Some(publish) = self.default_publish {
            record.publish = publish;
        }
        if let Some(discount) = self.default_discount {
            record.discount = discount;
        }
        record.discount_price = ProductRecord::discounted(record.retail_price, record.discount);
        record
    }
}

/// A record the catalog did not accept.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    /// Position in the mapped record list.
    pub index: usize,
    pub primary_sku: String,
    pub reason: String,
}

/// Snapshot published after each settled batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    /// 1-based index of the batch that just settled.
    pub batch: usize,
    pub batches: usize,
    pub processed: usize,
    pub total: usize,
    pub imported: usize,
    pub failed: usize,
    /// `round(processed / total * 100)`
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    Complete,
    Partial { imported: usize, total: usize },
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub total: usize,
    pub batches: usize,
    pub stats: ImportStats,
    pub failures: Vec<RecordFailure>,
}

impl ImportSummary {
    pub fn imported(&self) -> usize {
        self.stats.imported
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.stats.imported == self.total {
            RunOutcome::Complete
        } else {
            RunOutcome::Partial {
                imported: self.stats.imported,
                total: self.total,
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.outcome() == RunOutcome::Complete
    }

    pub fn message(&self) -> String {
        match self.outcome() {
            RunOutcome::Complete => format!("Imported all {} products", self.total),
            RunOutcome::Partial { imported, total } => format!(
                "Imported {imported} of {total} products; {} failed, check the logs for details",
                total - imported
            ),
        }
    }
}

pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((processed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Drives mapped records through the store in sequential, concurrent batches.
#[derive(Clone)]
pub struct BatchImporter {
    store: Arc<dyn ProductStore>,
    batch_size: usize,
}

impl BatchImporter {
    pub fn new(store: Arc<dyn ProductStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Check what [`BatchImporter::import`] requires before any call is made.
    pub fn check_preconditions(
        records: &[ProductRecord],
        defaults: &ImportDefaults,
    ) -> Result<(), ImportError> {
        if records.is_empty() {
            return Err(ImportError::NothingToImport);
        }
        defaults.validate()
    }

    /// Import `records`, invoking `on_batch` after each batch settles.
    pub async fn import<F>(
        &self,
        records: &[ProductRecord],
        defaults: &ImportDefaults,
        mut on_batch: F,
    ) -> Result<ImportSummary, ImportError>
    where
        F: FnMut(&BatchProgress),
    {
        Self::check_preconditions(records, defaults)?;

        let total = records.len();
        let batches = total.div_ceil(self.batch_size);
        let mut stats = ImportStats::default();
        let mut failures = Vec::new();

        log::info!(
            "import: starting {} products in {} batches of up to {}",
            total,
            batches,
            self.batch_size
        );

        for (batch_idx, chunk) in records.chunks(self.batch_size).enumerate() {
            let start = batch_idx * self.batch_size;
            let (batch_stats, batch_failures) = self.import_batch(start, chunk, defaults).await;

            stats.merge(batch_stats);
            failures.extend(batch_failures);

            let processed = start + chunk.len();
            let progress = BatchProgress {
                batch: batch_idx + 1,
                batches,
                processed,
                total,
                imported: stats.imported,
                failed: stats.failed,
                percent: progress_percent(processed, total),
            };

            log::debug!(
                "import: batch {}/{} settled ({} ok, {} failed), {}%",
                progress.batch,
                batches,
                batch_stats.imported,
                batch_stats.failed,
                progress.percent
            );
            on_batch(&progress);

            // let observers catch up before the next batch goes out
            tokio::task::yield_now().await;
        }

        let summary = ImportSummary {
            total,
            batches,
            stats,
            failures,
        };

        if summary.is_complete() {
            log::info!("import: {}", summary.message());
        } else {
            log::warn!("import: {}", summary.message());
        }

        Ok(summary)
    }

    async fn import_batch(
        &self,
        start: usize,
        chunk: &[ProductRecord],
        defaults: &ImportDefaults,
    ) -> (ImportStats, Vec<RecordFailure>) {
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<usize, String> = HashMap::with_capacity(chunk.len());

        for (offset, record) in chunk.iter().enumerate() {
            let index = start + offset;
            let record = defaults.apply(record);
            let store = Arc::clone(&self.store);
            pending.insert(index, record.primary_sku.clone());

            tasks.spawn(async move {
                let result = store.create_product(&record).await;
                (index, result.map_err(|err| err.to_string()))
            });
        }

        let mut stats = ImportStats {
            attempted: chunk.len(),
            ..ImportStats::default()
        };
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(created))) => {
                    pending.remove(&index);
                    stats.imported += 1;
                    log::trace!("import: record {} created as {}", index, created.id);
                }
                Ok((index, Err(reason))) => {
                    let primary_sku = pending.remove(&index).unwrap_or_default();
                    log::warn!(
                        "import: failed to create {} (record {}): {}",
                        primary_sku,
                        index,
                        reason
                    );
                    failures.push(RecordFailure {
                        index,
                        primary_sku,
                        reason,
                    });
                }
                Err(join_err) => {
                    log::error!("import: create task aborted: {}", join_err);
                }
            }
        }

        // anything still pending belongs to a task that panicked or was cancelled
        for (index, primary_sku) in pending {
            failures.push(RecordFailure {
                index,
                primary_sku,
                reason: "create task aborted".to_string(),
            });
        }

        failures.sort_by_key(|failure| failure.index);
        stats.failed = failures.len();
        (stats, failures)
    }
}
