//! State for one interactive import run.
//!
//! An [`ImportSession`] is owned by the surface driving a single import. It
//! holds what the operator sees: parsed rows, mapped records, a preview,
//! progress and counts. It is created empty, reset when a new file is
//! selected, and keeps its terminal state until the next reset.
//!
//! A running import or an in-flight parse marks the session busy; `reset`,
//! a new `begin_parse` and `begin_import` are rejected until it finishes.
//! Parse results carry the run id handed out by `begin_parse`, and results
//! for any other run are dropped.

use crate::import::batch::{BatchProgress, ImportSummary, RecordFailure};
use crate::import::parser::RawRow;
use crate::import::record::ProductRecord;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Session shared between route handlers and the background import task.
///
/// Never hold the lock across an `.await`.
pub type SharedSession = Arc<Mutex<ImportSession>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("an import is in progress; wait for it to finish")]
    ImportInProgress,
    #[error("a file is still being parsed")]
    ParseInProgress,
    #[error("the session was reset before parsing finished")]
    ParseSuperseded,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSession {
    run_id: Option<Uuid>,
    file_name: Option<String>,
    rows: Vec<RawRow>,
    records: Vec<ProductRecord>,
    preview: Vec<ProductRecord>,
    parsing: bool,
    importing: bool,
    progress: u8,
    imported: usize,
    total: usize,
    failures: Vec<RecordFailure>,
    message: String,
    error: Option<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// Serializable view of the session for the status surface.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub run_id: Option<Uuid>,
    pub file_name: Option<String>,
    pub parsing: bool,
    pub importing: bool,
    pub progress: u8,
    pub imported: usize,
    pub total: usize,
    pub failed: usize,
    pub row_count: usize,
    pub record_count: usize,
    pub message: String,
    pub error: Option<String>,
    pub preview: Vec<ProductRecord>,
    pub failures: Vec<RecordFailure>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSession {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Return every field to its initial value.
    ///
    /// Rejected while an import runs or a file is being parsed.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        *self = Self::default();
        Ok(())
    }

    /// Fails while an import runs or a file is being parsed.
    pub fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.importing {
            return Err(SessionError::ImportInProgress);
        }
        if self.parsing {
            return Err(SessionError::ParseInProgress);
        }
        Ok(())
    }

    /// Reset and mark a new file as being parsed.
    ///
    /// Returns the run id the parse results must be delivered with.
    pub fn begin_parse(&mut self, file_name: &str) -> Result<Uuid, SessionError> {
        self.reset()?;
        let run_id = Uuid::new_v4();
        self.run_id = Some(run_id);
        self.file_name = Some(file_name.to_string());
        self.parsing = true;
        self.message = format!("Parsing {file_name}...");
        Ok(run_id)
    }

    /// Whether `run_id` is the parse this session is waiting for.
    fn owns_parse(&self, run_id: Uuid) -> bool {
        if self.parsing && self.run_id == Some(run_id) {
            return true;
        }
        log::debug!("session: dropping parse result of stale run {}", run_id);
        false
    }

    /// Store the parse results of `run_id`. Results of any other run are dropped.
    pub fn finish_parse(
        &mut self,
        run_id: Uuid,
        rows: Vec<RawRow>,
        records: Vec<ProductRecord>,
        preview_size: usize,
    ) -> bool {
        if !self.owns_parse(run_id) {
            return false;
        }
        self.parsing = false;
        self.preview = records.iter().take(preview_size).cloned().collect();
        self.total = records.len();
        self.message = format!(
            "Parsed {} rows, {} products ready to import",
            rows.len(),
            records.len()
        );
        self.rows = rows;
        self.records = records;
        self.error = None;
        true
    }

    /// Structural parse failure of `run_id`: no partial data is kept.
    pub fn fail_parse(&mut self, run_id: Uuid, message: impl Into<String>) -> bool {
        if !self.owns_parse(run_id) {
            return false;
        }
        let message = message.into();
        self.parsing = false;
        self.rows.clear();
        self.records.clear();
        self.preview.clear();
        self.total = 0;
        self.message = message.clone();
        self.error = Some(message);
        true
    }

    /// Mark the session busy for a new run over the mapped records.
    pub fn begin_import(&mut self) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.importing = true;
        self.progress = 0;
        self.imported = 0;
        self.total = self.records.len();
        self.failures.clear();
        self.error = None;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.message = format!("Importing {} products...", self.total);
        Ok(())
    }

    pub fn record_batch(&mut self, progress: &BatchProgress) {
        self.progress = self.progress.max(progress.percent);
        self.imported = progress.imported;
        self.message = format!(
            "Imported {} of {} products (batch {}/{})",
            progress.imported, progress.total, progress.batch, progress.batches
        );
    }

    pub fn finish_import(&mut self, summary: &ImportSummary) {
        self.importing = false;
        self.progress = 100;
        self.imported = summary.imported();
        self.total = summary.total;
        self.failures = summary.failures.clone();
        self.message = summary.message();
        self.finished_at = Some(Utc::now());
    }

    /// The run could not start or was interrupted before completing.
    pub fn fail_import(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.importing = false;
        self.message = message.clone();
        self.error = Some(message);
        self.finished_at = Some(Utc::now());
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn preview(&self) -> &[ProductRecord] {
        &self.preview
    }

    pub fn is_importing(&self) -> bool {
        self.importing
    }

    pub fn is_parsing(&self) -> bool {
        self.parsing
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn imported(&self) -> usize {
        self.imported
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            run_id: self.run_id,
            file_name: self.file_name.clone(),
            parsing: self.parsing,
            importing: self.importing,
            progress: self.progress,
            imported: self.imported,
            total: self.total,
            failed: self.failures.len(),
            row_count: self.rows.len(),
            record_count: self.records.len(),
            message: self.message.clone(),
            error: self.error.clone(),
            preview: self.preview.clone(),
            failures: self.failures.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::stats::ImportStats;
    use crate::test_support::sample_record;

    fn parsed_session(count: usize) -> ImportSession {
        let mut session = ImportSession::new();
        let run_id = session.begin_parse("export.csv").unwrap();
        let rows = (0..count)
            .map(|i| RawRow::from_pairs(i as u64 + 2, [("SKU", format!("AZ-{i}"))]))
            .collect();
        let records = (0..count).map(|i| sample_record(&format!("W-{i}"))).collect();
        assert!(session.finish_parse(run_id, rows, records, 2));
        session
    }

    #[test]
    fn parse_populates_preview() {
        let session = parsed_session(5);
        let snapshot = session.snapshot();

        assert!(!snapshot.parsing);
        assert_eq!(snapshot.row_count, 5);
        assert_eq!(snapshot.record_count, 5);
        assert_eq!(snapshot.preview.len(), 2);
        assert_eq!(snapshot.file_name.as_deref(), Some("export.csv"));
        assert!(snapshot.run_id.is_some());
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = parsed_session(3);
        session.reset().unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.record_count, 0);
        assert_eq!(snapshot.preview.len(), 0);
        assert_eq!(snapshot.run_id, None);
        assert_eq!(snapshot.message, "");
        assert_eq!(snapshot.progress, 0);
    }

    #[test]
    fn reset_is_rejected_during_import() {
        let mut session = parsed_session(3);
        session.begin_import().unwrap();

        assert_eq!(session.reset(), Err(SessionError::ImportInProgress));
        assert_eq!(
            session.begin_parse("other.csv"),
            Err(SessionError::ImportInProgress)
        );
        assert_eq!(session.begin_import(), Err(SessionError::ImportInProgress));
        assert_eq!(session.records().len(), 3);
    }

    #[test]
    fn failed_parse_keeps_no_partial_data() {
        let mut session = parsed_session(3);
        session.reset().unwrap();
        let run_id = session.begin_parse("broken.csv").unwrap();
        assert!(session.fail_parse(run_id, "malformed CSV input"));

        assert!(session.records().is_empty());
        assert!(!session.is_parsing());
        assert_eq!(session.snapshot().error.as_deref(), Some("malformed CSV input"));
    }

    #[test]
    fn parse_in_flight_blocks_new_uploads_and_reset() {
        let mut session = ImportSession::new();
        let first = session.begin_parse("first.csv").unwrap();

        assert_eq!(
            session.begin_parse("second.csv"),
            Err(SessionError::ParseInProgress)
        );
        assert_eq!(session.reset(), Err(SessionError::ParseInProgress));
        assert_eq!(session.begin_import(), Err(SessionError::ParseInProgress));

        assert!(session.finish_parse(first, Vec::new(), vec![sample_record("W-FIRST")], 5));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.file_name.as_deref(), Some("first.csv"));
        assert_eq!(snapshot.record_count, 1);
        assert!(session.reset().is_ok());
    }

    #[test]
    fn stale_parse_results_are_dropped() {
        let mut session = ImportSession::new();
        let first = session.begin_parse("first.csv").unwrap();
        assert!(session.fail_parse(first, "malformed CSV input"));

        let second = session.begin_parse("second.csv").unwrap();
        assert!(!session.finish_parse(first, Vec::new(), vec![sample_record("W-FIRST")], 5));
        assert!(!session.fail_parse(first, "late failure"));
        assert!(session.is_parsing());
        assert!(session.records().is_empty());

        assert!(session.finish_parse(second, Vec::new(), vec![sample_record("W-SECOND")], 5));
        assert!(!session.finish_parse(second, Vec::new(), Vec::new(), 5));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.file_name.as_deref(), Some("second.csv"));
        assert_eq!(snapshot.preview[0].primary_sku, "W-SECOND");
        assert_eq!(snapshot.error, None);
    }

    #[test]
    fn progress_never_moves_backwards() {
        let mut session = parsed_session(4);
        session.begin_import().unwrap();

        let progress = |percent, imported| BatchProgress {
            batch: 1,
            batches: 2,
            processed: 2,
            total: 4,
            imported,
            failed: 0,
            percent,
        };
        session.record_batch(&progress(50, 2));
        session.record_batch(&progress(40, 2));
        assert_eq!(session.progress(), 50);

        session.finish_import(&ImportSummary {
            total: 4,
            batches: 2,
            stats: ImportStats {
                attempted: 4,
                imported: 3,
                failed: 1,
            },
            failures: vec![RecordFailure {
                index: 2,
                primary_sku: "W-2".to_string(),
                reason: "rejected".to_string(),
            }],
        });

        assert!(!session.is_importing());
        assert_eq!(session.progress(), 100);
        assert_eq!(session.imported(), 3);
        assert!(session.message().contains("3 of 4"));
        assert!(session.reset().is_ok());
    }
}
