//! Import coordination for one session.
//!
//! Ties the pipeline stages to an [`ImportSession`]:
//! 1. Validate the selected file name
//! 2. Parse rows and map them to records (session reset first)
//! 3. Check run preconditions and mark the session busy
//! 4. Run the batched import, publishing progress into the session

use crate::import::batch::{BatchImporter, ImportDefaults, ImportSummary};
use crate::import::error::ImportError;
use crate::import::mapper::FieldMapper;
use crate::import::parser::{RawRow, parse_rows, validate_file_name};
use crate::import::record::ProductRecord;
use crate::import::session::{SessionError, SessionSnapshot, SharedSession};

/// Rows and records produced from one export file.
#[derive(Debug, Clone, Default)]
pub struct ParsedExport {
    pub rows: Vec<RawRow>,
    pub records: Vec<ProductRecord>,
}

/// Validate, parse and map an export without touching any session.
pub fn parse_export(
    file_name: &str,
    input: &[u8],
    mapper: &FieldMapper,
) -> Result<ParsedExport, ImportError> {
    validate_file_name(file_name)?;

    let rows = parse_rows(input).map_err(|source| ImportError::Parse {
        file_name: file_name.to_string(),
        source,
    })?;
    let records = mapper.map_rows(&rows);

    let low_confidence = records.iter().filter(|r| r.low_confidence).count();
    log::info!(
        "parsed `{}`: {} rows, {} products ({} with low-confidence titles)",
        file_name,
        rows.len(),
        records.len(),
        low_confidence
    );

    Ok(ParsedExport { rows, records })
}

/// Reset the session and load a newly selected file into it.
///
/// On a structural failure the session keeps only the error message.
pub fn load_export(
    session: &SharedSession,
    file_name: &str,
    input: &[u8],
    mapper: &FieldMapper,
    preview_size: usize,
) -> Result<SessionSnapshot, ImportError> {
    let run_id = session.lock().begin_parse(file_name)?;

    match parse_export(file_name, input, mapper) {
        Ok(parsed) => {
            let mut guard = session.lock();
            if !guard.finish_parse(run_id, parsed.rows, parsed.records, preview_size) {
                return Err(SessionError::ParseSuperseded.into());
            }
            Ok(guard.snapshot())
        }
        Err(err) => {
            log::warn!("failed to load `{}`: {}", file_name, err);
            session.lock().fail_parse(run_id, err.to_string());
            Err(err)
        }
    }
}

/// Check preconditions and mark the session busy.
///
/// Returns the records to import; nothing is changed when a check fails.
pub fn begin_import(
    session: &SharedSession,
    defaults: &ImportDefaults,
) -> Result<Vec<ProductRecord>, ImportError> {
    let mut guard = session.lock();
    guard.ensure_idle()?;
    BatchImporter::check_preconditions(guard.records(), defaults)?;
    guard.begin_import()?;
    Ok(guard.records().to_vec())
}

/// Run an import previously started with [`begin_import`] to completion.
pub async fn run_import(
    session: SharedSession,
    importer: BatchImporter,
    records: Vec<ProductRecord>,
    defaults: ImportDefaults,
) -> Result<ImportSummary, ImportError> {
    let progress_session = session.clone();
    let result = importer
        .import(&records, &defaults, move |progress| {
            progress_session.lock().record_batch(progress);
        })
        .await;

    let mut guard = session.lock();
    match &result {
        Ok(summary) => guard.finish_import(summary),
        Err(err) => guard.fail_import(err.to_string()),
    }
    result
}
