use crate::import::session::SessionError;
use thiserror::Error;

/// Structural failures while reading a CSV export.
///
/// Any of these aborts the parse; no partial rows are returned.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV input has no header row")]
    MissingHeader,
    #[error("line {line}: quoted field is never closed")]
    UnterminatedQuote { line: u64 },
    #[error("line {line}: expected at most {expected} fields, found {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },
}

/// Errors that prevent an import run from starting or continuing.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file `{file_name}`: expected a .csv export")]
    UnsupportedFile { file_name: String },
    #[error("failed to parse `{file_name}`: {source}")]
    Parse {
        file_name: String,
        #[source]
        source: ParseError,
    },
    #[error("no products to import")]
    NothingToImport,
    #[error("invalid import defaults: {0}")]
    InvalidDefaults(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}
