//! CSV export parsing.
//!
//! Turns the raw bytes of a storefront product export into an ordered list of
//! [`RawRow`]s keyed by header name. Values are kept as strings; numeric and
//! boolean interpretation happens in the mapper.
//!
//! # Tolerated input
//!
//! - Blank lines (including lines of only separators/whitespace) are skipped
//! - Short rows are padded with empty strings for the missing trailing columns
//! - A leading UTF-8 byte order mark is ignored
//!
//! # Rejected input
//!
//! - Invalid UTF-8 anywhere in the stream
//! - No header row
//! - A row with more fields than there are headers
//! - A quoted field that is still open at the end of input
//!
//! Any rejection aborts the whole parse. Rows without a SKU are dropped here
//! so the mapper never sees them.

use crate::import::error::{ImportError, ParseError};
use std::collections::HashMap;
use std::path::Path;

/// Column holding the source product identifier.
pub const SKU_COLUMN: &str = "SKU";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One data line of the export, keyed by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    line: u64,
    fields: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line: u64, fields: HashMap<String, String>) -> Self {
        Self { line, fields }
    }

    /// Build a row from `(column, value)` pairs. The first value wins for duplicate columns.
    pub fn from_pairs<I, K, V>(line: u64, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = HashMap::new();
        for (key, value) in pairs {
            fields.entry(key.into()).or_insert_with(|| value.into());
        }
        Self { line, fields }
    }

    /// 1-based line number in the source file (0 when unknown).
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Raw value for `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// Trimmed value for `column` when it is present and non-empty.
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        let value = self.get(column).trim();
        if value.is_empty() { None } else { Some(value) }
    }

    pub fn sku(&self) -> Option<&str> {
        self.non_empty(SKU_COLUMN)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Check that a selected file looks like a CSV export before reading it.
pub fn validate_file_name(file_name: &str) -> Result<(), ImportError> {
    let is_csv = Path::new(file_name.trim())
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        Ok(())
    } else {
        Err(ImportError::UnsupportedFile {
            file_name: file_name.to_string(),
        })
    }
}

/// Fail when a quoted field opens and never closes.
///
/// The csv reader folds everything after such a quote into one field, so the
/// rows behind it would vanish silently. A quote only opens a field when it is
/// the field's first byte, the same rule the reader applies.
fn check_quotes(input: &[u8]) -> Result<(), ParseError> {
    let mut line = 1u64;
    let mut open_line = None;
    let mut field_start = true;
    let mut bytes = input.iter().peekable();

    while let Some(&byte) = bytes.next() {
        if byte == b'\n' {
            line += 1;
        }

        if open_line.is_some() {
            if byte == b'"' {
                if bytes.peek() == Some(&&b'"') {
                    bytes.next();
                } else {
                    open_line = None;
                }
            }
            continue;
        }

        match byte {
            b'"' if field_start => {
                open_line = Some(line);
                field_start = false;
            }
            b',' | b'\n' | b'\r' => field_start = true,
            _ => field_start = false,
        }
    }

    match open_line {
        Some(line) => Err(ParseError::UnterminatedQuote { line }),
        None => Ok(()),
    }
}

/// Parse a CSV export into rows that carry a SKU.
pub fn parse_rows(input: &[u8]) -> Result<Vec<RawRow>, ParseError> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
    check_quotes(input)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(ParseError::MissingHeader);
    }

    let mut rows = Vec::new();
    let mut skipped_without_sku = 0usize;

    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if record.len() > headers.len() {
            return Err(ParseError::TooManyFields {
                line,
                expected: headers.len(),
                found: record.len(),
            });
        }

        let pairs = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.clone(), record.get(idx).unwrap_or("").to_string()));
        let row = RawRow::from_pairs(line, pairs);

        if row.sku().is_none() {
            log::trace!("line {}: no SKU, skipping row", line);
            skipped_without_sku += 1;
            continue;
        }

        rows.push(row);
    }

    log::debug!(
        "parsed {} rows with a SKU ({} without SKU skipped, {} columns)",
        rows.len(),
        skipped_without_sku,
        headers.len()
    );

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_keyed_rows() {
        let input = b"SKU,Name,Regular price\nAZ-1,Acme Shaker Wall Cabinet 9W X 30H,120\n";
        let rows = parse_rows(input).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("SKU"), "AZ-1");
        assert_eq!(rows[0].get("Regular price"), "120");
        assert_eq!(rows[0].line(), 2);
    }

    #[test]
    fn short_rows_are_padded() {
        let rows = parse_rows(b"SKU,Name,Tags\nAZ-7,Cabinet\n").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Tags"), "");
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let rows = parse_rows(b"SKU,Name\n\nAZ-1,One\n,\n\nAZ-2,Two\n").unwrap();
        let skus: Vec<_> = rows.iter().map(|row| row.get("SKU")).collect();
        assert_eq!(skus, vec!["AZ-1", "AZ-2"]);
    }

    #[test]
    fn rows_without_sku_are_dropped() {
        let rows = parse_rows(b"SKU,Name\n  ,Nameless\nAZ-3,Kept\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Name"), "Kept");
    }

    #[test]
    fn values_stay_strings() {
        let rows = parse_rows(b"SKU,Published,Weight (lbs)\nAZ-1,1,007.50\n").unwrap();
        assert_eq!(rows[0].get("Published"), "1");
        assert_eq!(rows[0].get("Weight (lbs)"), "007.50");
    }

    #[test]
    fn quoted_fields_keep_commas() {
        let input = b"SKU,Images\nAZ-1,\"https://a/1.jpg, https://a/2.jpg\"\n";
        let rows = parse_rows(input).unwrap();
        assert_eq!(rows[0].get("Images"), "https://a/1.jpg, https://a/2.jpg");
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let rows = parse_rows(b"\xEF\xBB\xBFSKU,Name\nAZ-1,One\n").unwrap();
        assert_eq!(rows[0].get("SKU"), "AZ-1");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = parse_rows(b"SKU,Name\nAZ-1,\xff\xfe\n").unwrap_err();
        assert!(matches!(err, ParseError::Csv(_)));
    }

    #[test]
    fn rejects_unterminated_quote() {
        let input = b"SKU,Name\nAZ-1,\"Acme Shaker\nAZ-2,Two\nAZ-3,Three\n";
        let err = parse_rows(input).unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedQuote { line: 2 }));
    }

    #[test]
    fn closed_and_literal_quotes_are_accepted() {
        let input = b"SKU,Name,Description\n\
AZ-1,\"Acme \"\"Shaker\"\" Wall\",\"two\nlines\"\n\
AZ-2,Base 12\" wide,plain\n";
        let rows = parse_rows(input).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Name"), "Acme \"Shaker\" Wall");
        assert_eq!(rows[0].get("Description"), "two\nlines");
        assert_eq!(rows[1].get("Name"), "Base 12\" wide");
    }

    #[test]
    fn rejects_rows_longer_than_header() {
        let err = parse_rows(b"SKU,Name\nAZ-1,One\nAZ-2,Two,Extra\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::TooManyFields {
                line: 3,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn rejects_missing_header() {
        assert!(matches!(parse_rows(b"").unwrap_err(), ParseError::MissingHeader));
    }

    #[test]
    fn validates_file_extension() {
        assert!(validate_file_name("wc-product-export.csv").is_ok());
        assert!(validate_file_name("EXPORT.CSV").is_ok());
        assert!(matches!(
            validate_file_name("products.xlsx"),
            Err(ImportError::UnsupportedFile { .. })
        ));
        assert!(validate_file_name("csv").is_err());
    }
}
