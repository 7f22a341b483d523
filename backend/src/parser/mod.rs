//! Raw input to headers + records, with encoding and delimiter auto-detection.
//!
//! - [`encoding`] - bytes to text (chardet + encoding_rs)
//! - [`delimited`] - delimiter detection, record splitting, tokenizing
//! - [`records`] - JSON arrays of objects
//! - [`strategy`] - which of the above to try for a given file name
//!
//! Nothing here knows about orientation or KPIs.

pub mod delimited;
pub mod encoding;
pub mod records;
pub mod strategy;

use std::path::Path;

use crate::error::CsvError;
use crate::models::Record;

pub use delimited::{
    detect_delimiter, parse_delimited, split_records, tokenize_line, unique_headers,
    DelimitedOptions, CANDIDATE_DELIMITERS, MAX_WARNINGS,
};
pub use encoding::{decode_bytes, detect_encoding, DecodeStrategy, Decoded};
pub use records::parse_json_records;
pub use strategy::{parse_with_strategies, strategies_for, ParseStrategy};

/// Headers and rows produced by any parse strategy.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    /// Column headers, made unique.
    pub headers: Vec<String>,
    /// One record per data row, keyed by header.
    pub rows: Vec<Record>,
    /// Separator used, for delimited input.
    pub delimiter: Option<char>,
    /// Strict-mode row warnings (capped at [`MAX_WARNINGS`]).
    pub warnings: Vec<String>,
    /// Rows dropped in strict mode.
    pub skipped_rows: usize,
}

/// Read a file and decode it to text.
pub fn read_text_file<P: AsRef<Path>>(path: P) -> Result<Decoded, CsvError> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_bytes(&bytes)
}

/// Human-readable delimiter for logs and CLI output.
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_text_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("Metric;2023\nRevenue;10".as_bytes()).unwrap();

        let decoded = read_text_file(file.path()).unwrap();
        assert_eq!(decoded.encoding, "utf-8");
        assert_eq!(detect_delimiter(&decoded.text), ';');
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            read_text_file("/definitely/not/here.csv"),
            Err(CsvError::IoError(_))
        ));
    }

    #[test]
    fn test_format_delimiter() {
        assert_eq!(format_delimiter('\t'), "\\t");
        assert_eq!(format_delimiter(';'), ";");
    }
}
