//! High-level ingest API: raw input to a ready-to-use [`Dataset`].
//!
//! Combines every step of ingestion: decoding, parse strategy selection,
//! orientation classification and, for row-aligned input, the pivot.
//!
//! # Example
//!
//! ```rust,ignore
//! use kpilens::transform::{ingest_file, IngestOptions};
//!
//! let output = ingest_file("pnl.csv", &IngestOptions::default())?;
//! println!("{} rows, {}", output.dataset.row_count(), output.classification.orientation);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{IngestError, IngestResult};
use crate::models::{Dataset, Orientation};
use crate::parser::{
    decode_bytes, format_delimiter, parse_with_strategies, read_text_file, DelimitedOptions,
};

use super::orientation::{Classification, OrientationClassifier};
use super::pivot::pivot;

/// Options for the ingest pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOptions {
    /// Use this delimiter instead of detecting one
    #[serde(default)]
    pub delimiter: Option<char>,

    /// Skip rows with the wrong field count instead of padding them
    #[serde(default)]
    pub strict: bool,

    /// Pivot row-aligned input (on by default)
    #[serde(default = "default_true")]
    pub auto_pivot: bool,
}

fn default_true() -> bool {
    true
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            strict: false,
            auto_pivot: true,
        }
    }
}

impl IngestOptions {
    fn delimited(&self) -> DelimitedOptions {
        DelimitedOptions {
            delimiter: self.delimiter,
            strict: self.strict,
        }
    }
}

/// Everything learned while ingesting one file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutput {
    /// The dataset, pivoted if the source was row-aligned
    pub dataset: Dataset,

    /// How the orientation was decided
    pub classification: Classification,

    /// Detected or forced delimiter (delimited input only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,

    /// Name of the parse strategy that produced the table
    pub strategy: String,

    /// Charset the bytes were decoded with (byte input only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Strict-mode row warnings
    pub warnings: Vec<String>,

    /// Rows dropped in strict mode
    pub skipped_rows: usize,
}

/// Tagged ingest result handed to the dashboard.
///
/// Either `data` or `error` is set, never both; a failed ingest carries no
/// partial dataset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<IngestOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    pub fn failure(error: &IngestError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

impl From<IngestResult<IngestOutput>> for IngestResponse {
    fn from(result: IngestResult<IngestOutput>) -> Self {
        match result {
            Ok(output) => Self {
                success: true,
                data: Some(output),
                error: None,
            },
            Err(e) => Self::failure(&e),
        }
    }
}

/// Ingest decoded text.
///
/// `file_name` only selects the parse strategies (see
/// [`crate::parser::strategies_for`]); it is also kept as the dataset's
/// source name.
pub fn ingest_text(
    content: &str,
    file_name: Option<&str>,
    options: &IngestOptions,
) -> IngestResult<IngestOutput> {
    log_info(format!("📖 Reading {}...", file_name.unwrap_or("upload")));

    let (strategy, table) = parse_with_strategies(content, file_name, &options.delimited())?;

    log_success(format!("Parsed with '{}' strategy", strategy.name()));
    if let Some(d) = table.delimiter {
        log_success(format!("Detected separator: '{}'", format_delimiter(d)));
    }
    log_success(format!(
        "Read {} rows, {} columns",
        table.rows.len(),
        table.headers.len()
    ));
    if table.skipped_rows > 0 {
        log_warning(format!("{} rows skipped (strict mode)", table.skipped_rows));
        for warning in &table.warnings {
            log_warning(format!("• {}", warning));
        }
    }

    log_info("🧭 Detecting orientation...");
    let classification = OrientationClassifier::new().classify(&table.headers, &table.rows);
    log_info(format!(
        "{} (rules fired: {})",
        classification.orientation,
        if classification.fired.is_empty() {
            "none".to_string()
        } else {
            classification.fired.join(", ")
        }
    ));
    if classification.ambiguous {
        log_warning("Headers look like periods but the first column does not name metrics; leaving as-is");
    }

    let mut dataset = Dataset::new(table.headers, table.rows, classification.orientation);
    if let Some(name) = file_name {
        dataset = dataset.with_source_name(name);
    }

    if classification.orientation == Orientation::RowAligned && options.auto_pivot {
        log_info("🔄 Pivoting periods into rows...");
        dataset = pivot(&dataset);
        log_success(format!(
            "{} periods × {} metrics",
            dataset.row_count(),
            dataset.headers.len().saturating_sub(1)
        ));
    }

    Ok(IngestOutput {
        dataset,
        classification,
        delimiter: table.delimiter.map(format_delimiter),
        strategy: strategy.name().to_string(),
        encoding: None,
        warnings: table.warnings,
        skipped_rows: table.skipped_rows,
    })
}

/// Ingest raw bytes, detecting the charset first.
pub fn ingest_bytes(
    bytes: &[u8],
    file_name: Option<&str>,
    options: &IngestOptions,
) -> IngestResult<IngestOutput> {
    let decoded = decode_bytes(bytes)?;
    log_success(format!("Detected encoding: {}", decoded.encoding));

    let mut output = ingest_text(&decoded.text, file_name, options)?;
    output.encoding = Some(decoded.encoding);
    Ok(output)
}

/// Ingest a file from disk.
pub fn ingest_file<P: AsRef<Path>>(path: P, options: &IngestOptions) -> IngestResult<IngestOutput> {
    let path = path.as_ref();
    let decoded = read_text_file(path)?;
    log_success(format!("Detected encoding: {}", decoded.encoding));

    let file_name = path.file_name().and_then(|n| n.to_str());
    let mut output = ingest_text(&decoded.text, file_name, options)?;
    output.encoding = Some(decoded.encoding);
    Ok(output)
}
