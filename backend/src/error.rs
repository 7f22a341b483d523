//! Error types for the KPI Lens pipeline.
//!
//! One enum per layer:
//!
//! - [`CsvError`] - Decoding and tokenizing raw files
//! - [`IngestError`] - Turning text into a [`crate::models::Dataset`]
//! - [`MappingError`] - Loading and validating KPI definitions
//! - [`StoreError`] - Dashboard persistence
//! - [`ServerError`] - HTTP layer
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV / decoding errors
// =============================================================================

/// Errors while reading raw bytes or delimited text.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// No decode strategy produced text.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Empty input.
    #[error("File is empty")]
    EmptyFile,

    /// First record had no usable header.
    #[error("No headers found")]
    NoHeaders,
}

// =============================================================================
// Ingest errors
// =============================================================================

/// Errors while building a dataset from decoded text.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Delimited parsing failed.
    #[error("{0}")]
    Csv(#[from] CsvError),

    /// Structured records were not valid JSON.
    #[error("Invalid JSON records: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON was valid but not an array of objects.
    #[error("Unsupported record layout: {0}")]
    UnsupportedLayout(String),

    /// Every parse strategy failed; messages are in attempt order.
    #[error("Could not parse '{file}': {}", .attempts.join("; "))]
    AllStrategiesFailed { file: String, attempts: Vec<String> },
}

// =============================================================================
// KPI mapping errors
// =============================================================================

/// Errors in user-supplied KPI definitions.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Mapping file could not be read.
    #[error("Failed to read mapping: {0}")]
    IoError(#[from] std::io::Error),

    /// Mapping is not valid JSON or does not deserialize.
    #[error("Invalid mapping JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Mapping failed schema validation.
    #[error("Mapping failed validation: {}", .errors.join("; "))]
    SchemaError { errors: Vec<String> },

    /// A ratio/percent KPI without its second column.
    #[error("KPI '{kpi}' uses '{operation}' and needs columnB")]
    MissingSecondColumn { kpi: String, operation: String },
}

// =============================================================================
// Store errors
// =============================================================================

/// Errors from the dashboard store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Dashboard not found.
    #[error("Dashboard not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("Store IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error.
    #[error("Store JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Server errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Ingestion failed.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Bad KPI definitions.
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for ingestion.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for KPI mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile;
        let ingest_err: IngestError = csv_err.into();
        assert!(ingest_err.to_string().contains("empty"));

        let server_err: ServerError = ingest_err.into();
        assert!(server_err.to_string().starts_with("Ingest error"));
    }

    #[test]
    fn test_all_strategies_failed_lists_attempts() {
        let err = IngestError::AllStrategiesFailed {
            file: "q3.json".into(),
            attempts: vec!["json: expected value".into(), "delimited: File is empty".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("q3.json"));
        assert!(msg.contains("json: expected value; delimited: File is empty"));
    }

    #[test]
    fn test_missing_second_column_format() {
        let err = MappingError::MissingSecondColumn {
            kpi: "Gross Margin".into(),
            operation: "ratio".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Gross Margin"));
        assert!(msg.contains("columnB"));
    }
}
