//! # KPI Lens - financial spreadsheet ingestion and KPI formatting
//!
//! KPI Lens reads CSV and JSON exports of financial statements, works out
//! whether metrics run down the rows or across the columns, pivots
//! period-per-column sheets into one record per period, computes KPIs and
//! formats the results in the Indian (lakh/crore) or international system.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / JSON │────▶│   Parser    │────▶│ Orientation │────▶│   Dataset   │
//! │  (any enc.) │     │ (auto-delim)│     │  + pivot    │     │ (col-aligned│
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                     ┌─────────────┐     ┌─────────────┐            │
//!                     │  Formatter  │◀────│  KPI engine │◀───────────┘
//!                     │ (₹72.45 L)  │     │ (+ series)  │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kpilens::{compute_kpis, format_kpi, ingest_file, suggest_kpis, FormatOptions, IngestOptions};
//!
//! let output = ingest_file("pnl.csv", &IngestOptions::default())?;
//! let definitions = suggest_kpis(&output.dataset, Some("₹"));
//! for kpi in compute_kpis(&output.dataset, &definitions) {
//!     if let Some(v) = format_kpi(&kpi, &FormatOptions::default()) {
//!         println!("{}: {}", kpi.name, v.formatted);
//!     }
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Dataset, cell values, KPIs
//! - [`parser`] - Encoding detection, delimited and JSON parsing
//! - [`transform`] - Orientation rules, pivot and the ingest pipeline
//! - [`kpi`] - Numeric coercion, aggregation, time series, KPI mappings
//! - [`format`] - Indian / international number formatting
//! - [`validation`] - JSON Schema checks for KPI mapping files
//! - [`store`] - Dashboard persistence
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// KPIs and formatting
pub mod format;
pub mod kpi;

// Validation
pub mod validation;

// Persistence and configuration
pub mod config;
pub mod store;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, CsvResult, IngestError, IngestResult, MappingError, MappingResult, ServerError,
    ServerResult, StoreError, StoreResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CellValue, ColumnRef, Dataset, FormattedValue, Kpi, KpiOperation, Orientation, PivotMeta,
    Record, TimeSeries,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_bytes, detect_delimiter, detect_encoding, parse_delimited, parse_json_records,
    parse_with_strategies, read_text_file, tokenize_line, DelimitedOptions, ParseStrategy,
    ParsedTable,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    classify, ingest_bytes, ingest_file, ingest_text, pivot, Classification, IngestOptions,
    IngestOutput, IngestResponse, OrientationClassifier,
};

// =============================================================================
// Re-exports - KPIs
// =============================================================================

pub use kpi::{
    aggregate, coerce_number, compute_kpi, compute_kpis, suggest_kpis, time_series,
    KpiDefinition, KpiMapping,
};

// =============================================================================
// Re-exports - Formatting
// =============================================================================

pub use format::{format_kpi, format_kpi_value, parse_formatted, FormatOptions, NumberSystem};

// =============================================================================
// Re-exports - Validation, store, config
// =============================================================================

pub use config::AppConfig;
pub use store::{Dashboard, DashboardStore, StorageState};
pub use validation::{is_valid, validate, validate_kpi_mapping};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, AppState};
}
