//! REST API request and response bodies.
//!
//! Field names are camelCase on the wire, matching the dashboard client.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::format::{format_kpi, FormatOptions};
use crate::kpi::KpiDefinition;
use crate::models::{Dataset, FormattedValue, Kpi};
use crate::store::StorageState;
use crate::transform::{Classification, IngestOutput};

/// A KPI next to its display strings (`None` when the KPI has no value)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedKpi {
    #[serde(flatten)]
    pub kpi: Kpi,
    pub display: Option<FormattedValue>,
}

impl FormattedKpi {
    pub fn new(kpi: Kpi, options: &FormatOptions) -> Self {
        let display = format_kpi(&kpi, options);
        Self { kpi, display }
    }

    pub fn all(kpis: Vec<Kpi>, options: &FormatOptions) -> Vec<Self> {
        kpis.into_iter().map(|k| Self::new(k, options)).collect()
    }
}

/// Response to `POST /api/upload`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    /// Store id of the dashboard built from the upload
    pub dashboard_id: String,
    /// Whether the dashboard reached disk
    pub storage: StorageState,
    pub dataset: Dataset,
    pub classification: Classification,
    pub kpis: Vec<FormattedKpi>,
    pub metadata: UploadMetadata,
}

/// What the parser learned about the file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    pub file_name: Option<String>,
    pub encoding: Option<String>,
    pub delimiter: Option<String>,
    pub strategy: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub warnings: Vec<String>,
    pub skipped_rows: usize,
}

impl UploadMetadata {
    pub fn from_output(output: &IngestOutput, file_name: Option<String>) -> Self {
        Self {
            file_name,
            encoding: output.encoding.clone(),
            delimiter: output.delimiter.clone(),
            strategy: output.strategy.clone(),
            row_count: output.dataset.row_count(),
            columns: output.dataset.headers.clone(),
            warnings: output.warnings.clone(),
            skipped_rows: output.skipped_rows,
        }
    }
}

/// Body of `POST /api/kpis`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpisRequest {
    pub dataset: Dataset,
    pub definitions: Vec<KpiDefinition>,
    /// Formatting for the `display` field; server defaults when absent
    #[serde(default)]
    pub options: Option<FormatOptions>,
}

/// Response to `POST /api/kpis`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpisResponse {
    pub success: bool,
    pub kpis: Vec<FormattedKpi>,
}

/// Body of `POST /api/format`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatRequest {
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub options: Option<FormatOptions>,
}

/// Create an error body with the same shape as a failed ingest
pub fn error_response(error: &str) -> Value {
    json!({
        "success": false,
        "error": error,
    })
}
