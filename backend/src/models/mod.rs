//! Domain models for the KPI Lens pipeline.
//!
//! This module contains the core data structures shared by every stage:
//!
//! - [`CellValue`] - A single cell: number, text or null
//! - [`Dataset`] - Headers + rows, one per imported file
//! - [`ColumnRef`] - Opaque column identity, distinct from the display name
//! - [`Kpi`] - A computed business metric with optional [`TimeSeries`]
//! - [`FormattedValue`] - Display strings derived from a value and unit

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// Cell values
// =============================================================================

/// A single cell of a dataset.
///
/// Serialized untagged, so it reads and writes as a plain JSON number,
/// string or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    #[default]
    Null,
}

impl CellValue {
    /// Build a cell from raw text, keeping blanks as `Null`.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Null, or text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<Option<f64>> for CellValue {
    fn from(n: Option<f64>) -> Self {
        n.map(CellValue::Number).unwrap_or(CellValue::Null)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Null => Ok(()),
        }
    }
}

static NULL_CELL: CellValue = CellValue::Null;

/// One dataset row: column name → value.
pub type Record = BTreeMap<String, CellValue>;

// =============================================================================
// Dataset
// =============================================================================

/// Whether metrics run down the rows or across the columns of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// One record per row, metrics as columns. Usable as-is.
    #[default]
    ColumnAligned,
    /// One metric per row, periods as columns. Needs a pivot.
    RowAligned,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::ColumnAligned => f.write_str("column_aligned"),
            Orientation::RowAligned => f.write_str("row_aligned"),
        }
    }
}

/// Where a pivoted dataset came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotMeta {
    /// Header of the source column holding the metric names.
    pub attribute_column: String,
    /// Source headers that became the `period` values.
    pub period_headers: Vec<String>,
}

/// Tabular data from a single imported file.
///
/// Every row carries exactly the keys listed in `headers`; the constructor
/// fills missing keys with `Null` and drops unknown ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_meta: Option<PivotMeta>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Dataset {
    /// Create a dataset, enforcing the row/header key invariant.
    pub fn new(headers: Vec<String>, rows: Vec<Record>, orientation: Orientation) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| conform_row(&headers, row))
            .collect();

        Self {
            id: new_id(),
            source_name: None,
            headers,
            rows,
            orientation,
            pivot_meta: None,
        }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn with_pivot_meta(mut self, meta: PivotMeta) -> Self {
        self.pivot_meta = Some(meta);
        self
    }

    /// Re-apply the row invariant, e.g. after deserializing client input.
    pub fn normalized(mut self) -> Self {
        let headers = self.headers.clone();
        self.rows = self
            .rows
            .into_iter()
            .map(|row| conform_row(&headers, row))
            .collect();
        self
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Values of one column in row order, or `None` if the column is unknown.
    pub fn column(&self, name: &str) -> Option<Vec<&CellValue>> {
        if !self.has_column(name) {
            return None;
        }
        Some(
            self.rows
                .iter()
                .map(|row| row.get(name).unwrap_or(&NULL_CELL))
                .collect(),
        )
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_pivoted(&self) -> bool {
        self.pivot_meta.is_some()
    }

    /// One opaque reference per header, scoped to this dataset.
    pub fn column_refs(&self) -> Vec<ColumnRef> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, name)| ColumnRef {
                id: format!("{}#{}", self.id, i),
                name: name.clone(),
                source_file_id: self.id.clone(),
            })
            .collect()
    }
}

fn conform_row(headers: &[String], mut row: Record) -> Record {
    headers
        .iter()
        .map(|h| (h.clone(), row.remove(h).unwrap_or(CellValue::Null)))
        .collect()
}

/// Identity of a column within one source file.
///
/// Two files may both have a "Revenue" column; their refs still differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRef {
    pub id: String,
    pub name: String,
    pub source_file_id: String,
}

// =============================================================================
// KPIs
// =============================================================================

/// How a KPI value is computed from its column(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiOperation {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    /// `sum(A) / sum(B)`
    Ratio,
    /// `(sum(A) - sum(B)) / sum(B) * 100`
    Percent,
    /// Free-form expression, kept as display metadata only.
    Custom,
}

impl KpiOperation {
    pub fn needs_second_column(&self) -> bool {
        matches!(self, KpiOperation::Ratio | KpiOperation::Percent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KpiOperation::Sum => "sum",
            KpiOperation::Avg => "avg",
            KpiOperation::Min => "min",
            KpiOperation::Max => "max",
            KpiOperation::Count => "count",
            KpiOperation::Ratio => "ratio",
            KpiOperation::Percent => "percent",
            KpiOperation::Custom => "custom",
        }
    }
}

impl FromStr for KpiOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sum" | "total" => Ok(KpiOperation::Sum),
            "avg" | "average" | "mean" => Ok(KpiOperation::Avg),
            "min" => Ok(KpiOperation::Min),
            "max" => Ok(KpiOperation::Max),
            "count" => Ok(KpiOperation::Count),
            "ratio" => Ok(KpiOperation::Ratio),
            "percent" | "percent_change" | "pct" => Ok(KpiOperation::Percent),
            "custom" => Ok(KpiOperation::Custom),
            other => Err(format!("unknown KPI operation '{}'", other)),
        }
    }
}

impl fmt::Display for KpiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered values for charting a KPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub values: Vec<f64>,
    /// `true` when the values were fabricated for display, not read from data.
    pub synthetic: bool,
}

impl TimeSeries {
    pub fn real(values: Vec<f64>) -> Self {
        Self { values, synthetic: false }
    }

    pub fn synthetic(values: Vec<f64>) -> Self {
        Self { values, synthetic: true }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A named, computed business metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub id: String,
    pub name: String,
    pub operation: KpiOperation,
    pub column_a: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_b: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// `Null` only when no numeric data could be coerced.
    pub value: CellValue,
    pub unit: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_series: Option<TimeSeries>,
}

impl Kpi {
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.as_number()
    }

    pub fn has_value(&self) -> bool {
        !matches!(self.value, CellValue::Null)
    }
}

// =============================================================================
// Formatting output
// =============================================================================

/// Display strings for one value. Purely a function of value, unit and options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedValue {
    /// Compact form, e.g. `₹72.45 L`.
    pub formatted: String,
    /// Fully expanded with locale grouping, e.g. `₹72,45,000`.
    pub full: String,
    /// Full value plus a magnitude breakdown, e.g. `₹72,45,000 (72.45 Lakh)`.
    pub tooltip: String,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, CellValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_dataset_fills_missing_and_drops_extra() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![record(&[("a", 1.0.into()), ("zzz", "x".into())])];

        let ds = Dataset::new(headers, rows, Orientation::ColumnAligned);

        assert_eq!(ds.rows[0].len(), 2);
        assert_eq!(ds.rows[0]["a"], CellValue::Number(1.0));
        assert_eq!(ds.rows[0]["b"], CellValue::Null);
        assert!(!ds.rows[0].contains_key("zzz"));
    }

    #[test]
    fn test_cell_value_untagged_json() {
        let cells: Vec<CellValue> = serde_json::from_str(r#"[1.5, "abc", null]"#).unwrap();
        assert_eq!(
            cells,
            vec![CellValue::Number(1.5), CellValue::Text("abc".into()), CellValue::Null]
        );
        assert_eq!(serde_json::to_string(&cells).unwrap(), r#"[1.5,"abc",null]"#);
    }

    #[test]
    fn test_column_refs_are_distinct_across_files() {
        let a = Dataset::new(vec!["Revenue".into()], vec![], Orientation::ColumnAligned);
        let b = Dataset::new(vec!["Revenue".into()], vec![], Orientation::ColumnAligned);

        let ra = &a.column_refs()[0];
        let rb = &b.column_refs()[0];
        assert_eq!(ra.name, rb.name);
        assert_ne!(ra.id, rb.id);
        assert_eq!(ra.source_file_id, a.id);
    }

    #[test]
    fn test_missing_column_is_none() {
        let ds = Dataset::new(vec!["a".into()], vec![], Orientation::ColumnAligned);
        assert!(ds.column("b").is_none());
        assert_eq!(ds.column("a").map(|c| c.len()), Some(0));
    }

    #[test]
    fn test_operation_from_str() {
        assert_eq!("Average".parse::<KpiOperation>(), Ok(KpiOperation::Avg));
        assert_eq!("percent".parse::<KpiOperation>(), Ok(KpiOperation::Percent));
        assert!("median".parse::<KpiOperation>().is_err());
        assert!(KpiOperation::Ratio.needs_second_column());
        assert!(!KpiOperation::Sum.needs_second_column());
    }

    #[test]
    fn test_orientation_serializes_snake_case() {
        let json = serde_json::to_string(&Orientation::RowAligned).unwrap();
        assert_eq!(json, "\"row_aligned\"");
    }
}
