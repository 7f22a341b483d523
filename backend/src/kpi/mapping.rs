//! Declarative KPI definitions.
//!
//! A mapping file lists KPIs by name, operation and column(s):
//!
//! ```json
//! {
//!   "version": "1",
//!   "kpis": [
//!     { "name": "Total Revenue", "operation": "sum", "columnA": "revenue", "unit": "₹" },
//!     { "name": "Cost Ratio", "operation": "ratio", "columnA": "cogs", "columnB": "revenue", "unit": "x" }
//!   ]
//! }
//! ```
//!
//! Definitions are checked against the embedded schema before they are
//! deserialized, so a bad file reports every problem at once.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

use crate::error::{MappingError, MappingResult};
use crate::models::{CellValue, Dataset, Kpi, KpiOperation};
use crate::transform::orientation::{date_pattern, ATTRIBUTE_VOCABULARY};
use crate::transform::pivot::{normalize_attribute, PERIOD_COLUMN};
use crate::validation::validate_kpi_mapping;

use super::aggregate::{aggregate, column_values};
use super::coerce::coerce_number;
use super::series::{synthetic_series, time_series};

/// Units that read better averaged than summed.
const RATE_UNITS: [&str; 4] = ["%", "x", "days", "score"];

/// Header words that name a time axis rather than a measure.
const PERIOD_WORDS: &[&str] = &[
    "period", "year", "month", "quarter", "week", "day", "date", "fy", "fiscal", "financial",
];

/// One KPI as written in a mapping file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub operation: KpiOperation,
    #[serde(default)]
    pub column_a: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_b: Option<String>,
    /// Free-form expression, carried as display metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Literal value for `custom` KPIs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CellValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl KpiDefinition {
    pub fn new(name: impl Into<String>, operation: KpiOperation, column_a: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            operation,
            column_a: column_a.into(),
            column_b: None,
            expression: None,
            value: None,
            unit: None,
            category: None,
        }
    }

    pub fn with_column_b(mut self, column_b: impl Into<String>) -> Self {
        self.column_b = Some(column_b.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Rules the schema cannot express on its own.
    pub fn check(&self) -> MappingResult<()> {
        let has_b = self
            .column_b
            .as_deref()
            .is_some_and(|b| !b.trim().is_empty());

        if self.operation.needs_second_column() && !has_b {
            return Err(MappingError::MissingSecondColumn {
                kpi: self.name.clone(),
                operation: self.operation.to_string(),
            });
        }
        Ok(())
    }
}

/// A full mapping file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub kpis: Vec<KpiDefinition>,
}

impl KpiMapping {
    pub fn new(kpis: Vec<KpiDefinition>) -> Self {
        Self { version: None, kpis }
    }

    /// Parse and validate a mapping from JSON text.
    pub fn from_json(content: &str) -> MappingResult<Self> {
        let value: Value = serde_json::from_str(content)?;
        validate_kpi_mapping(&value).map_err(|errors| MappingError::SchemaError { errors })?;

        let mapping: KpiMapping = serde_json::from_value(value)?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// Load a mapping file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> MappingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> MappingResult<()> {
        self.kpis.iter().try_for_each(KpiDefinition::check)
    }

    pub fn to_json(&self) -> MappingResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Find the dataset header a definition refers to.
///
/// Tries an exact match, then a case-insensitive one, then compares
/// normalized keys, so `"Revenue"` still finds the `revenue` column of a
/// pivoted sheet.
pub fn resolve_column(dataset: &Dataset, name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let headers = &dataset.headers;
    if let Some(h) = headers.iter().find(|h| *h == name) {
        return Some(h.clone());
    }
    if let Some(h) = headers.iter().find(|h| h.eq_ignore_ascii_case(name)) {
        return Some(h.clone());
    }

    let key = normalize_attribute(name);
    if key.is_empty() {
        return None;
    }
    headers
        .iter()
        .find(|h| normalize_attribute(h) == key)
        .cloned()
}

/// Compute one KPI. Never fails: missing columns or unusable data give a
/// `Null` value.
pub fn compute_kpi(dataset: &Dataset, definition: &KpiDefinition) -> Kpi {
    let column_a = resolve_column(dataset, &definition.column_a);
    let column_b = definition
        .column_b
        .as_deref()
        .and_then(|b| resolve_column(dataset, b));

    let (value, numeric) = if definition.operation == KpiOperation::Custom {
        let literal = definition.value.clone().unwrap_or_default();
        let numeric = coerce_number(&literal);
        (literal, numeric)
    } else {
        let numeric = column_a
            .as_deref()
            .and_then(|a| aggregate(dataset, definition.operation, a, column_b.as_deref()));
        (CellValue::from(numeric), numeric)
    };

    let series = match column_a.as_deref() {
        Some(a) => time_series(dataset, definition.operation, a, column_b.as_deref(), numeric),
        None => numeric.map(synthetic_series),
    };

    Kpi {
        id: definition
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: definition.name.clone(),
        operation: definition.operation,
        column_a: column_a.unwrap_or_else(|| definition.column_a.clone()),
        column_b: column_b.or_else(|| definition.column_b.clone()),
        expression: definition.expression.clone(),
        value,
        unit: definition.unit.clone().unwrap_or_default(),
        category: definition
            .category
            .clone()
            .unwrap_or_else(|| infer_category(&definition.name).to_string()),
        time_series: series,
    }
}

/// Compute every KPI of a mapping, in order.
pub fn compute_kpis(dataset: &Dataset, definitions: &[KpiDefinition]) -> Vec<Kpi> {
    definitions
        .iter()
        .map(|definition| compute_kpi(dataset, definition))
        .collect()
}

/// Guess a display unit from a column name. Money columns get `currency`.
pub fn infer_unit(column: &str, currency: Option<&str>) -> String {
    let key = normalize_attribute(column);
    let has = |words: &[&str]| key.split('_').any(|w| words.contains(&w));

    if column.contains('%') || has(&["margin", "pct", "percent", "percentage", "rate", "growth", "yield", "roe", "roce", "roi"]) {
        "%".to_string()
    } else if has(&["ratio", "multiple", "coverage"]) {
        "x".to_string()
    } else if has(&["days", "dso", "dpo", "dio"]) {
        "days".to_string()
    } else if has(&["score", "nps", "rating"]) {
        "score".to_string()
    } else if has(&["count", "headcount", "employees", "customers", "units", "orders", "users", "qty", "quantity"]) {
        String::new()
    } else {
        currency.unwrap_or_default().to_string()
    }
}

/// Dashboard grouping for a metric name.
pub fn infer_category(name: &str) -> &'static str {
    let key = normalize_attribute(name);
    let has = |prefixes: &[&str]| {
        key.split('_')
            .any(|w| prefixes.iter().any(|p| w.starts_with(p)))
    };

    if has(&["margin", "profit", "ebitda", "ebit", "earning", "eps", "pat", "pbt"]) {
        "Profitability"
    } else if has(&["revenue", "sales", "income", "turnover", "arr", "mrr", "bookings"]) {
        "Revenue"
    } else if has(&["cost", "cogs", "expense", "opex", "capex", "salar", "payroll", "rent", "depreciation", "amorti"]) {
        "Expenses"
    } else if has(&["cash", "debt", "borrowing", "asset", "liabilit", "equity", "inventor", "receivable", "payable", "capital", "reserve"]) {
        "Balance Sheet"
    } else if has(&["headcount", "employee", "customer", "user", "order"]) {
        "Operations"
    } else {
        "General"
    }
}

/// `gross_profit` to `Gross Profit`.
pub fn display_name(column: &str) -> String {
    column
        .split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True for a column that labels periods or line items instead of measuring
/// something: `Year`, `Fiscal Year`, `Line Item`, or values that are mostly
/// dates. Bare four-digit values only count when they run in ascending order,
/// since amounts like `2000` look the same.
pub fn is_period_column(dataset: &Dataset, header: &str) -> bool {
    if dataset.is_pivoted() && header == PERIOD_COLUMN {
        return true;
    }

    let words: Vec<String> = header
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    let labels_only = !words.is_empty()
        && words.iter().all(|w| {
            PERIOD_WORDS.contains(&w.as_str()) || ATTRIBUTE_VOCABULARY.contains(&w.as_str())
        });
    if labels_only {
        return true;
    }

    let cells: Vec<String> = dataset
        .column(header)
        .unwrap_or_default()
        .into_iter()
        .map(|cell| cell.to_string().trim().to_string())
        .filter(|cell| !cell.is_empty())
        .collect();
    let patterns: Vec<&str> = cells.iter().filter_map(|cell| date_pattern(cell)).collect();
    if cells.is_empty() || patterns.len() * 2 <= cells.len() {
        return false;
    }

    if patterns.iter().all(|p| *p == "year") {
        let years: Vec<i64> = cells.iter().filter_map(|c| c.parse().ok()).collect();
        years.len() == cells.len() && years.windows(2).all(|w| w[0] < w[1])
    } else {
        true
    }
}

/// One definition per numeric column of a freshly ingested dataset.
///
/// Rates (`%`, `x`, days, scores) are averaged; everything else is summed.
/// Period columns (see [`is_period_column`]) and columns without a single
/// number are skipped.
pub fn suggest_kpis(dataset: &Dataset, currency: Option<&str>) -> Vec<KpiDefinition> {
    dataset
        .headers
        .iter()
        .filter(|h| !is_period_column(dataset, h))
        .filter(|h| column_values(dataset, h).is_some_and(|v| !v.is_empty()))
        .map(|h| {
            let unit = infer_unit(h, currency);
            let operation = if RATE_UNITS.contains(&unit.as_str()) {
                KpiOperation::Avg
            } else {
                KpiOperation::Sum
            };
            let name = display_name(h);
            KpiDefinition {
                id: Some(format!("kpi_{}", normalize_attribute(h))),
                category: Some(infer_category(&name).to_string()),
                unit: Some(unit),
                ..KpiDefinition::new(name, operation, h.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Orientation, Record};
    use crate::transform::pivot::pivot;

    fn pnl() -> Dataset {
        let headers: Vec<String> = ["Metric", "2021", "2022", "2023"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = [
            ["Revenue", "100", "120", "150"],
            ["COGS", "40", "50", "60"],
            ["Gross Margin %", "60", "58.3", "60"],
        ]
        .iter()
        .map(|r| {
            headers
                .iter()
                .cloned()
                .zip(r.iter().map(|v| CellValue::from(*v)))
                .collect::<Record>()
        })
        .collect();
        pivot(&Dataset::new(headers, rows, Orientation::RowAligned))
    }

    #[test]
    fn test_from_json_validates_schema_first() {
        let err = KpiMapping::from_json(r#"{"kpis": [{"name": "x", "operation": "median"}]}"#).unwrap_err();
        assert!(matches!(err, MappingError::SchemaError { .. }));

        let err = KpiMapping::from_json("not json").unwrap_err();
        assert!(matches!(err, MappingError::JsonError(_)));
    }

    #[test]
    fn test_from_json_round_trip() {
        let mapping = KpiMapping::from_json(
            r#"{"version": "1", "kpis": [
                {"name": "Revenue", "operation": "sum", "columnA": "revenue", "unit": "₹"},
                {"name": "Cost Ratio", "operation": "ratio", "columnA": "cogs", "columnB": "revenue", "unit": "x"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(mapping.kpis.len(), 2);
        assert_eq!(mapping.kpis[1].column_b.as_deref(), Some("revenue"));
        assert_eq!(KpiMapping::from_json(&mapping.to_json().unwrap()).unwrap(), mapping);
    }

    #[test]
    fn test_check_catches_blank_column_b() {
        let def = KpiDefinition::new("Margin", KpiOperation::Percent, "profit").with_column_b("  ");
        assert!(matches!(
            def.check(),
            Err(MappingError::MissingSecondColumn { .. })
        ));
    }

    #[test]
    fn test_resolve_column() {
        let ds = pnl();
        assert_eq!(resolve_column(&ds, "revenue").as_deref(), Some("revenue"));
        assert_eq!(resolve_column(&ds, "REVENUE").as_deref(), Some("revenue"));
        assert_eq!(resolve_column(&ds, "Gross Margin %").as_deref(), Some("gross_margin"));
        assert_eq!(resolve_column(&ds, "ebitda"), None);
        assert_eq!(resolve_column(&ds, ""), None);
    }

    #[test]
    fn test_compute_kpis() {
        let ds = pnl();
        let defs = vec![
            KpiDefinition::new("Total Revenue", KpiOperation::Sum, "Revenue").with_unit("₹"),
            KpiDefinition::new("Cost Ratio", KpiOperation::Ratio, "cogs").with_column_b("revenue"),
            KpiDefinition::new("EBITDA", KpiOperation::Sum, "ebitda"),
        ];
        let kpis = compute_kpis(&ds, &defs);

        assert_eq!(kpis[0].value, CellValue::Number(370.0));
        assert_eq!(kpis[0].column_a, "revenue");
        assert_eq!(kpis[0].category, "Revenue");
        let ts = kpis[0].time_series.as_ref().unwrap();
        assert_eq!(ts.values, vec![100.0, 120.0, 150.0]);
        assert!(!ts.synthetic);

        assert_eq!(kpis[1].value, CellValue::Number(150.0 / 370.0));
        assert_eq!(kpis[1].time_series.as_ref().map(|t| t.len()), Some(3));

        assert_eq!(kpis[2].value, CellValue::Null);
        assert_eq!(kpis[2].time_series, None);
        assert_eq!(kpis[2].column_a, "ebitda");
    }

    #[test]
    fn test_custom_kpi_uses_literal_value() {
        let ds = pnl();
        let mut def = KpiDefinition::new("Runway", KpiOperation::Custom, "");
        def.expression = Some("\"cash\" / \"burn\"".into());

        let kpi = compute_kpi(&ds, &def);
        assert_eq!(kpi.value, CellValue::Null);
        assert_eq!(kpi.time_series, None);

        def.value = Some(CellValue::Number(14.0));
        let kpi = compute_kpi(&ds, &def);
        assert_eq!(kpi.value, CellValue::Number(14.0));
        assert!(kpi.time_series.unwrap().synthetic);
        assert_eq!(kpi.expression.as_deref(), Some("\"cash\" / \"burn\""));
    }

    #[test]
    fn test_suggest_kpis() {
        let ds = pnl();
        let suggested = suggest_kpis(&ds, Some("₹"));
        let names: Vec<&str> = suggested.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Revenue", "Cogs", "Gross Margin"]);

        assert_eq!(suggested[0].operation, KpiOperation::Sum);
        assert_eq!(suggested[0].unit.as_deref(), Some("₹"));
        assert_eq!(suggested[0].id.as_deref(), Some("kpi_revenue"));
        assert_eq!(suggested[1].category.as_deref(), Some("Expenses"));
        assert_eq!(suggested[2].operation, KpiOperation::Avg);
        assert_eq!(suggested[2].unit.as_deref(), Some("%"));
        assert_eq!(suggested[2].category.as_deref(), Some("Profitability"));
    }

    fn column_aligned(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| {
                headers
                    .iter()
                    .cloned()
                    .zip(r.iter().map(|v| CellValue::from(*v)))
                    .collect::<Record>()
            })
            .collect();
        Dataset::new(headers, rows, Orientation::ColumnAligned)
    }

    #[test]
    fn test_suggest_skips_period_columns() {
        let ds = column_aligned(&["Year", "Revenue"], &[&["2021", "100"], &["2022", "200"]]);
        let suggested = suggest_kpis(&ds, Some("₹"));
        let names: Vec<&str> = suggested.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Revenue"]);

        let ds = column_aligned(
            &["Fiscal Year", "Month No", "Sales"],
            &[&["2021", "2021-04", "10"], &["2022", "2021-05", "12"]],
        );
        let names: Vec<String> = suggest_kpis(&ds, None).into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Sales"]);
    }

    #[test]
    fn test_four_digit_amounts_are_not_periods() {
        let ds = column_aligned(&["Spend"], &[&["2000"], &["1500"], &["1800"]]);
        assert!(!is_period_column(&ds, "Spend"));

        let ds = column_aligned(&["Label"], &[&["2019"], &["2020"], &["2021"]]);
        assert!(is_period_column(&ds, "Label"));
    }

    #[test]
    fn test_infer_unit() {
        assert_eq!(infer_unit("Net Margin", Some("$")), "%");
        assert_eq!(infer_unit("debt_equity_ratio", Some("$")), "x");
        assert_eq!(infer_unit("DSO days", None), "days");
        assert_eq!(infer_unit("Headcount", Some("$")), "");
        assert_eq!(infer_unit("Revenue", Some("$")), "$");
        assert_eq!(infer_unit("Revenue", None), "");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("gross_profit"), "Gross Profit");
        assert_eq!(display_name("ebitda"), "Ebitda");
    }
}
