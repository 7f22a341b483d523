//! Row-aligned to column-aligned pivot.
//!
//! ```text
//! Metric,2021,2022          period,revenue,cogs
//! Revenue,100,120     ──▶   2021,100,40
//! COGS,40,50                2022,120,50
//! ```

use std::collections::BTreeMap;

use crate::kpi::coerce::coerce_number;
use crate::models::{CellValue, Dataset, Orientation, PivotMeta, Record};

/// Header of the sequence column produced by [`pivot`].
pub const PERIOD_COLUMN: &str = "period";

/// Normalize a metric name into a column key: lowercase, runs of anything
/// non-alphanumeric become a single `_`, no leading or trailing `_`.
pub fn normalize_attribute(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Turn a row-aligned dataset into one row per period.
///
/// The first header names the metric column, every other header is a period.
/// Cells are coerced to numbers where possible and kept as trimmed text
/// otherwise; blanks are skipped. Periods that end up with no values are
/// dropped. A repeated metric name overwrites the earlier row's value.
pub fn pivot(dataset: &Dataset) -> Dataset {
    let Some((attribute_column, period_headers)) = dataset.headers.split_first() else {
        return dataset.clone();
    };

    let mut attributes: Vec<String> = Vec::new();
    let mut by_period: Vec<BTreeMap<String, CellValue>> = vec![BTreeMap::new(); period_headers.len()];

    for row in &dataset.rows {
        let name = match row.get(attribute_column) {
            Some(CellValue::Text(s)) => s.clone(),
            Some(CellValue::Number(n)) => n.to_string(),
            _ => continue,
        };
        let mut key = normalize_attribute(&name);
        if key.is_empty() {
            continue;
        }
        if key == PERIOD_COLUMN {
            key = format!("{}_2", PERIOD_COLUMN);
        }
        if !attributes.contains(&key) {
            attributes.push(key.clone());
        }

        for (period, values) in period_headers.iter().zip(by_period.iter_mut()) {
            let Some(cell) = row.get(period) else { continue };
            if cell.is_blank() {
                continue;
            }
            let value = match coerce_number(cell) {
                Some(n) => CellValue::Number(n),
                None => CellValue::Text(cell.to_string().trim().to_string()),
            };
            values.insert(key.clone(), value);
        }
    }

    let mut headers = Vec::with_capacity(attributes.len() + 1);
    headers.push(PERIOD_COLUMN.to_string());
    headers.extend(attributes);

    let rows: Vec<Record> = period_headers
        .iter()
        .zip(by_period)
        .filter(|(_, values)| !values.is_empty())
        .map(|(period, mut values)| {
            values.insert(PERIOD_COLUMN.to_string(), CellValue::Text(period.clone()));
            values
        })
        .collect();

    let mut pivoted = Dataset::new(headers, rows, Orientation::RowAligned).with_pivot_meta(PivotMeta {
        attribute_column: attribute_column.clone(),
        period_headers: period_headers.to_vec(),
    });
    pivoted.id = dataset.id.clone();
    pivoted.source_name = dataset.source_name.clone();
    pivoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kpi::coerce::coerce_all;
    use proptest::prelude::*;

    fn dataset(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| {
                headers
                    .iter()
                    .zip(r.iter())
                    .map(|(h, v)| (h.clone(), CellValue::from_raw(v)))
                    .collect()
            })
            .collect();
        Dataset::new(headers, rows, Orientation::RowAligned)
    }

    #[test]
    fn test_normalize_attribute() {
        assert_eq!(normalize_attribute("Revenue"), "revenue");
        assert_eq!(normalize_attribute("  Net Profit (after tax) "), "net_profit_after_tax");
        assert_eq!(normalize_attribute("EBITDA %"), "ebitda");
        assert_eq!(normalize_attribute("--"), "");
    }

    #[test]
    fn test_metric_by_year() {
        let ds = dataset(
            &["Metric", "2021", "2022", "2023"],
            &[&["Revenue", "100", "120", "150"], &["COGS", "40", "50", "60"]],
        )
        .with_source_name("pnl.csv");
        let out = pivot(&ds);

        assert_eq!(out.headers, vec!["period", "revenue", "cogs"]);
        assert_eq!(out.rows.len(), 3);
        assert_eq!(out.rows[0]["period"], CellValue::Text("2021".into()));
        assert_eq!(out.rows[0]["revenue"], CellValue::Number(100.0));
        assert_eq!(out.rows[2]["cogs"], CellValue::Number(60.0));
        assert_eq!(out.id, ds.id);
        assert_eq!(out.source_name.as_deref(), Some("pnl.csv"));
        assert_eq!(out.orientation, Orientation::RowAligned);

        let meta = out.pivot_meta.unwrap();
        assert_eq!(meta.attribute_column, "Metric");
        assert_eq!(meta.period_headers, vec!["2021", "2022", "2023"]);
    }

    #[test]
    fn test_text_cells_blanks_and_empty_periods() {
        let ds = dataset(
            &["Metric", "FY22", "FY23", "FY24"],
            &[&["Revenue", "₹1,000", "n/a", ""], &["", "5", "6", ""]],
        );
        let out = pivot(&ds);

        // FY24 has no values at all
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.headers, vec!["period", "revenue"]);
        assert_eq!(out.rows[0]["revenue"], CellValue::Number(1000.0));
        assert_eq!(out.rows[1]["revenue"], CellValue::Text("n/a".into()));
    }

    #[test]
    fn test_duplicate_attribute_overwrites() {
        let ds = dataset(&["Item", "Q1"], &[&["Revenue", "1"], &["revenue ", "2"]]);
        let out = pivot(&ds);
        assert_eq!(out.headers, vec!["period", "revenue"]);
        assert_eq!(out.rows[0]["revenue"], CellValue::Number(2.0));
    }

    #[test]
    fn test_period_attribute_does_not_clobber_period_column() {
        let ds = dataset(&["Metric", "2023"], &[&["Period", "7"]]);
        let out = pivot(&ds);
        assert_eq!(out.headers, vec!["period", "period_2"]);
        assert_eq!(out.rows[0]["period"], CellValue::Text("2023".into()));
    }

    proptest! {
        #[test]
        fn prop_pivot_preserves_attribute_sums(
            values in prop::collection::vec(prop::collection::vec(-1.0e6f64..1.0e6, 4), 1..6)
        ) {
            let headers: Vec<String> = ["Metric", "2020", "2021", "2022", "2023"]
                .iter()
                .map(|h| h.to_string())
                .collect();
            let rows: Vec<Record> = values
                .iter()
                .enumerate()
                .map(|(i, vals)| {
                    let mut row = Record::new();
                    row.insert("Metric".into(), CellValue::Text(format!("Line {}", i)));
                    for (h, v) in headers[1..].iter().zip(vals) {
                        row.insert(h.clone(), CellValue::Text(v.to_string()));
                    }
                    row
                })
                .collect();
            let ds = Dataset::new(headers, rows, Orientation::RowAligned);
            let out = pivot(&ds);

            for (i, vals) in values.iter().enumerate() {
                let column = out.column(&format!("line_{}", i)).unwrap();
                let got: f64 = coerce_all(column).iter().sum();
                let want: f64 = vals.iter().sum();
                prop_assert!((got - want).abs() <= 1e-6 * want.abs().max(1.0));
            }
        }
    }
}
