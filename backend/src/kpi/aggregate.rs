//! Column aggregates.
//!
//! Every function returns `None` rather than an error or a made-up number
//! when there is nothing meaningful to report: unknown column, no numeric
//! values, zero denominator. Results are always finite.

use crate::models::{Dataset, KpiOperation};

use super::coerce::coerce_all;

/// Coerced numeric values of a column, or `None` if the column is unknown.
pub fn column_values(dataset: &Dataset, column: &str) -> Option<Vec<f64>> {
    dataset.column(column).map(coerce_all)
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn avg(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(sum(values) / values.len() as f64)
    }
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// `a / b`, or `None` when `b` is zero.
pub fn ratio(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        None
    } else {
        finite(a / b)
    }
}

/// Percent change from `b` to `a`, or `None` when `b` is zero.
pub fn percent_change(a: f64, b: f64) -> Option<f64> {
    if b == 0.0 {
        None
    } else {
        finite((a - b) * 100.0 / b)
    }
}

fn finite(n: f64) -> Option<f64> {
    n.is_finite().then_some(n)
}

/// Aggregate one or two columns of a dataset.
///
/// `column_b` is only read by `ratio` and `percent`. `custom` has no
/// computable value and always yields `None`.
pub fn aggregate(
    dataset: &Dataset,
    operation: KpiOperation,
    column_a: &str,
    column_b: Option<&str>,
) -> Option<f64> {
    let a = column_values(dataset, column_a)?;

    let value = match operation {
        KpiOperation::Sum => {
            if a.is_empty() {
                return None;
            }
            sum(&a)
        }
        KpiOperation::Avg => avg(&a)?,
        KpiOperation::Min => min(&a)?,
        KpiOperation::Max => max(&a)?,
        KpiOperation::Count => a.len() as f64,
        KpiOperation::Ratio | KpiOperation::Percent => {
            let b = column_values(dataset, column_b?)?;
            if a.is_empty() || b.is_empty() {
                return None;
            }
            if operation == KpiOperation::Ratio {
                ratio(sum(&a), sum(&b))?
            } else {
                percent_change(sum(&a), sum(&b))?
            }
        }
        KpiOperation::Custom => return None,
    };

    finite(value)
}
