//! KPI time series.
//!
//! Rows are already in sequence order: a pivoted dataset has one row per
//! period in source header order, anything else keeps file order.

use crate::models::{Dataset, KpiOperation, TimeSeries};

use super::aggregate::{column_values, percent_change, ratio};
use super::coerce::coerce_number;

/// Points in a synthetic series.
pub const SYNTHETIC_LENGTH: usize = 6;

/// Each synthetic point is this fraction of the next one.
pub const SYNTHETIC_STEP_RATIO: f64 = 0.92;

/// Real series for a KPI, nulls dropped.
///
/// Two-column operations give the per-row ratio or percent change where both
/// cells are numbers and the denominator is non-zero. Returns `None` when a
/// column is unknown or the operation has no column to read.
pub fn real_series(
    dataset: &Dataset,
    operation: KpiOperation,
    column_a: &str,
    column_b: Option<&str>,
) -> Option<Vec<f64>> {
    match operation {
        KpiOperation::Custom => None,
        KpiOperation::Ratio | KpiOperation::Percent => {
            let a = dataset.column(column_a)?;
            let b = dataset.column(column_b?)?;
            let per_row = if operation == KpiOperation::Ratio {
                ratio
            } else {
                percent_change
            };
            Some(
                a.into_iter()
                    .zip(b)
                    .filter_map(|(x, y)| per_row(coerce_number(x)?, coerce_number(y)?))
                    .collect(),
            )
        }
        _ => column_values(dataset, column_a),
    }
}

/// A display-only series of [`SYNTHETIC_LENGTH`] points ending exactly at
/// `value`, each step back scaled by [`SYNTHETIC_STEP_RATIO`].
pub fn synthetic_series(value: f64) -> TimeSeries {
    let mut values: Vec<f64> = (0..SYNTHETIC_LENGTH)
        .scan(value, |current, _| {
            let point = *current;
            *current *= SYNTHETIC_STEP_RATIO;
            Some(point)
        })
        .collect();
    values.reverse();
    TimeSeries::synthetic(values)
}

/// Series for a KPI with the given computed value.
///
/// Falls back to [`synthetic_series`] when fewer than two real points exist
/// and there is a value to anchor on. No value and no real data means no
/// series.
pub fn time_series(
    dataset: &Dataset,
    operation: KpiOperation,
    column_a: &str,
    column_b: Option<&str>,
    value: Option<f64>,
) -> Option<TimeSeries> {
    let real = real_series(dataset, operation, column_a, column_b).unwrap_or_default();

    if real.len() >= 2 {
        return Some(TimeSeries::real(real));
    }

    value.filter(|v| v.is_finite()).map(synthetic_series)
}
