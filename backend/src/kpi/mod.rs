//! KPI computation.
//!
//! - [`coerce`] - Cell values to numbers
//! - [`aggregate`] - sum/avg/min/max/count/ratio/percent over columns
//! - [`series`] - Time series for charting, real or synthetic
//! - [`mapping`] - Declarative KPI definitions and suggestions

pub mod aggregate;
pub mod coerce;
pub mod mapping;
pub mod series;

pub use aggregate::{aggregate, column_values};
pub use coerce::{coerce_all, coerce_number, coerce_str};
pub use mapping::{
    compute_kpi, compute_kpis, infer_category, infer_unit, is_period_column, resolve_column,
    suggest_kpis,
    KpiDefinition, KpiMapping,
};
pub use series::{synthetic_series, time_series, SYNTHETIC_LENGTH, SYNTHETIC_STEP_RATIO};
