//! Transformation module.
//!
//! This module turns parsed tables into datasets:
//! - Orientation: ruleset deciding whether a table needs a pivot
//! - Pivot: row-aligned (metric per row) to one row per period
//! - Pipeline: raw input to dataset, end to end

pub mod orientation;
pub mod pipeline;
pub mod pivot;

pub use orientation::{classify, Classification, OrientationClassifier, Rule, Signal};
pub use pipeline::*;
pub use pivot::{normalize_attribute, pivot, PERIOD_COLUMN};
