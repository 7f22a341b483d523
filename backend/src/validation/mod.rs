//! JSON Schema validation for KPI mapping files.
//!
//! The mapping schema is embedded at compile time from
//! `schemas/kpi-mapping.json` and checked with JSON Schema Draft 7.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use kpilens::validation::{validate_kpi_mapping, is_valid_kpi_mapping};
//!
//! let mapping = json!({
//!     "kpis": [{ "name": "Total Revenue", "operation": "sum", "columnA": "revenue" }]
//! });
//! assert!(validate_kpi_mapping(&mapping).is_ok());
//!
//! let missing_b = json!({
//!     "kpis": [{ "name": "Margin", "operation": "ratio", "columnA": "profit" }]
//! });
//! assert!(!is_valid_kpi_mapping(&missing_b));
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static KPI_MAPPING_SCHEMA: Lazy<Result<Value, String>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/kpi-mapping.json"))
        .map_err(|e| format!("Invalid embedded schema: {}", e))
});

/// Validate a JSON value against a schema.
///
/// Returns every validation error message.
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use kpilens::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": { "name": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
/// assert!(validate(&schema, &json!({ "age": 42 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate against the embedded KPI mapping schema.
pub fn validate_kpi_mapping(data: &Value) -> Result<(), Vec<String>> {
    let schema = KPI_MAPPING_SCHEMA.as_ref().map_err(|e| vec![e.clone()])?;
    validate(schema, data)
}

/// Quick check against the KPI mapping schema.
pub fn is_valid_kpi_mapping(data: &Value) -> bool {
    match KPI_MAPPING_SCHEMA.as_ref() {
        Ok(schema) => is_valid(schema, data),
        Err(_) => false,
    }
}
