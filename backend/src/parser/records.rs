//! Structured (JSON) record input.
//!
//! Accepts either a top-level array of objects or an object wrapping that
//! array under `rows`, `data` or `records`.

use serde_json::Value;

use crate::error::IngestError;
use crate::models::{CellValue, Record};

use super::delimited::unique_headers;
use super::ParsedTable;

const WRAPPER_KEYS: [&str; 3] = ["rows", "data", "records"];

/// Parse JSON records into headers (first-seen key order) and rows.
pub fn parse_json_records(content: &str) -> Result<ParsedTable, IngestError> {
    let value: Value = serde_json::from_str(content.trim_start_matches('\u{feff}'))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => WRAPPER_KEYS
            .iter()
            .find_map(|k| match obj.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                IngestError::UnsupportedLayout(format!(
                    "expected an array or an object with one of: {}",
                    WRAPPER_KEYS.join(", ")
                ))
            })?,
        other => {
            return Err(IngestError::UnsupportedLayout(format!(
                "expected an array of objects, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut keys: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(items.len());

    for item in items {
        match item {
            Value::Object(obj) => {
                for key in obj.keys() {
                    if !keys.contains(key) {
                        keys.push(key.clone());
                    }
                }
                objects.push(obj);
            }
            other => {
                return Err(IngestError::UnsupportedLayout(format!(
                    "record is {}, expected an object",
                    json_kind(&other)
                )))
            }
        }
    }

    if keys.is_empty() {
        return Err(IngestError::UnsupportedLayout("no records".to_string()));
    }

    let headers = unique_headers(keys.clone());
    let rows = objects
        .into_iter()
        .map(|mut obj| {
            keys.iter()
                .zip(&headers)
                .map(|(key, header)| {
                    let cell = obj.remove(key).map(json_to_cell).unwrap_or(CellValue::Null);
                    (header.clone(), cell)
                })
                .collect::<Record>()
        })
        .collect();

    Ok(ParsedTable {
        headers,
        rows,
        delimiter: None,
        warnings: Vec::new(),
        skipped_rows: 0,
    })
}

fn json_to_cell(value: Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Null),
        Value::String(s) => CellValue::from_raw(&s),
        Value::Bool(b) => CellValue::Text(b.to_string()),
        nested => CellValue::Text(nested.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_of_objects_keeps_key_order() {
        let table = parse_json_records(
            r#"[{"period": "2023", "revenue": 100, "cogs": "40"}, {"period": "2024", "ebitda": 7}]"#,
        )
        .unwrap();

        assert_eq!(table.headers, vec!["period", "revenue", "cogs", "ebitda"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["revenue"], CellValue::Number(100.0));
        assert_eq!(table.rows[0]["cogs"], CellValue::Text("40".into()));
        assert_eq!(table.rows[0]["ebitda"], CellValue::Null);
        assert_eq!(table.delimiter, None);
    }

    #[test]
    fn test_wrapped_records() {
        let table = parse_json_records(r#"{"data": [{"a": 1}]}"#).unwrap();
        assert_eq!(table.headers, vec!["a"]);
    }

    #[test]
    fn test_rejects_scalars() {
        assert!(matches!(
            parse_json_records("42"),
            Err(IngestError::UnsupportedLayout(_))
        ));
        assert!(matches!(
            parse_json_records("[1, 2]"),
            Err(IngestError::UnsupportedLayout(_))
        ));
        assert!(matches!(parse_json_records("[]"), Err(IngestError::UnsupportedLayout(_))));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(parse_json_records("a,b\n1,2"), Err(IngestError::Json(_))));
    }
}
