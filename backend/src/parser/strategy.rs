//! Parse strategy chain.
//!
//! The file extension decides which parsers are worth trying and in what
//! order. [`parse_with_strategies`] walks that list once and returns the
//! first table produced, or every failure reason.

use crate::error::IngestError;

use super::delimited::{parse_delimited, DelimitedOptions};
use super::records::parse_json_records;
use super::ParsedTable;

/// A named way of turning decoded text into a [`ParsedTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// JSON array of objects.
    StructuredRecords,
    /// CSV/TSV/pipe-separated text.
    Delimited,
}

impl ParseStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ParseStrategy::StructuredRecords => "json",
            ParseStrategy::Delimited => "delimited",
        }
    }

    pub fn run(&self, content: &str, options: &DelimitedOptions) -> Result<ParsedTable, IngestError> {
        match self {
            ParseStrategy::StructuredRecords => parse_json_records(content),
            ParseStrategy::Delimited => Ok(parse_delimited(content, options)?),
        }
    }
}

/// Strategies to try for a file, by extension.
///
/// `.json` files try records first; known delimited extensions only try the
/// delimited parser. Anything else is sniffed: content opening with `[` or
/// `{` tries records first, the rest tries delimited then records.
pub fn strategies_for(file_name: Option<&str>, content: &str) -> Vec<ParseStrategy> {
    let ext = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase());

    match ext.as_deref() {
        Some("json") => vec![ParseStrategy::StructuredRecords, ParseStrategy::Delimited],
        Some("csv") | Some("tsv") | Some("txt") | Some("psv") => vec![ParseStrategy::Delimited],
        _ if looks_structured(content) => {
            vec![ParseStrategy::StructuredRecords, ParseStrategy::Delimited]
        }
        _ => vec![ParseStrategy::Delimited, ParseStrategy::StructuredRecords],
    }
}

fn looks_structured(content: &str) -> bool {
    matches!(
        content.trim_start_matches('\u{feff}').trim_start().chars().next(),
        Some('[') | Some('{')
    )
}

/// Try each strategy for `file_name` in order; first success wins.
pub fn parse_with_strategies(
    content: &str,
    file_name: Option<&str>,
    options: &DelimitedOptions,
) -> Result<(ParseStrategy, ParsedTable), IngestError> {
    let mut failures: Vec<(ParseStrategy, IngestError)> = Vec::new();

    for strategy in strategies_for(file_name, content) {
        match strategy.run(content, options) {
            Ok(table) => return Ok((strategy, table)),
            Err(e) => failures.push((strategy, e)),
        }
    }

    // A single strategy's own error is clearer than the wrapped list.
    if failures.len() == 1 {
        if let Some((_, err)) = failures.pop() {
            return Err(err);
        }
    }

    Err(IngestError::AllStrategiesFailed {
        file: file_name.unwrap_or("upload").to_string(),
        attempts: failures
            .iter()
            .map(|(strategy, e)| format!("{}: {}", strategy.name(), e))
            .collect(),
    })
}
