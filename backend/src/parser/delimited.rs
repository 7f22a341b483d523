//! Delimited text: delimiter detection, record splitting and tokenizing.
//!
//! Quoting follows the usual spreadsheet export rules: a field that starts
//! with `"` runs to the matching closing quote, may contain the delimiter or
//! line breaks, and uses `""` for a literal quote. Unquoted fields are trimmed.

use crate::error::CsvError;
use crate::models::{CellValue, Record};

use super::ParsedTable;

/// Candidate separators, in tie-break priority order.
pub const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Maximum number of row warnings kept in strict mode.
pub const MAX_WARNINGS: usize = 10;

/// Options for delimited parsing.
#[derive(Debug, Clone, Default)]
pub struct DelimitedOptions {
    /// Force a delimiter instead of detecting one.
    pub delimiter: Option<char>,
    /// Skip rows whose field count differs from the header instead of
    /// padding/truncating them.
    pub strict: bool,
}

/// Pick the separator that splits the first non-empty line into the most
/// fields. Ties keep the earlier candidate; an empty input yields `,`.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &CANDIDATE_DELIMITERS {
        let count = tokenize_line(first_line, sep).len();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

#[derive(Default)]
struct Field {
    text: String,
    quoted: bool,
}

impl Field {
    fn finish(self) -> String {
        if self.quoted {
            self.text
        } else {
            self.text.trim().to_string()
        }
    }
}

/// Split one record into fields.
///
/// A blank line yields an empty list; callers skip it.
pub fn tokenize_line(line: &str, delimiter: char) -> Vec<String> {
    if line.trim().is_empty() {
        return Vec::new();
    }

    let mut fields = Vec::new();
    let mut field = Field::default();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.text.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.text.push(c);
            }
        } else if c == delimiter {
            fields.push(std::mem::take(&mut field).finish());
        } else if field.quoted {
            // After the closing quote: `"a" "b"` concatenates, whitespace is dropped.
            if c == '"' {
                in_quotes = true;
            } else if !c.is_whitespace() {
                field.text.push(c);
            }
        } else if c == '"' && field.text.trim().is_empty() {
            field.text.clear();
            field.quoted = true;
            in_quotes = true;
        } else {
            field.text.push(c);
        }
    }

    fields.push(field.finish());
    fields
}

#[derive(Clone, Copy, PartialEq)]
enum QuoteState {
    Unquoted,
    InQuotes,
    Closed,
}

/// Split text into records at line breaks that are not inside a quoted field.
///
/// Uses the same field-start rule as [`tokenize_line`], so a stray `"` in the
/// middle of an unquoted value does not swallow the following lines.
pub fn split_records(content: &str, delimiter: char) -> Vec<String> {
    let mut records = Vec::new();
    let mut current = String::new();
    let mut state = QuoteState::Unquoted;
    let mut field_blank = true;

    for c in content.chars() {
        match c {
            '"' => {
                state = match state {
                    QuoteState::InQuotes => QuoteState::Closed,
                    QuoteState::Closed => QuoteState::InQuotes,
                    QuoteState::Unquoted if field_blank => QuoteState::InQuotes,
                    QuoteState::Unquoted => QuoteState::Unquoted,
                };
                field_blank = false;
                current.push(c);
            }
            '\n' if state != QuoteState::InQuotes => {
                if current.ends_with('\r') {
                    current.pop();
                }
                records.push(std::mem::take(&mut current));
                state = QuoteState::Unquoted;
                field_blank = true;
            }
            c if c == delimiter && state != QuoteState::InQuotes => {
                current.push(c);
                state = QuoteState::Unquoted;
                field_blank = true;
            }
            c => {
                if state == QuoteState::Unquoted && !c.is_whitespace() {
                    field_blank = false;
                }
                current.push(c);
            }
        }
    }

    if current.ends_with('\r') {
        current.pop();
    }
    if !current.is_empty() {
        records.push(current);
    }

    records
}

/// Make headers usable as record keys: blanks become `column_N`, repeats get
/// a numeric suffix (`revenue`, `revenue_2`).
pub fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());

    for (i, header) in raw.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("column_{}", i + 1)
        } else {
            header.trim().to_string()
        };

        let mut candidate = base.clone();
        let mut n = 2;
        while headers.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        headers.push(candidate);
    }

    headers
}

/// Parse delimited text into headers and records.
pub fn parse_delimited(content: &str, options: &DelimitedOptions) -> Result<ParsedTable, CsvError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(content));
    let records = split_records(content, delimiter);

    // Physical line each record starts on; quoted fields may span several
    let mut start_lines = Vec::with_capacity(records.len());
    let mut next_line = 1;
    for record in &records {
        start_lines.push(next_line);
        next_line += 1 + record.matches('\n').count();
    }

    let mut lines = records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.trim().is_empty());

    let (_, header_line) = lines.next().ok_or(CsvError::EmptyFile)?;
    let raw_headers = tokenize_line(header_line, delimiter);
    if raw_headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }
    let headers = unique_headers(raw_headers);

    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut skipped_rows = 0;

    for (idx, line) in lines {
        let line_num = start_lines.get(idx).copied().unwrap_or(idx + 1);
        let values = tokenize_line(line, delimiter);

        if values.len() != headers.len() && options.strict {
            skipped_rows += 1;
            if warnings.len() < MAX_WARNINGS {
                warnings.push(format!(
                    "Line {}: expected {} fields, found {}",
                    line_num,
                    headers.len(),
                    values.len()
                ));
            }
            continue;
        }

        let row: Record = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = values
                    .get(i)
                    .map(|v| CellValue::from_raw(v))
                    .unwrap_or(CellValue::Null);
                (header.clone(), cell)
            })
            .collect();

        rows.push(row);
    }

    Ok(ParsedTable {
        headers,
        rows,
        delimiter: Some(delimiter),
        warnings,
        skipped_rows,
    })
}
