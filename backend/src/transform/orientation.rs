//! Orientation detection.
//!
//! Decides whether a table lists metrics down its rows with one column per
//! period (row-aligned, needs a pivot) or is already one record per row.
//!
//! Detection is a ruleset: each [`Rule`] is a named predicate feeding one
//! [`Signal`]. A signal holds when any of its rules holds; the table is
//! row-aligned only when every signal holds. New heuristics are added as
//! rules, without touching [`OrientationClassifier::classify`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{CellValue, Orientation, Record};

/// Data rows inspected by the classifier.
pub const SAMPLE_ROWS: usize = 10;

/// Period headers inspected by the date-columns rule.
pub const MAX_DATE_HEADERS: usize = 10;

/// Words that make a first header look like a metric-name column.
pub const ATTRIBUTE_VOCABULARY: &[&str] = &[
    "period", "metric", "metrics", "indicator", "indicators", "kpi", "kpis", "item", "items",
    "line", "account", "accounts", "row", "field", "name", "particulars", "description",
    "parameter", "head", "category", "measure",
];

/// Financial line items expected in the first column of a row-aligned sheet.
pub const METRIC_KEYWORDS: &[&str] = &[
    "revenue", "sales", "turnover", "income", "cogs", "cost", "expense", "opex", "capex",
    "ebitda", "ebit", "profit", "margin", "earnings", "eps", "assets", "asset", "liabilities",
    "liability", "equity", "cash", "debt", "borrowing", "inventory", "receivable", "payable",
    "depreciation", "amortization", "amortisation", "interest", "tax", "dividend", "capital",
    "reserves", "salary", "salaries", "payroll", "rent", "gross", "headcount", "arr", "mrr",
];

static DATE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("year", r"^\d{4}$"),
        ("year_month", r"^\d{4}[-_]\d{1,2}$"),
        ("year_month_day", r"^\d{4}[-_]\d{1,2}[-_]\d{1,2}$"),
        (
            "month_name",
            r"^(jan(uary)?|feb(ruary)?|mar(ch)?|apr(il)?|may|june?|july?|aug(ust)?|sep(t(ember)?)?|oct(ober)?|nov(ember)?|dec(ember)?)\b",
        ),
        ("day_month_year", r"^\d{1,2}/\d{1,2}/\d{4}$"),
        ("fiscal_year", r"^fy\s?'?\d{2}(\d{2})?(\s?[-/]\s?\d{2,4})?$"),
        ("quarter", r"^(q[1-4]([\s\-_']*\d{2}(\d{2})?)?|\d{4}[\s\-_]?q[1-4])$"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (name, re)))
    .collect()
});

/// The two independent pieces of evidence for a row-aligned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// The first column holds metric names.
    HeaderShape,
    /// The remaining headers are periods.
    DateColumns,
}

impl Signal {
    pub const ALL: [Signal; 2] = [Signal::HeaderShape, Signal::DateColumns];
}

/// What the rules get to look at.
#[derive(Debug, Clone)]
pub struct Sample<'a> {
    pub headers: &'a [String],
    /// Non-blank first-column values of the first [`SAMPLE_ROWS`] rows.
    pub first_column: Vec<String>,
}

impl<'a> Sample<'a> {
    pub fn new(headers: &'a [String], rows: &[Record]) -> Self {
        let first_column = headers
            .first()
            .map(|first| {
                rows.iter()
                    .take(SAMPLE_ROWS)
                    .filter_map(|row| match row.get(first) {
                        Some(CellValue::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        Some(CellValue::Number(n)) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { headers, first_column }
    }

    /// Headers after the first, capped at [`MAX_DATE_HEADERS`].
    pub fn period_candidates(&self) -> &[String] {
        let rest = self.headers.get(1..).unwrap_or(&[]);
        &rest[..rest.len().min(MAX_DATE_HEADERS)]
    }
}

/// A named predicate contributing to one signal.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub signal: Signal,
    /// Lower runs first; also the order rules are reported in.
    pub priority: u8,
    pub predicate: fn(&Sample) -> bool,
}

/// Built-in rules.
pub const DEFAULT_RULES: &[Rule] = &[
    Rule {
        name: "attribute_header",
        signal: Signal::HeaderShape,
        priority: 10,
        predicate: attribute_header,
    },
    Rule {
        name: "metric_keywords_in_first_column",
        signal: Signal::HeaderShape,
        priority: 20,
        predicate: metric_keywords_in_first_column,
    },
    Rule {
        name: "date_like_headers",
        signal: Signal::DateColumns,
        priority: 10,
        predicate: date_like_headers,
    },
];

fn words(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// First header is a word like "Metric", "Particulars" or "Line Item".
pub fn attribute_header(sample: &Sample) -> bool {
    sample
        .headers
        .first()
        .map(|h| words(h).any(|w| ATTRIBUTE_VOCABULARY.contains(&w.as_str())))
        .unwrap_or(false)
}

/// True if a first-column value names a known financial metric.
pub fn is_metric_name(value: &str) -> bool {
    words(value).any(|w| METRIC_KEYWORDS.iter().any(|k| w == *k || (k.len() > 3 && w.starts_with(k))))
}

/// At least 30% of sampled first-column values, or at least two of them,
/// are financial metric names.
pub fn metric_keywords_in_first_column(sample: &Sample) -> bool {
    let sampled = sample.first_column.len();
    if sampled == 0 {
        return false;
    }
    let matches = sample.first_column.iter().filter(|v| is_metric_name(v)).count();
    matches >= 2 || matches as f64 / sampled as f64 >= 0.3
}

/// Name of the first date pattern a header matches.
pub fn date_pattern(header: &str) -> Option<&'static str> {
    let h = header.trim().to_lowercase();
    DATE_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&h))
        .map(|(name, _)| *name)
}

/// At least half of the period candidates look like dates.
pub fn date_like_headers(sample: &Sample) -> bool {
    let candidates = sample.period_candidates();
    if candidates.is_empty() {
        return false;
    }
    let matches = candidates.iter().filter(|h| date_pattern(h).is_some()).count();
    matches * 2 >= candidates.len()
}

/// Outcome of classification, with the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub orientation: Orientation,
    /// Names of rules that held, in priority order.
    pub fired: Vec<&'static str>,
    pub header_shape: bool,
    pub date_columns: bool,
    /// Period-like headers without a metric-name column. Left column-aligned,
    /// but worth surfacing: it is also what a dated transaction log looks like.
    pub ambiguous: bool,
}

/// Ordered ruleset evaluator.
#[derive(Debug, Clone)]
pub struct OrientationClassifier {
    rules: Vec<Rule>,
}

impl OrientationClassifier {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }

    pub fn with_rules(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self { rules }
    }

    /// Add a rule, keeping priority order.
    pub fn add_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self.rules.sort_by_key(|r| r.priority);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, headers: &[String], rows: &[Record]) -> Classification {
        let sample = Sample::new(headers, rows);

        let fired: Vec<&'static str> = self
            .rules
            .iter()
            .filter(|rule| (rule.predicate)(&sample))
            .map(|rule| rule.name)
            .collect();

        let holds = |signal: Signal| {
            self.rules
                .iter()
                .any(|r| r.signal == signal && fired.contains(&r.name))
        };

        let header_shape = holds(Signal::HeaderShape);
        let date_columns = holds(Signal::DateColumns);
        let row_aligned = Signal::ALL.iter().all(|s| holds(*s));

        Classification {
            orientation: if row_aligned {
                Orientation::RowAligned
            } else {
                Orientation::ColumnAligned
            },
            fired,
            header_shape,
            date_columns,
            ambiguous: date_columns && !header_shape,
        }
    }
}

impl Default for OrientationClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify with the built-in rules.
pub fn classify(headers: &[String], rows: &[Record]) -> Classification {
    OrientationClassifier::new().classify(headers, rows)
}
