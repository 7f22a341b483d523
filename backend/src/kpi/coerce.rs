//! Best-effort conversion of cell values to numbers.
//!
//! Never panics and never substitutes zero: anything that does not read as
//! a finite number becomes `None`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::CellValue;

/// Currency glyphs stripped before parsing.
pub const CURRENCY_GLYPHS: [char; 5] = ['₹', '$', '€', '£', '¥'];

static CURRENCY_CODE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)^(rs\.?|inr|usd|eur|gbp|jpy)\s*|\s*(rs\.?|inr|usd|eur|gbp|jpy)$").ok()
});

/// Coerce any cell to a finite number.
pub fn coerce_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Number(_) | CellValue::Null => None,
        CellValue::Text(s) => coerce_str(s),
    }
}

/// Parse a display string such as `₹2,000`, `(1,234.50)` or `12.5%`.
pub fn coerce_str(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Accounting negatives: (1,234)
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        negative = true;
        s = inner;
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !CURRENCY_GLYPHS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    let cleaned = cleaned.strip_suffix('%').unwrap_or(&cleaned);
    let cleaned = match CURRENCY_CODE.as_ref() {
        Some(re) => re.replace_all(cleaned, "").into_owned(),
        None => cleaned.to_string(),
    };

    if cleaned.is_empty() {
        return None;
    }

    let n: f64 = cleaned.parse().ok()?;
    if !n.is_finite() {
        return None;
    }

    Some(if negative { -n } else { n })
}

/// Coerce a column, dropping everything that is not a number.
pub fn coerce_all<'a, I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a CellValue>,
{
    values.into_iter().filter_map(coerce_number).collect()
}
