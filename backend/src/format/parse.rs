//! Reading formatted amounts back into numbers.
//!
//! Accepts what [`super::format_kpi_value`] writes (`₹72.45 L`,
//! `-$1.5 M`, `₹1,23,45,678 (1.23 Crore)`, `12.5%`) as well as amounts
//! typed by hand (`INR 3 crore`, `2.5 lakhs`, `4bn`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::kpi::coerce::CURRENCY_GLYPHS;

static AMOUNT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^(-)?\s*(?:rs\.?|inr|usd|eur|gbp|jpy)?\s*(-)?\s*(\d[\d,]*(?:\.\d+)?|\.\d+)\s*([a-z]+)?",
    )
    .ok()
});

/// Multiplier for a magnitude word or abbreviation.
pub fn magnitude(word: &str) -> Option<f64> {
    match word {
        "k" | "thousand" | "thousands" => Some(1e3),
        "l" | "lakh" | "lakhs" | "lac" | "lacs" => Some(1e5),
        "m" | "mn" | "million" | "millions" => Some(1e6),
        "cr" | "crore" | "crores" => Some(1e7),
        "b" | "bn" | "billion" | "billions" => Some(1e9),
        "t" | "tn" | "trillion" | "trillions" => Some(1e12),
        _ => None,
    }
}

/// Parse a compact or fully grouped amount. Trailing units (`%`, `x`,
/// `days`, ...) are ignored; `N/A` and anything without a number is `None`.
pub fn parse_formatted(input: &str) -> Option<f64> {
    let re = AMOUNT.as_ref()?;

    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !CURRENCY_GLYPHS.contains(c))
        .collect::<String>()
        .to_lowercase();

    let caps = re.captures(cleaned.trim())?;
    let negative = caps.get(1).is_some() || caps.get(2).is_some();
    let number: f64 = caps.get(3)?.as_str().replace(',', "").parse().ok()?;
    let scale = caps
        .get(4)
        .and_then(|w| magnitude(w.as_str()))
        .unwrap_or(1.0);

    let value = number * scale;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_amounts() {
        assert_eq!(parse_formatted("₹72.45 L"), Some(7245000.0));
        assert_eq!(parse_formatted("-$1.5 M"), Some(-1500000.0));
        assert_eq!(parse_formatted("₹1.23 Cr"), Some(12300000.0));
        assert_eq!(parse_formatted("2 T"), Some(2e12));
    }

    #[test]
    fn test_full_and_tooltip() {
        assert_eq!(parse_formatted("₹1,23,45,678"), Some(12345678.0));
        assert_eq!(parse_formatted("12,345,678.50"), Some(12345678.5));
        assert_eq!(parse_formatted("₹1,23,45,678 (1.23 Crore)"), Some(12345678.0));
    }

    #[test]
    fn test_units_are_ignored() {
        assert_eq!(parse_formatted("12.5%"), Some(12.5));
        assert_eq!(parse_formatted("2.5x"), Some(2.5));
        assert_eq!(parse_formatted("45 days"), Some(45.0));
        assert_eq!(parse_formatted("1.5 K%"), Some(1500.0));
    }

    #[test]
    fn test_typed_amounts() {
        assert_eq!(parse_formatted("INR 3 crore"), Some(30000000.0));
        assert_eq!(parse_formatted("2.5 lakhs"), Some(250000.0));
        assert_eq!(parse_formatted("4bn"), Some(4e9));
        assert_eq!(parse_formatted("Rs. -500"), Some(-500.0));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_formatted("N/A"), None);
        assert_eq!(parse_formatted(""), None);
        assert_eq!(parse_formatted("lakh"), None);
    }
}
