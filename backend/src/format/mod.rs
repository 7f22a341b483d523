//! Locale-aware KPI number formatting.
//!
//! Two magnitude systems:
//!
//! ```text
//! indian          Cr (10^7)  L (10^5)  K (10^3)           1,23,45,678
//! international   T (10^12)  B (10^9)  M (10^6)  K (10^3) 12,345,678
//! ```
//!
//! Formatting is a pure function of value, unit and [`FormatOptions`].

pub mod grouping;
pub mod parse;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{CellValue, FormattedValue, Kpi};

pub use grouping::{format_fixed, group_digits, round_to};
pub use parse::parse_formatted;

/// Shown for NaN and infinities.
pub const NOT_AVAILABLE: &str = "N/A";

/// Most fraction digits any rendering will use.
pub const MAX_DECIMALS: u32 = 10;

/// Units shown as a suffix on small values instead of being treated as money.
pub const SPECIAL_UNITS: [&str; 6] = ["%", "x", "ratio", "times", "days", "score"];

// =============================================================================
// Number systems
// =============================================================================

/// One step of a magnitude scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeUnit {
    pub value: f64,
    /// Compact suffix, e.g. `L`.
    pub short: &'static str,
    /// Tooltip word, e.g. `Lakh`.
    pub long: &'static str,
}

const INDIAN_UNITS: [MagnitudeUnit; 3] = [
    MagnitudeUnit { value: 1e7, short: "Cr", long: "Crore" },
    MagnitudeUnit { value: 1e5, short: "L", long: "Lakh" },
    MagnitudeUnit { value: 1e3, short: "K", long: "Thousand" },
];

const INTERNATIONAL_UNITS: [MagnitudeUnit; 4] = [
    MagnitudeUnit { value: 1e12, short: "T", long: "Trillion" },
    MagnitudeUnit { value: 1e9, short: "B", long: "Billion" },
    MagnitudeUnit { value: 1e6, short: "M", long: "Million" },
    MagnitudeUnit { value: 1e3, short: "K", long: "Thousand" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberSystem {
    /// Lakh/crore, digits grouped 3-then-2.
    #[default]
    Indian,
    /// Thousand/million/billion/trillion, digits grouped by 3.
    International,
}

impl NumberSystem {
    /// Magnitude units, largest first.
    pub fn units(&self) -> &'static [MagnitudeUnit] {
        match self {
            NumberSystem::Indian => &INDIAN_UNITS,
            NumberSystem::International => &INTERNATIONAL_UNITS,
        }
    }

    /// Symbol used for the bare `currency` unit.
    pub fn default_currency(&self) -> &'static str {
        match self {
            NumberSystem::Indian => "₹",
            NumberSystem::International => "$",
        }
    }

    /// Largest unit whose rounded scaled value is at least 1, for `abs >= 1000`.
    pub fn magnitude_for(&self, abs: f64, decimals: u32) -> Option<&'static MagnitudeUnit> {
        if abs < 1000.0 {
            return None;
        }
        self.units()
            .iter()
            .find(|unit| round_to(abs / unit.value, decimals) >= 1.0)
    }
}

impl FromStr for NumberSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "indian" | "in" | "en-in" | "lakh" => Ok(NumberSystem::Indian),
            "international" | "intl" | "western" | "en-us" => Ok(NumberSystem::International),
            other => Err(format!("unknown number system '{}'", other)),
        }
    }
}

impl fmt::Display for NumberSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberSystem::Indian => f.write_str("indian"),
            NumberSystem::International => f.write_str("international"),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatOptions {
    #[serde(default)]
    pub system: NumberSystem,
    #[serde(default = "default_decimals", deserialize_with = "deserialize_decimals")]
    pub decimals: u32,
    /// Used when a value has no unit of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_symbol: Option<String>,
    #[serde(default = "default_compact")]
    pub compact: bool,
}

fn default_decimals() -> u32 {
    2
}

fn deserialize_decimals<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u32::deserialize(deserializer).map(|d| d.min(MAX_DECIMALS))
}

fn default_compact() -> bool {
    true
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            system: NumberSystem::default(),
            decimals: default_decimals(),
            currency_symbol: None,
            compact: default_compact(),
        }
    }
}

impl FormatOptions {
    pub fn with_system(mut self, system: NumberSystem) -> Self {
        self.system = system;
        self
    }

    pub fn with_currency(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = Some(symbol.into());
        self
    }

    pub fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals.min(MAX_DECIMALS);
        self
    }

    /// Fraction digits actually rendered, capped at [`MAX_DECIMALS`].
    pub fn decimals(&self) -> u32 {
        self.decimals.min(MAX_DECIMALS)
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }
}

// =============================================================================
// Units
// =============================================================================

/// How a unit string affects rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    /// Prefix symbol, e.g. `₹`.
    Currency(String),
    /// Suffix that bypasses compacting below 1000.
    Special(String),
    /// Any other unit, appended after a space.
    Other(String),
    /// Bare number.
    Plain,
}

impl UnitKind {
    pub fn classify(unit: Option<&str>, options: &FormatOptions) -> Self {
        let unit = unit.map(str::trim).filter(|u| !u.is_empty());

        let Some(unit) = unit else {
            return match options.currency_symbol.as_deref().map(str::trim) {
                Some(symbol) if !symbol.is_empty() => UnitKind::Currency(symbol.to_string()),
                _ => UnitKind::Plain,
            };
        };

        if let Some(glyph) = unit.chars().next().filter(|_| unit.chars().count() == 1) {
            if crate::kpi::coerce::CURRENCY_GLYPHS.contains(&glyph) {
                return UnitKind::Currency(unit.to_string());
            }
        }

        let lower = unit.to_lowercase();
        let symbol = match lower.as_str() {
            "inr" | "rs" | "rs." => Some("₹"),
            "usd" => Some("$"),
            "eur" => Some("€"),
            "gbp" => Some("£"),
            "jpy" => Some("¥"),
            _ => None,
        };
        if let Some(symbol) = symbol {
            return UnitKind::Currency(symbol.to_string());
        }
        if lower == "currency" {
            let symbol = options
                .currency_symbol
                .clone()
                .unwrap_or_else(|| options.system.default_currency().to_string());
            return UnitKind::Currency(symbol);
        }

        if SPECIAL_UNITS.contains(&lower.as_str()) {
            let suffix = if lower == "ratio" || lower == "times" {
                "x".to_string()
            } else {
                lower
            };
            return UnitKind::Special(suffix);
        }

        UnitKind::Other(unit.to_string())
    }

    pub fn is_special(&self) -> bool {
        matches!(self, UnitKind::Special(_))
    }

    /// Attach the unit to an already rendered number.
    pub fn wrap(&self, number: &str) -> String {
        match self {
            UnitKind::Currency(symbol) => format!("{}{}", symbol, number),
            UnitKind::Special(suffix) if suffix == "%" || suffix == "x" => {
                format!("{}{}", number, suffix)
            }
            UnitKind::Special(suffix) | UnitKind::Other(suffix) => format!("{} {}", number, suffix),
            UnitKind::Plain => number.to_string(),
        }
    }
}

// =============================================================================
// Formatting
// =============================================================================

fn not_available() -> FormattedValue {
    FormattedValue {
        formatted: NOT_AVAILABLE.to_string(),
        full: NOT_AVAILABLE.to_string(),
        tooltip: NOT_AVAILABLE.to_string(),
    }
}

/// Fully expanded, grouped, trailing zero decimals trimmed, with sign.
pub fn format_full(value: f64, options: &FormatOptions) -> String {
    let decimals = options.decimals();
    let sign = if value < 0.0 && round_to(value.abs(), decimals) != 0.0 {
        "-"
    } else {
        ""
    };
    format!(
        "{}{}",
        sign,
        format_fixed(value, decimals, options.system, true)
    )
}

/// Format a KPI value for display.
///
/// ```rust,ignore
/// let v = format_kpi_value(7245000.0, Some("₹"), &FormatOptions::default());
/// assert_eq!(v.formatted, "₹72.45 L");
/// assert_eq!(v.tooltip, "₹72,45,000 (72.45 Lakh)");
/// ```
pub fn format_kpi_value(value: f64, unit: Option<&str>, options: &FormatOptions) -> FormattedValue {
    if !value.is_finite() {
        return not_available();
    }

    let kind = UnitKind::classify(unit, options);
    let decimals = options.decimals();
    let system = options.system;
    let abs = value.abs();

    if round_to(abs, decimals) == 0.0 {
        let zero = kind.wrap("0");
        return FormattedValue {
            formatted: zero.clone(),
            full: zero.clone(),
            tooltip: zero,
        };
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let signed = |number: String| format!("{}{}", sign, kind.wrap(&number));

    let full = signed(format_fixed(abs, decimals, system, true));
    let magnitude = system.magnitude_for(abs, decimals);

    let formatted = match magnitude {
        Some(unit) if options.compact => signed(format!(
            "{} {}",
            format_fixed(abs / unit.value, decimals, system, true),
            unit.short
        )),
        None if options.compact || kind.is_special() => full.clone(),
        _ => signed(format_fixed(abs, decimals, system, false)),
    };

    let tooltip = match magnitude {
        Some(unit) => format!(
            "{} ({}{} {})",
            full,
            sign,
            format_fixed(abs / unit.value, decimals, system, true),
            unit.long
        ),
        None => full.clone(),
    };

    FormattedValue {
        formatted,
        full,
        tooltip,
    }
}

/// Format a computed KPI. `None` when the KPI has no value; text values
/// from custom KPIs are shown as-is.
pub fn format_kpi(kpi: &Kpi, options: &FormatOptions) -> Option<FormattedValue> {
    match &kpi.value {
        CellValue::Number(n) => {
            let unit = Some(kpi.unit.as_str()).filter(|u| !u.is_empty());
            Some(format_kpi_value(*n, unit, options))
        }
        CellValue::Text(text) => Some(FormattedValue {
            formatted: text.clone(),
            full: text.clone(),
            tooltip: text.clone(),
        }),
        CellValue::Null => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KpiOperation;
    use proptest::prelude::*;

    fn indian() -> FormatOptions {
        FormatOptions::default()
    }

    fn international() -> FormatOptions {
        FormatOptions::default().with_system(NumberSystem::International)
    }

    #[test]
    fn test_lakh_compact_and_full() {
        let v = format_kpi_value(7245000.0, Some("₹"), &indian());
        assert_eq!(v.formatted, "₹72.45 L");
        assert_eq!(v.full, "₹72,45,000");
        assert_eq!(v.tooltip, "₹72,45,000 (72.45 Lakh)");

        let v = format_kpi_value(7245000.0, Some("₹"), &indian().with_compact(false));
        assert_eq!(v.formatted, "₹72,45,000.00");
        assert_ne!(v.formatted, "₹7,245,000.00");
    }

    #[test]
    fn test_crore_tooltip() {
        let v = format_kpi_value(12345678.0, Some("₹"), &indian());
        assert_eq!(v.formatted, "₹1.23 Cr");
        assert_eq!(v.tooltip, "₹1,23,45,678 (1.23 Crore)");

        let v = format_kpi_value(12345678.0, Some("$"), &international());
        assert_eq!(v.formatted, "$12.35 M");
        assert_eq!(v.full, "$12,345,678");
    }

    #[test]
    fn test_international_units() {
        assert_eq!(format_kpi_value(1_500_000.0, Some("USD"), &international()).formatted, "$1.5 M");
        assert_eq!(format_kpi_value(2.5e9, None, &international()).formatted, "2.5 B");
        assert_eq!(format_kpi_value(3e12, Some("€"), &international()).formatted, "€3 T");
        assert_eq!(format_kpi_value(4200.0, None, &international()).formatted, "4.2 K");
    }

    #[test]
    fn test_rounding_promotes_to_next_unit() {
        // 99,999.999 rounds to 1.00 L rather than 100 K
        assert_eq!(format_kpi_value(99_999.999, None, &indian()).formatted, "1 L");
    }

    #[test]
    fn test_special_units() {
        assert_eq!(format_kpi_value(12.5, Some("%"), &indian()).formatted, "12.5%");
        assert_eq!(format_kpi_value(2.5, Some("x"), &indian()).formatted, "2.5x");
        assert_eq!(format_kpi_value(2.5, Some("times"), &indian()).formatted, "2.5x");
        assert_eq!(format_kpi_value(45.0, Some("days"), &indian()).formatted, "45 days");
        assert_eq!(format_kpi_value(12.5, Some("%"), &indian().with_compact(false)).formatted, "12.5%");
        assert_eq!(format_kpi_value(1500.0, Some("%"), &international()).formatted, "1.5 K%");
    }

    #[test]
    fn test_currency_fallback_and_other_units() {
        let opts = indian().with_currency("₹");
        assert_eq!(format_kpi_value(500.0, None, &opts).formatted, "₹500");
        assert_eq!(format_kpi_value(500.0, Some("currency"), &international()).formatted, "$500");
        assert_eq!(format_kpi_value(1200.0, Some("units"), &international()).formatted, "1.2 K units");
        assert_eq!(format_kpi_value(12.346, None, &indian()).formatted, "12.35");
    }

    #[test]
    fn test_negative_and_zero() {
        let v = format_kpi_value(-7245000.0, Some("₹"), &indian());
        assert_eq!(v.formatted, "-₹72.45 L");
        assert_eq!(v.full, "-₹72,45,000");
        assert_eq!(v.tooltip, "-₹72,45,000 (-72.45 Lakh)");

        for opts in [indian(), international(), indian().with_compact(false)] {
            assert_eq!(format_kpi_value(0.0, Some("₹"), &opts).formatted, "₹0");
            assert_eq!(format_kpi_value(-0.0, Some("%"), &opts).formatted, "0%");
            assert_eq!(format_kpi_value(0.001, Some("₹"), &opts).full, "₹0");
        }
    }

    #[test]
    fn test_non_finite() {
        let v = format_kpi_value(f64::NAN, Some("₹"), &indian());
        assert_eq!(v.formatted, "N/A");
        assert_eq!(format_kpi_value(f64::INFINITY, None, &indian()).tooltip, "N/A");
    }

    #[test]
    fn test_decimals_are_capped() {
        let mut opts = indian();
        opts.decimals = 400;
        let v = format_kpi_value(1234.0, Some("₹"), &opts);
        assert_eq!(v.formatted, "₹1.234 K");
        assert_eq!(v.full, "₹1,234");
        assert!(!v.tooltip.contains("NaN"));

        assert_eq!(indian().with_decimals(99).decimals, MAX_DECIMALS);
        let opts: FormatOptions = serde_json::from_str(r#"{"decimals": 400}"#).unwrap();
        assert_eq!(opts.decimals, MAX_DECIMALS);
    }

    #[test]
    fn test_near_max_values_stay_finite() {
        let v = format_kpi_value(1.7e308, None, &indian());
        assert!(!v.full.contains("inf"));
        let parsed = parse_formatted(&v.full).unwrap();
        assert!((parsed / 1.7e308 - 1.0).abs() < 1e-9);
        assert!(v.tooltip.ends_with("Crore)"));
        assert!(v.formatted.ends_with(" Cr"));
    }

    #[test]
    fn test_format_full() {
        assert_eq!(format_full(12345678.0, &indian()), "1,23,45,678");
        assert_eq!(format_full(12345678.0, &international()), "12,345,678");
        assert_eq!(format_full(-1234.5, &international()), "-1,234.5");
    }

    #[test]
    fn test_format_kpi() {
        let mut kpi = Kpi {
            id: "k".into(),
            name: "Revenue".into(),
            operation: KpiOperation::Sum,
            column_a: "revenue".into(),
            column_b: None,
            expression: None,
            value: CellValue::Number(7245000.0),
            unit: "₹".into(),
            category: "Revenue".into(),
            time_series: None,
        };
        assert_eq!(format_kpi(&kpi, &indian()).unwrap().formatted, "₹72.45 L");

        kpi.value = CellValue::Text("14 months".into());
        assert_eq!(format_kpi(&kpi, &indian()).unwrap().formatted, "14 months");

        kpi.value = CellValue::Null;
        assert!(format_kpi(&kpi, &indian()).is_none());
    }

    #[test]
    fn test_number_system_from_str() {
        assert_eq!("Indian".parse::<NumberSystem>(), Ok(NumberSystem::Indian));
        assert_eq!("intl".parse::<NumberSystem>(), Ok(NumberSystem::International));
        assert!("roman".parse::<NumberSystem>().is_err());
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let opts: FormatOptions = serde_json::from_str(r#"{"system": "international"}"#).unwrap();
        assert_eq!(opts.decimals, 2);
        assert!(opts.compact);
        assert_eq!(opts.system, NumberSystem::International);
    }

    proptest! {
        #[test]
        fn prop_format_then_parse(
            value in -1.0e13f64..1.0e13,
            international in any::<bool>(),
            compact in any::<bool>(),
        ) {
            let system = if international { NumberSystem::International } else { NumberSystem::Indian };
            let opts = FormatOptions::default().with_system(system).with_compact(compact);
            let tolerance = value.abs() * 0.006 + 0.006;

            for unit in [Some("₹"), Some("%"), None] {
                let v = format_kpi_value(value, unit, &opts);
                let parsed = parse_formatted(&v.formatted).unwrap();
                prop_assert!((parsed - value).abs() <= tolerance, "{} -> {} -> {}", value, v.formatted, parsed);
                let parsed_full = parse_formatted(&v.full).unwrap();
                prop_assert!((parsed_full - value).abs() <= tolerance);
            }
        }
    }
}
