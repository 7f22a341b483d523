//! Digit grouping and fixed-point rendering.

use super::NumberSystem;

/// Round half away from zero to `decimals` places.
///
/// Values too large to scale are already integral and come back unchanged.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if decimals == 0 {
        return value.round();
    }
    let factor = 10_f64.powi(decimals.min(i32::MAX as u32) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Insert separators into a run of ASCII digits.
///
/// Both systems group the last three digits; above that, Indian groups by
/// two (`1,23,45,678`) and international by three (`12,345,678`).
pub fn group_digits(digits: &str, system: NumberSystem) -> String {
    let len = digits.len();
    if len <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(len - 3);
    let step = match system {
        NumberSystem::Indian => 2,
        NumberSystem::International => 3,
    };

    let mut groups = Vec::with_capacity(head.len() / step + 2);
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(step);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    groups.push(tail);
    groups.join(",")
}

/// Render a non-negative value with grouped integer digits and `decimals`
/// fraction digits. With `trim`, trailing fraction zeros (and a bare point)
/// are dropped.
pub fn format_fixed(value: f64, decimals: u32, system: NumberSystem, trim: bool) -> String {
    let s = format!("{:.*}", decimals as usize, round_to(value.abs(), decimals));
    let (int_part, frac_part) = s.split_once('.').unwrap_or((s.as_str(), ""));

    let frac = if trim {
        frac_part.trim_end_matches('0')
    } else {
        frac_part
    };

    let grouped = group_digits(int_part, system);
    if frac.is_empty() {
        grouped
    } else {
        format!("{}.{}", grouped, frac)
    }
}
