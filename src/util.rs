// Utility helpers for parsing and formatting.
//
// This module centralizes the "dirty" cell handling so the rest of the code
// can assume clean, typed values.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in spreadsheet exports.
///
/// - Trims whitespace, including non-breaking and full-width spaces.
/// - Strips thousands separators (`,` and the full-width `，`).
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s: String = s
        .chars()
        .filter(|c| *c != ',' && *c != '，' && !c.is_whitespace())
        .collect();
    let v = s.parse::<f64>().ok()?;
    v.is_finite().then_some(v)
}

/// Numeric cell cleaning for count and volume columns: anything that does
/// not parse degrades to zero instead of failing the load.
pub fn clean_numeric(s: &str) -> f64 {
    parse_f64_safe(Some(s)).unwrap_or(0.0)
}

/// Integer parsing for key columns such as a sales year or month. Tolerates a
/// trailing `.0` left behind by spreadsheet round-trips and a Korean unit
/// suffix (`2015년`, `3월`).
pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    let s = s.trim_end_matches(['년', '월']);
    let s = s.strip_suffix(".0").unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

/// Ratio with the zero-denominator convention used by every derived metric.
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
