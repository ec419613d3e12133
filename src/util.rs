// Utility helpers for numeric coercion and display formatting.
//
// Cell coercion lives here so the scoring code can assume plain `f64` values.
use num_format::{Locale, ToFormattedString};

/// Parse a string-like cell into `f64`.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Returns `None` for blanks, unparseable text and non-finite results
///   such as `"NaN"` or `"inf"`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Fixed one-decimal rendering used for every score column.
pub fn format_score(value: f64) -> String {
    format!("{:.1}", value)
}

/// Like [`format_score`] but always carries a sign, for variances.
pub fn format_variance(value: f64) -> String {
    format!("{:+.1}", value)
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234.5`).
    let neg = n.is_sign_negative();
    let s = format!("{:.*}", decimals, n.abs());
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_blank_text_and_non_finite() {
        assert_eq!(parse_f64_safe(Some(" 42.5 ")), Some(42.5));
        assert_eq!(parse_f64_safe(Some("1e2")), Some(100.0));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("NaN")), None);
        assert_eq!(parse_f64_safe(Some("inf")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn average_of_empty_is_zero() {
        assert_eq!(average(&[]), 0.0);
        assert!((average(&[80.0, 90.0]) - 85.0).abs() < 1e-9);
    }

    #[test]
    fn rounding_and_formatting() {
        assert_eq!(round_to(66.666, 1), 66.7);
        assert_eq!(format_score(21.26), "21.3");
        assert_eq!(format_variance(3.0), "+3.0");
        assert_eq!(format_variance(-0.46), "-0.5");
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-12.0, 1), "-12.0");
        assert_eq!(format_int(9855_i64), "9,855");
    }
}
