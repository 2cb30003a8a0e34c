//! Locale-aware numeric token normalization
//!
//! Target sites mix thousands separators and decimal separators freely
//! ("1,234.56", "1.234,56", "9,564", "12,34") and decorate numbers with
//! currency and unit markers. This module recovers the mathematically
//! intended value, treating 0 and NaN as "not found" rather than as data.

/// Parse a raw token into a strictly positive price.
/// Returns `None` for zero, NaN, or anything that fails to parse - a
/// missing price is a miss, never a zero value.
pub fn parse_positive_price(raw: &str) -> Option<f64> {
    let value = parse_magnitude(raw)?;
    if value > 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Parse a raw change token into a signed value.
///
/// The sign comes from a leading `+`/`-` glyph (including the typographic
/// minus variants some sites render). When no glyph is present,
/// `negative_hint` - derived from a style/class negative indicator - flips
/// the magnitude. The hint is a best-effort secondary signal only.
/// A token with no parsable magnitude yields 0.0.
pub fn parse_signed_change(raw: &str, negative_hint: bool) -> f64 {
    let Some(magnitude) = parse_magnitude(raw) else {
        return 0.0;
    };

    match detect_leading_sign(raw) {
        Some(Sign::Negative) => -magnitude,
        Some(Sign::Positive) => magnitude,
        None if negative_hint => -magnitude,
        None => magnitude,
    }
}

/// Parse a raw token into a non-negative magnitude (high/low cells).
/// Missing or unparsable values collapse to 0, which consumers treat as
/// "range not applicable".
pub fn parse_range_bound(raw: &str) -> f64 {
    parse_magnitude(raw).unwrap_or(0.0)
}

/// Known non-price artifacts that survive numeric normalization: calendar
/// years, marine fuel grade numbers (IFO380/IFO180) and the 0.50% sulphur
/// cap, all of which appear as bare numbers near prices on target pages.
/// Applied only on the loosely-scoped regex fallback path, where false
/// positives are most likely.
pub fn is_non_price_artifact(value: f64) -> bool {
    let is_integer = value.fract() == 0.0;
    if is_integer && (1990.0..=2035.0).contains(&value) {
        return true;
    }
    if is_integer && (value == 380.0 || value == 180.0) {
        return true;
    }
    (value - 0.5).abs() < f64::EPSILON
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Positive,
    Negative,
}

/// Find an explicit sign glyph ahead of the first digit, skipping currency
/// markers. U+2212 (minus sign) and U+2013 (en dash) are treated as minus:
/// both show up in rendered change cells.
fn detect_leading_sign(raw: &str) -> Option<Sign> {
    for ch in raw.chars() {
        match ch {
            '+' => return Some(Sign::Positive),
            '-' | '\u{2212}' | '\u{2013}' => return Some(Sign::Negative),
            c if c.is_ascii_digit() => return None,
            _ => continue,
        }
    }
    None
}

/// Strip non-numeric noise and normalize separators, then parse.
fn parse_magnitude(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = normalize_separators(&cleaned);
    let value: f64 = normalized.parse().ok()?;
    if value == 0.0 || !value.is_finite() {
        return None;
    }
    Some(value)
}

/// Resolve `.` vs `,` ambiguity:
/// - both present: the separator occurring last is the decimal separator,
///   the other is a thousands separator and is removed;
/// - only `,`: a single comma followed by exactly 3 digits with a head of
///   at most 3 digits is a thousands separator; a single comma followed by
///   1-4 digits is a decimal separator; anything else drops all commas.
fn normalize_separators(token: &str) -> String {
    let last_dot = token.rfind('.');
    let last_comma = token.rfind(',');

    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => {
            if dot > comma {
                token.chars().filter(|c| *c != ',').collect()
            } else {
                let without_dots: String = token.chars().filter(|c| *c != '.').collect();
                without_dots.replace(',', ".")
            }
        }
        (None, Some(_)) => {
            let parts: Vec<&str> = token.split(',').collect();
            if parts.len() == 2 {
                let (head, tail) = (parts[0], parts[1]);
                if tail.len() == 3 && head.len() <= 3 && !head.is_empty() {
                    format!("{}{}", head, tail)
                } else if (1..=4).contains(&tail.len()) {
                    format!("{}.{}", head, tail)
                } else {
                    token.replace(',', "")
                }
            } else {
                token.replace(',', "")
            }
        }
        _ => token.to_string(),
    }
}
