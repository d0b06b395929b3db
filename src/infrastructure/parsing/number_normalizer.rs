//! Turns a price-bearing text fragment into a number.
//!
//! Handles Swedish and English grouping: `3 997 kr`, `1 234,50`, `1,234.56`,
//! `1.234,56`. Anything that does not parse, or parses outside the caller's
//! range, comes back as `None` so the caller can move on to its next strategy.

use crate::domain::PriceRange;

/// Normalize with the selector plausibility range `[0, 10 000 000]`
pub fn normalize_price(raw: &str) -> Option<f64> {
    normalize_price_in(raw, PriceRange::selector())
}

/// Normalize and require the value to lie in `range`
pub fn normalize_price_in(raw: &str, range: PriceRange) -> Option<f64> {
    let cleaned = clean_numeric(raw)?;
    let value = cleaned.parse::<f64>().ok()?;
    range.contains(value).then_some(value)
}

/// Reduce `raw` to something `f64::from_str` understands.
fn clean_numeric(raw: &str) -> Option<String> {
    // Whitespace is only ever a thousands separator; it is dropped with the
    // currency words and symbols.
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    // "1 299:-" style suffixes and sentence punctuation
    let trimmed = kept.trim_end_matches(['-', '.', ',']);
    if !trimmed.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let last_comma = trimmed.rfind(',');
    let last_dot = trimmed.rfind('.');

    let resolved = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => {
            // 1.234,56: comma is the decimal point
            trimmed.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => {
            // 1,234.56: dot is the decimal point
            trimmed.replace(',', "")
        }
        (Some(comma), None) => {
            // At most two digits after the last comma means decimals
            if trimmed.len() - comma <= 3 {
                let (int_part, frac_part) = trimmed.split_at(comma);
                format!("{}.{}", int_part.replace(',', ""), &frac_part[1..])
            } else {
                trimmed.replace(',', "")
            }
        }
        (None, _) => trimmed.to_string(),
    };

    Some(resolved)
}
