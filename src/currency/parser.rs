//! Locale-aware amount parser
//!
//! Resolves the thousands/decimal separator ambiguity of raw numerals:
//! - EU: `1.234,56` (dot = thousands, comma = decimal)
//! - US: `1,234.56` (comma = thousands, dot = decimal)
//!
//! Cases are tried in order and the first one that applies wins. The result
//! is heuristic by nature: `1.234` reads as one thousand two hundred
//! thirty-four, `1.23` as one point two three.

use crate::error::{PriceError, Result};

/// How the separators of a numeral were interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorStyle {
    /// `18,99`
    CommaDecimal,
    /// `18.99`
    DotDecimal,
    /// `1.234,56`
    DotThousandsCommaDecimal,
    /// `1,234.56`
    CommaThousandsDotDecimal,
    /// `1.234`, `1.234.567`
    DotThousands,
    /// `1,234`, `1,234,567`
    CommaThousands,
    /// No separators, or a shape none of the cases claim
    Plain,
}

/// True when `sep` is followed by one or two trailing digits at end of input
fn has_short_tail(s: &str, sep: char) -> bool {
    match s.rfind(sep) {
        Some(idx) => {
            let tail = &s[idx + sep.len_utf8()..];
            (1..=2).contains(&tail.len()) && tail.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Classify the separators of a trimmed numeral
pub fn classify(s: &str) -> SeparatorStyle {
    let dots = s.matches('.').count();
    let commas = s.matches(',').count();
    let first_dot = s.find('.');
    let first_comma = s.find(',');

    if commas == 1 && dots == 0 && has_short_tail(s, ',') {
        SeparatorStyle::CommaDecimal
    } else if dots == 1 && commas == 0 && has_short_tail(s, '.') {
        SeparatorStyle::DotDecimal
    } else if dots > 0 && commas == 1 && first_dot < first_comma {
        SeparatorStyle::DotThousandsCommaDecimal
    } else if commas > 0 && dots == 1 && first_comma < first_dot {
        SeparatorStyle::CommaThousandsDotDecimal
    } else if dots > 0 && commas == 0 && !has_short_tail(s, '.') {
        SeparatorStyle::DotThousands
    } else if commas > 0 && dots == 0 && !has_short_tail(s, ',') {
        SeparatorStyle::CommaThousands
    } else if commas > 1 && dots == 0 {
        SeparatorStyle::CommaThousands
    } else if dots > 1 && commas == 0 {
        SeparatorStyle::DotThousands
    } else {
        SeparatorStyle::Plain
    }
}

/// Rewrite a numeral into canonical `1234.56` form
pub fn normalize(s: &str) -> String {
    match classify(s) {
        SeparatorStyle::CommaDecimal => s.replacen(',', ".", 1),
        SeparatorStyle::DotDecimal | SeparatorStyle::Plain => s.to_string(),
        SeparatorStyle::DotThousandsCommaDecimal => s.replace('.', "").replacen(',', ".", 1),
        SeparatorStyle::CommaThousandsDotDecimal | SeparatorStyle::CommaThousands => {
            s.replace(',', "")
        }
        SeparatorStyle::DotThousands => s.replace('.', ""),
    }
}

/// Parse a raw matched numeral into an amount.
///
/// Fails with `ParseFailure` when the cleaned string is not a decimal numeral.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PriceError::ParseFailure { raw: raw.to_string() });
    }

    let cleaned = normalize(trimmed);
    let valid = cleaned.bytes().any(|b| b.is_ascii_digit())
        && cleaned.bytes().all(|b| b.is_ascii_digit() || b == b'.' || b == b'-' || b == b'+');

    match cleaned.parse::<f64>() {
        Ok(value) if valid && value.is_finite() => Ok(value),
        _ => Err(PriceError::ParseFailure { raw: raw.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    // -------------------------------------------------------------------------
    // Requirement 1: Both regional styles resolve to the same amount
    // -------------------------------------------------------------------------
    #[test]
    fn test_eu_and_us_grouping() {
        assert!(approx(parse_amount("1.234,56").unwrap(), 1234.56));
        assert!(approx(parse_amount("1,234.56").unwrap(), 1234.56));
    }

    // -------------------------------------------------------------------------
    // Requirement 2: Short tails are decimals, long tails are thousands
    // -------------------------------------------------------------------------
    #[test]
    fn test_decimal_vs_thousands_tail() {
        assert!(approx(parse_amount("18,99").unwrap(), 18.99));
        assert!(approx(parse_amount("18.9").unwrap(), 18.9));
        assert!(approx(parse_amount("1.234").unwrap(), 1234.0));
        assert!(approx(parse_amount("1,234").unwrap(), 1234.0));
    }

    // -------------------------------------------------------------------------
    // Requirement 3: Repeated separators are grouping
    // -------------------------------------------------------------------------
    #[test]
    fn test_multiple_separators() {
        assert!(approx(parse_amount("1,234,567").unwrap(), 1234567.0));
        assert!(approx(parse_amount("1.234.567").unwrap(), 1234567.0));
        assert!(approx(parse_amount("1.234.567,89").unwrap(), 1234567.89));
        assert!(approx(parse_amount("1,234,567.89").unwrap(), 1234567.89));
        assert!(approx(parse_amount("1,23,45").unwrap(), 12345.0));
    }

    #[test]
    fn test_plain_integer() {
        assert!(approx(parse_amount(" 59 ").unwrap(), 59.0));
    }

    #[test]
    fn test_classification() {
        assert_eq!(classify("18,99"), SeparatorStyle::CommaDecimal);
        assert_eq!(classify("18.99"), SeparatorStyle::DotDecimal);
        assert_eq!(classify("1.234,5"), SeparatorStyle::DotThousandsCommaDecimal);
        assert_eq!(classify("1,234.5"), SeparatorStyle::CommaThousandsDotDecimal);
        assert_eq!(classify("1.234"), SeparatorStyle::DotThousands);
        assert_eq!(classify("1,234"), SeparatorStyle::CommaThousands);
        assert_eq!(classify("1234"), SeparatorStyle::Plain);
    }

    // -------------------------------------------------------------------------
    // Requirement 4: Unresolvable shapes fail instead of guessing
    // -------------------------------------------------------------------------
    #[test]
    fn test_unparseable() {
        assert!(matches!(parse_amount(""), Err(PriceError::ParseFailure { .. })));
        assert!(matches!(parse_amount("1,2,3.4.5"), Err(PriceError::ParseFailure { .. })));
        assert!(matches!(parse_amount(".,"), Err(PriceError::ParseFailure { .. })));
    }
}
