//! Price formatting per currency convention
//!
//! Output shape: `{symbol}{grouped integer}{decimal sep}{decimals} {CODE}`.
//! Zero-decimal currencies drop the decimal part after rounding.

use crate::currency::table::CurrencyTable;

/// Currencies displayed without minor units
pub const ZERO_DECIMAL: &[&str] = &["JPY", "KRW", "VND", "IDR", "CLP", "COP", "KZT", "UYU"];

/// Currencies written with a decimal comma and dot grouping
pub const COMMA_DECIMAL: &[&str] = &["TRY", "EUR", "PLN", "SEK", "NOK", "DKK", "UAH", "RUB"];

/// Separator pair for a currency's display convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convention {
    pub thousands: char,
    pub decimal: char,
    pub decimals: usize,
}

impl Convention {
    pub fn for_currency(code: &str) -> Self {
        let (thousands, decimal) = if COMMA_DECIMAL.contains(&code) {
            ('.', ',')
        } else {
            (',', '.')
        };
        let decimals = if ZERO_DECIMAL.contains(&code) { 0 } else { 2 };
        Self { thousands, decimal, decimals }
    }
}

/// Insert `sep` between every group of three digits, keeping a leading sign.
pub fn group_thousands(digits: &str, sep: char) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3 + 1);
    out.push_str(sign);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// Render `amount` in `currency` using the shared table for the symbol.
pub fn format_price(amount: f64, currency: &str) -> String {
    format_price_with(CurrencyTable::shared(), amount, currency)
}

pub fn format_price_with(table: &CurrencyTable, amount: f64, currency: &str) -> String {
    let symbol = table.display_symbol(currency);
    let conv = Convention::for_currency(currency);

    if conv.decimals == 0 {
        let whole = format!("{}", amount.round() as i64);
        return format!("{}{} {}", symbol, group_thousands(&whole, conv.thousands), currency);
    }

    let fixed = format!("{:.*}", conv.decimals, amount);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    format!(
        "{}{}{}{} {}",
        symbol,
        group_thousands(int_part, conv.thousands),
        conv.decimal,
        frac_part,
        currency
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_decimal_rounds_and_groups() {
        assert_eq!(format_price(1234.5, "JPY"), "¥1,235 JPY");
        assert_eq!(format_price(1330000.2, "KRW"), "₩1,330,000 KRW");
        assert_eq!(format_price(999.4, "CLP"), "CLP$999 CLP");
    }

    #[test]
    fn test_comma_decimal_currencies() {
        assert_eq!(format_price(1234.56, "EUR"), "€1.234,56 EUR");
        assert_eq!(format_price(3333.333, "TRY"), "₺3.333,33 TRY");
        assert_eq!(format_price(5.0, "PLN"), "zł5,00 PLN");
    }

    #[test]
    fn test_default_convention() {
        assert_eq!(format_price(1234567.891, "USD"), "$1,234,567.89 USD");
        assert_eq!(format_price(0.5, "GBP"), "£0.50 GBP");
    }

    #[test]
    fn test_unknown_currency_uses_code_as_symbol() {
        assert_eq!(format_price(12.0, "XAF"), "XAF12.00 XAF");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("1", ','), "1");
        assert_eq!(group_thousands("123", ','), "123");
        assert_eq!(group_thousands("1234", '.'), "1.234");
        assert_eq!(group_thousands("-1234567", ','), "-1,234,567");
    }
}
