//! CurrencyTable - ordered currency registry with compiled detection patterns
//!
//! Source of truth for both detection and display. Order is semantic:
//! extraction stops at the first rule that yields a valid amount, so an
//! ambiguous `$` resolves to USD because USD precedes CLP/COP.
//!
//! # Layout
//! - `CURRENCY_DEFS`: static definitions (code, symbols, codes, pattern)
//! - `CurrencyRule`: a definition plus its compiled leading/trailing regexes
//! - `CurrencyTable`: the ordered rule list, the aggregate "looks like a price"
//!   shape and the percentage shape

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

// ==================== DEFINITIONS ====================

/// Static definition of one currency
#[derive(Debug)]
pub struct CurrencyDef {
    pub code: &'static str,
    /// Display symbols, first one is used when formatting
    pub symbols: &'static [&'static str],
    pub codes: &'static [&'static str],
    /// Alternation matching any symbol or code variant (case-insensitive)
    pub pattern: &'static str,
}

macro_rules! currency {
    ($code:literal, [$($sym:literal),*], [$($alt:literal),*], $pattern:literal) => {
        CurrencyDef {
            code: $code,
            symbols: &[$($sym),*],
            codes: &[$($alt),*],
            pattern: $pattern,
        }
    };
}

/// Detection order. Do not sort.
pub static CURRENCY_DEFS: &[CurrencyDef] = &[
    // Major
    currency!("USD", ["$"], ["USD", "US$"], r"\$|USD|US\$"),
    currency!("EUR", ["€"], ["EUR", "EURO"], r"€|EUR|EURO"),
    currency!("GBP", ["£"], ["GBP"], r"£|GBP"),
    currency!("JPY", ["¥", "￥"], ["JPY"], r"¥|￥|JPY"),
    currency!("CNY", ["¥", "￥", "元"], ["CNY", "RMB"], r"¥|￥|元|CNY|RMB"),
    // Americas
    currency!("BRL", ["R$"], ["BRL"], r"R\$|BRL"),
    currency!("CAD", ["C$", "CA$"], ["CAD"], r"C\$|CA\$|CAD"),
    currency!("MXN", ["Mex$", "MX$"], ["MXN"], r"Mex\$|MX\$|MXN"),
    currency!("CLP", ["CLP$", "$"], ["CLP"], r"CLP\$|CLP"),
    currency!("COP", ["COL$", "$"], ["COP"], r"COL\$|COP"),
    currency!("CRC", ["₡"], ["CRC"], r"₡|CRC"),
    currency!("PEN", ["S/"], ["PEN"], r"S/|PEN"),
    currency!("UYU", ["$U", "UYU$"], ["UYU"], r"\$U|UYU\$|UYU"),
    // Europe
    currency!("TRY", ["₺", "TL"], ["TRY", "TL"], r"₺|TRY|TL"),
    currency!("RUB", ["₽"], ["RUB"], r"₽|RUB"),
    currency!("PLN", ["zł", "zl"], ["PLN"], r"zł|zl|PLN"),
    currency!("UAH", ["₴"], ["UAH"], r"₴|UAH"),
    currency!("CHF", ["CHF", "Fr"], ["CHF"], r"CHF|Fr"),
    currency!("SEK", ["kr"], ["SEK"], r"SEK"),
    currency!("NOK", ["kr"], ["NOK"], r"NOK"),
    currency!("DKK", ["kr"], ["DKK"], r"DKK"),
    // Asia Pacific
    currency!("AUD", ["A$", "AU$"], ["AUD"], r"A\$|AU\$|AUD"),
    currency!("NZD", ["NZ$"], ["NZD"], r"NZ\$|NZD"),
    currency!("SGD", ["S$"], ["SGD"], r"S\$|SGD"),
    currency!("HKD", ["HK$"], ["HKD"], r"HK\$|HKD"),
    currency!("TWD", ["NT$"], ["TWD"], r"NT\$|TWD"),
    currency!("KRW", ["₩"], ["KRW"], r"₩|KRW"),
    currency!("INR", ["₹", "Rs"], ["INR"], r"₹|Rs\.?|INR"),
    currency!("IDR", ["Rp"], ["IDR"], r"Rp\.?|IDR"),
    currency!("MYR", ["RM"], ["MYR"], r"RM|MYR"),
    currency!("PHP", ["₱"], ["PHP"], r"₱|PHP"),
    currency!("THB", ["฿"], ["THB"], r"฿|THB"),
    currency!("VND", ["₫"], ["VND"], r"₫|VND"),
    currency!("KZT", ["₸"], ["KZT"], r"₸|KZT"),
    // Middle East
    currency!("AED", ["د.إ"], ["AED"], r"د\.إ|AED"),
    currency!("SAR", ["ر.س", "SR"], ["SAR"], r"ر\.س|SR|SAR"),
    currency!("QAR", ["ر.ق", "QR"], ["QAR"], r"ر\.ق|QR|QAR"),
    currency!("KWD", ["د.ك", "KD"], ["KWD"], r"د\.ك|KD|KWD"),
    currency!("ILS", ["₪"], ["ILS"], r"₪|ILS"),
    // Africa
    currency!("ZAR", ["R"], ["ZAR"], r"ZAR"),
];

/// Amount capture used by every rule: digits with embedded separators
const AMOUNT: &str = r"([0-9]+[0-9,.]*[0-9]*)";

/// Any known symbol or code adjacent to a grouped/decimal numeral
const PRICE_SHAPE: &str = concat!(
    r"(?i)",
    r"(?:[$€£¥₹₩₺₽₡₴₱฿₫₸₪]|R\$|C\$|A\$|NZ\$|HK\$|S\$|MX\$|US\$|CA\$|AU\$|NT\$|COL\$|CLP\$|\$U|UYU\$|Rp\.?|RM|S/|د\.إ|ر\.س|ر\.ق|د\.ك|SR|QR|KD)",
    r"\s*[0-9]{1,3}(?:[.,][0-9]{3})*(?:[.,][0-9]{1,2})?",
    r"|[0-9]{1,3}(?:[.,][0-9]{3})*(?:[.,][0-9]{1,2})?\s*",
    r"(?:[$€£¥₹₩₺₽₡₴₱฿₫₸₪]|USD|EUR|GBP|JPY|CNY|INR|KRW|TRY|TL|BRL|CAD|AUD|MXN|RUB|PLN|SEK|NOK|DKK|CHF|NZD|ZAR|SGD|HKD|TWD|IDR|MYR|PHP|THB|VND|KZT|AED|SAR|QAR|KWD|ILS|CLP|COP|CRC|PEN|UYU|UAH|RMB)",
);

/// Discount badges such as "-15%"
const PERCENTAGE_SHAPE: &str = r"^-?[0-9]+\s*%$";

// ==================== COMPILED RULES ====================

/// A currency definition with its compiled extraction patterns
#[derive(Debug)]
pub struct CurrencyRule {
    def: &'static CurrencyDef,
    /// `<symbol-or-code> <amount>`
    leading: Regex,
    /// `<amount> <symbol-or-code>`
    trailing: Regex,
}

impl CurrencyRule {
    fn compile(def: &'static CurrencyDef) -> Self {
        let leading = Regex::new(&format!(r"(?i)(?:{})\s*{}", def.pattern, AMOUNT))
            .expect("static currency pattern");
        let trailing = Regex::new(&format!(r"(?i){}\s*(?:{})", AMOUNT, def.pattern))
            .expect("static currency pattern");
        Self { def, leading, trailing }
    }

    pub fn code(&self) -> &'static str {
        self.def.code
    }

    pub fn symbols(&self) -> &'static [&'static str] {
        self.def.symbols
    }

    pub fn codes(&self) -> &'static [&'static str] {
        self.def.codes
    }

    /// Symbol used when rendering an amount in this currency
    pub fn display_symbol(&self) -> &'static str {
        self.def.symbols.first().copied().unwrap_or(self.def.code)
    }

    /// Raw amount following a symbol/code, if present
    pub fn leading_amount<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.leading.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
    }

    /// Raw amount preceding a symbol/code, if present
    pub fn trailing_amount<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.trailing.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str())
    }
}

/// Serializable view of a rule for the JS side
#[derive(Debug, Clone, Serialize)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub symbols: Vec<&'static str>,
    pub codes: Vec<&'static str>,
}

// ==================== TABLE ====================

static SHARED: OnceLock<CurrencyTable> = OnceLock::new();

/// Ordered currency registry
#[derive(Debug)]
pub struct CurrencyTable {
    rules: Vec<CurrencyRule>,
    price_shape: Regex,
    percentage: Regex,
}

impl Default for CurrencyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CurrencyTable {
    /// Compile every rule. Prefer `shared()` outside of tests.
    pub fn new() -> Self {
        Self {
            rules: CURRENCY_DEFS.iter().map(CurrencyRule::compile).collect(),
            price_shape: Regex::new(PRICE_SHAPE).expect("static price pattern"),
            percentage: Regex::new(PERCENTAGE_SHAPE).expect("static percentage pattern"),
        }
    }

    /// Process-wide compiled table
    pub fn shared() -> &'static CurrencyTable {
        SHARED.get_or_init(CurrencyTable::new)
    }

    /// Rules in detection order
    pub fn rules(&self) -> &[CurrencyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&CurrencyRule> {
        self.rules.iter().find(|r| r.code() == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// First symbol of a known currency, or the code itself
    pub fn display_symbol<'a>(&self, code: &'a str) -> &'a str {
        match self.get(code) {
            Some(rule) => rule.display_symbol(),
            None => code,
        }
    }

    /// Aggregate price shape test (symbol/code adjacent to a numeral)
    pub fn looks_like_price(&self, text: &str) -> bool {
        self.price_shape.is_match(text)
    }

    /// Whole-text percentage test, expects trimmed input
    pub fn is_percentage(&self, text: &str) -> bool {
        self.percentage.is_match(text)
    }

    /// Trimmed, non-percentage, price-shaped
    pub fn is_price_candidate(&self, text: &str) -> bool {
        let trimmed = text.trim();
        !trimmed.is_empty() && !self.is_percentage(trimmed) && self.looks_like_price(trimmed)
    }

    pub fn infos(&self) -> Vec<CurrencyInfo> {
        self.rules
            .iter()
            .map(|r| CurrencyInfo {
                code: r.code(),
                symbols: r.symbols().to_vec(),
                codes: r.codes().to_vec(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let table = CurrencyTable::shared();
        let codes: HashSet<_> = table.rules().iter().map(|r| r.code()).collect();
        assert_eq!(codes.len(), table.len());
        assert_eq!(table.len(), 40);
    }

    #[test]
    fn test_usd_precedes_peso_rules() {
        let table = CurrencyTable::shared();
        let pos = |code: &str| table.rules().iter().position(|r| r.code() == code).unwrap();
        assert!(pos("USD") < pos("CLP"));
        assert!(pos("USD") < pos("COP"));
        assert!(pos("JPY") < pos("CNY"));
    }

    #[test]
    fn test_display_symbol_falls_back_to_code() {
        let table = CurrencyTable::shared();
        assert_eq!(table.display_symbol("EUR"), "€");
        assert_eq!(table.display_symbol("CLP"), "CLP$");
        assert_eq!(table.display_symbol("XAF"), "XAF");
    }

    #[test]
    fn test_price_shape() {
        let table = CurrencyTable::shared();
        assert!(table.looks_like_price("$59.99"));
        assert!(table.looks_like_price("€24,99"));
        assert!(table.looks_like_price("59.99€"));
        assert!(table.looks_like_price("29.99 USD"));
        assert!(table.looks_like_price("₺1.234,56"));
        assert!(table.looks_like_price("Rp 150.000"));
        assert!(table.looks_like_price("19,99 eur"));
        assert!(!table.looks_like_price("Free to play"));
        assert!(!table.looks_like_price("1,234"));
    }

    #[test]
    fn test_percentage_shape() {
        let table = CurrencyTable::shared();
        assert!(table.is_percentage("-15%"));
        assert!(table.is_percentage("20 %"));
        assert!(!table.is_percentage("-15% off $10"));
        assert!(!table.is_price_candidate("-15%"));
        assert!(table.is_price_candidate("  $10  "));
    }

    #[test]
    fn test_leading_and_trailing_capture() {
        let table = CurrencyTable::shared();
        let eur = table.get("EUR").unwrap();
        assert_eq!(eur.leading_amount("€ 1.234,56"), Some("1.234,56"));
        assert_eq!(eur.trailing_amount("24,99€"), Some("24,99"));
        assert_eq!(eur.leading_amount("24,99"), None);
    }
}
