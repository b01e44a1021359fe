//! PriceExtractor - first (amount, currency) pair in a text fragment
//!
//! Walks the currency table in order and tries `<symbol> <amount>` then
//! `<amount> <symbol>` for each rule. The first rule that produces a
//! parseable, non-negative amount wins; later rules are never consulted, so
//! the table order is the tie-break.

use serde::{Deserialize, Serialize};

use crate::currency::parser::parse_amount;
use crate::currency::table::CurrencyTable;
use crate::error::{PriceError, Result};

/// Which side of the numeral the currency marker was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerPosition {
    Leading,
    Trailing,
}

/// A detected price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMatch {
    pub amount: f64,
    pub currency: String,
    pub position: MarkerPosition,
    /// The numeral as it appeared in the text
    pub raw_amount: String,
}

/// Extract the first price from `text` using the shared table.
pub fn extract_price(text: &str) -> Result<PriceMatch> {
    extract_price_with(CurrencyTable::shared(), text)
}

/// Extract the first price from `text`.
///
/// Returns `NoCurrencyMatch` when no rule matched syntactically and
/// `ParseFailure` when some rule matched but none of the numerals parsed.
pub fn extract_price_with(table: &CurrencyTable, text: &str) -> Result<PriceMatch> {
    if text.trim().is_empty() {
        return Err(PriceError::NoCurrencyMatch);
    }

    let mut parse_failure: Option<PriceError> = None;

    for rule in table.rules() {
        let attempts = [
            (MarkerPosition::Leading, rule.leading_amount(text)),
            (MarkerPosition::Trailing, rule.trailing_amount(text)),
        ];

        for (position, raw) in attempts {
            let Some(raw) = raw else { continue };
            match parse_amount(raw) {
                Ok(amount) if amount >= 0.0 => {
                    return Ok(PriceMatch {
                        amount,
                        currency: rule.code().to_string(),
                        position,
                        raw_amount: raw.to_string(),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    parse_failure.get_or_insert(e);
                }
            }
        }
    }

    Err(parse_failure.unwrap_or(PriceError::NoCurrencyMatch))
}
