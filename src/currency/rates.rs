//! Exchange rate table and cross-rate conversion
//!
//! Rates are quoted against a single base currency (USD). Any pair converts
//! through the base: `amount / rates[source] * rates[target]`. No rounding
//! happens here; that is the formatter's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{PriceError, Result};

pub const BASE_CURRENCY: &str = "USD";

/// Built-in rates used until the first successful refresh
const FALLBACK_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.92),
    ("GBP", 0.79),
    ("JPY", 150.0),
    ("TRY", 40.0),
    ("CAD", 1.35),
    ("AUD", 1.52),
    ("CHF", 0.88),
    ("CNY", 7.2),
    ("INR", 83.0),
    ("KRW", 1330.0),
    ("MXN", 17.0),
    ("BRL", 4.95),
    ("RUB", 92.0),
    ("PLN", 4.0),
    ("SEK", 10.5),
    ("NOK", 10.8),
    ("DKK", 6.85),
];

fn default_base() -> String {
    BASE_CURRENCY.to_string()
}

/// Read-only snapshot of the exchange rates owned by the refresh collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTable {
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default)]
    pub rates: HashMap<String, f64>,
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<String>,
    #[serde(default, alias = "lastUpdate", skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            base: default_base(),
            rates: HashMap::new(),
            as_of_date: None,
            fetched_at: None,
        }
    }
}

impl RateTable {
    pub fn new(base: impl Into<String>, rates: HashMap<String, f64>) -> Self {
        let mut table = Self {
            base: base.into(),
            rates,
            ..Self::default()
        };
        table.rates.insert(table.base.clone(), 1.0);
        table
    }

    /// Minimal table used when no rates were ever fetched
    pub fn fallback() -> Self {
        let rates = FALLBACK_RATES
            .iter()
            .map(|(code, rate)| (code.to_string(), *rate))
            .collect();
        let mut table = Self::new(BASE_CURRENCY, rates);
        table.as_of_date = Some(Utc::now().format("%Y-%m-%d").to_string());
        table
    }

    /// Parse a `{base, rates, date}` API payload, pinning `rates[base] = 1.0`
    pub fn from_api_payload(json: &str) -> Result<Self> {
        let mut table: RateTable = serde_json::from_str(json)?;
        table.rates.insert(table.base.clone(), 1.0);
        Ok(table)
    }

    /// Usable rate for `code`; zero, negative and non-finite rates count as absent
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rate(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn with_fetched_at(mut self, at: DateTime<Utc>) -> Self {
        self.fetched_at = Some(at);
        self
    }
}

/// Convert `amount` from `source` to `target` through the table's base.
pub fn convert(amount: f64, source: &str, target: &str, table: &RateTable) -> Result<f64> {
    if source == target {
        return Ok(amount);
    }

    match (table.rate(source), table.rate(target)) {
        (Some(from), Some(to)) => Ok(amount / from * to),
        _ => Err(PriceError::InconvertibleRate {
            from: source.to_string(),
            to: target.to_string(),
        }),
    }
}
