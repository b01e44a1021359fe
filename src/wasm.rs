//! Text-level JS surface
//!
//! `PriceCortex` exposes detection, conversion and formatting on plain
//! strings, for callers that manage their own DOM (popup previews, other
//! content scripts). The live-page engine is `dom::PageConverter`.

use wasm_bindgen::prelude::*;

use crate::currency::{
    convert, extract_price_with, format_price_with, parse_amount, CurrencyTable, RateTable,
};
use crate::error::Result;
use crate::logging;

#[wasm_bindgen]
pub struct PriceCortex {
    table: &'static CurrencyTable,
    rates: RateTable,
    target: String,
}

impl PriceCortex {
    /// Convert the first price in `text` to the target currency.
    ///
    /// Text already in the target currency comes back unchanged.
    pub fn rewrite(&self, text: &str) -> Result<String> {
        let found = extract_price_with(self.table, text.trim())?;
        if found.currency == self.target {
            return Ok(text.to_string());
        }
        let amount = convert(found.amount, &found.currency, &self.target, &self.rates)?;
        Ok(format_price_with(self.table, amount, &self.target))
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }
}

#[wasm_bindgen]
impl PriceCortex {
    #[wasm_bindgen(constructor)]
    pub fn new(target_currency: &str) -> Self {
        Self {
            table: CurrencyTable::shared(),
            rates: RateTable::fallback(),
            target: target_currency.trim().to_ascii_uppercase(),
        }
    }

    #[wasm_bindgen(getter, js_name = targetCurrency)]
    pub fn target_currency(&self) -> String {
        self.target.clone()
    }

    #[wasm_bindgen(js_name = setTargetCurrency)]
    pub fn set_target_currency(&mut self, code: &str) {
        self.target = code.trim().to_ascii_uppercase();
    }

    /// Replace rates from a `{base, rates, date?}` object
    #[wasm_bindgen(js_name = setRates)]
    pub fn set_rates(&mut self, rates: JsValue) -> std::result::Result<(), JsValue> {
        let mut table: RateTable = serde_wasm_bindgen::from_value(rates)?;
        table.rates.insert(table.base.clone(), 1.0);
        self.rates = table;
        Ok(())
    }

    /// Replace rates from a raw API response body
    #[wasm_bindgen(js_name = setRatesJson)]
    pub fn set_rates_json(&mut self, json: &str) -> std::result::Result<(), JsValue> {
        self.rates = RateTable::from_api_payload(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = hasRate)]
    pub fn has_rate(&self, code: &str) -> bool {
        self.rates.contains(code)
    }

    /// First `{amount, currency, position, raw_amount}` in the text, or null
    #[wasm_bindgen(js_name = extractPrice)]
    pub fn extract_price(&self, text: &str) -> std::result::Result<JsValue, JsValue> {
        match extract_price_with(self.table, text) {
            Ok(found) => serde_wasm_bindgen::to_value(&found).map_err(|e| JsValue::from_str(&e.to_string())),
            Err(_) => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen]
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> std::result::Result<f64, JsValue> {
        convert(amount, from, to, &self.rates).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = formatPrice)]
    pub fn format_price(&self, amount: f64, currency: &str) -> String {
        format_price_with(self.table, amount, currency)
    }

    #[wasm_bindgen(js_name = rewriteText)]
    pub fn rewrite_text(&self, text: &str) -> std::result::Result<String, JsValue> {
        self.rewrite(text).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen(js_name = looksLikePrice)]
    pub fn looks_like_price(&self, text: &str) -> bool {
        self.table.is_price_candidate(text)
    }

    /// Registered currencies in detection order
    #[wasm_bindgen]
    pub fn currencies(&self) -> std::result::Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.table.infos()).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

#[wasm_bindgen(js_name = parsePrice)]
pub fn parse_price(raw: &str) -> std::result::Result<f64, JsValue> {
    parse_amount(raw).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Install the console tracing subscriber (e.g. "debug", "pricecore=trace")
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: &str) -> bool {
    logging::init(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PriceError;

    #[test]
    fn test_rewrite_converts_first_price() {
        let mut cortex = PriceCortex::new("try");
        cortex.rates = RateTable::new("USD", [("TRY".to_string(), 40.0)].into_iter().collect());
        assert_eq!(cortex.target_currency(), "TRY");
        assert_eq!(cortex.rewrite("Now only $19.99!").unwrap(), "₺799,60 TRY");
    }

    #[test]
    fn test_rewrite_same_currency_is_identity() {
        let cortex = PriceCortex::new("EUR");
        assert_eq!(cortex.rewrite(" 5,00 € ").unwrap(), " 5,00 € ");
    }

    #[test]
    fn test_rewrite_reports_local_failures() {
        let cortex = PriceCortex::new("EUR");
        assert!(matches!(cortex.rewrite("free"), Err(PriceError::NoCurrencyMatch)));
        assert!(matches!(cortex.rewrite("₪30"), Err(PriceError::InconvertibleRate { .. })));
    }

    #[test]
    fn test_fallback_rates_loaded() {
        let cortex = PriceCortex::new("USD");
        assert!(cortex.has_rate("JPY"));
        assert!(!cortex.has_rate("ILS"));
        assert!(cortex.looks_like_price("¥1,500"));
    }
}
