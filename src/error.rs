//! Error taxonomy for the price pipeline
//!
//! None of these are fatal. Local failures (parse, no match, missing rate)
//! leave the fragment as found and make it eligible for a retry on the next
//! pass; `StaleContext` aborts the current pass at its next checkpoint.

#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("Unparseable amount: {raw:?}")]
    ParseFailure { raw: String },

    #[error("No known currency in text")]
    NoCurrencyMatch,

    #[error("No rate to convert {from} -> {to}")]
    InconvertibleRate { from: String, to: String },

    #[error("Host context was torn down")]
    StaleContext,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PriceError {
    /// True for failures that a later pass may resolve on its own
    /// (new rates, new page text).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PriceError::ParseFailure { .. }
                | PriceError::NoCurrencyMatch
                | PriceError::InconvertibleRate { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PriceError>;
