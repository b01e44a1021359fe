//! Settings snapshot, host context and pass statistics

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

use crate::currency::{RateTable, BASE_CURRENCY};
use crate::error::{PriceError, Result};

fn default_target() -> String {
    BASE_CURRENCY.to_string()
}

fn default_enabled() -> bool {
    true
}

/// Collaborator-owned settings, in their storage shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_target")]
    pub target_currency: String,
    #[serde(default = "RateTable::fallback")]
    pub exchange_rates: RateTable,
    #[serde(default = "default_enabled", alias = "extensionEnabled")]
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_currency: default_target(),
            exchange_rates: RateTable::fallback(),
            enabled: true,
        }
    }
}

/// Immutable settings view shared by every fragment of one pass.
///
/// Cloning is cheap; the rate table sits behind an `Rc` so a pass keeps the
/// table it started with even if the conductor swaps in a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingSession {
    pub target_currency: String,
    pub rates: Rc<RateTable>,
    pub enabled: bool,
}

impl ProcessingSession {
    pub fn new(target_currency: impl Into<String>, rates: RateTable, enabled: bool) -> Self {
        Self {
            target_currency: target_currency.into().trim().to_ascii_uppercase(),
            rates: Rc::new(rates),
            enabled,
        }
    }

    pub fn to_settings(&self) -> Settings {
        Settings {
            target_currency: self.target_currency.clone(),
            exchange_rates: (*self.rates).clone(),
            enabled: self.enabled,
        }
    }
}

impl From<Settings> for ProcessingSession {
    fn from(settings: Settings) -> Self {
        Self::new(settings.target_currency, settings.exchange_rates, settings.enabled)
    }
}

/// Liveness of the hosting page context.
///
/// Shared between the conductor and anything that outlives a single call
/// (pending futures, timer callbacks). Once invalidated it never recovers.
#[derive(Debug)]
pub struct HostContext {
    valid: Cell<bool>,
}

impl HostContext {
    pub fn new() -> Rc<Self> {
        Rc::new(Self { valid: Cell::new(true) })
    }

    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    pub fn invalidate(&self) {
        self.valid.set(false);
    }

    /// Checkpoint: `StaleContext` once torn down
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(PriceError::StaleContext)
        }
    }
}

/// Counters for one or more passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStats {
    /// Text nodes examined by the scanner
    pub visited: usize,
    pub converted: usize,
    pub same: usize,
    /// Candidates left untouched (no match, bad amount, missing rate)
    pub skipped: usize,
    pub restored: usize,
    pub elapsed_us: u64,
}

impl PassStats {
    pub fn merge(&mut self, other: &PassStats) {
        self.visited += other.visited;
        self.converted += other.converted;
        self.same += other.same;
        self.skipped += other.skipped;
        self.restored += other.restored;
        self.elapsed_us += other.elapsed_us;
    }

    /// Fragments whose visible text changed
    pub fn touched(&self) -> usize {
        self.converted + self.restored
    }
}
