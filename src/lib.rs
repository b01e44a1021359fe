//! PriceCore: in-page price detection and currency conversion
//!
//! A Rust/WASM engine that finds price strings in page text, converts them
//! to a target currency and rewrites them in place, staying reversible while
//! the page mutates underneath it.
//!
//! # Architecture
//!
//! ## Currency Components
//! - `table.rs` - CurrencyTable: ordered registry (~40 currencies), order is the tie-break
//! - `parser.rs` - Numeric parser: `1.234,56` vs `1,234.56`
//! - `extractor.rs` - First (amount, currency) pair in a fragment
//! - `rates.rs` - RateTable + cross-rate conversion through USD
//! - `formatter.rs` - Convention-aware rendering (`€1.234,56 EUR`, `¥1,235 JPY`)
//!
//! ## Page Components
//! - `tree.rs` - PageTree: observable ordered tree capability, ProcessedMark
//! - `walker.rs` - TreeScanner: document-order candidate fragments
//! - `rewrite.rs` - RewriteEngine: idempotent rewrite + restore protocol
//! - `reactor.rs` - ChangeReactor: debounce, sweep, invalidation timing
//! - `conductor.rs` - PriceConductor: passes and control commands
//! - `memory.rs` - MemoryTree: in-memory document
//!
//! ## Bindings
//! - `wasm.rs` - PriceCortex: text-level API
//! - `dom/` - PageConverter: live DOM host (feature `dom`)
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { PageConverter } from 'pricecore';
//!
//! await init();
//!
//! const converter = new PageConverter({ allowedHosts: ['steampowered.com'] });
//! converter.start({ targetCurrency: 'TRY', exchangeRates: cached, enabled: true });
//!
//! // Settings UI commands
//! converter.setTargetCurrency('EUR');
//! converter.setEnabled(false);   // restores original prices
//! converter.forceRescan();
//! ```

pub mod config;
pub mod currency;
pub mod error;
pub mod logging;
pub mod page;
pub mod wasm;

#[cfg(feature = "dom")]
pub mod dom;

pub use config::EngineConfig;
pub use currency::*;
pub use error::{PriceError, Result};
pub use page::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
