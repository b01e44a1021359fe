//! Scenario tests for the page layer, run against `MemoryTree`.

mod pipeline_tests;

use crate::config::EngineConfig;
use crate::currency::RateTable;
use crate::page::conductor::PriceConductor;
use crate::page::memory::MemoryTree;
use crate::page::session::Settings;

fn test_rates() -> RateTable {
    RateTable::new(
        "USD",
        [("EUR", 0.9), ("TRY", 30.0), ("JPY", 150.0), ("GBP", 0.8)]
            .iter()
            .map(|(code, rate)| (code.to_string(), *rate))
            .collect(),
    )
}

fn settings(target: &str) -> Settings {
    Settings {
        target_currency: target.to_string(),
        exchange_rates: test_rates(),
        enabled: true,
    }
}

fn conductor(tree: MemoryTree, target: &str) -> PriceConductor<MemoryTree> {
    PriceConductor::new(tree, EngineConfig::default(), settings(target))
}
