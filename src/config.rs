// pricecore/src/config.rs
//
// Engine timings, walk filters and host gating

use serde::{Deserialize, Serialize};

use crate::error::{PriceError, Result};

/// Element kinds whose subtrees are never scanned
pub const DEFAULT_SKIP_TAGS: &[&str] = &[
    "SCRIPT", "STYLE", "NOSCRIPT", "IFRAME", "CANVAS", "SVG", "VIDEO", "AUDIO", "INPUT", "TEXTAREA",
    "SELECT", "BUTTON",
];

/// Runtime configuration of the rewrite engine
///
/// All durations are milliseconds on the host clock passed to the conductor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Quiet window after the last mutation batch before reprocessing
    pub debounce_ms: u64,
    /// Period of the full reconciliation sweep
    pub sweep_interval_ms: u64,
    /// Delay before the full rescan that follows a settings change
    pub invalidation_grace_ms: u64,
    /// Delay before the full rescan that follows client-side navigation
    pub navigation_grace_ms: u64,
    /// One-shot full pass after start for late-loading content; 0 disables
    pub late_load_rescan_ms: u64,
    /// Upper-case tag names pruned from the walk
    pub skip_tags: Vec<String>,
    /// Host suffixes the engine runs on; empty allows every host
    pub allowed_hosts: Vec<String>,
    /// Default tracing directive for `logging::init`
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            sweep_interval_ms: 1000,
            invalidation_grace_ms: 100,
            navigation_grace_ms: 500,
            late_load_rescan_ms: 2000,
            skip_tags: DEFAULT_SKIP_TAGS.iter().map(|t| t.to_string()).collect(),
            allowed_hosts: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: EngineConfig = serde_json::from_str(json)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Restrict to the given host suffixes
    pub fn with_allowed_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(PriceError::InvalidConfig("debounceMs must be > 0".into()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(PriceError::InvalidConfig("sweepIntervalMs must be > 0".into()));
        }
        Ok(())
    }

    /// Upper-case tags, lower-case hosts without a leading dot
    pub fn normalize(&mut self) {
        for tag in &mut self.skip_tags {
            *tag = tag.trim().to_ascii_uppercase();
        }
        for host in &mut self.allowed_hosts {
            *host = host.trim().trim_start_matches('.').to_ascii_lowercase();
        }
    }

    pub fn is_skipped_tag(&self, tag: &str) -> bool {
        self.skip_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Suffix match on the host name (`store.example.com` matches `example.com`)
    pub fn is_host_allowed(&self, host: &str) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}
