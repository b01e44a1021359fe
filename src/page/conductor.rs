//! PriceConductor: owns the tree, the settings snapshot and the reactor
//!
//! # State machine
//! `Created → Running → TornDown`. Commands on a torn-down conductor are
//! no-ops; passes report `StaleContext`.
//!
//! # Clock
//! The host passes its clock (`now`, milliseconds) into every call and
//! drives `tick` at `next_deadline()`. Nothing here reads wall time except
//! pass duration statistics.
//!
//! # Usage
//! ```rust,ignore
//! let mut conductor = PriceConductor::new(tree, EngineConfig::default(), settings);
//! conductor.start(now)?;
//! conductor.observe(&mutations, now);
//! conductor.tick(now)?;
//! conductor.set_target_currency("EUR", now);
//! ```

use instant::Instant;
use std::rc::Rc;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::config::EngineConfig;
use crate::currency::RateTable;
use crate::error::Result;
use crate::page::reactor::{ChangeReactor, Wakeup};
use crate::page::rewrite::{FragmentOutcome, RewriteEngine};
use crate::page::session::{HostContext, PassStats, ProcessingSession, Settings};
use crate::page::tree::{Mutation, NodeKind, PageTree};
use crate::page::walker::{detect_page_currency, is_pruned, TreeScanner};

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Running,
    TornDown,
}

fn tally(stats: &mut PassStats, outcome: &FragmentOutcome) {
    match outcome {
        FragmentOutcome::Converted { .. } => stats.converted += 1,
        FragmentOutcome::Same => stats.same += 1,
        FragmentOutcome::Skipped(e) => {
            trace!(error = %e, "fragment skipped");
            stats.skipped += 1;
        }
        FragmentOutcome::Fresh | FragmentOutcome::Excluded => {}
    }
}

// =============================================================================
// PriceConductor
// =============================================================================

/// Drives detection and rewriting over one hosted tree
pub struct PriceConductor<T: PageTree> {
    tree: T,
    config: EngineConfig,
    engine: RewriteEngine<'static>,
    session: ProcessingSession,
    reactor: ChangeReactor<T::Node>,
    context: Rc<HostContext>,
    location: Option<String>,
    page_currency: Option<String>,
    state: State,
    totals: PassStats,
}

impl<T: PageTree> PriceConductor<T> {
    pub fn new(tree: T, config: EngineConfig, settings: Settings) -> Self {
        let reactor = ChangeReactor::new(&config);
        Self {
            tree,
            config,
            engine: RewriteEngine::default(),
            session: ProcessingSession::from(settings),
            reactor,
            context: HostContext::new(),
            location: None,
            page_currency: None,
            state: State::Created,
            totals: PassStats::default(),
        }
    }

    // ==================== ACCESSORS ====================

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Direct tree access for hosts that mutate the page (and tests)
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &ProcessingSession {
        &self.session
    }

    pub fn settings(&self) -> Settings {
        self.session.to_settings()
    }

    /// Shared liveness flag, for callbacks that outlive a call
    pub fn context(&self) -> Rc<HostContext> {
        Rc::clone(&self.context)
    }

    /// Currency the page displays, detected at start
    pub fn page_currency(&self) -> Option<&str> {
        self.page_currency.as_deref()
    }

    /// Totals across every pass so far
    pub fn totals(&self) -> PassStats {
        self.totals
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running && self.context.is_valid()
    }

    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::Created => "created",
            State::Running => "running",
            State::TornDown => "torn-down",
        }
    }

    /// Earliest time `tick` has work to do
    pub fn next_deadline(&self) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        self.reactor.next_deadline()
    }

    /// Page location host is on the allow-list (an empty list allows all)
    pub fn host_allowed(&self) -> bool {
        if self.config.allowed_hosts.is_empty() {
            return true;
        }
        self.tree
            .location()
            .and_then(|loc| Url::parse(&loc).ok())
            .and_then(|url| url.host_str().map(|h| self.config.is_host_allowed(h)))
            .unwrap_or(false)
    }

    fn active(&self) -> bool {
        self.is_running() && self.session.enabled && self.host_allowed()
    }

    // ==================== LIFECYCLE ====================

    /// Replace the initial settings; only before `start`
    pub fn configure(&mut self, settings: Settings) -> bool {
        if self.state != State::Created {
            return false;
        }
        self.session = ProcessingSession::from(settings);
        true
    }

    /// Initial pass, then arm the sweep and the late-load rescan
    pub fn start(&mut self, now: u64) -> Result<PassStats> {
        self.context.ensure_valid()?;
        if self.state != State::Created {
            return Ok(PassStats::default());
        }
        self.state = State::Running;
        self.location = self.tree.location();
        self.reactor.start(now);

        if !self.host_allowed() {
            info!(location = ?self.location, "host not on allow-list, staying idle");
            return Ok(PassStats::default());
        }

        self.page_currency = detect_page_currency(&mut self.tree, self.engine.table(), &self.config);
        info!(
            page_currency = ?self.page_currency,
            target = %self.session.target_currency,
            enabled = self.session.enabled,
            "price conductor started"
        );

        if !self.session.enabled {
            return Ok(PassStats::default());
        }
        let root = self.tree.root();
        self.scan(root, false)
    }

    /// Invalidate the context and cancel every timer
    pub fn teardown(&mut self) {
        if self.state == State::TornDown {
            return;
        }
        self.context.invalidate();
        self.reactor.shutdown();
        self.state = State::TornDown;
        info!("price conductor torn down");
    }

    // ==================== CHANGE REACTION ====================

    /// Feed a batch of tree mutations
    pub fn observe(&mut self, mutations: &[Mutation<T::Node>], now: u64) {
        if !self.is_running() {
            return;
        }
        if self.check_location(now) || !self.active() {
            return;
        }
        let candidates = ChangeReactor::candidates(&self.tree, self.engine.table(), mutations);
        if !candidates.is_empty() {
            trace!(count = candidates.len(), "mutation candidates");
        }
        self.reactor.observe(candidates, now);
    }

    /// Run whatever the reactor has due at `now`
    pub fn tick(&mut self, now: u64) -> Result<PassStats> {
        self.context.ensure_valid()?;
        if self.state != State::Running {
            return Ok(PassStats::default());
        }
        self.check_location(now);

        let mut stats = PassStats::default();
        for wakeup in self.reactor.poll(now) {
            if !self.active() {
                continue;
            }
            let pass = match wakeup {
                Wakeup::Subtrees(roots) => self.subtree_pass(roots)?,
                Wakeup::FullRescan => {
                    let root = self.tree.root();
                    self.scan(root, false)?
                }
                Wakeup::Sweep => self.sweep_pass()?,
            };
            stats.merge(&pass);
        }
        Ok(stats)
    }

    /// Compare the tree's location with the last one seen.
    ///
    /// On change every mark is dropped without restoring (the old content is
    /// gone) and a full rescan is scheduled after the navigation grace delay.
    pub fn check_location(&mut self, now: u64) -> bool {
        if !self.is_running() {
            return false;
        }
        let current = self.tree.location();
        if current == self.location {
            return false;
        }
        let previous = std::mem::replace(&mut self.location, current);
        let cleared = self.engine.clear_all(&mut self.tree);
        self.reactor.navigated(now);
        info!(from = ?previous, to = ?self.location, cleared, "navigation detected");
        true
    }

    // ==================== COMMANDS ====================

    /// Switch target currency: restore everything, rescan after the grace delay
    pub fn set_target_currency(&mut self, code: &str, now: u64) -> usize {
        let code = code.trim().to_ascii_uppercase();
        if !self.is_running() || code.is_empty() || code == self.session.target_currency {
            return 0;
        }
        self.session = ProcessingSession {
            target_currency: code,
            ..self.session.clone()
        };
        self.invalidate_all(now)
    }

    /// Disable restores every rewritten fragment; enable rescans
    pub fn set_enabled(&mut self, enabled: bool, now: u64) -> usize {
        if !self.is_running() || enabled == self.session.enabled {
            return 0;
        }
        self.session = ProcessingSession {
            enabled,
            ..self.session.clone()
        };
        if enabled {
            info!("enabled, rescan scheduled");
            self.reactor.invalidate(now);
            0
        } else {
            let restored = self.engine.restore_all(&mut self.tree);
            self.reactor.suspend();
            self.totals.restored += restored;
            info!(restored, "disabled, original prices restored");
            restored
        }
    }

    /// Replace the rate snapshot; a different table invalidates every mark
    pub fn update_rates(&mut self, rates: RateTable, now: u64) -> usize {
        if !self.is_running() || rates == *self.session.rates {
            return 0;
        }
        self.session = ProcessingSession {
            rates: Rc::new(rates),
            ..self.session.clone()
        };
        self.invalidate_all(now)
    }

    /// Dispatch a collaborator settings change as the matching commands
    pub fn apply_settings(&mut self, settings: Settings, now: u64) -> usize {
        if !self.is_running() {
            return 0;
        }
        let next = ProcessingSession::from(settings);
        let toggled = next.enabled != self.session.enabled;
        let changed = next.target_currency != self.session.target_currency || next.rates != self.session.rates;

        if toggled {
            self.session = ProcessingSession {
                enabled: self.session.enabled,
                ..next
            };
            return self.set_enabled(!self.session.enabled, now);
        }
        if !changed {
            return 0;
        }
        self.session = next;
        if self.session.enabled {
            self.invalidate_all(now)
        } else {
            0
        }
    }

    /// Immediate full pass
    pub fn force_rescan(&mut self, _now: u64) -> Result<PassStats> {
        self.context.ensure_valid()?;
        if !self.active() {
            return Ok(PassStats::default());
        }
        let root = self.tree.root();
        self.scan(root, false)
    }

    /// Restore every mark; if enabled schedule a rescan after the grace delay
    fn invalidate_all(&mut self, now: u64) -> usize {
        let restored = self.engine.restore_all(&mut self.tree);
        self.totals.restored += restored;
        if self.session.enabled {
            self.reactor.invalidate(now);
        }
        info!(
            restored,
            target = %self.session.target_currency,
            rates = self.session.rates.len(),
            "global invalidation"
        );
        restored
    }

    // ==================== PASSES ====================

    /// Walk `root` and process every candidate with one session snapshot
    fn scan(&mut self, root: T::Node, include_processed: bool) -> Result<PassStats> {
        let started = Instant::now();
        let session = self.session.clone();
        let table = self.engine.table();
        let mut scanner = TreeScanner::new(root).include_processed(include_processed);
        let mut stats = PassStats::default();

        while let Some(fragment) = scanner.next(&mut self.tree, table, &self.config) {
            if let Err(e) = self.context.ensure_valid() {
                warn!(converted = stats.converted, "context invalidated mid-pass, aborting");
                return Err(e);
            }
            let outcome = self.engine.process_fragment(&mut self.tree, &fragment, &session);
            tally(&mut stats, &outcome);
        }

        stats.visited = scanner.visited();
        stats.elapsed_us = started.elapsed().as_micros() as u64;
        self.totals.merge(&stats);
        debug!(
            visited = stats.visited,
            converted = stats.converted,
            same = stats.same,
            skipped = stats.skipped,
            elapsed_us = stats.elapsed_us,
            "pass complete"
        );
        Ok(stats)
    }

    /// Debounced mutation candidates: clear stale marks, rescan each subtree
    fn subtree_pass(&mut self, roots: Vec<T::Node>) -> Result<PassStats> {
        let mut stats = PassStats::default();
        for root in roots {
            if !self.tree.is_connected(&root) || self.tree.kind(&root) != NodeKind::Element {
                continue;
            }
            if is_pruned(&self.tree, &root, &self.config) {
                continue;
            }
            self.engine.clear_stale_within(&mut self.tree, &root);
            stats.merge(&self.scan(root, false)?);
        }
        Ok(stats)
    }

    /// Reconcile stale marks, then process anything still unconverted
    fn sweep_pass(&mut self) -> Result<PassStats> {
        let mut stats = PassStats::default();
        let root = self.tree.root();
        for element in self.engine.clear_stale_within(&mut self.tree, &root) {
            trace!(element = ?element, "stale mark reprocessed");
            stats.merge(&self.scan(element, false)?);
        }
        stats.merge(&self.scan(root, true)?);
        Ok(stats)
    }
}
