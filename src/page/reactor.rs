//! ChangeReactor - decides when and where to reprocess
//!
//! # State machine
//! ```text
//! Idle --batch with candidates--> Debouncing --quiet window--> Idle
//!   \                              |  (each batch restarts the window)
//!    `--------- shutdown ---------> Stopped
//! ```
//! Independent of that cycle: the periodic sweep, the late-load pass and the
//! grace-delayed rescans that follow invalidation or navigation.
//!
//! The reactor owns timing only. The conductor performs the passes it asks
//! for through `poll`.

use tracing::debug;

use crate::config::EngineConfig;
use crate::currency::CurrencyTable;
use crate::page::schedule::{Scheduler, TaskKind};
use crate::page::tree::{Mutation, NodeKind, PageTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    Idle,
    Debouncing,
    Stopped,
}

/// Work the reactor wants done now
#[derive(Debug, Clone, PartialEq)]
pub enum Wakeup<N> {
    /// Reprocess these subtrees (debounced mutation candidates)
    Subtrees(Vec<N>),
    /// Clear-and-scan the whole tree
    FullRescan,
    /// Reconcile marks, then scan for unprocessed prices
    Sweep,
}

#[derive(Debug, Clone, Copy)]
struct Timings {
    debounce: u64,
    sweep: u64,
    invalidation_grace: u64,
    navigation_grace: u64,
    late_load: u64,
}

impl From<&EngineConfig> for Timings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            debounce: config.debounce_ms,
            sweep: config.sweep_interval_ms,
            invalidation_grace: config.invalidation_grace_ms,
            navigation_grace: config.navigation_grace_ms,
            late_load: config.late_load_rescan_ms,
        }
    }
}

/// Debounce/sweep state for one observed root
#[derive(Debug, Clone)]
pub struct ChangeReactor<N> {
    state: ReactorState,
    pending: Vec<N>,
    scheduler: Scheduler,
    timings: Timings,
}

impl<N: Clone + PartialEq> ChangeReactor<N> {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            state: ReactorState::Idle,
            pending: Vec::new(),
            scheduler: Scheduler::new(),
            timings: Timings::from(config),
        }
    }

    pub fn state(&self) -> ReactorState {
        self.state
    }

    pub fn pending(&self) -> &[N] {
        &self.pending
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Arm the periodic sweep and the late-load pass
    pub fn start(&mut self, now: u64) {
        if self.state == ReactorState::Stopped {
            return;
        }
        self.scheduler.repeating(TaskKind::Sweep, now, self.timings.sweep);
        if self.timings.late_load > 0 {
            self.scheduler.once(TaskKind::LateLoad, now, self.timings.late_load);
        }
    }

    /// Elements worth reprocessing after a mutation batch
    ///
    /// - added element whose text is price-shaped
    /// - added text node that is a price candidate, via its parent
    /// - changed text node that is a price candidate, via its parent
    /// - mutated element holding a marked text node whose live text no
    ///   longer matches the mark
    pub fn candidates<T>(tree: &T, table: &CurrencyTable, mutations: &[Mutation<N>]) -> Vec<N>
    where
        T: PageTree<Node = N>,
    {
        let mut out: Vec<N> = Vec::new();
        let mut push = |node: N| {
            if !out.contains(&node) {
                out.push(node);
            }
        };

        for mutation in mutations {
            match mutation {
                Mutation::ChildList { target, added } => {
                    for node in added {
                        match tree.kind(node) {
                            NodeKind::Element => {
                                if table.looks_like_price(&tree.text_content(node)) {
                                    push(node.clone());
                                }
                            }
                            NodeKind::Text => {
                                if table.is_price_candidate(&tree.text_content(node)) {
                                    if let Some(parent) = tree.parent_element(node) {
                                        push(parent);
                                    }
                                }
                            }
                            NodeKind::Other => {}
                        }
                    }

                    if tree.kind(target) == NodeKind::Element {
                        let stale = tree.text_descendants(target).iter().any(|node| {
                            tree.mark(node)
                                .is_some_and(|mark| mark.is_stale(&tree.text_content(node)))
                        });
                        if stale && table.looks_like_price(&tree.text_content(target)) {
                            push(target.clone());
                        }
                    }
                }
                Mutation::CharacterData { target } => {
                    if table.is_price_candidate(&tree.text_content(target)) {
                        if let Some(parent) = tree.parent_element(target) {
                            push(parent);
                        }
                    }
                }
            }
        }
        out
    }

    /// Queue candidates and restart the quiet window
    pub fn observe(&mut self, candidates: Vec<N>, now: u64) {
        if self.state == ReactorState::Stopped || candidates.is_empty() {
            return;
        }
        for node in candidates {
            if !self.pending.contains(&node) {
                self.pending.push(node);
            }
        }
        self.state = ReactorState::Debouncing;
        self.scheduler.once(TaskKind::Debounce, now, self.timings.debounce);
    }

    fn drop_pending(&mut self) {
        self.pending.clear();
        self.scheduler.cancel(TaskKind::Debounce);
        if self.state == ReactorState::Debouncing {
            self.state = ReactorState::Idle;
        }
    }

    /// Settings changed: a full rescan after the short grace delay
    /// supersedes any debounced subtree work
    pub fn invalidate(&mut self, now: u64) {
        if self.state == ReactorState::Stopped {
            return;
        }
        self.drop_pending();
        self.scheduler.once(TaskKind::Rescan, now, self.timings.invalidation_grace);
    }

    /// Location changed: full rescan after the longer grace delay
    pub fn navigated(&mut self, now: u64) {
        if self.state == ReactorState::Stopped {
            return;
        }
        self.drop_pending();
        self.scheduler.once(TaskKind::Rescan, now, self.timings.navigation_grace);
    }

    /// Disabled: forget queued work but keep the sweep armed
    pub fn suspend(&mut self) {
        self.drop_pending();
        self.scheduler.cancel(TaskKind::Rescan);
        self.scheduler.cancel(TaskKind::LateLoad);
    }

    /// Work due at `now`, in deadline order
    pub fn poll(&mut self, now: u64) -> Vec<Wakeup<N>> {
        if self.state == ReactorState::Stopped {
            return Vec::new();
        }

        let mut wakeups = Vec::new();
        for kind in self.scheduler.take_due(now) {
            match kind {
                TaskKind::Debounce => {
                    self.state = ReactorState::Idle;
                    let batch = std::mem::take(&mut self.pending);
                    debug!(candidates = batch.len(), "debounce window elapsed");
                    if !batch.is_empty() {
                        wakeups.push(Wakeup::Subtrees(batch));
                    }
                }
                TaskKind::Rescan | TaskKind::LateLoad => {
                    if !wakeups.contains(&Wakeup::FullRescan) {
                        wakeups.push(Wakeup::FullRescan);
                    }
                }
                TaskKind::Sweep => wakeups.push(Wakeup::Sweep),
            }
        }
        wakeups
    }

    pub fn next_deadline(&self) -> Option<u64> {
        if self.state == ReactorState::Stopped {
            return None;
        }
        self.scheduler.next_deadline()
    }

    /// Cancel every timer; the reactor never wakes again
    pub fn shutdown(&mut self) {
        self.pending.clear();
        self.scheduler.cancel_all();
        self.state = ReactorState::Stopped;
    }
}
