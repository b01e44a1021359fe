//! Scheduler - named, cancellable deadlines on the host clock
//!
//! Each task kind owns one slot. Scheduling into an occupied slot replaces
//! the pending deadline, which is how the debounce window restarts. Repeating
//! slots re-arm themselves when they fire.

use tracing::trace;

/// Task kinds the reactor schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// Mutation batch quiet window elapsed
    Debounce,
    /// Full rescan after invalidation or navigation
    Rescan,
    /// One-shot pass for late-loading content
    LateLoad,
    /// Periodic reconciliation
    Sweep,
}

impl TaskKind {
    const ALL: [TaskKind; 4] = [TaskKind::Debounce, TaskKind::Rescan, TaskKind::LateLoad, TaskKind::Sweep];

    fn slot(self) -> usize {
        self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Debounce => "debounce",
            TaskKind::Rescan => "rescan",
            TaskKind::LateLoad => "late-load",
            TaskKind::Sweep => "sweep",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    due_at: u64,
    /// Re-arm period for repeating tasks
    every: Option<u64>,
}

/// Fixed-slot timer table
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    slots: [Option<Slot>; 4],
    fired: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire once at `now + delay`, replacing any pending deadline
    pub fn once(&mut self, kind: TaskKind, now: u64, delay: u64) {
        self.slots[kind.slot()] = Some(Slot { due_at: now.saturating_add(delay), every: None });
        trace!(task = kind.name(), due_at = now.saturating_add(delay), "scheduled");
    }

    /// Arm `kind` to fire every `period` starting at `now + period`
    pub fn repeating(&mut self, kind: TaskKind, now: u64, period: u64) {
        self.slots[kind.slot()] = Some(Slot { due_at: now.saturating_add(period), every: Some(period) });
    }

    pub fn cancel(&mut self, kind: TaskKind) {
        self.slots[kind.slot()] = None;
    }

    pub fn cancel_all(&mut self) {
        self.slots = [None; 4];
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    pub fn due_at(&self, kind: TaskKind) -> Option<u64> {
        self.slots[kind.slot()].map(|s| s.due_at)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<u64> {
        self.slots.iter().flatten().map(|s| s.due_at).min()
    }

    /// Pop every task due at `now`, earliest first (ties in kind order).
    ///
    /// Repeating tasks are re-armed one period after `now`, so a host that
    /// wakes late does not receive a burst of catch-up sweeps.
    pub fn take_due(&mut self, now: u64) -> Vec<TaskKind> {
        let mut due: Vec<(u64, TaskKind)> = Vec::new();
        for kind in TaskKind::ALL {
            let slot = &mut self.slots[kind.slot()];
            let Some(current) = *slot else { continue };
            if current.due_at > now {
                continue;
            }
            due.push((current.due_at, kind));
            *slot = current.every.map(|every| Slot { due_at: now.saturating_add(every), every: Some(every) });
        }
        due.sort();
        self.fired += due.len() as u64;
        due.into_iter().map(|(_, kind)| kind).collect()
    }

    /// Total tasks fired
    pub fn fired(&self) -> u64 {
        self.fired
    }
}
