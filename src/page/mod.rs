//! Page layer: the observable tree, the scanner, the rewrite protocol and
//! the change-driven reprocessing loop.

pub mod tree;
pub mod memory;
pub mod walker;
pub mod rewrite;
pub mod session;
pub mod schedule;
pub mod reactor;
pub mod conductor;

pub use conductor::PriceConductor;
pub use memory::{MemoryTree, NodeId};
pub use reactor::{ChangeReactor, ReactorState, Wakeup};
pub use rewrite::{FragmentOutcome, RewriteEngine};
pub use schedule::{Scheduler, TaskKind};
pub use session::{HostContext, PassStats, ProcessingSession, Settings};
pub use tree::{MarkState, Mutation, NodeKind, PageTree, ProcessedMark};
pub use walker::{detect_page_currency, Fragment, TreeScanner};

#[cfg(test)]
mod tests;
