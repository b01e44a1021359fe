//! Browser DOM binding (feature `dom`)

pub mod tree;
pub mod host;

pub use host::PageConverter;
pub use tree::DomTree;
