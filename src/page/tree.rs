//! PageTree - the observable ordered tree the engine runs against
//!
//! Anything that can enumerate text nodes in document order, rewrite a
//! text node and keep per-node metadata can host the engine: the browser
//! DOM (`dom` feature) or the in-memory `MemoryTree` used by tests.
//!
//! Marks are per text node, so one element can hold several independently
//! converted prices. They live wherever the host keeps them (a weak map, a
//! side table); holding one must not extend the node's lifetime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node classification the walker cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Other,
}

/// Processed state recorded on an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkState {
    /// Text was rewritten into the target currency
    Converted,
    /// Text was already in the target currency, left as is
    Same,
}

impl MarkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkState::Converted => "true",
            MarkState::Same => "same",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "true" => Some(MarkState::Converted),
            "same" => Some(MarkState::Same),
            _ => None,
        }
    }
}

/// Idempotency metadata attached to a text node the engine has handled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMark {
    pub state: MarkState,
    /// Pre-conversion trimmed text of the node; absent for `Same`
    pub original_text: Option<String>,
    /// What the engine last left in the node (trimmed)
    pub last_written_text: String,
}

impl ProcessedMark {
    pub fn converted(original: impl Into<String>, written: impl Into<String>) -> Self {
        Self {
            state: MarkState::Converted,
            original_text: Some(original.into()),
            last_written_text: written.into(),
        }
    }

    pub fn same(text: impl Into<String>) -> Self {
        Self {
            state: MarkState::Same,
            original_text: None,
            last_written_text: text.into(),
        }
    }

    /// A mark is stale once the node's live text diverges from what we wrote
    pub fn is_stale(&self, current_text: &str) -> bool {
        current_text.trim() != self.last_written_text
    }
}

/// One observed change to the tree
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<N> {
    /// Children of `target` were added or removed
    ChildList { target: N, added: Vec<N> },
    /// The data of text node `target` changed
    CharacterData { target: N },
}

/// Host tree capability
pub trait PageTree {
    type Node: Clone + PartialEq + fmt::Debug;

    /// Document root (body)
    fn root(&self) -> Self::Node;

    fn kind(&self, node: &Self::Node) -> NodeKind;

    /// Children in document order
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent_element(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Still attached to the document
    fn is_connected(&self, _node: &Self::Node) -> bool {
        true
    }

    /// Upper-case tag name of an element
    fn tag_name(&self, element: &Self::Node) -> String;

    /// Explicit hidden flag; cheap enough to ask for every element
    fn is_hidden(&self, element: &Self::Node) -> bool;

    /// Computed style suppresses rendering. Only asked for scan roots and
    /// the parents of price candidates.
    fn is_style_hidden(&self, _element: &Self::Node) -> bool {
        false
    }

    /// Concatenated text of the node and its descendants
    fn text_content(&self, node: &Self::Node) -> String;

    /// Replace the data of a text node
    fn set_text(&mut self, text_node: &Self::Node, text: &str);

    fn mark(&self, text_node: &Self::Node) -> Option<ProcessedMark>;

    fn set_mark(&mut self, text_node: &Self::Node, mark: ProcessedMark);

    fn clear_mark(&mut self, text_node: &Self::Node);

    /// Every attached text node carrying a mark
    fn marked_nodes(&self) -> Vec<Self::Node>;

    /// `<meta property=..>` content, if the host has one
    fn meta_content(&self, _property: &str) -> Option<String> {
        None
    }

    /// Current location (URL) of the hosted document
    fn location(&self) -> Option<String> {
        None
    }

    /// Descendant text nodes of `node` in document order
    fn text_descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack = vec![node.clone()];
        while let Some(current) = stack.pop() {
            match self.kind(&current) {
                NodeKind::Text => out.push(current),
                NodeKind::Element => {
                    let mut children = self.children(&current);
                    children.reverse();
                    stack.extend(children);
                }
                NodeKind::Other => {}
            }
        }
        out
    }
}

impl fmt::Display for MarkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_compares_trimmed_live_text() {
        let mark = ProcessedMark::converted("$10", "€9,20 EUR");
        assert!(!mark.is_stale("  €9,20 EUR \n"));
        assert!(mark.is_stale("$12"));
    }

    #[test]
    fn test_mark_state_attribute_values() {
        assert_eq!(MarkState::parse("true"), Some(MarkState::Converted));
        assert_eq!(MarkState::parse("same"), Some(MarkState::Same));
        assert_eq!(MarkState::parse("yes"), None);
        assert_eq!(MarkState::Same.to_string(), "same");
    }
}
