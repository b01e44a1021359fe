//! MemoryTree - arena-backed PageTree
//!
//! A small document model with a mutation log, used to run the engine
//! outside a browser. Marks live in a side table keyed by node id; detaching
//! a subtree drops its marks so the table never outlives the nodes.

use std::cell::Cell;
use std::collections::HashMap;

use crate::page::tree::{Mutation, NodeKind, PageTree, ProcessedMark};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element { tag: String, hidden: bool, style_hidden: bool },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeEntry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory document with observable mutations
#[derive(Debug, Clone)]
pub struct MemoryTree {
    nodes: Vec<NodeEntry>,
    root: NodeId,
    marks: HashMap<NodeId, ProcessedMark>,
    meta: HashMap<String, String>,
    location: Option<String>,
    mutations: Vec<Mutation<NodeId>>,
    style_queries: Cell<usize>,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    /// Empty document with a `BODY` root
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeEntry {
                data: NodeData::Element { tag: "BODY".to_string(), hidden: false, style_hidden: false },
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            marks: HashMap::new(),
            meta: HashMap::new(),
            location: None,
            mutations: Vec::new(),
            style_queries: Cell::new(0),
        }
    }

    fn new_element(tag: &str) -> NodeData {
        NodeData::Element { tag: tag.to_ascii_uppercase(), hidden: false, style_hidden: false }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeEntry { data, parent: None, children: Vec::new() });
        id
    }

    /// Append a new element under `parent`
    pub fn element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.alloc(Self::new_element(tag));
        self.append_child(parent, id);
        id
    }

    /// Append a new text node under `parent`
    pub fn text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeData::Text(text.to_string()));
        self.append_child(parent, id);
        id
    }

    /// Create a detached element (for building a subtree before insertion)
    pub fn detached_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Self::new_element(tag))
    }

    /// Create a detached text node
    pub fn detached_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    /// Attach a detached node under `parent`, recording a childList mutation
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.nodes[child.0].parent {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        self.mutations.push(Mutation::ChildList { target: parent, added: vec![child] });
    }

    /// Detach `node` and its subtree
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent.take() else { return };
        self.nodes[parent.0].children.retain(|c| *c != node);
        self.forget_marks(node);
        self.mutations.push(Mutation::ChildList { target: parent, added: Vec::new() });
    }

    fn forget_marks(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.marks.remove(&current);
            stack.extend(self.nodes[current.0].children.iter().copied());
        }
    }

    /// External text write (page script, virtual-scroll recycling)
    pub fn replace_text(&mut self, text_node: NodeId, text: &str) {
        if let NodeData::Text(data) = &mut self.nodes[text_node.0].data {
            *data = text.to_string();
            self.mutations.push(Mutation::CharacterData { target: text_node });
        }
    }

    /// `element.textContent = text`: replace all children with one text node
    pub fn set_element_text(&mut self, element: NodeId, text: &str) -> NodeId {
        let old = std::mem::take(&mut self.nodes[element.0].children);
        for child in old {
            self.nodes[child.0].parent = None;
            self.forget_marks(child);
        }
        let id = self.alloc(NodeData::Text(text.to_string()));
        self.nodes[id.0].parent = Some(element);
        self.nodes[element.0].children.push(id);
        self.mutations.push(Mutation::ChildList { target: element, added: vec![id] });
        id
    }

    pub fn set_hidden(&mut self, element: NodeId, value: bool) {
        if let NodeData::Element { hidden, .. } = &mut self.nodes[element.0].data {
            *hidden = value;
        }
    }

    /// Simulate `display: none` from a stylesheet
    pub fn set_style_hidden(&mut self, element: NodeId, value: bool) {
        if let NodeData::Element { style_hidden, .. } = &mut self.nodes[element.0].data {
            *style_hidden = value;
        }
    }

    /// Computed-style lookups made so far
    pub fn style_queries(&self) -> usize {
        self.style_queries.get()
    }

    pub fn set_meta(&mut self, property: &str, content: &str) {
        self.meta.insert(property.to_string(), content.to_string());
    }

    pub fn set_location(&mut self, url: &str) {
        self.location = Some(url.to_string());
    }

    /// Drain the mutation log (what a MutationObserver would deliver)
    pub fn take_mutations(&mut self) -> Vec<Mutation<NodeId>> {
        std::mem::take(&mut self.mutations)
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }
}

impl PageTree for MemoryTree {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self, node: &NodeId) -> NodeKind {
        match self.nodes[node.0].data {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        }
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    fn parent_element(&self, node: &NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        self.is_attached(*node)
    }

    fn tag_name(&self, element: &NodeId) -> String {
        match &self.nodes[element.0].data {
            NodeData::Element { tag, .. } => tag.clone(),
            NodeData::Text(_) => String::new(),
        }
    }

    fn is_hidden(&self, element: &NodeId) -> bool {
        matches!(self.nodes[element.0].data, NodeData::Element { hidden: true, .. })
    }

    fn text_content(&self, node: &NodeId) -> String {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => text.clone(),
            NodeData::Element { .. } => self
                .text_descendants(node)
                .iter()
                .filter_map(|id| match &self.nodes[id.0].data {
                    NodeData::Text(text) => Some(text.as_str()),
                    NodeData::Element { .. } => None,
                })
                .collect(),
        }
    }

    fn set_text(&mut self, text_node: &NodeId, text: &str) {
        self.replace_text(*text_node, text);
    }

    fn is_style_hidden(&self, element: &NodeId) -> bool {
        self.style_queries.set(self.style_queries.get() + 1);
        matches!(self.nodes[element.0].data, NodeData::Element { style_hidden: true, .. })
    }

    fn mark(&self, text_node: &NodeId) -> Option<ProcessedMark> {
        self.marks.get(text_node).cloned()
    }

    fn set_mark(&mut self, text_node: &NodeId, mark: ProcessedMark) {
        self.marks.insert(*text_node, mark);
    }

    fn clear_mark(&mut self, text_node: &NodeId) {
        self.marks.remove(text_node);
    }

    fn marked_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            if self.marks.contains_key(&current) {
                out.push(current);
            }
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        out
    }

    fn meta_content(&self, property: &str) -> Option<String> {
        self.meta.get(property).cloned()
    }

    fn location(&self) -> Option<String> {
        self.location.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_concatenates_in_order() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let p = tree.element(root, "p");
        tree.text(p, "Price: ");
        let b = tree.element(p, "b");
        tree.text(b, "$10");
        assert_eq!(tree.text_content(&p), "Price: $10");
        assert_eq!(tree.tag_name(&b), "B");
    }

    #[test]
    fn test_mutation_log() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let span = tree.element(root, "span");
        let t = tree.text(span, "$1");
        tree.replace_text(t, "$2");
        let log = tree.take_mutations();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2], Mutation::CharacterData { target: t });
        assert!(tree.take_mutations().is_empty());
    }

    #[test]
    fn test_remove_drops_marks() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let span = tree.element(root, "span");
        let t = tree.text(span, "$1");
        tree.set_mark(&t, ProcessedMark::same("$1"));
        assert_eq!(tree.marked_nodes(), vec![t]);
        tree.remove(span);
        assert!(tree.marked_nodes().is_empty());
        assert!(tree.mark(&t).is_none());
        assert!(!tree.is_attached(t));
    }

    #[test]
    fn test_set_element_text_replaces_children() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let div = tree.element(root, "div");
        let a = tree.text(div, "$1");
        tree.text(div, "b");
        tree.set_mark(&a, ProcessedMark::same("$1"));
        tree.set_element_text(div, "c");
        assert_eq!(tree.children(&div).len(), 1);
        assert_eq!(tree.text_content(&div), "c");
        assert!(tree.mark(&a).is_none());
        assert!(tree.marked_nodes().is_empty());
    }
}
