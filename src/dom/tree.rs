//! DomTree - PageTree over the live browser document
//!
//! Text nodes cannot carry attributes, so marks live in a `WeakMap` keyed by
//! the text node. The parent element gets a `data-price-processed`
//! attribute while any of its text children is marked; that attribute is the
//! index `marked_nodes` enumerates from.

use js_sys::{Object, WeakMap};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, MutationRecord, Node, Window};

use crate::error::{PriceError, Result};
use crate::page::tree::{Mutation, NodeKind, PageTree, ProcessedMark};

pub const PROCESSED_ATTR: &str = "data-price-processed";

pub struct DomTree {
    window: Window,
    document: Document,
    root: Node,
    marks: WeakMap,
}

impl DomTree {
    /// Tree rooted at `document.body`
    pub fn from_window() -> Result<Self> {
        let window = web_sys::window().ok_or(PriceError::StaleContext)?;
        let document = window.document().ok_or(PriceError::StaleContext)?;
        let body = document.body().ok_or(PriceError::StaleContext)?;
        Ok(Self {
            window,
            document,
            root: body.into(),
            marks: WeakMap::new(),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn element<'n>(node: &'n Node) -> Option<&'n Element> {
        node.dyn_ref::<Element>()
    }

    fn key(node: &Node) -> &Object {
        node.unchecked_ref::<Object>()
    }

    fn has_mark(&self, node: &Node) -> bool {
        node.node_type() == Node::TEXT_NODE && self.marks.has(Self::key(node))
    }

    /// Text children of `element` carrying a mark
    fn marked_children(&self, element: &Node) -> Vec<Node> {
        let list = element.child_nodes();
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter(|child| self.has_mark(child))
            .collect()
    }
}

/// Translate an observer record; unknown record types are dropped
pub fn to_mutation(record: &MutationRecord) -> Option<Mutation<Node>> {
    let target = record.target()?;
    match record.type_().as_str() {
        "childList" => {
            let list = record.added_nodes();
            let added = (0..list.length()).filter_map(|i| list.item(i)).collect();
            Some(Mutation::ChildList { target, added })
        }
        "characterData" => Some(Mutation::CharacterData { target }),
        _ => None,
    }
}

impl PageTree for DomTree {
    type Node = Node;

    fn root(&self) -> Node {
        self.root.clone()
    }

    fn kind(&self, node: &Node) -> NodeKind {
        match node.node_type() {
            Node::ELEMENT_NODE => NodeKind::Element,
            Node::TEXT_NODE => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn parent_element(&self, node: &Node) -> Option<Node> {
        node.parent_element().map(Node::from)
    }

    fn is_connected(&self, node: &Node) -> bool {
        node.is_connected()
    }

    fn tag_name(&self, element: &Node) -> String {
        Self::element(element)
            .map(|el| el.tag_name().to_ascii_uppercase())
            .unwrap_or_default()
    }

    fn is_hidden(&self, element: &Node) -> bool {
        element.dyn_ref::<HtmlElement>().is_some_and(|html| html.hidden())
    }

    fn is_style_hidden(&self, element: &Node) -> bool {
        let Some(el) = Self::element(element) else { return false };
        match self.window.get_computed_style(el) {
            Ok(Some(style)) => {
                style.get_property_value("display").is_ok_and(|v| v == "none")
                    || style.get_property_value("visibility").is_ok_and(|v| v == "hidden")
            }
            _ => false,
        }
    }

    fn text_content(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }

    fn set_text(&mut self, text_node: &Node, text: &str) {
        text_node.set_text_content(Some(text));
    }

    fn mark(&self, text_node: &Node) -> Option<ProcessedMark> {
        let value = self.marks.get(Self::key(text_node));
        if value.is_undefined() {
            return None;
        }
        serde_wasm_bindgen::from_value(value).ok()
    }

    fn set_mark(&mut self, text_node: &Node, mark: ProcessedMark) {
        let value: JsValue = match serde_wasm_bindgen::to_value(&mark) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode mark");
                return;
            }
        };
        self.marks.set(Self::key(text_node), &value);
        if let Some(parent) = text_node.parent_element() {
            if let Err(e) = parent.set_attribute(PROCESSED_ATTR, "true") {
                tracing::warn!(error = ?e, "failed to write mark attribute");
            }
        }
    }

    fn clear_mark(&mut self, text_node: &Node) {
        self.marks.delete(Self::key(text_node));
        if let Some(parent) = text_node.parent_element() {
            if self.marked_children(&parent).is_empty() {
                let _ = parent.remove_attribute(PROCESSED_ATTR);
            }
        }
    }

    fn marked_nodes(&self) -> Vec<Node> {
        let selector = format!("[{}]", PROCESSED_ATTR);
        let Ok(list) = self.document.query_selector_all(&selector) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .flat_map(|element| self.marked_children(&element))
            .collect()
    }

    fn meta_content(&self, property: &str) -> Option<String> {
        let selector = format!("meta[property=\"{}\"]", property);
        self.document
            .query_selector(&selector)
            .ok()
            .flatten()
            .and_then(|el| el.get_attribute("content"))
    }

    fn location(&self) -> Option<String> {
        self.document.location().and_then(|loc| loc.href().ok())
    }
}
