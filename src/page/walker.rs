//! TreeScanner - document-order walk yielding price-shaped text fragments
//!
//! The scanner is a cursor: it holds its own stack and borrows the tree only
//! for the duration of each `next` call, so the caller can rewrite the
//! fragment it was just handed before asking for the next one.
//!
//! Pruned during the walk:
//! - elements whose tag is in the skip list (scripts, media, form controls)
//! - elements with the hidden flag and everything below them
//!
//! Computed style is only consulted for the scan root and for the parent of
//! a price candidate, never for every element on the way down.
//!
//! A text node is yielded when its trimmed text is non-empty, not a
//! percentage, price-shaped, and it carries no fresh mark. A stale mark is
//! cleared on the way past.

use crate::config::EngineConfig;
use crate::currency::{extract_price_with, CurrencyTable};
use crate::page::tree::{NodeKind, PageTree};

/// One candidate text fragment
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment<N> {
    pub text_node: N,
    /// Nearest element ancestor; rescan scope for the fragment
    pub element: N,
    /// Trimmed text at the time of the visit
    pub text: String,
}

/// Restartable cursor over candidate fragments under a root
#[derive(Debug, Clone)]
pub struct TreeScanner<N> {
    root: N,
    stack: Vec<N>,
    include_processed: bool,
    visited: usize,
}

impl<N: Clone + PartialEq> TreeScanner<N> {
    pub fn new(root: N) -> Self {
        Self {
            stack: vec![root.clone()],
            root,
            include_processed: false,
            visited: 0,
        }
    }

    /// Yield fragments regardless of marks (reconciliation sweep)
    pub fn include_processed(mut self, include: bool) -> Self {
        self.include_processed = include;
        self
    }

    /// Rewind to the root
    pub fn restart(&mut self) {
        self.stack.clear();
        self.stack.push(self.root.clone());
        self.visited = 0;
    }

    /// Text nodes examined so far
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Advance to the next candidate fragment
    pub fn next<T>(&mut self, tree: &mut T, table: &CurrencyTable, config: &EngineConfig) -> Option<Fragment<N>>
    where
        T: PageTree<Node = N>,
    {
        while let Some(node) = self.stack.pop() {
            match tree.kind(&node) {
                NodeKind::Element => {
                    if is_pruned(tree, &node, config) || (node == self.root && tree.is_style_hidden(&node)) {
                        continue;
                    }
                    let mut children = tree.children(&node);
                    children.reverse();
                    self.stack.extend(children);
                }
                NodeKind::Text => {
                    self.visited += 1;
                    if let Some(fragment) = self.accept(tree, node, table, config) {
                        return Some(fragment);
                    }
                }
                NodeKind::Other => {}
            }
        }
        None
    }

    fn accept<T>(&self, tree: &mut T, node: N, table: &CurrencyTable, config: &EngineConfig) -> Option<Fragment<N>>
    where
        T: PageTree<Node = N>,
    {
        let element = tree.parent_element(&node)?;
        // A text root has not been through the element checks
        if node == self.root && is_pruned(tree, &element, config) {
            return None;
        }

        let raw = tree.text_content(&node);
        let text = raw.trim();
        if !table.is_price_candidate(text) {
            return None;
        }
        if tree.is_style_hidden(&element) {
            return None;
        }

        if !self.include_processed {
            if let Some(mark) = tree.mark(&node) {
                if !mark.is_stale(text) {
                    return None;
                }
                tree.clear_mark(&node);
            }
        }
        let text = text.to_string();

        Some(Fragment { text_node: node, element, text })
    }

    /// Drain the remaining fragments
    pub fn collect_all<T>(&mut self, tree: &mut T, table: &CurrencyTable, config: &EngineConfig) -> Vec<Fragment<N>>
    where
        T: PageTree<Node = N>,
    {
        let mut out = Vec::new();
        while let Some(fragment) = self.next(tree, table, config) {
            out.push(fragment);
        }
        out
    }
}

/// Skip-listed or hidden element
pub fn is_pruned<T: PageTree>(tree: &T, element: &T::Node, config: &EngineConfig) -> bool {
    config.is_skipped_tag(&tree.tag_name(element)) || tree.is_hidden(element)
}

/// `node` is `ancestor` or lies below it
pub fn is_within<T: PageTree>(tree: &T, node: &T::Node, ancestor: &T::Node) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if n == *ancestor {
            return true;
        }
        current = tree.parent_element(&n);
    }
    false
}

const PAGE_CURRENCY_META: &str = "product:price:currency";

/// Currency the page itself displays prices in.
///
/// First extractable price among the scanner's candidates (marks ignored),
/// else the `product:price:currency` meta property if it names a known code.
pub fn detect_page_currency<T: PageTree>(tree: &mut T, table: &CurrencyTable, config: &EngineConfig) -> Option<String> {
    let mut scanner = TreeScanner::new(tree.root()).include_processed(true);
    while let Some(fragment) = scanner.next(tree, table, config) {
        if let Ok(found) = extract_price_with(table, &fragment.text) {
            return Some(found.currency);
        }
    }

    tree.meta_content(PAGE_CURRENCY_META)
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| table.contains(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::memory::MemoryTree;
    use crate::page::tree::ProcessedMark;

    fn texts(tree: &mut MemoryTree, include_processed: bool) -> Vec<String> {
        let table = CurrencyTable::shared();
        let config = EngineConfig::default();
        TreeScanner::new(tree.root())
            .include_processed(include_processed)
            .collect_all(tree, table, &config)
            .into_iter()
            .map(|f| f.text)
            .collect()
    }

    #[test]
    fn test_document_order_and_filters() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.element(root, "div");
        tree.text(a, "  $10.00 ");
        tree.text(a, "-15%");
        tree.text(a, "Add to cart");
        let b = tree.element(root, "span");
        tree.text(b, "25,00€");

        assert_eq!(texts(&mut tree, false), vec!["$10.00", "25,00€"]);
    }

    #[test]
    fn test_skip_tags_and_hidden_subtrees_are_pruned() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let script = tree.element(root, "script");
        tree.text(script, "var p = '$10';");
        let button = tree.element(root, "button");
        let inner = tree.element(button, "span");
        tree.text(inner, "$5");
        let hidden = tree.element(root, "div");
        tree.set_hidden(hidden, true);
        let deep = tree.element(hidden, "p");
        tree.text(deep, "€3");
        let visible = tree.element(root, "p");
        tree.text(visible, "£4");

        assert_eq!(texts(&mut tree, false), vec!["£4"]);
    }

    #[test]
    fn test_fresh_mark_rejects_and_stale_mark_is_cleared() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let a = tree.element(root, "span");
        let fresh = tree.text(a, "€9,20 EUR");
        tree.set_mark(&fresh, ProcessedMark::converted("$10", "€9,20 EUR"));
        let b = tree.element(root, "span");
        let stale = tree.text(b, "$12");
        tree.set_mark(&stale, ProcessedMark::converted("$10", "€9,20 EUR"));

        assert_eq!(texts(&mut tree, false), vec!["$12"]);
        assert!(tree.mark(&fresh).is_some());
        assert!(tree.mark(&stale).is_none());
    }

    #[test]
    fn test_include_processed_ignores_marks() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let el = tree.element(root, "span");
        let node = tree.text(el, "$10");
        tree.set_mark(&node, ProcessedMark::same("$10"));

        assert_eq!(texts(&mut tree, true), vec!["$10"]);
        assert!(tree.mark(&node).is_some());
    }

    #[test]
    fn test_marks_are_per_text_node() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let div = tree.element(root, "div");
        let first = tree.text(div, "₺300,00 TRY");
        tree.set_mark(&first, ProcessedMark::converted("$10", "₺300,00 TRY"));
        tree.element(div, "br");
        tree.text(div, "$20");

        assert_eq!(texts(&mut tree, false), vec!["$20"]);
        assert!(tree.mark(&first).is_some());
    }

    #[test]
    fn test_computed_style_only_for_root_and_candidate_parents() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        for _ in 0..5 {
            let row = tree.element(root, "div");
            let cell = tree.element(row, "span");
            tree.text(cell, "Add to cart");
        }
        let styled = tree.element(root, "div");
        tree.set_style_hidden(styled, true);
        tree.text(styled, "$3");
        let shown = tree.element(root, "p");
        tree.text(shown, "$4");

        assert_eq!(texts(&mut tree, false), vec!["$4"]);
        assert_eq!(tree.style_queries(), 3);
    }

    #[test]
    fn test_restart_replays_sequence() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let el = tree.element(root, "span");
        tree.text(el, "$10");
        let table = CurrencyTable::shared();
        let config = EngineConfig::default();

        let mut scanner = TreeScanner::new(root);
        assert!(scanner.next(&mut tree, table, &config).is_some());
        assert!(scanner.next(&mut tree, table, &config).is_none());
        scanner.restart();
        assert!(scanner.next(&mut tree, table, &config).is_some());
    }

    #[test]
    fn test_detect_page_currency() {
        let table = CurrencyTable::shared();
        let config = EngineConfig::default();

        let mut tree = MemoryTree::new();
        let root = tree.root();
        let el = tree.element(root, "div");
        tree.text(el, "Buy now");
        tree.text(el, "199,99 TL");
        assert_eq!(detect_page_currency(&mut tree, table, &config).as_deref(), Some("TRY"));

        let mut meta_only = MemoryTree::new();
        meta_only.set_meta("product:price:currency", "eur");
        assert_eq!(detect_page_currency(&mut meta_only, table, &config).as_deref(), Some("EUR"));

        meta_only.set_meta("product:price:currency", "XXX");
        assert_eq!(detect_page_currency(&mut meta_only, table, &config), None);
    }
}
