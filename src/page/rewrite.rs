//! RewriteEngine - extract, convert, format and commit one fragment
//!
//! Every mutation is confined to one text node and the mark on that node.
//! Local failures leave both untouched so the next pass retries.

use crate::currency::{convert, extract_price_with, format_price_with, CurrencyTable};
use crate::error::PriceError;
use crate::page::session::ProcessingSession;
use crate::page::tree::{MarkState, PageTree, ProcessedMark};
use crate::page::walker::{is_within, Fragment};

/// What happened to a fragment
#[derive(Debug)]
pub enum FragmentOutcome {
    /// Text node already carries an up-to-date mark
    Fresh,
    /// Percentage badge or blank text
    Excluded,
    /// Left as found; eligible for retry on a later pass
    Skipped(PriceError),
    /// Already in the target currency; marked, text unchanged
    Same,
    Converted { from: String, to: String },
}

/// Replace the trimmed part of `current`, keeping its surrounding whitespace
fn splice_trimmed(current: &str, replacement: &str) -> String {
    let start = current.len() - current.trim_start().len();
    let end = current.trim_end().len().max(start);
    format!("{}{}{}", &current[..start], replacement, &current[end..])
}

/// Stateless per-fragment pipeline over a currency table
#[derive(Debug, Clone, Copy)]
pub struct RewriteEngine<'a> {
    table: &'a CurrencyTable,
}

impl Default for RewriteEngine<'static> {
    fn default() -> Self {
        Self::new(CurrencyTable::shared())
    }
}

impl<'a> RewriteEngine<'a> {
    pub fn new(table: &'a CurrencyTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a CurrencyTable {
        self.table
    }

    /// Convert the fragment's price into the session's target currency
    pub fn process_fragment<T: PageTree>(
        &self,
        tree: &mut T,
        fragment: &Fragment<T::Node>,
        session: &ProcessingSession,
    ) -> FragmentOutcome {
        let node = &fragment.text_node;
        let node_text = tree.text_content(node);
        let text = node_text.trim();

        if let Some(mark) = tree.mark(node) {
            if !mark.is_stale(text) {
                return FragmentOutcome::Fresh;
            }
            tree.clear_mark(node);
        }

        if text.is_empty() || self.table.is_percentage(text) {
            return FragmentOutcome::Excluded;
        }

        let found = match extract_price_with(self.table, text) {
            Ok(found) => found,
            Err(e) => return FragmentOutcome::Skipped(e),
        };

        if found.currency == session.target_currency {
            tree.set_mark(node, ProcessedMark::same(text));
            return FragmentOutcome::Same;
        }

        let amount = match convert(found.amount, &found.currency, &session.target_currency, &session.rates) {
            Ok(amount) => amount,
            Err(e) => return FragmentOutcome::Skipped(e),
        };

        let formatted = format_price_with(self.table, amount, &session.target_currency);
        tree.set_text(node, &splice_trimmed(&node_text, &formatted));
        tree.set_mark(node, ProcessedMark::converted(text, formatted));

        FragmentOutcome::Converted {
            from: found.currency,
            to: session.target_currency.clone(),
        }
    }

    /// Write the pre-conversion text back into `text_node` and drop its mark.
    ///
    /// Returns true when text was restored. A stale mark is dropped without
    /// touching the text, since the page has replaced what we wrote.
    pub fn restore_original<T: PageTree>(&self, tree: &mut T, text_node: &T::Node) -> bool {
        let Some(mark) = tree.mark(text_node) else { return false };
        tree.clear_mark(text_node);

        let current = tree.text_content(text_node);
        if mark.state != MarkState::Converted || mark.is_stale(&current) {
            return false;
        }
        let Some(original) = mark.original_text else { return false };
        tree.set_text(text_node, &splice_trimmed(&current, &original));
        true
    }

    /// Restore every marked node; returns how many had text restored
    pub fn restore_all<T: PageTree>(&self, tree: &mut T) -> usize {
        tree.marked_nodes()
            .into_iter()
            .filter(|node| self.restore_original(tree, node))
            .count()
    }

    /// Drop every mark without touching text
    pub fn clear_all<T: PageTree>(&self, tree: &mut T) -> usize {
        let marked = tree.marked_nodes();
        for node in &marked {
            tree.clear_mark(node);
        }
        marked.len()
    }

    /// Drop stale marks on `root` and below.
    ///
    /// Returns the parent elements of the cleared nodes, deduplicated, for
    /// rescanning.
    pub fn clear_stale_within<T: PageTree>(&self, tree: &mut T, root: &T::Node) -> Vec<T::Node> {
        let mut parents = Vec::new();
        for node in tree.marked_nodes() {
            if !is_within(tree, &node, root) {
                continue;
            }
            let stale = tree
                .mark(&node)
                .is_some_and(|mark| mark.is_stale(&tree.text_content(&node)));
            if !stale {
                continue;
            }
            tree.clear_mark(&node);
            if let Some(parent) = tree.parent_element(&node) {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
        parents
    }
}
