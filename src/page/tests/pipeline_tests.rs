//! Scanner + rewrite engine contract tests

use super::*;
use crate::currency::{extract_price, CurrencyTable};
use crate::page::memory::NodeId;
use crate::page::rewrite::{FragmentOutcome, RewriteEngine};
use crate::page::session::ProcessingSession;
use crate::page::tree::PageTree;
use crate::page::walker::TreeScanner;

fn session(target: &str) -> ProcessingSession {
    ProcessingSession::from(settings(target))
}

/// Scan the whole tree once, processing each fragment as it is yielded
fn pass(tree: &mut MemoryTree, session: &ProcessingSession) -> Vec<FragmentOutcome> {
    let table = CurrencyTable::shared();
    let config = EngineConfig::default();
    let engine = RewriteEngine::new(table);
    let mut scanner = TreeScanner::new(tree.root());
    let mut outcomes = Vec::new();
    while let Some(fragment) = scanner.next(tree, table, &config) {
        outcomes.push(engine.process_fragment(tree, &fragment, session));
    }
    outcomes
}

fn one_price(text: &str) -> (MemoryTree, NodeId) {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let el = tree.element(root, "span");
    let node = tree.text(el, text);
    (tree, node)
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_two_passes_equal_one() {
    let (mut tree, node) = one_price("1.234,56 €");
    let s = session("USD");
    pass(&mut tree, &s);
    let once = tree.text_content(&node);
    let second = pass(&mut tree, &s);
    assert!(second.is_empty(), "fresh marks are filtered by the scanner");
    assert_eq!(tree.text_content(&node), once);
    assert_eq!(once, "$1,371.73 USD");
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_restore_reproduces_original() {
    for original in ["$1,234.56", "18,99 TL", "¥ 1500", "£0.99"] {
        let (mut tree, node) = one_price(original);
        pass(&mut tree, &session("EUR"));
        assert_ne!(tree.text_content(&node), original, "{} was not converted", original);

        assert!(RewriteEngine::default().restore_original(&mut tree, &node));
        assert_eq!(tree.text_content(&node), original);
    }
}

// ============================================================================
// Tie-break and percentage exclusion
// ============================================================================

#[test]
fn test_dollar_resolves_to_usd() {
    assert_eq!(extract_price("$10").unwrap().currency, "USD");
    let (mut tree, node) = one_price("$10");
    let outcomes = pass(&mut tree, &session("USD"));
    assert!(matches!(outcomes.as_slice(), [FragmentOutcome::Same]));
    assert!(tree.mark(&node).is_some());
}

#[test]
fn test_percentage_never_reaches_extractor() {
    let (mut tree, node) = one_price("-15%");
    let outcomes = pass(&mut tree, &session("EUR"));
    assert!(outcomes.is_empty());
    assert_eq!(tree.text_content(&node), "-15%");
    assert!(tree.mark(&node).is_none());
}

// ============================================================================
// Staleness
// ============================================================================

#[test]
fn test_overwritten_text_is_reprocessed_from_new_content() {
    let (mut tree, node) = one_price("$10");
    let s = session("EUR");
    pass(&mut tree, &s);
    assert_eq!(tree.text_content(&node), "€9,00 EUR");

    tree.replace_text(node, "$30");
    let outcomes = pass(&mut tree, &s);
    assert!(matches!(outcomes.as_slice(), [FragmentOutcome::Converted { .. }]));
    assert_eq!(tree.text_content(&node), "€27,00 EUR");
    let mark = tree.mark(&node).unwrap();
    assert_eq!(mark.original_text.as_deref(), Some("$30"));
}

#[test]
fn test_unparseable_fragment_left_unmarked() {
    let (mut tree, node) = one_price("Total: $ 1.2.3,4,5");
    let outcomes = pass(&mut tree, &session("EUR"));
    assert!(outcomes.iter().all(|o| !matches!(o, FragmentOutcome::Converted { .. })));
    assert_eq!(tree.text_content(&node), "Total: $ 1.2.3,4,5");
    assert!(tree.mark(&node).is_none());
}
