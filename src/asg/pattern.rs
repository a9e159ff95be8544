//! Dynamic-programming pattern dispatch over node kinds.
//!
//! The rewrite algorithms (expansion, reduction, beta substitution) share
//! this machinery: a memoization map with in-progress markers (detecting
//! circular expansions), and a pattern table dispatched most-derived kind
//! first, falling back through the kind ancestry, with optional predicates
//! tried in declaration order.

use rustc_hash::FxHashMap;

use super::mop::{AsgGraph, NodeId};
use super::nodes::NodeKind;

/// State of one node's expansion inside an algorithm run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoEntry {
    /// Expansion has started but not finished; hitting this again means a
    /// circular dependency.
    InProgress,
    Done(NodeId),
}

/// The memoization map of one algorithm run.
#[derive(Debug, Default)]
pub struct DynProgMemo {
    entries: FxHashMap<NodeId, MemoEntry>,
}

impl DynProgMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, node: NodeId) -> Option<MemoEntry> {
        self.entries.get(&node).copied()
    }

    pub fn begin(&mut self, node: NodeId) {
        self.entries.insert(node, MemoEntry::InProgress);
    }

    pub fn finish(&mut self, node: NodeId, result: NodeId) {
        self.entries.insert(node, MemoEntry::Done(result));
    }

    /// Pre-set a result without running any pattern.
    pub fn set_value_for_node_expansion(&mut self, node: NodeId, result: NodeId) {
        self.finish(node, result);
    }
}

/// A guard deciding whether a pattern applies to a matched node.
pub type PatternPredicate = fn(&AsgGraph, NodeId) -> bool;

/// One registered pattern: a kind (possibly abstract), an optional
/// predicate, and the handler payload.
pub struct KindPattern<H> {
    pub kind: NodeKind,
    pub predicate: Option<PatternPredicate>,
    pub handler: H,
}

/// Walk the node's kind and its ancestors; for each kind, try the
/// registered patterns in declaration order and return the first whose
/// predicate accepts the node.
pub fn find_matching_pattern<'p, H>(
    patterns: &'p [KindPattern<H>],
    graph: &AsgGraph,
    node: NodeId,
) -> Option<&'p KindPattern<H>> {
    let mut kind = Some(graph.kind(node));
    while let Some(current) = kind {
        for pattern in patterns.iter().filter(|pattern| pattern.kind == current) {
            let accepts = match pattern.predicate {
                Some(predicate) => predicate(graph, node),
                None => true,
            };
            if accepts {
                return Some(pattern);
            }
        }
        kind = current.parent();
    }
    None
}
