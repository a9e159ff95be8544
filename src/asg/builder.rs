//! Graph builder with global value numbering.
//!
//! The builder constructs analyzed-IR nodes, deduplicates pure-data nodes
//! through a unification table, and threads the *current sequencing
//! predecessor* so side-effecting nodes chain automatically. Builders form
//! a parent chain: child scopes (block analysis) get their own table and
//! predecessor but look up unification candidates through their parents.

use rustc_hash::FxHashMap;

use super::derivation::Derivation;
use super::mop::{Arg, AsgGraph, NodeId};
use super::nodes::NodeKind;

/// A unification table: structural hash → candidate canonical nodes.
#[derive(Debug, Default)]
pub struct GvnTable {
    buckets: FxHashMap<u64, Vec<NodeId>>,
}

impl GvnTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a node structurally equal to `candidate`.
    pub fn find(&self, graph: &AsgGraph, hash: u64, candidate: NodeId) -> Option<NodeId> {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&existing| graph.unification_equals(existing, candidate))
    }

    /// Install `candidate` as the canonical node for its structure.
    pub fn insert(&mut self, hash: u64, candidate: NodeId) {
        self.buckets.entry(hash).or_default().push(candidate);
    }

    /// Find-or-install in one step, returning the canonical node.
    pub fn unify(&mut self, graph: &AsgGraph, candidate: NodeId) -> NodeId {
        let hash = graph.unification_hash(candidate);
        match self.find(graph, hash, candidate) {
            Some(existing) => existing,
            None => {
                self.insert(hash, candidate);
                candidate
            }
        }
    }
}

/// Result of a build: either a freshly installed node, or the canonical
/// node an equal structure unified with (the unification-derivation marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Built {
    New(NodeId),
    Unified { canonical: NodeId, original: NodeId },
}

impl Built {
    pub fn node(self) -> NodeId {
        match self {
            Built::New(id) => id,
            Built::Unified { canonical, .. } => canonical,
        }
    }

    pub fn is_unified(self) -> bool {
        matches!(self, Built::Unified { .. })
    }
}

/// Handle of one builder scope.
pub type BuilderId = usize;

#[derive(Debug)]
struct BuilderFrame {
    parent: Option<BuilderId>,
    table: GvnTable,
    current_predecessor: Option<NodeId>,
}

/// The builder scope arena. Scopes are cheap; child scopes stay allocated
/// for the lifetime of a compilation so parent chains remain valid.
#[derive(Debug)]
pub struct GvnBuilder {
    frames: Vec<BuilderFrame>,
}

impl GvnBuilder {
    /// Create the builder with a root scope (builder id 0).
    pub fn new() -> Self {
        Self {
            frames: vec![BuilderFrame {
                parent: None,
                table: GvnTable::new(),
                current_predecessor: None,
            }],
        }
    }

    pub const ROOT: BuilderId = 0;

    /// Open a child scope chained to `parent` for unification lookups.
    pub fn push_child(&mut self, parent: BuilderId) -> BuilderId {
        let id = self.frames.len();
        self.frames.push(BuilderFrame {
            parent: Some(parent),
            table: GvnTable::new(),
            current_predecessor: None,
        });
        id
    }

    // =========================================================================
    // Current predecessor threading
    // =========================================================================

    pub fn current_predecessor(&self, builder: BuilderId) -> Option<NodeId> {
        self.frames[builder].current_predecessor
    }

    pub fn set_current_predecessor(&mut self, builder: BuilderId, predecessor: Option<NodeId>) {
        self.frames[builder].current_predecessor = predecessor;
    }

    /// Snapshot the current-predecessor pointer.
    pub fn memento(&self, builder: BuilderId) -> Option<NodeId> {
        self.frames[builder].current_predecessor
    }

    /// Roll the current-predecessor pointer back to a snapshot.
    pub fn restore_memento(&mut self, builder: BuilderId, memento: Option<NodeId>) {
        self.frames[builder].current_predecessor = memento;
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Construct a node; deduplicate it when pure data, and advance the
    /// current predecessor when it sequences.
    pub fn build(
        &mut self,
        graph: &mut AsgGraph,
        builder: BuilderId,
        kind: NodeKind,
        args: Vec<Arg>,
    ) -> Built {
        let candidate = graph.construct(kind, args);
        let built = self.unify_with_previous_built_node(graph, builder, candidate);
        self.update_predecessor_with(graph, builder, built.node());
        built
    }

    /// Variant attaching a syntax-expansion derivation for diagnostics.
    pub fn for_syntax_expansion_build(
        &mut self,
        graph: &mut AsgGraph,
        builder: BuilderId,
        syntax_node: NodeId,
        kind: NodeKind,
        mut args: Vec<Arg>,
    ) -> Built {
        args.insert(
            0,
            Arg::derivation(Derivation::SyntaxExpansion {
                source: syntax_node,
            }),
        );
        self.build(graph, builder, kind, args)
    }

    /// Same, and also advances the predecessor; `build` already sequences,
    /// so this is an alias kept for call-site symmetry with pure builds.
    pub fn for_syntax_expansion_build_and_sequence(
        &mut self,
        graph: &mut AsgGraph,
        builder: BuilderId,
        syntax_node: NodeId,
        kind: NodeKind,
        args: Vec<Arg>,
    ) -> Built {
        let built = self.for_syntax_expansion_build(graph, builder, syntax_node, kind, args);
        self.update_predecessor_with(graph, builder, built.node());
        built
    }

    /// GVN the node: pure-data nodes unify against this scope's table and
    /// its parents; sequencing and stateful nodes are never deduplicated.
    pub fn unify_with_previous_built_node(
        &mut self,
        graph: &AsgGraph,
        builder: BuilderId,
        candidate: NodeId,
    ) -> Built {
        if !graph.is_pure_data(candidate) {
            return Built::New(candidate);
        }

        let hash = graph.unification_hash(candidate);
        if let Some(canonical) = self.unify_in_chain(graph, builder, hash, candidate) {
            return Built::Unified {
                canonical,
                original: candidate,
            };
        }
        self.frames[builder].table.insert(hash, candidate);
        Built::New(candidate)
    }

    fn unify_in_chain(
        &self,
        graph: &AsgGraph,
        builder: BuilderId,
        hash: u64,
        candidate: NodeId,
    ) -> Option<NodeId> {
        let mut current = Some(builder);
        while let Some(frame_id) = current {
            let frame = &self.frames[frame_id];
            if let Some(found) = frame.table.find(graph, hash, candidate) {
                if found != candidate {
                    return Some(found);
                }
                return None;
            }
            current = frame.parent;
        }
        None
    }

    fn update_predecessor_with(&mut self, graph: &AsgGraph, builder: BuilderId, node: NodeId) {
        if graph.is_sequencing(node) {
            self.frames[builder].current_predecessor = Some(node);
        }
    }
}

impl Default for GvnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asg::mop::Arg;

    fn build_int(
        builder: &mut GvnBuilder,
        graph: &mut AsgGraph,
        scope: BuilderId,
        value: i64,
    ) -> Built {
        builder.build(
            graph,
            scope,
            NodeKind::LiteralInteger,
            vec![Arg::derivation(Derivation::None), Arg::int(value)],
        )
    }

    #[test]
    fn test_gvn_returns_same_identity_for_equal_structure() {
        let mut graph = AsgGraph::new();
        let mut builder = GvnBuilder::new();
        let a = build_int(&mut builder, &mut graph, GvnBuilder::ROOT, 42);
        let b = build_int(&mut builder, &mut graph, GvnBuilder::ROOT, 42);
        assert!(matches!(a, Built::New(_)));
        assert!(b.is_unified());
        assert_eq!(a.node(), b.node());
    }

    #[test]
    fn test_gvn_distinguishes_different_structure() {
        let mut graph = AsgGraph::new();
        let mut builder = GvnBuilder::new();
        let a = build_int(&mut builder, &mut graph, GvnBuilder::ROOT, 1);
        let b = build_int(&mut builder, &mut graph, GvnBuilder::ROOT, 2);
        assert_ne!(a.node(), b.node());
    }

    #[test]
    fn test_child_scope_unifies_through_parent() {
        let mut graph = AsgGraph::new();
        let mut builder = GvnBuilder::new();
        let parent_node = build_int(&mut builder, &mut graph, GvnBuilder::ROOT, 7).node();
        let child = builder.push_child(GvnBuilder::ROOT);
        let child_node = build_int(&mut builder, &mut graph, child, 7);
        assert!(child_node.is_unified());
        assert_eq!(child_node.node(), parent_node);
    }

    #[test]
    fn test_sibling_scopes_do_not_share_tables() {
        let mut graph = AsgGraph::new();
        let mut builder = GvnBuilder::new();
        let left = builder.push_child(GvnBuilder::ROOT);
        let right = builder.push_child(GvnBuilder::ROOT);
        let a = build_int(&mut builder, &mut graph, left, 9).node();
        let b = build_int(&mut builder, &mut graph, right, 9).node();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sequencing_nodes_are_not_deduplicated_and_advance_predecessor() {
        let mut graph = AsgGraph::new();
        let mut builder = GvnBuilder::new();
        let entry_a = builder
            .build(
                &mut graph,
                GvnBuilder::ROOT,
                NodeKind::SequenceEntry,
                vec![Arg::derivation(Derivation::None)],
            )
            .node();
        assert_eq!(
            builder.current_predecessor(GvnBuilder::ROOT),
            Some(entry_a)
        );
        let entry_b = builder
            .build(
                &mut graph,
                GvnBuilder::ROOT,
                NodeKind::SequenceEntry,
                vec![Arg::derivation(Derivation::None)],
            )
            .node();
        assert_ne!(entry_a, entry_b);
        assert_eq!(
            builder.current_predecessor(GvnBuilder::ROOT),
            Some(entry_b)
        );
    }

    #[test]
    fn test_memento_rolls_back_speculative_sequencing() {
        let mut graph = AsgGraph::new();
        let mut builder = GvnBuilder::new();
        let entry = builder
            .build(
                &mut graph,
                GvnBuilder::ROOT,
                NodeKind::SequenceEntry,
                vec![Arg::derivation(Derivation::None)],
            )
            .node();
        let memento = builder.memento(GvnBuilder::ROOT);
        builder.build(
            &mut graph,
            GvnBuilder::ROOT,
            NodeKind::SequenceEntry,
            vec![Arg::derivation(Derivation::None)],
        );
        assert_ne!(builder.current_predecessor(GvnBuilder::ROOT), Some(entry));
        builder.restore_memento(GvnBuilder::ROOT, memento);
        assert_eq!(builder.current_predecessor(GvnBuilder::ROOT), Some(entry));
    }
}
