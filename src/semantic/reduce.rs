//! Constant reduction and beta substitution.
//!
//! Reduction rewrites literal primitive applications through the
//! primitive's compile-time implementation; every expansion result passes
//! through it, so folding happens as the analyzed graph is built. Beta
//! substitution rewrites a subgraph under an old→new node map and is the
//! basis for inlining: nodes whose beta-replaceable dependency set is
//! disjoint from the substitution pass through untouched.

use rustc_hash::FxHashMap;

use crate::asg::{
    Arg, AsgGraph, AttrValue, DataValue, Derivation, DynProgMemo, KindPattern, MemoEntry, NodeId,
    NodeKind, find_matching_pattern,
};

// ============================================================================
// REDUCTION
// ============================================================================

/// A literal primitive application is reducible when the primitive is
/// always-inline, or pure and compile-time with all-literal arguments.
pub fn is_reducible_literal_application(graph: &AsgGraph, node: NodeId) -> bool {
    if graph.kind(node) != NodeKind::Application {
        return false;
    }
    let functional = graph.input_attr(node, "functional");
    if graph.kind(functional) != NodeKind::LiteralPrimitiveFunction {
        return false;
    }
    if graph.bool_attr(functional, "always_inline") {
        return true;
    }
    graph.bool_attr(functional, "pure")
        && graph.bool_attr(functional, "compile_time")
        && graph
            .inputs_attr(node, "arguments")
            .iter()
            .all(|argument| graph.kind(*argument).is_literal())
}

type ReduceHandler = fn(&mut ReductionAlgorithm, &mut AsgGraph, NodeId) -> NodeId;

static REDUCTION_PATTERNS: &[KindPattern<ReduceHandler>] = &[
    KindPattern {
        kind: NodeKind::Application,
        predicate: Some(is_reducible_literal_application),
        handler: ReductionAlgorithm::reduce_literal_application,
    },
    KindPattern {
        kind: NodeKind::Any,
        predicate: None,
        handler: ReductionAlgorithm::reduce_generic_node,
    },
];

/// The dynamic-programming reduction pass. Running it twice over the same
/// graph reaches a fixpoint after the first run: reduced nodes memoize to
/// themselves.
#[derive(Default)]
pub struct ReductionAlgorithm {
    memo: DynProgMemo,
}

impl ReductionAlgorithm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reduce_node(&mut self, graph: &mut AsgGraph, node: NodeId) -> NodeId {
        match self.memo.lookup(node) {
            Some(MemoEntry::Done(result)) => return result,
            // The graph is acyclic; an in-progress hit can only come from a
            // self-referential rewrite, which reduces to itself.
            Some(MemoEntry::InProgress) => return node,
            None => {}
        }

        self.memo.begin(node);
        let pattern = find_matching_pattern(REDUCTION_PATTERNS, graph, node)
            .expect("the generic pattern matches every node");
        let handler = pattern.handler;
        let result = handler(self, graph, node);
        self.memo.finish(node, result);
        result
    }

    fn reduce_literal_application(&mut self, graph: &mut AsgGraph, node: NodeId) -> NodeId {
        let functional = graph.input_attr(node, "functional");
        let arguments = graph.inputs_attr(node, "arguments").to_vec();
        let reduced: Vec<NodeId> = arguments
            .into_iter()
            .map(|argument| self.reduce_node(graph, argument))
            .collect();

        let implementation = match graph.data_attr(functional, "compile_time_implementation") {
            DataValue::CompileImpl(Some(implementation)) => *implementation,
            _ => return node,
        };
        tracing::trace!(
            primitive = %graph.str_attr(functional, "name"),
            "reducing literal primitive application"
        );
        let folded = implementation(graph, Derivation::Reduction { source: node }, &reduced);
        self.reduce_node(graph, folded)
    }

    fn reduce_generic_node(&mut self, graph: &mut AsgGraph, node: NodeId) -> NodeId {
        let attributes = graph.construction_attributes(node).to_vec();
        let mut reduced_attributes = Vec::with_capacity(attributes.len());
        let mut has_reduced_attribute = false;
        for attribute in attributes {
            let reduced = self.reduce_attribute(graph, &attribute);
            has_reduced_attribute = has_reduced_attribute || reduced != attribute;
            reduced_attributes.push(reduced);
        }

        if !has_reduced_attribute {
            return node;
        }
        let kind = graph.kind(node);
        let rebuilt = graph.construct(
            kind,
            reduced_attributes.into_iter().map(Arg::Pos).collect(),
        );
        self.reduce_node(graph, rebuilt)
    }

    fn reduce_attribute(&mut self, graph: &mut AsgGraph, attribute: &AttrValue) -> AttrValue {
        match attribute {
            AttrValue::Node(id) => AttrValue::Node(self.reduce_node(graph, *id)),
            AttrValue::OptionalNode(Some(id)) => {
                AttrValue::OptionalNode(Some(self.reduce_node(graph, *id)))
            }
            AttrValue::Nodes(ids) => AttrValue::Nodes(
                ids.iter()
                    .map(|id| self.reduce_node(graph, *id))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

// ============================================================================
// BETA SUBSTITUTION
// ============================================================================

/// An old→new substitution map over beta-replaceable nodes.
#[derive(Debug, Default)]
pub struct BetaSubstitutionContext {
    table: FxHashMap<NodeId, NodeId>,
}

impl BetaSubstitutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_substitution_for_node(&mut self, old_node: NodeId, replacement: NodeId) {
        self.table.insert(old_node, replacement);
    }

    pub fn substitution_for(&self, node: NodeId) -> NodeId {
        self.table.get(&node).copied().unwrap_or(node)
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn includes_node(&self, node: NodeId) -> bool {
        self.table.contains_key(&node)
    }

    pub fn includes_any_of(&self, mut nodes: impl Iterator<Item = NodeId>) -> bool {
        nodes.any(|node| self.includes_node(node))
    }
}

type BetaHandler = fn(&mut BetaSubstitutionAlgorithm<'_>, &mut AsgGraph, NodeId) -> NodeId;

static BETA_PATTERNS: &[KindPattern<BetaHandler>] = &[
    KindPattern {
        kind: NodeKind::BetaReplaceable,
        predicate: None,
        handler: |algorithm, graph, node| algorithm.expand_beta_replaceable_node(graph, node),
    },
    KindPattern {
        kind: NodeKind::Any,
        predicate: None,
        handler: |algorithm, graph, node| algorithm.expand_generic_node(graph, node),
    },
];

/// Rewrites a graph under a substitution map, leaving untouched every node
/// whose beta-replaceable dependency set is disjoint from the map.
pub struct BetaSubstitutionAlgorithm<'c> {
    context: &'c BetaSubstitutionContext,
    memo: DynProgMemo,
}

impl<'c> BetaSubstitutionAlgorithm<'c> {
    pub fn new(context: &'c BetaSubstitutionContext) -> Self {
        Self {
            context,
            memo: DynProgMemo::new(),
        }
    }

    pub fn expand_node(&mut self, graph: &mut AsgGraph, node: NodeId) -> NodeId {
        if self.context.is_empty() {
            return node;
        }
        if self.context.includes_node(node) {
            return self.context.substitution_for(node);
        }
        let dependencies = graph.beta_replaceable_dependencies(node);
        if !self
            .context
            .includes_any_of(dependencies.iter().copied())
        {
            return node;
        }
        self.run(graph, node)
    }

    fn run(&mut self, graph: &mut AsgGraph, node: NodeId) -> NodeId {
        match self.memo.lookup(node) {
            Some(MemoEntry::Done(result)) => return result,
            Some(MemoEntry::InProgress) => return node,
            None => {}
        }

        self.memo.begin(node);
        let pattern = find_matching_pattern(BETA_PATTERNS, graph, node)
            .expect("the generic pattern matches every node");
        let handler = pattern.handler;
        let result = handler(self, graph, node);
        self.memo.finish(node, result);
        result
    }

    fn expand_beta_replaceable_node(&mut self, graph: &mut AsgGraph, node: NodeId) -> NodeId {
        if self.context.includes_node(node) {
            self.context.substitution_for(node)
        } else {
            self.expand_generic_node(graph, node)
        }
    }

    fn expand_generic_node(&mut self, graph: &mut AsgGraph, node: NodeId) -> NodeId {
        let attributes = graph.construction_attributes(node).to_vec();
        let expanded: Vec<Arg> = attributes
            .iter()
            .map(|attribute| Arg::Pos(self.expand_attribute(graph, attribute)))
            .collect();
        let kind = graph.kind(node);
        graph.construct(kind, expanded)
    }

    fn expand_attribute(&mut self, graph: &mut AsgGraph, attribute: &AttrValue) -> AttrValue {
        match attribute {
            AttrValue::Node(id) => AttrValue::Node(self.expand_node(graph, *id)),
            AttrValue::OptionalNode(Some(id)) => {
                AttrValue::OptionalNode(Some(self.expand_node(graph, *id)))
            }
            AttrValue::Nodes(ids) => AttrValue::Nodes(
                ids.iter()
                    .map(|id| self.expand_node(graph, *id))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asg::Derivation;

    fn literal_int(graph: &mut AsgGraph, value: i64) -> NodeId {
        graph.construct(
            NodeKind::LiteralInteger,
            vec![Arg::derivation(Derivation::None), Arg::int(value)],
        )
    }

    fn argument(graph: &mut AsgGraph, index: i64) -> NodeId {
        graph.construct(
            NodeKind::Argument,
            vec![Arg::derivation(Derivation::None), Arg::int(index)],
        )
    }

    fn double_literal(graph: &mut AsgGraph, derivation: Derivation, args: &[NodeId]) -> NodeId {
        let value = graph.int_attr(args[0], "value");
        graph.construct(
            NodeKind::LiteralInteger,
            vec![Arg::derivation(derivation), Arg::int(value * 2)],
        )
    }

    fn pure_primitive(graph: &mut AsgGraph) -> NodeId {
        graph.construct(
            NodeKind::LiteralPrimitiveFunction,
            vec![
                Arg::derivation(Derivation::None),
                Arg::str("double:"),
                Arg::data(crate::asg::DataValue::CompileImpl(Some(double_literal))),
                Arg::data(crate::asg::DataValue::Bool(true)),
                Arg::data(crate::asg::DataValue::Bool(true)),
                Arg::data(crate::asg::DataValue::Bool(false)),
            ],
        )
    }

    #[test]
    fn test_reduction_folds_literal_primitive_applications() {
        let mut graph = AsgGraph::new();
        let primitive = pure_primitive(&mut graph);
        let three = literal_int(&mut graph, 3);
        let application = graph.construct(
            NodeKind::Application,
            vec![
                Arg::derivation(Derivation::None),
                Arg::node(primitive),
                Arg::nodes(vec![three]),
            ],
        );
        assert!(is_reducible_literal_application(&graph, application));

        let mut reduction = ReductionAlgorithm::new();
        let folded = reduction.reduce_node(&mut graph, application);
        assert_eq!(graph.kind(folded), NodeKind::LiteralInteger);
        assert_eq!(graph.int_attr(folded, "value"), 6);
    }

    #[test]
    fn test_reduction_reaches_a_fixpoint() {
        let mut graph = AsgGraph::new();
        let primitive = pure_primitive(&mut graph);
        let three = literal_int(&mut graph, 3);
        let application = graph.construct(
            NodeKind::Application,
            vec![
                Arg::derivation(Derivation::None),
                Arg::node(primitive),
                Arg::nodes(vec![three]),
            ],
        );

        let mut reduction = ReductionAlgorithm::new();
        let first = reduction.reduce_node(&mut graph, application);
        let second = reduction.reduce_node(&mut graph, application);
        assert_eq!(first, second);
        // The folded node reduces to itself.
        assert_eq!(reduction.reduce_node(&mut graph, first), first);
    }

    #[test]
    fn test_application_with_non_literal_argument_is_not_reducible() {
        let mut graph = AsgGraph::new();
        let primitive = pure_primitive(&mut graph);
        let arg = argument(&mut graph, 0);
        let application = graph.construct(
            NodeKind::Application,
            vec![
                Arg::derivation(Derivation::None),
                Arg::node(primitive),
                Arg::nodes(vec![arg]),
            ],
        );
        assert!(!is_reducible_literal_application(&graph, application));
        let mut reduction = ReductionAlgorithm::new();
        assert_eq!(reduction.reduce_node(&mut graph, application), application);
    }

    #[test]
    fn test_beta_substitution_replaces_mapped_nodes() {
        let mut graph = AsgGraph::new();
        let arg = argument(&mut graph, 0);
        let replacement = literal_int(&mut graph, 42);

        let mut context = BetaSubstitutionContext::new();
        context.set_substitution_for_node(arg, replacement);
        let mut algorithm = BetaSubstitutionAlgorithm::new(&context);
        assert_eq!(algorithm.expand_node(&mut graph, arg), replacement);
    }

    #[test]
    fn test_beta_substitution_rewrites_dependent_subgraphs() {
        let mut graph = AsgGraph::new();
        let arg = argument(&mut graph, 0);
        let array = graph.construct(
            NodeKind::Array,
            vec![Arg::derivation(Derivation::None), Arg::nodes(vec![arg])],
        );
        let replacement = literal_int(&mut graph, 1);

        let mut context = BetaSubstitutionContext::new();
        context.set_substitution_for_node(arg, replacement);
        let mut algorithm = BetaSubstitutionAlgorithm::new(&context);
        let rewritten = algorithm.expand_node(&mut graph, array);
        assert_ne!(rewritten, array);
        assert_eq!(graph.inputs_attr(rewritten, "elements"), &[replacement]);
    }

    #[test]
    fn test_beta_substitution_leaves_unrelated_nodes_alone() {
        let mut graph = AsgGraph::new();
        let arg = argument(&mut graph, 0);
        let other_arg = argument(&mut graph, 1);
        let literal = literal_int(&mut graph, 5);
        let array = graph.construct(
            NodeKind::Array,
            vec![
                Arg::derivation(Derivation::None),
                Arg::nodes(vec![literal]),
            ],
        );
        let replacement = literal_int(&mut graph, 9);

        let mut context = BetaSubstitutionContext::new();
        context.set_substitution_for_node(arg, replacement);
        let mut algorithm = BetaSubstitutionAlgorithm::new(&context);
        // No beta-replaceable inputs at all: identity.
        assert_eq!(algorithm.expand_node(&mut graph, array), array);
        // Beta-replaceable but unmentioned by the substitution: identity.
        assert_eq!(algorithm.expand_node(&mut graph, other_arg), other_arg);
    }

    #[test]
    fn test_empty_substitution_is_identity() {
        let mut graph = AsgGraph::new();
        let arg = argument(&mut graph, 0);
        let context = BetaSubstitutionContext::new();
        let mut algorithm = BetaSubstitutionAlgorithm::new(&context);
        assert_eq!(algorithm.expand_node(&mut graph, arg), arg);
    }
}
