//! Global code motion: region ordering, classification, pinning and
//! serialization properties.

use smalt::asg::{Arg, AsgGraph, Derivation, NodeId, NodeKind};
use smalt::parser::parse_source_string;
use smalt::schedule::{ScheduledInstructions, schedule_block, schedule_top_level_script};
use smalt::semantic::{TopLevelEnv, expand_and_analyze, make_script_analysis_environment};
use smalt::syntax::lower_parse_tree;

fn schedule_script(text: &str) -> (AsgGraph, ScheduledInstructions) {
    let (_, tree) = parse_source_string(text, "<test>");
    let mut graph = AsgGraph::new();
    let root = lower_parse_tree(&mut graph, &tree);
    let top_level = TopLevelEnv::new(&mut graph);
    let environment = make_script_analysis_environment(top_level, "<test>");
    let analysis = expand_and_analyze(&mut graph, environment, root);
    assert!(analysis.errors.is_empty());
    let scheduled = schedule_top_level_script(&graph, analysis.root);
    (graph, scheduled)
}

/// Every sequencing dependency of a region appears earlier in the
/// serialized stream.
fn assert_regions_in_topological_order(graph: &AsgGraph, scheduled: &ScheduledInstructions) {
    let serialized = &scheduled.serialized_instructions;
    for (index, instruction) in serialized.iter().enumerate() {
        if !graph.is_sequencing(*instruction) {
            continue;
        }
        for dependency in graph.sequencing_dependencies(*instruction) {
            let dependency_index = serialized
                .iter()
                .position(|candidate| *candidate == dependency)
                .expect("sequencing dependencies are serialized");
            assert!(
                dependency_index < index,
                "region dependency serialized after its user"
            );
        }
    }
}

/// Every data dependency of a serialized instruction appears earlier in
/// the flat program (constants and activation parameters count as earlier),
/// with the phi exception: a phi may read phi values serialized after it.
fn assert_body_respects_data_dependencies(graph: &AsgGraph, scheduled: &ScheduledInstructions) {
    let flat: Vec<NodeId> = scheduled.enumerate_for_interpretation().collect();
    let body_start = scheduled.constants.len() + scheduled.activation_parameters.len();
    for (index, instruction) in flat.iter().enumerate().skip(body_start) {
        if graph.kind(*instruction) == NodeKind::Phi {
            continue;
        }
        for dependency in graph.interpretation_dependencies(*instruction) {
            let dependency_index = flat
                .iter()
                .position(|candidate| *candidate == dependency)
                .expect("interpretation dependencies are part of the program");
            assert!(
                dependency_index < index,
                "data dependency serialized after its user"
            );
        }
    }
}

#[test]
fn test_schedule_of_straight_line_script() {
    let (graph, scheduled) = schedule_script("Stdio stdout print: 'hi'; nl");
    // entry, stdout send, print: send, nl send, return
    assert_eq!(scheduled.serialized_instructions.len(), 5);
    assert_eq!(
        graph.kind(scheduled.serialized_instructions[0]),
        NodeKind::SequenceEntry
    );
    assert_eq!(
        graph.kind(*scheduled.serialized_instructions.last().unwrap()),
        NodeKind::SequenceReturn
    );
    assert!(scheduled.activation_parameters.is_empty());
    // Stdio, the selectors and the string are pre-evaluated constants.
    assert!(scheduled.constants.len() >= 4);
    assert_regions_in_topological_order(&graph, &scheduled);
    assert_body_respects_data_dependencies(&graph, &scheduled);
}

#[test]
fn test_constants_are_partitioned_out_of_the_body() {
    let (graph, scheduled) = schedule_script("42");
    assert!(
        scheduled
            .constants
            .iter()
            .any(|constant| graph.kind(*constant) == NodeKind::LiteralInteger)
    );
    assert!(
        scheduled
            .serialized_instructions
            .iter()
            .all(|instruction| !graph.kind(*instruction).is_literal())
    );
}

#[test]
fn test_block_scheduling_uses_captures_then_arguments_as_activation() {
    let (_, tree) = parse_source_string("[:x | [:y | x + y]]", "<test>");
    let mut graph = AsgGraph::new();
    let root = lower_parse_tree(&mut graph, &tree);
    let top_level = TopLevelEnv::new(&mut graph);
    let environment = make_script_analysis_environment(top_level, "<test>");
    let analysis = expand_and_analyze(&mut graph, environment, root);
    assert!(analysis.errors.is_empty());

    // Dig out the inner block definition.
    let exit = graph
        .optional_input_attr(analysis.root, "exit_point")
        .unwrap();
    let outer_instance = graph.input_attr(exit, "value");
    let outer_definition = graph.input_attr(outer_instance, "definition");
    let outer_exit = graph
        .optional_input_attr(outer_definition, "exit_point")
        .unwrap();
    let inner_instance = graph.input_attr(outer_exit, "value");
    let inner_definition = graph.input_attr(inner_instance, "definition");

    let scheduled = schedule_block(&graph, inner_definition);
    assert_eq!(scheduled.activation_parameters.len(), 2);
    assert_eq!(
        graph.kind(scheduled.activation_parameters[0]),
        NodeKind::CapturedValue
    );
    assert_eq!(
        graph.kind(scheduled.activation_parameters[1]),
        NodeKind::Argument
    );
    assert_regions_in_topological_order(&graph, &scheduled);
    assert_body_respects_data_dependencies(&graph, &scheduled);
}

// ============================================================================
// A hand-built diamond: entry → branch → (true | false) → convergence with
// a phi merging the two arms.
// ============================================================================

struct Diamond {
    graph: AsgGraph,
    script: NodeId,
    branch: NodeId,
    true_entry: NodeId,
    true_end: NodeId,
    false_entry: NodeId,
    false_end: NodeId,
    convergence: NodeId,
    phi: NodeId,
    phi_values: [NodeId; 2],
}

fn build_diamond() -> Diamond {
    let mut graph = AsgGraph::new();
    let none = || Arg::derivation(Derivation::None);

    let entry = graph.construct(NodeKind::SequenceEntry, vec![none()]);
    let condition = graph.construct(NodeKind::LiteralTrue, vec![none()]);
    let one = graph.construct(NodeKind::LiteralInteger, vec![none(), Arg::int(1)]);
    let two = graph.construct(NodeKind::LiteralInteger, vec![none(), Arg::int(2)]);

    let true_entry = graph.construct(NodeKind::SequenceEntry, vec![none()]);
    let false_entry = graph.construct(NodeKind::SequenceEntry, vec![none()]);
    let branch = graph.construct(
        NodeKind::ConditionalBranch,
        vec![
            none(),
            Arg::node(condition),
            Arg::node(true_entry),
            Arg::node(false_entry),
            Arg::named_predecessor("predecessor", Some(entry)),
        ],
    );
    let true_end = graph.construct(
        NodeKind::SequenceBranchEnd,
        vec![
            none(),
            Arg::named_predecessor("predecessor", Some(true_entry)),
            Arg::named_predecessor("divergence", Some(branch)),
        ],
    );
    let false_end = graph.construct(
        NodeKind::SequenceBranchEnd,
        vec![
            none(),
            Arg::named_predecessor("predecessor", Some(false_entry)),
            Arg::named_predecessor("divergence", Some(branch)),
        ],
    );
    let convergence = graph.construct(
        NodeKind::SequenceConvergence,
        vec![
            none(),
            Arg::named_predecessor("divergence", Some(branch)),
            Arg::named_nodes("predecessors", vec![true_end, false_end]),
        ],
    );

    let true_value = graph.construct(
        NodeKind::PhiValue,
        vec![
            none(),
            Arg::node(one),
            Arg::named_predecessor("predecessor", Some(true_end)),
        ],
    );
    let false_value = graph.construct(
        NodeKind::PhiValue,
        vec![
            none(),
            Arg::node(two),
            Arg::named_predecessor("predecessor", Some(false_end)),
        ],
    );
    let phi = graph.construct(
        NodeKind::Phi,
        vec![
            none(),
            Arg::nodes(vec![true_value, false_value]),
            Arg::named_predecessor("predecessor", Some(convergence)),
        ],
    );
    let exit = graph.construct(
        NodeKind::SequenceReturn,
        vec![
            none(),
            Arg::node(phi),
            Arg::named_predecessor("predecessor", Some(convergence)),
        ],
    );
    let script = graph.construct(
        NodeKind::TopLevelScript,
        vec![
            none(),
            Arg::node(entry),
            Arg::named_predecessor("exit_point", Some(exit)),
        ],
    );

    Diamond {
        graph,
        script,
        branch,
        true_entry,
        true_end,
        false_entry,
        false_end,
        convergence,
        phi,
        phi_values: [true_value, false_value],
    }
}

#[test]
fn test_diamond_dominators() {
    let diamond = build_diamond();
    let graph = &diamond.graph;
    // Branch destinations have no direct immediate dominator of their own;
    // the scheduler assigns them the divergence node.
    assert_eq!(graph.direct_immediate_dominator(diamond.true_entry), None);
    assert_eq!(
        graph.direct_immediate_dominator(diamond.true_end),
        Some(diamond.true_entry)
    );
    // A convergence is dominated by its divergence point.
    assert_eq!(
        graph.direct_immediate_dominator(diamond.convergence),
        Some(diamond.branch)
    );
}

#[test]
fn test_diamond_serialization_pins_phi_machinery() {
    let diamond = build_diamond();
    let scheduled = schedule_top_level_script(&diamond.graph, diamond.script);
    let serialized = &scheduled.serialized_instructions;

    let position = |node: NodeId| {
        serialized
            .iter()
            .position(|candidate| *candidate == node)
            .expect("node is serialized")
    };

    // Phi values sit in the predecessor region their value arrives from:
    // directly after the branch-end region node they are pinned to.
    assert_eq!(position(diamond.phi_values[0]), position(diamond.true_end) + 1);
    assert_eq!(
        position(diamond.phi_values[1]),
        position(diamond.false_end) + 1
    );
    // The phi sits in the convergence region.
    assert_eq!(position(diamond.phi), position(diamond.convergence) + 1);

    assert_regions_in_topological_order(&diamond.graph, &scheduled);
}

#[test]
fn test_diamond_regions_serialize_in_topological_order() {
    let diamond = build_diamond();
    let scheduled = schedule_top_level_script(&diamond.graph, diamond.script);
    let serialized = &scheduled.serialized_instructions;

    let position = |node: NodeId| {
        serialized
            .iter()
            .position(|candidate| *candidate == node)
            .expect("node is serialized")
    };
    assert!(position(diamond.branch) < position(diamond.true_entry));
    assert!(position(diamond.branch) < position(diamond.false_entry));
    assert!(position(diamond.true_end) < position(diamond.convergence));
    assert!(position(diamond.false_end) < position(diamond.convergence));
}
