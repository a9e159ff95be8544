//! Expansion and analysis behavior over the graph IR.

use smalt::asg::{Arg, AsgGraph, Derivation, NodeId, NodeKind};
use smalt::parser::parse_source_string;
use smalt::semantic::{
    AnalysisResult, TopLevelEnv, expand_and_analyze, make_script_analysis_environment,
};
use smalt::syntax::lower_parse_tree;

fn analyze(text: &str) -> (AsgGraph, AnalysisResult) {
    let (_, tree) = parse_source_string(text, "<test>");
    let mut graph = AsgGraph::new();
    let root = lower_parse_tree(&mut graph, &tree);
    let top_level = TopLevelEnv::new(&mut graph);
    let environment = make_script_analysis_environment(top_level, "<test>");
    let result = expand_and_analyze(&mut graph, environment, root);
    (graph, result)
}

fn analyze_ok(text: &str) -> (AsgGraph, NodeId) {
    let (graph, result) = analyze(text);
    assert!(
        result.errors.is_empty(),
        "unexpected analysis errors: {:?}",
        result
            .errors
            .iter()
            .map(|error| graph.str_attr(*error, "message").to_string())
            .collect::<Vec<_>>()
    );
    (graph, result.root)
}

/// The value returned by the script's exit point.
fn script_result(graph: &AsgGraph, root: NodeId) -> NodeId {
    assert_eq!(graph.kind(root), NodeKind::TopLevelScript);
    let exit = graph.optional_input_attr(root, "exit_point").unwrap();
    assert_eq!(graph.kind(exit), NodeKind::SequenceReturn);
    graph.input_attr(exit, "value")
}

#[test]
fn test_literal_script_analyzes_to_literal() {
    let (graph, root) = analyze_ok("42");
    let result = script_result(&graph, root);
    assert_eq!(graph.kind(result), NodeKind::LiteralInteger);
    assert_eq!(graph.int_attr(result, "value"), 42);
}

#[test]
fn test_empty_script_analyzes_to_nil() {
    let (graph, root) = analyze_ok("");
    assert_eq!(graph.kind(script_result(&graph, root)), NodeKind::LiteralNil);
}

#[test]
fn test_repeated_symbols_unify_to_one_node() {
    let (graph, root) = analyze_ok("{#'+'. #'+'}");
    let array = script_result(&graph, root);
    assert_eq!(graph.kind(array), NodeKind::MutableArray);
    let elements = graph.inputs_attr(array, "elements");
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0], elements[1]);
    assert_eq!(graph.kind(elements[0]), NodeKind::LiteralSymbol);
}

#[test]
fn test_binary_sequence_is_a_left_associative_send_chain() {
    let (graph, root) = analyze_ok("1 + 2 * 4");
    let outer = script_result(&graph, root);
    assert_eq!(graph.kind(outer), NodeKind::FxMessageSend);
    let outer_selector = graph.input_attr(outer, "selector");
    assert_eq!(graph.str_attr(outer_selector, "value"), "*");

    let inner = graph.input_attr(outer, "receiver");
    assert_eq!(graph.kind(inner), NodeKind::FxMessageSend);
    let inner_selector = graph.input_attr(inner, "selector");
    assert_eq!(graph.str_attr(inner_selector, "value"), "+");
}

#[test]
fn test_receiverful_sends_thread_the_sequencing_spine() {
    let (graph, root) = analyze_ok("1 printString. 2 printString");
    let last = script_result(&graph, root);
    assert_eq!(graph.kind(last), NodeKind::FxMessageSend);
    let previous = graph.optional_input_attr(last, "predecessor").unwrap();
    assert_eq!(graph.kind(previous), NodeKind::FxMessageSend);
    let entry = graph.optional_input_attr(previous, "predecessor").unwrap();
    assert_eq!(graph.kind(entry), NodeKind::SequenceEntry);
}

#[test]
fn test_pure_primitive_application_constant_folds_during_analysis() {
    let (graph, root) = analyze_ok("integerAdd: 20 with: 22");
    let result = script_result(&graph, root);
    assert_eq!(graph.kind(result), NodeKind::LiteralInteger);
    assert_eq!(graph.int_attr(result, "value"), 42);
}

#[test]
fn test_always_inline_primitive_reduces_to_its_argument() {
    let (graph, root) = analyze_ok("identity: 7");
    let result = script_result(&graph, root);
    assert_eq!(graph.kind(result), NodeKind::LiteralInteger);
    assert_eq!(graph.int_attr(result, "value"), 7);
}

#[test]
fn test_effectful_primitive_application_stays_on_the_spine() {
    let (graph, root) = analyze_ok("error: 'boom'");
    let result = script_result(&graph, root);
    assert_eq!(graph.kind(result), NodeKind::FxApplication);
}

#[test]
fn test_unresolved_identifier_accumulates_and_does_not_abort() {
    let (graph, result) = analyze("undefinedThing. 42");
    assert_eq!(result.errors.len(), 1);
    let message = graph.str_attr(result.errors[0], "message");
    assert!(message.contains("undefinedThing"));
    // The pass still completes and the script returns the last value.
    let value = script_result(&graph, result.root);
    assert_eq!(graph.kind(value), NodeKind::LiteralInteger);
}

#[test]
fn test_error_nodes_carry_source_positions() {
    let (graph, result) = analyze("undefinedThing");
    let position = graph.position_of(result.errors[0]);
    assert!(!position.is_empty());
    assert_eq!(position.text(), "undefinedThing");
}

#[test]
fn test_receiverless_send_resolves_its_selector_as_an_identifier() {
    // `foo:` has no binding, which surfaces as an unresolved identifier.
    let (graph, result) = analyze("foo: 1");
    assert!(!result.errors.is_empty());
    let message = graph.str_attr(result.errors[0], "message");
    assert!(message.contains("foo:"));
}

#[test]
fn test_block_analysis_produces_definition_and_instance() {
    let (graph, root) = analyze_ok("[:x | x + 1]");
    let instance = script_result(&graph, root);
    assert_eq!(graph.kind(instance), NodeKind::BlockInstance);
    assert!(graph.inputs_attr(instance, "captured_values").is_empty());

    let definition = graph.input_attr(instance, "definition");
    assert_eq!(graph.kind(definition), NodeKind::BlockDefinition);
    let arguments = graph.inputs_attr(definition, "arguments");
    assert_eq!(arguments.len(), 1);
    assert_eq!(graph.kind(arguments[0]), NodeKind::Argument);
    assert!(graph.inputs_attr(definition, "captures").is_empty());

    let entry = graph.input_attr(definition, "entry_point");
    assert_eq!(graph.kind(entry), NodeKind::SequenceEntry);
    let exit = graph.optional_input_attr(definition, "exit_point").unwrap();
    assert_eq!(graph.kind(exit), NodeKind::SequenceReturn);
}

#[test]
fn test_block_with_empty_body_returns_nil() {
    let (graph, root) = analyze_ok("[]");
    let instance = script_result(&graph, root);
    let definition = graph.input_attr(instance, "definition");
    let exit = graph.optional_input_attr(definition, "exit_point").unwrap();
    let body = graph.input_attr(exit, "value");
    assert_eq!(graph.kind(body), NodeKind::LiteralNil);
}

#[test]
fn test_nested_block_captures_the_outer_argument() {
    let (graph, root) = analyze_ok("[:x | [:y | x + y]]");
    let outer_instance = script_result(&graph, root);
    let outer_definition = graph.input_attr(outer_instance, "definition");
    let outer_exit = graph
        .optional_input_attr(outer_definition, "exit_point")
        .unwrap();
    let inner_instance = graph.input_attr(outer_exit, "value");
    assert_eq!(graph.kind(inner_instance), NodeKind::BlockInstance);

    // The inner instance closes over the outer block's argument.
    let captured = graph.inputs_attr(inner_instance, "captured_values");
    assert_eq!(captured.len(), 1);
    assert_eq!(graph.kind(captured[0]), NodeKind::Argument);

    // Inside the inner definition, the capture is a CapturedValue binding.
    let inner_definition = graph.input_attr(inner_instance, "definition");
    let captures = graph.inputs_attr(inner_definition, "captures");
    assert_eq!(captures.len(), 1);
    assert_eq!(graph.kind(captures[0]), NodeKind::CapturedValue);
}

#[test]
fn test_assignment_rebinds_for_the_rest_of_the_scope() {
    let (graph, root) = analyze_ok("| a | a := 5. a");
    let result = script_result(&graph, root);
    assert_eq!(graph.kind(result), NodeKind::LiteralInteger);
    assert_eq!(graph.int_attr(result, "value"), 5);
}

#[test]
fn test_unassigned_local_reads_nil() {
    let (graph, root) = analyze_ok("| a | a");
    assert_eq!(graph.kind(script_result(&graph, root)), NodeKind::LiteralNil);
}

#[test]
fn test_assignment_to_non_identifier_is_an_error() {
    let (graph, result) = analyze("3 := 4");
    assert_eq!(result.errors.len(), 1);
    let message = graph.str_attr(result.errors[0], "message");
    assert!(message.contains("identifier"));
}

#[test]
fn test_cascade_evaluates_receiver_once() {
    let (graph, root) = analyze_ok("Stdio stdout print: 'hi'; nl");
    let last = script_result(&graph, root);
    assert_eq!(graph.kind(last), NodeKind::FxMessageSend);
    let nl_selector = graph.input_attr(last, "selector");
    assert_eq!(graph.str_attr(nl_selector, "value"), "nl");

    // Both cascaded messages share the same receiver node.
    let print_send = graph.optional_input_attr(last, "predecessor").unwrap();
    assert_eq!(graph.kind(print_send), NodeKind::FxMessageSend);
    assert_eq!(
        graph.input_attr(last, "receiver"),
        graph.input_attr(print_send, "receiver")
    );
}

#[test]
fn test_literal_array_is_constant_data() {
    let (graph, root) = analyze_ok("#(1 2 3)");
    let array = script_result(&graph, root);
    assert_eq!(graph.kind(array), NodeKind::Array);
    assert!(graph.is_constant_data_node(array));
}

#[test]
fn test_dynamic_array_is_stateful_and_not_unified() {
    let (graph, root) = analyze_ok("{{1}. {1}}");
    let outer = script_result(&graph, root);
    let elements = graph.inputs_attr(outer, "elements");
    assert_eq!(elements.len(), 2);
    // Mutable arrays have identity; equal structure must not unify.
    assert_ne!(elements[0], elements[1]);
}

#[test]
fn test_expansion_is_idempotent_up_to_unification() {
    let (_, tree) = parse_source_string("1 + 2. #sym. [:x | x]", "<test>");
    let mut graph = AsgGraph::new();
    let root = lower_parse_tree(&mut graph, &tree);
    let top_level = TopLevelEnv::new(&mut graph);

    let environment_a = make_script_analysis_environment(top_level.clone(), "<test>");
    let first = expand_and_analyze(&mut graph, environment_a, root);
    let environment_b = make_script_analysis_environment(top_level, "<test>");
    let second = expand_and_analyze(&mut graph, environment_b, root);

    assert!(first.errors.is_empty());
    assert!(second.errors.is_empty());
    assert!(graph.unification_equals(first.root, second.root));
}

#[test]
fn test_single_term_binary_sequence_reduces_to_the_term() {
    let mut graph = AsgGraph::new();
    let top_level = TopLevelEnv::new(&mut graph);
    let environment = make_script_analysis_environment(top_level, "<test>");

    let one = graph.construct(
        NodeKind::SyntaxLiteralInteger,
        vec![Arg::derivation(Derivation::None), Arg::int(1)],
    );
    let sequence = graph.construct(
        NodeKind::SyntaxBinaryExpressionSequence,
        vec![Arg::derivation(Derivation::None), Arg::nodes(vec![one])],
    );

    let mut expander = smalt::semantic::Expander::new(&mut graph, environment);
    let result = expander.expand(sequence);
    drop(expander);
    assert_eq!(graph.kind(result), NodeKind::LiteralInteger);
    assert_eq!(graph.int_attr(result, "value"), 1);
}

#[test]
fn test_attempt_expansion_reports_errors_without_accumulating() {
    let mut graph = AsgGraph::new();
    let top_level = TopLevelEnv::new(&mut graph);
    let environment = make_script_analysis_environment(top_level, "<test>");

    let missing = graph.construct(
        NodeKind::SyntaxIdentifierReference,
        vec![Arg::derivation(Derivation::None), Arg::str("missing")],
    );
    let mut expander = smalt::semantic::Expander::new(&mut graph, environment);
    let (result, errors) = expander.attempt_expansion_of_node(missing);
    assert_eq!(errors.len(), 1);
    // The speculative errors are handed back, not accumulated.
    assert!(expander.errors().is_empty());
    drop(expander);
    assert_eq!(graph.kind(result), NodeKind::Error);
}
