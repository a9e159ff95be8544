//! End-to-end: source text through scanning, parsing, analysis, scheduling
//! and interpretation.

use smalt::interp::{Runtime, RuntimeError, Value};
use smalt::pipeline::{PipelineError, evaluate_source};

fn evaluate(text: &str) -> (Result<Value, PipelineError>, String) {
    let runtime = Runtime::with_captured_stdout();
    let result = evaluate_source(&runtime, text, "<test>");
    let output = runtime.captured_output();
    (result, output)
}

fn evaluate_ok(text: &str) -> (Value, String) {
    let (result, output) = evaluate(text);
    (result.expect("evaluation should succeed"), output)
}

#[test]
fn test_integer_literal() {
    let (value, output) = evaluate_ok("42");
    assert!(value.value_equals(&Value::Integer(42)));
    assert!(output.is_empty());
}

#[test]
fn test_radix_integer_literal() {
    let (value, _) = evaluate_ok("2r1010");
    assert!(value.value_equals(&Value::Integer(10)));
}

#[test]
fn test_binary_chain_is_strictly_left_to_right() {
    // (1 + 2) * 4, not arithmetic precedence.
    let (value, _) = evaluate_ok("1 + 2 * 4");
    assert!(value.value_equals(&Value::Integer(12)));
}

#[test]
fn test_cascade_writes_to_stdout_and_answers_the_stream() {
    let (value, output) = evaluate_ok("Stdio stdout print: 'hi'; nl");
    assert_eq!(output, "hi\n");
    assert!(matches!(value, Value::Stream(_)));
}

#[test]
fn test_block_application_through_value_selector() {
    let (value, _) = evaluate_ok("[:x | x + 1] value: 10");
    assert!(value.value_equals(&Value::Integer(11)));
}

#[test]
fn test_symbol_literal() {
    let (value, _) = evaluate_ok("#'+'");
    assert!(value.value_equals(&Value::Symbol("+".into())));
}

#[test]
fn test_builtin_bindings() {
    let (value, _) = evaluate_ok("nil");
    assert!(value.value_equals(&Value::Nil));
    let (value, _) = evaluate_ok("true");
    assert!(value.value_equals(&Value::Boolean(true)));
    let (value, _) = evaluate_ok("false");
    assert!(value.value_equals(&Value::Boolean(false)));
}

#[test]
fn test_empty_script_is_nil() {
    let (value, _) = evaluate_ok("");
    assert!(value.value_equals(&Value::Nil));
}

#[test]
fn test_float_arithmetic() {
    let (value, _) = evaluate_ok("1.5 + 2");
    assert!(value.value_equals(&Value::Float(3.5)));
}

#[test]
fn test_character_literal() {
    let (value, _) = evaluate_ok("$a");
    assert!(value.value_equals(&Value::Character('a')));
}

#[test]
fn test_string_escape_and_size() {
    let (value, _) = evaluate_ok("'it''s' size");
    assert!(value.value_equals(&Value::Integer(4)));
}

#[test]
fn test_string_concatenation() {
    let (value, _) = evaluate_ok("'ab' , 'cd'");
    assert!(value.value_equals(&Value::string("abcd")));
}

#[test]
fn test_locals_and_assignment() {
    let (value, _) = evaluate_ok("| a b | a := 3. b := a + 4. b * 2");
    assert!(value.value_equals(&Value::Integer(14)));
}

#[test]
fn test_statement_sequence_returns_last_value() {
    let (value, _) = evaluate_ok("1. 2. 3");
    assert!(value.value_equals(&Value::Integer(3)));
}

#[test]
fn test_nested_blocks_capture_outer_arguments() {
    let (value, _) = evaluate_ok("[:x | [:y | x + y] value: 3] value: 4");
    assert!(value.value_equals(&Value::Integer(7)));
}

#[test]
fn test_block_with_temporaries() {
    let (value, _) = evaluate_ok("[| t | t := 5. t] value");
    assert!(value.value_equals(&Value::Integer(5)));
}

#[test]
fn test_block_invoked_twice_with_different_arguments() {
    let (value, _) = evaluate_ok("| inc | inc := [:x | x + 1]. inc value: 1. inc value: 41");
    assert!(value.value_equals(&Value::Integer(42)));
}

#[test]
fn test_tail_return_in_block() {
    let (value, _) = evaluate_ok("[:x | ^x * 2] value: 21");
    assert!(value.value_equals(&Value::Integer(42)));
}

#[test]
fn test_literal_array_indexing() {
    let (value, _) = evaluate_ok("#(10 20 30) at: 2");
    assert!(value.value_equals(&Value::Integer(20)));
}

#[test]
fn test_mutable_array_store_and_size() {
    let (value, _) = evaluate_ok("{1. 2. 3} size");
    assert!(value.value_equals(&Value::Integer(3)));
    let (value, _) = evaluate_ok("{1. 2. 3} at: 2 put: 9");
    assert!(value.value_equals(&Value::Integer(9)));
}

#[test]
fn test_compile_time_primitive_folds_to_a_constant() {
    let (value, _) = evaluate_ok("integerAdd: 20 with: 22");
    assert!(value.value_equals(&Value::Integer(42)));
}

#[test]
fn test_pure_primitive_with_runtime_argument_applies_at_runtime() {
    let (value, _) = evaluate_ok("[:x | integerAdd: x with: 2] value: 5");
    assert!(value.value_equals(&Value::Integer(7)));
}

#[test]
fn test_always_inline_primitive_over_a_block() {
    let (value, _) = evaluate_ok("(identity: [:x | x]) value: 3");
    assert!(value.value_equals(&Value::Integer(3)));
}

#[test]
fn test_error_primitive_raises() {
    let (result, _) = evaluate("error: 'boom'");
    match result {
        Err(PipelineError::Runtime(RuntimeError::Raised(message))) => {
            assert_eq!(message, "boom")
        }
        other => panic!("expected a raised runtime error, got {other:?}"),
    }
}

#[test]
fn test_does_not_understand_terminates_evaluation() {
    let (result, _) = evaluate("3 frobnicate");
    match result {
        Err(PipelineError::Runtime(RuntimeError::DoesNotUnderstand { selector, .. })) => {
            assert_eq!(selector, "frobnicate")
        }
        other => panic!("expected does-not-understand, got {other:?}"),
    }
}

#[test]
fn test_block_arity_mismatch_is_a_runtime_error() {
    let (result, _) = evaluate("[:x | x] value: 1 value: 2");
    assert!(result.is_err());
}

#[test]
fn test_comparison_and_boolean_selectors() {
    let (value, _) = evaluate_ok("1 < 2");
    assert!(value.value_equals(&Value::Boolean(true)));
    let (value, _) = evaluate_ok("(1 > 2) not");
    assert!(value.value_equals(&Value::Boolean(true)));
}

#[test]
fn test_equality_selectors() {
    let (value, _) = evaluate_ok("#foo = #foo");
    assert!(value.value_equals(&Value::Boolean(true)));
    let (value, _) = evaluate_ok("1 ~= 2");
    assert!(value.value_equals(&Value::Boolean(true)));
}

#[test]
fn test_print_string_of_integers() {
    let (value, _) = evaluate_ok("42 printString");
    assert!(value.value_equals(&Value::string("42")));
}

#[test]
fn test_output_ordering_across_statements() {
    let (value, output) =
        evaluate_ok("Stdio stdout print: 'a'. Stdio stdout print: 'b'. Stdio stdout nl. 7");
    assert_eq!(output, "ab\n");
    assert!(value.value_equals(&Value::Integer(7)));
}

#[test]
fn test_block_writing_to_stdout_runs_when_applied() {
    let (value, output) = evaluate_ok("[:x | Stdio stdout print: x] value: 'hey'. 1");
    assert_eq!(output, "hey");
    assert!(value.value_equals(&Value::Integer(1)));
}
