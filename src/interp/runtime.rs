//! The message-send runtime.
//!
//! Dispatch for `FxMessageSend`: built-in behavior per receiver kind,
//! property fallback (`Stdio stdout`), and value-selector application of
//! callables. Unknown selectors raise does-not-understand. Also home to
//! the runtime side of the primitive-function table; primitives are
//! resolved by name when constants are pre-evaluated.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::asg::{AsgGraph, NodeId};
use crate::schedule::schedule_block;

use super::interpreter::InterpretableInstructions;
use super::value::{Closure, Primitive, RuntimeError, RuntimeImpl, Stream, Value};

/// Selectors that apply a callable receiver to their arguments.
const VALUE_SELECTORS: &[&str] = &[
    "value",
    "value:",
    "value:value:",
    "value:value:value:",
    "value:value:value:value:",
];

/// Per-evaluation runtime state: the standard output stream, the runtime
/// primitive table, and the block scheduling cache.
pub struct Runtime {
    stdout: Stream,
    primitives: FxHashMap<SmolStr, RuntimeImpl>,
    block_cache: RefCell<FxHashMap<NodeId, Rc<InterpretableInstructions>>>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_stdout(Stream::stdout())
    }

    /// A runtime whose standard output is captured in memory (tests).
    pub fn with_captured_stdout() -> Self {
        Self::with_stdout(Stream::buffer())
    }

    fn with_stdout(stdout: Stream) -> Self {
        let mut primitives: FxHashMap<SmolStr, RuntimeImpl> = FxHashMap::default();
        primitives.insert("integerAdd:with:".into(), run_integer_add);
        primitives.insert("integerSubtract:with:".into(), run_integer_subtract);
        primitives.insert("integerMultiply:with:".into(), run_integer_multiply);
        primitives.insert("identity:".into(), run_identity);
        primitives.insert("error:".into(), run_error);
        Self {
            stdout,
            primitives,
            block_cache: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn stdout(&self) -> Stream {
        self.stdout.clone()
    }

    /// What the captured stdout has accumulated (empty for the real one).
    pub fn captured_output(&self) -> String {
        self.stdout.buffered_contents()
    }

    /// The primitive value registered under `name`.
    pub fn primitive_named(&self, name: &str) -> Option<Value> {
        let function = *self.primitives.get(name)?;
        Some(Value::Primitive(Rc::new(Primitive {
            name: name.into(),
            function,
        })))
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// The interpreter context handle: the graph being executed plus the
/// runtime. Threaded through sends so closures can schedule and run block
/// bodies.
pub struct Interp<'a> {
    pub graph: &'a AsgGraph,
    pub runtime: &'a Runtime,
}

impl<'a> Interp<'a> {
    pub fn new(graph: &'a AsgGraph, runtime: &'a Runtime) -> Self {
        Self { graph, runtime }
    }

    /// Scheduled, interpretable instructions for a block definition,
    /// computed once per definition and cached.
    pub fn instructions_for_block(
        &self,
        definition: NodeId,
    ) -> Result<Rc<InterpretableInstructions>, RuntimeError> {
        if let Some(cached) = self.runtime.block_cache.borrow().get(&definition) {
            return Ok(cached.clone());
        }
        let scheduled = schedule_block(self.graph, definition);
        let instructions = Rc::new(InterpretableInstructions::new(
            self.graph,
            self.runtime,
            &scheduled,
        )?);
        self.runtime
            .block_cache
            .borrow_mut()
            .insert(definition, instructions.clone());
        Ok(instructions)
    }

    /// Apply a callable value to arguments.
    pub fn apply(&self, callable: &Value, arguments: &[Value]) -> Result<Value, RuntimeError> {
        match callable {
            Value::Primitive(primitive) => (primitive.function)(self, arguments),
            Value::Closure(closure) => self.call_closure(closure, arguments),
            other => Err(RuntimeError::Raised(format!(
                "{} is not applicable.",
                other.print_string()
            ))),
        }
    }

    fn call_closure(&self, closure: &Closure, arguments: &[Value]) -> Result<Value, RuntimeError> {
        let expected = closure.instructions.activation_parameter_count();
        let got = closure.captured.len() + arguments.len();
        if expected != got {
            return Err(RuntimeError::ArityMismatch { expected, got });
        }
        let mut activation: Vec<Value> = closure.captured.clone();
        activation.extend_from_slice(arguments);
        closure.instructions.evaluate_with_arguments(self, &activation)
    }

    // =========================================================================
    // Message dispatch
    // =========================================================================

    /// Send `selector` to `receiver`: built-in method, property fallback,
    /// value-selector application of callables, else does-not-understand.
    pub fn send(
        &self,
        receiver: &Value,
        selector: &str,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        // Universal behavior first.
        match (selector, arguments) {
            ("=", [other]) => return Ok(Value::Boolean(receiver.value_equals(other))),
            ("~=", [other]) => return Ok(Value::Boolean(!receiver.value_equals(other))),
            ("printString", []) => return Ok(Value::string(&receiver.print_string())),
            ("asString", []) => return Ok(Value::string(&receiver.to_string())),
            _ => {}
        }

        if let Some(result) = self.send_builtin(receiver, selector, arguments)? {
            return Ok(result);
        }

        if receiver.is_callable()
            && VALUE_SELECTORS.contains(&selector)
            && selector.matches(':').count() == arguments.len()
        {
            return self.apply(receiver, arguments);
        }

        Err(RuntimeError::DoesNotUnderstand {
            receiver: receiver.print_string(),
            selector: selector.into(),
        })
    }

    fn send_builtin(
        &self,
        receiver: &Value,
        selector: &str,
        arguments: &[Value],
    ) -> Result<Option<Value>, RuntimeError> {
        let result = match (receiver, selector, arguments) {
            // ------------------------------------------------------------
            // Numbers: strict left-to-right binary chains at the language
            // level; the runtime sees one operator at a time.
            // ------------------------------------------------------------
            (Value::Integer(_) | Value::Float(_), _, [argument]) => {
                return numeric_binary_selector(receiver, selector, argument);
            }
            (Value::Integer(value), "negated", []) => Value::Integer(value.wrapping_neg()),
            (Value::Float(value), "negated", []) => Value::Float(-value),

            // ------------------------------------------------------------
            // Booleans
            // ------------------------------------------------------------
            (Value::Boolean(value), "not", []) => Value::Boolean(!value),
            (Value::Boolean(a), "&", [Value::Boolean(b)]) => Value::Boolean(*a && *b),
            (Value::Boolean(a), "|", [Value::Boolean(b)]) => Value::Boolean(*a || *b),

            // ------------------------------------------------------------
            // Strings and symbols
            // ------------------------------------------------------------
            (Value::String(a), ",", [Value::String(b)]) => {
                Value::string(&format!("{a}{b}"))
            }
            (Value::String(value), "size", []) => Value::Integer(value.chars().count() as i64),
            (Value::Symbol(value), "size", []) => Value::Integer(value.chars().count() as i64),

            // ------------------------------------------------------------
            // Arrays
            // ------------------------------------------------------------
            (Value::Array(elements), "size", []) => Value::Integer(elements.len() as i64),
            (Value::Array(elements), "at:", [Value::Integer(index)]) => {
                array_at(elements, *index)?
            }
            (Value::MutableArray(elements), "size", []) => {
                Value::Integer(elements.borrow().len() as i64)
            }
            (Value::MutableArray(elements), "at:", [Value::Integer(index)]) => {
                array_at(&elements.borrow(), *index)?
            }
            (Value::MutableArray(elements), "at:put:", [Value::Integer(index), value]) => {
                let mut elements = elements.borrow_mut();
                let slot = checked_index(elements.len(), *index)?;
                elements[slot] = value.clone();
                value.clone()
            }

            // ------------------------------------------------------------
            // Standard I/O
            // ------------------------------------------------------------
            (Value::Stdio, "stdout", []) => Value::Stream(self.runtime.stdout()),
            (Value::Stream(stream), "nextPutAll:", [argument]) => {
                stream.write_str(&argument.to_string());
                receiver.clone()
            }
            (Value::Stream(stream), "nl", []) => {
                stream.write_str("\n");
                receiver.clone()
            }
            (Value::Stream(stream), "print:", [argument]) => {
                stream.write_str(&argument.to_string());
                receiver.clone()
            }

            _ => return Ok(None),
        };
        Ok(Some(result))
    }
}

fn checked_index(len: usize, index: i64) -> Result<usize, RuntimeError> {
    if index >= 1 && (index as usize) <= len {
        Ok(index as usize - 1)
    } else {
        Err(RuntimeError::Raised(format!(
            "Index {index} is out of bounds for an array of size {len}."
        )))
    }
}

fn array_at(elements: &[Value], index: i64) -> Result<Value, RuntimeError> {
    Ok(elements[checked_index(elements.len(), index)?].clone())
}

/// Binary numeric selectors over integers and floats. Returns `Ok(None)`
/// when the selector (or the argument type) is not numeric so dispatch can
/// continue.
fn numeric_binary_selector(
    receiver: &Value,
    selector: &str,
    argument: &Value,
) -> Result<Option<Value>, RuntimeError> {
    let pair = match (receiver, argument) {
        (Value::Integer(a), Value::Integer(b)) => Some((*a, *b)),
        _ => None,
    };

    // Integer × Integer keeps integer arithmetic.
    if let Some((a, b)) = pair {
        let result = match selector {
            "+" => Value::Integer(a.wrapping_add(b)),
            "-" => Value::Integer(a.wrapping_sub(b)),
            "*" => Value::Integer(a.wrapping_mul(b)),
            "/" => {
                if b == 0 {
                    return Err(RuntimeError::Raised("Division by zero.".to_string()));
                }
                if a % b == 0 {
                    Value::Integer(a / b)
                } else {
                    Value::Float(a as f64 / b as f64)
                }
            }
            "//" => {
                if b == 0 {
                    return Err(RuntimeError::Raised("Division by zero.".to_string()));
                }
                Value::Integer(a.div_euclid(b))
            }
            "\\\\" => {
                if b == 0 {
                    return Err(RuntimeError::Raised("Division by zero.".to_string()));
                }
                Value::Integer(a.rem_euclid(b))
            }
            "<" => Value::Boolean(a < b),
            ">" => Value::Boolean(a > b),
            "<=" => Value::Boolean(a <= b),
            ">=" => Value::Boolean(a >= b),
            "min:" => Value::Integer(a.min(b)),
            "max:" => Value::Integer(a.max(b)),
            _ => return Ok(None),
        };
        return Ok(Some(result));
    }

    let floats = match (receiver, argument) {
        (Value::Integer(a), Value::Float(b)) => Some((*a as f64, *b)),
        (Value::Float(a), Value::Integer(b)) => Some((*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Some((*a, *b)),
        _ => None,
    };
    let Some((a, b)) = floats else {
        return Ok(None);
    };
    let result = match selector {
        "+" => Value::Float(a + b),
        "-" => Value::Float(a - b),
        "*" => Value::Float(a * b),
        "/" => {
            if b == 0.0 {
                return Err(RuntimeError::Raised("Division by zero.".to_string()));
            }
            Value::Float(a / b)
        }
        "<" => Value::Boolean(a < b),
        ">" => Value::Boolean(a > b),
        "<=" => Value::Boolean(a <= b),
        ">=" => Value::Boolean(a >= b),
        "min:" => Value::Float(a.min(b)),
        "max:" => Value::Float(a.max(b)),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

// ============================================================================
// RUNTIME PRIMITIVE IMPLEMENTATIONS
// ============================================================================

fn integer_argument(arguments: &[Value], index: usize) -> Result<i64, RuntimeError> {
    match arguments.get(index) {
        Some(Value::Integer(value)) => Ok(*value),
        Some(other) => Err(RuntimeError::Raised(format!(
            "Integer primitive expects an integer, got {}.",
            other.print_string()
        ))),
        None => Err(RuntimeError::ArityMismatch {
            expected: index + 1,
            got: arguments.len(),
        }),
    }
}

fn run_integer_add(_: &Interp<'_>, arguments: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Integer(
        integer_argument(arguments, 0)?.wrapping_add(integer_argument(arguments, 1)?),
    ))
}

fn run_integer_subtract(_: &Interp<'_>, arguments: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Integer(
        integer_argument(arguments, 0)?.wrapping_sub(integer_argument(arguments, 1)?),
    ))
}

fn run_integer_multiply(_: &Interp<'_>, arguments: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Integer(
        integer_argument(arguments, 0)?.wrapping_mul(integer_argument(arguments, 1)?),
    ))
}

fn run_identity(_: &Interp<'_>, arguments: &[Value]) -> Result<Value, RuntimeError> {
    match arguments {
        [value] => Ok(value.clone()),
        _ => Err(RuntimeError::ArityMismatch {
            expected: 1,
            got: arguments.len(),
        }),
    }
}

fn run_error(_: &Interp<'_>, arguments: &[Value]) -> Result<Value, RuntimeError> {
    let message = arguments
        .first()
        .map(|value| value.to_string())
        .unwrap_or_else(|| "error".to_string());
    Err(RuntimeError::Raised(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn send_on_empty_graph(
        receiver: &Value,
        selector: &str,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let graph = AsgGraph::new();
        let runtime = Runtime::with_captured_stdout();
        let interp = Interp::new(&graph, &runtime);
        interp.send(receiver, selector, arguments)
    }

    #[test]
    fn test_integer_arithmetic_selectors() {
        let result = send_on_empty_graph(&Value::Integer(3), "+", &[Value::Integer(4)]).unwrap();
        assert!(result.value_equals(&Value::Integer(7)));
        let result = send_on_empty_graph(&Value::Integer(3), "*", &[Value::Integer(4)]).unwrap();
        assert!(result.value_equals(&Value::Integer(12)));
        let result = send_on_empty_graph(&Value::Integer(7), "/", &[Value::Integer(2)]).unwrap();
        assert!(result.value_equals(&Value::Float(3.5)));
        let result = send_on_empty_graph(&Value::Integer(7), "//", &[Value::Integer(2)]).unwrap();
        assert!(result.value_equals(&Value::Integer(3)));
    }

    #[test]
    fn test_comparison_selectors() {
        let result = send_on_empty_graph(&Value::Integer(1), "<", &[Value::Integer(2)]).unwrap();
        assert!(result.value_equals(&Value::Boolean(true)));
        let result = send_on_empty_graph(&Value::Integer(1), "=", &[Value::Integer(1)]).unwrap();
        assert!(result.value_equals(&Value::Boolean(true)));
    }

    #[test]
    fn test_division_by_zero_raises() {
        let result = send_on_empty_graph(&Value::Integer(1), "/", &[Value::Integer(0)]);
        assert!(matches!(result, Err(RuntimeError::Raised(_))));
    }

    #[test]
    fn test_stdio_stdout_property_and_stream_protocol() {
        let graph = AsgGraph::new();
        let runtime = Runtime::with_captured_stdout();
        let interp = Interp::new(&graph, &runtime);

        let stream = interp.send(&Value::Stdio, "stdout", &[]).unwrap();
        assert!(matches!(stream, Value::Stream(_)));
        let result = interp
            .send(&stream, "print:", &[Value::string("hi")])
            .unwrap();
        // Stream messages answer the stream itself.
        assert!(result.value_equals(&stream));
        interp.send(&stream, "nl", &[]).unwrap();
        assert_eq!(runtime.captured_output(), "hi\n");
    }

    #[test]
    fn test_does_not_understand() {
        let result = send_on_empty_graph(&Value::Integer(1), "frobnicate", &[]);
        assert!(matches!(
            result,
            Err(RuntimeError::DoesNotUnderstand { .. })
        ));
    }

    #[test]
    fn test_array_indexing_is_one_based() {
        let array = Value::Array(Rc::new(vec![Value::Integer(10), Value::Integer(20)]));
        let result = send_on_empty_graph(&array, "at:", &[Value::Integer(1)]).unwrap();
        assert!(result.value_equals(&Value::Integer(10)));
        let result = send_on_empty_graph(&array, "at:", &[Value::Integer(0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_print_string_selector() {
        let result = send_on_empty_graph(&Value::string("a"), "printString", &[]).unwrap();
        assert!(result.value_equals(&Value::string("'a'")));
    }
}
