//! Runtime values and runtime errors.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use smol_str::SmolStr;
use thiserror::Error;

use super::interpreter::InterpretableInstructions;

/// Errors raised while evaluating a scheduled program.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The receiver has no behavior for the selector.
    #[error("MessageNotUnderstood: {receiver} >> #{selector}")]
    DoesNotUnderstand {
        receiver: String,
        selector: SmolStr,
    },

    /// An instruction whose kind defines no interpretation routine.
    #[error("Cannot interpret {0}.")]
    CannotInterpret(String),

    /// A callable invoked with the wrong number of arguments.
    #[error("Wrong number of arguments: expected {expected}, got {got}.")]
    ArityMismatch { expected: usize, got: usize },

    /// A node that is not evaluable as a pre-computed constant.
    #[error("Cannot evaluate {0} as a constant value.")]
    NotAConstant(String),

    /// Any other runtime failure (division by zero, explicit errors).
    #[error("{0}")]
    Raised(String),
}

/// A runtime primitive implementation, looked up by the primitive's name.
pub type RuntimeImpl = fn(&super::runtime::Interp<'_>, &[Value]) -> Result<Value, RuntimeError>;

/// A named primitive function value.
pub struct Primitive {
    pub name: SmolStr,
    pub function: RuntimeImpl,
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Primitive({})", self.name)
    }
}

/// A block instance closed over its captured values. Invoking it runs the
/// scheduled block body with `captured ++ arguments` as the activation
/// context parameters.
pub struct Closure {
    pub instructions: Rc<InterpretableInstructions>,
    pub captured: Vec<Value>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure(captured = {})", self.captured.len())
    }
}

/// Where a stream writes.
#[derive(Debug)]
pub enum StreamSink {
    Stdout,
    Buffer(Vec<u8>),
}

/// A writable stream value. Streams answer `nextPutAll:`, `nl` and
/// `print:`, each returning the stream.
#[derive(Debug, Clone)]
pub struct Stream(pub Rc<RefCell<StreamSink>>);

impl Stream {
    pub fn stdout() -> Self {
        Stream(Rc::new(RefCell::new(StreamSink::Stdout)))
    }

    pub fn buffer() -> Self {
        Stream(Rc::new(RefCell::new(StreamSink::Buffer(Vec::new()))))
    }

    pub fn write_str(&self, text: &str) {
        match &mut *self.0.borrow_mut() {
            StreamSink::Stdout => {
                let stdout = std::io::stdout();
                let _ = stdout.lock().write_all(text.as_bytes());
            }
            StreamSink::Buffer(buffer) => buffer.extend_from_slice(text.as_bytes()),
        }
    }

    /// The buffered contents, for tests against a capturing stream.
    pub fn buffered_contents(&self) -> String {
        match &*self.0.borrow() {
            StreamSink::Stdout => String::new(),
            StreamSink::Buffer(buffer) => String::from_utf8_lossy(buffer).into_owned(),
        }
    }

    fn same_as(&self, other: &Stream) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Character(char),
    String(Rc<str>),
    Symbol(SmolStr),
    Array(Rc<Vec<Value>>),
    MutableArray(Rc<RefCell<Vec<Value>>>),
    Primitive(Rc<Primitive>),
    Closure(Rc<Closure>),
    Stdio,
    Stream(Stream),
}

impl Value {
    pub fn string(text: &str) -> Self {
        Value::String(Rc::from(text))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Primitive(_))
    }

    /// Structural value equality; integers and floats compare numerically.
    pub fn value_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                *a as f64 == *b
            }
            (Value::Character(a), Value::Character(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(a, b)| a.value_equals(b))
            }
            (Value::MutableArray(a), Value::MutableArray(b)) => Rc::ptr_eq(a, b),
            (Value::Primitive(a), Value::Primitive(b)) => Rc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Stdio, Value::Stdio) => true,
            (Value::Stream(a), Value::Stream(b)) => a.same_as(b),
            _ => false,
        }
    }

    /// Smalltalk `printString`: strings quoted, symbols hash-prefixed,
    /// everything else as displayed.
    pub fn print_string(&self) -> String {
        match self {
            Value::String(text) => format!("'{}'", text.replace('\'', "''")),
            Value::Symbol(name) => format!("#{name}"),
            other => other.to_string(),
        }
    }
}

// Display is the `asString` view: raw string contents, bare symbols.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Character(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value}"),
            Value::Symbol(value) => write!(f, "{value}"),
            Value::Array(elements) => {
                write!(f, "#(")?;
                for (index, element) in elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", element.print_string())?;
                }
                write!(f, ")")
            }
            Value::MutableArray(elements) => {
                write!(f, "{{")?;
                for (index, element) in elements.borrow().iter().enumerate() {
                    if index > 0 {
                        write!(f, ". ")?;
                    }
                    write!(f, "{}", element.print_string())?;
                }
                write!(f, "}}")
            }
            Value::Primitive(primitive) => write!(f, "{}", primitive.name),
            Value::Closure(_) => write!(f, "a Block"),
            Value::Stdio => write!(f, "Stdio"),
            Value::Stream(_) => write!(f, "a FileStream"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_equality_is_numeric_across_integer_and_float() {
        assert!(Value::Integer(2).value_equals(&Value::Float(2.0)));
        assert!(!Value::Integer(2).value_equals(&Value::Float(2.5)));
        assert!(!Value::Integer(2).value_equals(&Value::string("2")));
    }

    #[test]
    fn test_print_string_quotes_strings_and_hashes_symbols() {
        assert_eq!(Value::string("it's").print_string(), "'it''s'");
        assert_eq!(Value::Symbol("+".into()).print_string(), "#+");
        assert_eq!(Value::Integer(7).print_string(), "7");
    }

    #[test]
    fn test_display_of_arrays() {
        let array = Value::Array(Rc::new(vec![
            Value::Integer(1),
            Value::string("x"),
        ]));
        assert_eq!(array.to_string(), "#(1 'x')");
    }

    #[test]
    fn test_stream_buffer_captures_writes() {
        let stream = Stream::buffer();
        stream.write_str("hi");
        stream.write_str("\n");
        assert_eq!(stream.buffered_contents(), "hi\n");
    }
}
