//! Runtime values, the message-send runtime, and the flat-instruction
//! interpreter.

mod interpreter;
mod runtime;
mod value;

pub use interpreter::{InterpretableInstructions, evaluate_as_constant_value};
pub use runtime::{Interp, Runtime};
pub use value::{Closure, Primitive, RuntimeError, RuntimeImpl, Stream, StreamSink, Value};
