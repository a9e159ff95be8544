//! The register-less interpreter over a scheduled instruction stream.
//!
//! The program layout is one flat array `[c0 .. cC-1  a0 .. aA-1  i0 ..]`:
//! constants, activation parameters, body. Before execution, constants are
//! pre-evaluated to host values and every body instruction gets a tuple of
//! signed operand indices (negative indices name constants by offset from
//! the constant base, non-negative ones name register positions). The step
//! loop delegates each instruction to its kind's interpretation routine
//! and stores the returned value at `pc - C`, stopping when the return
//! routine fires.

use rustc_hash::FxHashMap;

use crate::asg::{AsgGraph, DataValue, HostObject, NodeId, NodeKind};
use crate::schedule::ScheduledInstructions;

use super::runtime::{Interp, Runtime};
use super::value::{Closure, RuntimeError, Value};
use std::rc::Rc;

/// Evaluate a node as a pre-computed constant value.
pub fn evaluate_as_constant_value(
    graph: &AsgGraph,
    runtime: &Runtime,
    node: NodeId,
) -> Result<Value, RuntimeError> {
    match graph.kind(node) {
        NodeKind::LiteralNil => Ok(Value::Nil),
        NodeKind::LiteralFalse => Ok(Value::Boolean(false)),
        NodeKind::LiteralTrue => Ok(Value::Boolean(true)),
        NodeKind::LiteralInteger => Ok(Value::Integer(graph.int_attr(node, "value"))),
        NodeKind::LiteralFloat => match graph.data_attr(node, "value") {
            DataValue::Float(value) => Ok(Value::Float(*value)),
            other => Err(RuntimeError::NotAConstant(format!("{other:?}"))),
        },
        NodeKind::LiteralCharacter => match graph.data_attr(node, "value") {
            DataValue::Char(value) => Ok(Value::Character(*value)),
            other => Err(RuntimeError::NotAConstant(format!("{other:?}"))),
        },
        NodeKind::LiteralString => Ok(Value::string(graph.str_attr(node, "value"))),
        NodeKind::LiteralSymbol => Ok(Value::Symbol(graph.str_attr(node, "value").clone())),
        NodeKind::LiteralObject => match graph.data_attr(node, "value") {
            DataValue::Object(HostObject::Stdio) => Ok(Value::Stdio),
            other => Err(RuntimeError::NotAConstant(format!("{other:?}"))),
        },
        NodeKind::LiteralPrimitiveFunction => {
            let name = graph.str_attr(node, "name");
            runtime.primitive_named(name).ok_or_else(|| {
                RuntimeError::Raised(format!("Unknown primitive function {name}."))
            })
        }
        NodeKind::Array => {
            let elements: Result<Vec<Value>, RuntimeError> = graph
                .inputs_attr(node, "elements")
                .iter()
                .map(|element| evaluate_as_constant_value(graph, runtime, *element))
                .collect();
            Ok(Value::Array(Rc::new(elements?)))
        }
        _ => Err(RuntimeError::NotAConstant(
            graph.print_name_with_data_attributes(node),
        )),
    }
}

/// A scheduled program made executable: flat instruction array, operand
/// tuples and pre-evaluated constants.
pub struct InterpretableInstructions {
    functional: NodeId,
    instructions: Vec<NodeId>,
    constant_count: usize,
    activation_parameter_count: usize,
    start_pc: usize,
    activation_context_size: usize,
    parameter_lists: Vec<Vec<i64>>,
    constants: Vec<Value>,
}

impl InterpretableInstructions {
    pub fn new(
        graph: &AsgGraph,
        runtime: &Runtime,
        scheduled: &ScheduledInstructions,
    ) -> Result<Self, RuntimeError> {
        let instructions: Vec<NodeId> = scheduled.enumerate_for_interpretation().collect();
        let constant_count = scheduled.constants.len();
        let activation_parameter_count = scheduled.activation_parameters.len();
        let start_pc = constant_count + activation_parameter_count;
        let activation_context_size = instructions.len() - constant_count;

        let mut instruction_index_table: FxHashMap<NodeId, i64> = FxHashMap::default();
        for (index, instruction) in instructions.iter().enumerate() {
            instruction_index_table.insert(*instruction, index as i64 - constant_count as i64);
        }

        let constants: Result<Vec<Value>, RuntimeError> = instructions[..constant_count]
            .iter()
            .map(|constant| evaluate_as_constant_value(graph, runtime, *constant))
            .collect();

        let mut parameter_lists = Vec::with_capacity(instructions.len() - constant_count);
        for instruction in &instructions[constant_count..] {
            let mut parameters = Vec::new();
            for dependency in graph.interpretation_dependencies(*instruction) {
                let index = instruction_index_table.get(&dependency).ok_or_else(|| {
                    RuntimeError::CannotInterpret(
                        graph.print_name_with_data_attributes(dependency),
                    )
                })?;
                parameters.push(*index);
            }
            parameter_lists.push(parameters);
        }

        Ok(Self {
            functional: scheduled.functional,
            instructions,
            constant_count,
            activation_parameter_count,
            start_pc,
            activation_context_size,
            parameter_lists,
            constants: constants?,
        })
    }

    pub fn functional(&self) -> NodeId {
        self.functional
    }

    pub fn activation_parameter_count(&self) -> usize {
        self.activation_parameter_count
    }

    pub fn constant_count(&self) -> usize {
        self.constant_count
    }

    /// Run the program: populate the first A registers from `arguments`
    /// and step from the start pc until the return routine fires.
    pub fn evaluate_with_arguments(
        &self,
        interp: &Interp<'_>,
        arguments: &[Value],
    ) -> Result<Value, RuntimeError> {
        let mut context = ActivationContext {
            pc: self.start_pc,
            data: vec![Value::Nil; self.activation_context_size],
            result: Value::Nil,
            should_return: false,
        };
        for (index, argument) in arguments.iter().enumerate() {
            context.data[index] = argument.clone();
        }

        while !context.should_return {
            if context.pc >= self.instructions.len() {
                return Err(RuntimeError::Raised(
                    "Execution ran past the end of the instruction stream.".to_string(),
                ));
            }
            let pc = context.pc;
            let instruction = self.instructions[pc];
            context.pc += 1;
            let value = self.interpret_instruction(interp, instruction, &mut context, pc)?;
            context.data[pc - self.constant_count] = value;
        }
        Ok(context.result)
    }

    fn interpret_instruction(
        &self,
        interp: &Interp<'_>,
        instruction: NodeId,
        context: &mut ActivationContext,
        pc: usize,
    ) -> Result<Value, RuntimeError> {
        let parameters = &self.parameter_lists[pc - self.constant_count];
        let graph = interp.graph;

        match graph.kind(instruction) {
            NodeKind::SequenceEntry => Ok(Value::Nil),

            NodeKind::SequenceReturn => {
                context.result = self.operand(context, parameters[0]);
                context.should_return = true;
                Ok(Value::Nil)
            }

            NodeKind::FxApplication | NodeKind::Application => {
                let functional = self.operand(context, parameters[0]);
                let arguments: Vec<Value> = parameters[1..]
                    .iter()
                    .map(|parameter| self.operand(context, *parameter))
                    .collect();
                interp.apply(&functional, &arguments)
            }

            NodeKind::FxMessageSend | NodeKind::MessageSend => {
                let receiver = self.operand(context, parameters[0]);
                let selector_value = self.operand(context, parameters[1]);
                let Value::Symbol(selector) = selector_value else {
                    return Err(RuntimeError::Raised(format!(
                        "Message selector must be a symbol, got {}.",
                        selector_value.print_string()
                    )));
                };
                let arguments: Vec<Value> = parameters[2..]
                    .iter()
                    .map(|parameter| self.operand(context, *parameter))
                    .collect();
                interp.send(&receiver, &selector, &arguments)
            }

            NodeKind::BlockInstance => {
                let captured: Vec<Value> = parameters
                    .iter()
                    .map(|parameter| self.operand(context, *parameter))
                    .collect();
                let definition = graph.input_attr(instruction, "definition");
                let instructions = interp.instructions_for_block(definition)?;
                Ok(Value::Closure(Rc::new(Closure {
                    instructions,
                    captured,
                })))
            }

            NodeKind::MutableArray => {
                let elements: Vec<Value> = parameters
                    .iter()
                    .map(|parameter| self.operand(context, *parameter))
                    .collect();
                Ok(Value::MutableArray(Rc::new(std::cell::RefCell::new(
                    elements,
                ))))
            }

            NodeKind::Array => {
                let elements: Vec<Value> = parameters
                    .iter()
                    .map(|parameter| self.operand(context, *parameter))
                    .collect();
                Ok(Value::Array(Rc::new(elements)))
            }

            // Block instances read the definition node itself; the
            // definition has no runtime value of its own.
            NodeKind::BlockDefinition => Ok(Value::Nil),

            // Phi machinery acts as identity reads; the scheduler has
            // already routed values into place.
            NodeKind::PhiValue => Ok(self.operand(context, parameters[0])),
            NodeKind::Phi => Ok(parameters
                .first()
                .map(|parameter| self.operand(context, *parameter))
                .unwrap_or(Value::Nil)),

            kind if kind.is_literal() => {
                evaluate_as_constant_value(graph, interp.runtime, instruction)
            }

            _ => Err(RuntimeError::CannotInterpret(
                graph.print_name_with_data_attributes(instruction),
            )),
        }
    }

    fn operand(&self, context: &ActivationContext, index: i64) -> Value {
        if index < 0 {
            self.constants[(self.constant_count as i64 + index) as usize].clone()
        } else {
            context.data[index as usize].clone()
        }
    }

    /// Human-readable listing: one instruction per line with operand
    /// tuples, constants with their evaluated values.
    pub fn dump(&self, graph: &AsgGraph) -> String {
        let mut result = String::new();
        for (index, instruction) in self.instructions.iter().enumerate() {
            let slot = index as i64 - self.constant_count as i64;
            result.push_str(&format!(
                "{}: {}",
                slot,
                graph.print_name_with_data_attributes(*instruction)
            ));
            if index >= self.constant_count {
                let parameters = &self.parameter_lists[index - self.constant_count];
                if !parameters.is_empty() {
                    result.push('(');
                    for (parameter_index, parameter) in parameters.iter().enumerate() {
                        if parameter_index > 0 {
                            result.push_str(", ");
                        }
                        result.push_str(&parameter.to_string());
                    }
                    result.push(')');
                }
            } else {
                result.push_str(" := ");
                result.push_str(&self.constants[index].print_string());
            }
            result.push('\n');
        }
        result
    }
}

/// The mutable register file of one activation.
struct ActivationContext {
    pc: usize,
    data: Vec<Value>,
    result: Value,
    should_return: bool,
}
