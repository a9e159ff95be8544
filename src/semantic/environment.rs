//! Lexical environments for expansion and analysis.
//!
//! Environments map symbols to graph nodes. The top-level target
//! environment holds the built-in bindings (`nil`, `false`, `true`, the
//! `Stdio` handle and the primitive-function table) plus a global
//! unification table; it is built per pipeline invocation so the core
//! carries no process-wide state. Child environments are copy-on-write:
//! adding a binding returns a new environment. Functional-analysis
//! environments additionally record declared arguments and the captures
//! synthesized when a lookup crosses the functional boundary and resolves
//! to a beta-replaceable node.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::asg::{
    Arg, AsgGraph, CompileTimeImpl, DataValue, Derivation, GvnTable, HostObject, NodeId, NodeKind,
};
use crate::base::SourcePosition;

// ============================================================================
// TOP-LEVEL TARGET ENVIRONMENT
// ============================================================================

/// The root environment of a compilation target.
#[derive(Debug)]
pub struct TopLevelEnv {
    symbols: RefCell<IndexMap<SmolStr, Vec<NodeId>>>,
    unification: RefCell<GvnTable>,
}

impl TopLevelEnv {
    /// Build the top-level environment with its built-in bindings and
    /// primitive functions installed.
    pub fn new(graph: &mut AsgGraph) -> Rc<Self> {
        let environment = Rc::new(Self {
            symbols: RefCell::new(IndexMap::new()),
            unification: RefCell::new(GvnTable::new()),
        });

        let nil = graph.construct(NodeKind::LiteralNil, vec![Arg::derivation(Derivation::None)]);
        let r#false = graph.construct(
            NodeKind::LiteralFalse,
            vec![Arg::derivation(Derivation::None)],
        );
        let r#true = graph.construct(
            NodeKind::LiteralTrue,
            vec![Arg::derivation(Derivation::None)],
        );
        environment.add_symbol_value(graph, "nil", nil);
        environment.add_symbol_value(graph, "false", r#false);
        environment.add_symbol_value(graph, "true", r#true);

        let stdio = graph.construct(
            NodeKind::LiteralObject,
            vec![
                Arg::derivation(Derivation::None),
                Arg::data(DataValue::Object(HostObject::Stdio)),
            ],
        );
        environment.add_symbol_value(graph, "Stdio", stdio);

        environment.add_primitive_functions(graph);
        environment
    }

    /// Install `value` in the global unification table, returning the
    /// canonical node for its structure.
    pub fn add_unification_value(&self, graph: &AsgGraph, value: NodeId) -> NodeId {
        self.unification.borrow_mut().unify(graph, value)
    }

    /// Bind `name`, shadowing any previous top-level binding.
    pub fn add_symbol_value(&self, graph: &AsgGraph, name: &str, value: NodeId) {
        let value = self.add_unification_value(graph, value);
        self.symbols
            .borrow_mut()
            .entry(name.into())
            .or_default()
            .insert(0, value);
    }

    pub fn look_last_binding_of(&self, name: &str) -> Option<NodeId> {
        self.symbols
            .borrow()
            .get(name)
            .and_then(|bindings| bindings.first().copied())
    }

    // =========================================================================
    // Primitive functions
    // =========================================================================

    fn add_primitive_function(
        &self,
        graph: &mut AsgGraph,
        name: &str,
        pure: bool,
        compile_time: bool,
        always_inline: bool,
        compile_time_implementation: Option<CompileTimeImpl>,
    ) {
        let primitive = graph.construct(
            NodeKind::LiteralPrimitiveFunction,
            vec![
                Arg::derivation(Derivation::None),
                Arg::str(name),
                Arg::data(DataValue::CompileImpl(compile_time_implementation)),
                Arg::data(DataValue::Bool(pure)),
                Arg::data(DataValue::Bool(compile_time)),
                Arg::data(DataValue::Bool(always_inline)),
            ],
        );
        self.add_symbol_value(graph, name, primitive);
    }

    fn add_primitive_functions(&self, graph: &mut AsgGraph) {
        self.add_primitive_function(
            graph,
            "integerAdd:with:",
            true,
            true,
            false,
            Some(reduce_integer_add),
        );
        self.add_primitive_function(
            graph,
            "integerSubtract:with:",
            true,
            true,
            false,
            Some(reduce_integer_subtract),
        );
        self.add_primitive_function(
            graph,
            "integerMultiply:with:",
            true,
            true,
            false,
            Some(reduce_integer_multiply),
        );
        self.add_primitive_function(graph, "identity:", false, false, true, Some(reduce_identity));
        self.add_primitive_function(graph, "error:", false, false, false, None);
    }
}

// ============================================================================
// COMPILE-TIME PRIMITIVE IMPLEMENTATIONS
// ============================================================================

fn literal_integer_value(graph: &AsgGraph, node: NodeId) -> Option<i64> {
    if graph.kind(node) == NodeKind::LiteralInteger {
        Some(graph.int_attr(node, "value"))
    } else {
        None
    }
}

fn reduce_integer_binary(
    graph: &mut AsgGraph,
    derivation: Derivation,
    arguments: &[NodeId],
    operation: fn(i64, i64) -> i64,
) -> NodeId {
    let folded = match arguments {
        [left, right] => literal_integer_value(graph, *left)
            .zip(literal_integer_value(graph, *right))
            .map(|(left, right)| operation(left, right)),
        _ => None,
    };
    match folded {
        Some(value) => graph.construct(
            NodeKind::LiteralInteger,
            vec![Arg::derivation(derivation), Arg::int(value)],
        ),
        None => graph.construct(
            NodeKind::Error,
            vec![
                Arg::derivation(derivation),
                Arg::str("Integer primitive expects two integer literals."),
                Arg::nodes(arguments.to_vec()),
            ],
        ),
    }
}

fn reduce_integer_add(graph: &mut AsgGraph, derivation: Derivation, args: &[NodeId]) -> NodeId {
    reduce_integer_binary(graph, derivation, args, i64::wrapping_add)
}

fn reduce_integer_subtract(
    graph: &mut AsgGraph,
    derivation: Derivation,
    args: &[NodeId],
) -> NodeId {
    reduce_integer_binary(graph, derivation, args, i64::wrapping_sub)
}

fn reduce_integer_multiply(
    graph: &mut AsgGraph,
    derivation: Derivation,
    args: &[NodeId],
) -> NodeId {
    reduce_integer_binary(graph, derivation, args, i64::wrapping_mul)
}

fn reduce_identity(graph: &mut AsgGraph, derivation: Derivation, args: &[NodeId]) -> NodeId {
    match args {
        [value] => *value,
        _ => graph.construct(
            NodeKind::Error,
            vec![
                Arg::derivation(derivation),
                Arg::str("identity: expects exactly one argument."),
                Arg::nodes(args.to_vec()),
            ],
        ),
    }
}

// ============================================================================
// ENVIRONMENT CHAIN
// ============================================================================

/// A lexical environment: the top level, or a child layered over a parent.
#[derive(Debug, Clone)]
pub enum Environment {
    TopLevel(Rc<TopLevelEnv>),
    Bindings(Rc<BindingsEnv>),
    Functional(Rc<FunctionalEnv>),
    Script(Rc<ScriptEnv>),
}

/// A copy-on-write child environment with local bindings.
#[derive(Debug)]
pub struct BindingsEnv {
    parent: Environment,
    symbols: IndexMap<SmolStr, Vec<NodeId>>,
}

/// The root environment of a source file.
#[derive(Debug)]
pub struct ScriptEnv {
    parent: Environment,
    pub script_directory: String,
    pub script_name: String,
}

/// Functional frame state: argument bindings and recorded captures.
#[derive(Debug, Default)]
pub struct FunctionalState {
    symbols: IndexMap<SmolStr, Vec<NodeId>>,
    captured_symbols: FxHashMap<SmolStr, NodeId>,
    captured_value_table: FxHashMap<NodeId, NodeId>,
    arguments: Vec<NodeId>,
    captured_values: Vec<NodeId>,
    capture_bindings: Vec<NodeId>,
}

/// The environment of a functional frame (a block under analysis).
#[derive(Debug)]
pub struct FunctionalEnv {
    parent: Environment,
    pub position: SourcePosition,
    state: RefCell<FunctionalState>,
}

impl FunctionalEnv {
    pub fn new(parent: Environment, position: SourcePosition) -> Rc<Self> {
        Rc::new(Self {
            parent,
            position,
            state: RefCell::new(FunctionalState::default()),
        })
    }

    /// Bind a declared argument by name.
    pub fn add_argument_binding(&self, graph: &AsgGraph, argument: NodeId) {
        let mut state = self.state.borrow_mut();
        state.arguments.push(argument);
        if let DataValue::Str(name) = graph.data_attr(argument, "name") {
            let name = name.clone();
            state.symbols.entry(name).or_default().insert(0, argument);
        }
    }

    /// The capture binding for an outer beta-replaceable node, synthesizing
    /// a `CapturedValue` node on first sight.
    pub fn valid_capture_binding_for(&self, graph: &mut AsgGraph, captured: NodeId) -> NodeId {
        if let Some(binding) = self.state.borrow().captured_value_table.get(&captured) {
            return *binding;
        }

        let derivation = graph.derivation_of(captured);
        let index = self.state.borrow().captured_values.len() as i64;
        let binding = graph.construct(
            NodeKind::CapturedValue,
            vec![Arg::derivation(derivation), Arg::int(index)],
        );
        let mut state = self.state.borrow_mut();
        state.captured_values.push(captured);
        state.capture_bindings.push(binding);
        state.captured_value_table.insert(captured, binding);
        binding
    }

    /// The synthesized `CapturedValue` nodes, in capture order.
    pub fn capture_bindings(&self) -> Vec<NodeId> {
        self.state.borrow().capture_bindings.clone()
    }

    /// The outer nodes being captured, in capture order.
    pub fn captured_values(&self) -> Vec<NodeId> {
        self.state.borrow().captured_values.clone()
    }

    pub fn arguments(&self) -> Vec<NodeId> {
        self.state.borrow().arguments.clone()
    }
}

impl Environment {
    /// Wrap a top-level environment.
    pub fn top_level(environment: Rc<TopLevelEnv>) -> Self {
        Environment::TopLevel(environment)
    }

    /// The root target environment of this chain.
    pub fn top_level_target_environment(&self) -> Rc<TopLevelEnv> {
        match self {
            Environment::TopLevel(environment) => environment.clone(),
            Environment::Bindings(environment) => {
                environment.parent.top_level_target_environment()
            }
            Environment::Functional(environment) => {
                environment.parent.top_level_target_environment()
            }
            Environment::Script(environment) => environment.parent.top_level_target_environment(),
        }
    }

    pub fn is_script_environment(&self) -> bool {
        matches!(self, Environment::Script(_))
    }

    pub fn is_lexical_environment(&self) -> bool {
        matches!(self, Environment::Functional(_) | Environment::Script(_))
    }

    /// A child environment with one extra binding. Binding-adding never
    /// mutates the receiver: an existing bindings layer is copied.
    pub fn child_with_symbol_binding(&self, symbol: impl Into<SmolStr>, binding: NodeId) -> Self {
        let (parent, mut symbols) = match self {
            Environment::Bindings(environment) => {
                (environment.parent.clone(), environment.symbols.clone())
            }
            other => (other.clone(), IndexMap::new()),
        };
        symbols.entry(symbol.into()).or_default().insert(0, binding);
        Environment::Bindings(Rc::new(BindingsEnv { parent, symbols }))
    }

    /// Resolve a symbol through the chain. A lookup that crosses a
    /// functional boundary and resolves to a beta-replaceable node
    /// synthesizes a captured value and records the capture on that frame.
    pub fn lookup_symbol_recursively(&self, graph: &mut AsgGraph, symbol: &str) -> Option<NodeId> {
        match self {
            Environment::TopLevel(environment) => environment.look_last_binding_of(symbol),
            Environment::Bindings(environment) => {
                if let Some(bindings) = environment.symbols.get(symbol) {
                    return bindings.first().copied();
                }
                environment.parent.lookup_symbol_recursively(graph, symbol)
            }
            Environment::Script(environment) => {
                environment.parent.lookup_symbol_recursively(graph, symbol)
            }
            Environment::Functional(environment) => {
                {
                    let state = environment.state.borrow();
                    if let Some(bindings) = state.symbols.get(symbol) {
                        return bindings.first().copied();
                    }
                    if let Some(binding) = state.captured_symbols.get(symbol) {
                        return Some(*binding);
                    }
                }

                let parent_binding = environment
                    .parent
                    .lookup_symbol_recursively(graph, symbol)?;
                if graph.is_beta_replaceable(parent_binding) {
                    let capture_binding =
                        environment.valid_capture_binding_for(graph, parent_binding);
                    environment
                        .state
                        .borrow_mut()
                        .captured_symbols
                        .insert(symbol.into(), capture_binding);
                    return Some(capture_binding);
                }
                Some(parent_binding)
            }
        }
    }
}

/// The analysis environment for one script file.
pub fn make_script_analysis_environment(
    top_level: Rc<TopLevelEnv>,
    script_path: &str,
) -> Environment {
    let path = std::path::Path::new(script_path);
    let script_directory = path
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default();
    let script_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| script_path.to_string());
    Environment::Script(Rc::new(ScriptEnv {
        parent: Environment::TopLevel(top_level),
        script_directory,
        script_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_builtin_bindings() {
        let mut graph = AsgGraph::new();
        let top_level = TopLevelEnv::new(&mut graph);
        let nil = top_level.look_last_binding_of("nil").unwrap();
        assert_eq!(graph.kind(nil), NodeKind::LiteralNil);
        let stdio = top_level.look_last_binding_of("Stdio").unwrap();
        assert_eq!(graph.kind(stdio), NodeKind::LiteralObject);
        let add = top_level.look_last_binding_of("integerAdd:with:").unwrap();
        assert_eq!(graph.kind(add), NodeKind::LiteralPrimitiveFunction);
        assert!(graph.bool_attr(add, "pure"));
        assert!(graph.bool_attr(add, "compile_time"));
    }

    #[test]
    fn test_child_binding_is_copy_on_write() {
        let mut graph = AsgGraph::new();
        let top_level = TopLevelEnv::new(&mut graph);
        let nil = top_level.look_last_binding_of("nil").unwrap();
        let r#true = top_level.look_last_binding_of("true").unwrap();

        let base = Environment::top_level(top_level);
        let child_a = base.child_with_symbol_binding("x", nil);
        let child_b = child_a.child_with_symbol_binding("x", r#true);
        assert_eq!(
            child_a.lookup_symbol_recursively(&mut graph, "x"),
            Some(nil)
        );
        assert_eq!(
            child_b.lookup_symbol_recursively(&mut graph, "x"),
            Some(r#true)
        );
    }

    #[test]
    fn test_functional_lookup_captures_beta_replaceable_bindings() {
        let mut graph = AsgGraph::new();
        let top_level = TopLevelEnv::new(&mut graph);
        let base = Environment::top_level(top_level);

        let outer_argument = graph.construct(
            NodeKind::Argument,
            vec![
                Arg::derivation(Derivation::None),
                Arg::int(0),
                Arg::str("x"),
            ],
        );
        let with_argument = base.child_with_symbol_binding("x", outer_argument);
        let frame = FunctionalEnv::new(with_argument, SourcePosition::empty());
        let environment = Environment::Functional(frame.clone());

        let binding = environment
            .lookup_symbol_recursively(&mut graph, "x")
            .unwrap();
        assert_eq!(graph.kind(binding), NodeKind::CapturedValue);
        assert_eq!(frame.captured_values(), vec![outer_argument]);
        assert_eq!(frame.capture_bindings(), vec![binding]);

        // A second lookup reuses the recorded capture.
        let again = environment
            .lookup_symbol_recursively(&mut graph, "x")
            .unwrap();
        assert_eq!(binding, again);
        assert_eq!(frame.captured_values().len(), 1);
    }

    #[test]
    fn test_functional_lookup_passes_plain_bindings_through() {
        let mut graph = AsgGraph::new();
        let top_level = TopLevelEnv::new(&mut graph);
        let nil = top_level.look_last_binding_of("nil").unwrap();
        let base = Environment::top_level(top_level);
        let frame = FunctionalEnv::new(base, SourcePosition::empty());
        let environment = Environment::Functional(frame.clone());

        let binding = environment
            .lookup_symbol_recursively(&mut graph, "nil")
            .unwrap();
        assert_eq!(binding, nil);
        assert!(frame.captured_values().is_empty());
    }

    #[test]
    fn test_top_level_unification_table_canonicalizes() {
        let mut graph = AsgGraph::new();
        let top_level = TopLevelEnv::new(&mut graph);
        let nil_a = graph.construct(NodeKind::LiteralNil, vec![Arg::derivation(Derivation::None)]);
        let canonical = top_level.add_unification_value(&graph, nil_a);
        assert_eq!(canonical, top_level.look_last_binding_of("nil").unwrap());
    }
}
