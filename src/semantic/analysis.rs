//! Expansion and analysis: lowering syntax IR to analyzed IR.
//!
//! A dynamic-programming pattern-match pass over the graph. The expander
//! resolves identifiers through the environment chain, rewrites message
//! sends (receiverless sends become applications, receiverful sends become
//! effectful sends threaded on the sequencing spine), analyzes blocks in
//! their own functional frame and builder scope, and passes every result
//! through constant reduction.
//!
//! Failures never abort the pass: they become `Error` nodes in the graph
//! and accumulate on the expander; the caller surfaces them before
//! scheduling.

use smol_str::SmolStr;

use crate::asg::{
    Arg, AsgGraph, Built, BuilderId, Derivation, DynProgMemo, GvnBuilder, KindPattern, MemoEntry,
    NodeId, NodeKind, find_matching_pattern,
};

use super::environment::{Environment, FunctionalEnv};
use super::reduce::ReductionAlgorithm;

/// Result of analyzing one functional: the analyzed root plus every error
/// node recorded along the way.
#[derive(Debug)]
pub struct AnalysisResult {
    pub root: NodeId,
    pub errors: Vec<NodeId>,
}

/// Expand a syntax-IR root into a `TopLevelScript` with its sequencing
/// spine built, accumulating analysis errors.
pub fn expand_and_analyze(
    graph: &mut AsgGraph,
    environment: Environment,
    node: NodeId,
) -> AnalysisResult {
    let mut expander = Expander::new(graph, environment);
    let root = expander.expand_top_level_script(node);
    AnalysisResult {
        root,
        errors: expander.into_errors(),
    }
}

/// A handler either finishes with a node or delegates to another node's
/// expansion under the same memo entry.
enum Step {
    Done(NodeId),
    Continue(NodeId),
}

type ExpandHandler = fn(&mut Expander<'_>, NodeId) -> Step;

/// One expansion scope: the current environment, its builder, and the memo
/// of this scope. Child scopes (blocks) get fresh memos so that
/// environment-dependent resolution is never shared across frames.
struct Frame {
    environment: Environment,
    builder: BuilderId,
    memo: DynProgMemo,
}

/// The expansion-and-analysis algorithm.
pub struct Expander<'g> {
    graph: &'g mut AsgGraph,
    builders: GvnBuilder,
    reduction: ReductionAlgorithm,
    errors: Vec<NodeId>,
    frames: Vec<Frame>,
}

static EXPANSION_PATTERNS: &[KindPattern<ExpandHandler>] = &[
    KindPattern {
        kind: NodeKind::SyntaxError,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_error(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxArray,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_array(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxLiteralArray,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_literal_array(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxBinaryExpressionSequence,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_binary_expression_sequence(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxLiteralInteger,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_literal_integer(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxLiteralFloat,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_literal_float(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxLiteralString,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_literal_string(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxLiteralSymbol,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_literal_symbol(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxLiteralCharacter,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_literal_character(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxIdentifierReference,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_identifier_reference(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxMessageCascade,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_message_cascade(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxMessageSend,
        predicate: Some(|graph, node| graph.optional_input_attr(node, "receiver").is_none()),
        handler: |expander, node| expander.expand_syntax_message_send_without_receiver(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxMessageSend,
        predicate: Some(|graph, node| graph.optional_input_attr(node, "receiver").is_some()),
        handler: |expander, node| expander.expand_syntax_message_send_with_receiver(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxApplication,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_application(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxBlock,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_block(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxSequence,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_sequence(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxLexicalSequence,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_lexical_sequence(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxAssignment,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_assignment(node),
    },
    KindPattern {
        kind: NodeKind::SyntaxReturn,
        predicate: None,
        handler: |expander, node| expander.expand_syntax_return(node),
    },
    KindPattern {
        kind: NodeKind::Syntax,
        predicate: None,
        handler: |expander, node| expander.expand_unhandled_syntax(node),
    },
    // Already-analyzed nodes (environment bindings) pass through.
    KindPattern {
        kind: NodeKind::Analyzed,
        predicate: None,
        handler: |expander, node| expander.expand_analyzed_node(node),
    },
];

impl<'g> Expander<'g> {
    pub fn new(graph: &'g mut AsgGraph, environment: Environment) -> Self {
        Self {
            graph,
            builders: GvnBuilder::new(),
            reduction: ReductionAlgorithm::new(),
            errors: Vec::new(),
            frames: vec![Frame {
                environment,
                builder: GvnBuilder::ROOT,
                memo: DynProgMemo::new(),
            }],
        }
    }

    pub fn errors(&self) -> &[NodeId] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<NodeId> {
        self.errors
    }

    // =========================================================================
    // Frame access
    // =========================================================================

    fn frame(&self) -> &Frame {
        self.frames.last().expect("the frame stack is never empty")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("the frame stack is never empty")
    }

    fn environment(&self) -> Environment {
        self.frame().environment.clone()
    }

    fn set_environment(&mut self, environment: Environment) {
        self.frame_mut().environment = environment;
    }

    fn builder(&self) -> BuilderId {
        self.frame().builder
    }

    fn current_predecessor(&self) -> Option<NodeId> {
        self.builders.current_predecessor(self.builder())
    }

    // =========================================================================
    // Build helpers
    // =========================================================================

    fn build_for(&mut self, syntax_node: NodeId, kind: NodeKind, args: Vec<Arg>) -> Built {
        let builder = self.builder();
        self.builders
            .for_syntax_expansion_build(self.graph, builder, syntax_node, kind, args)
    }

    fn build_and_sequence_for(
        &mut self,
        syntax_node: NodeId,
        kind: NodeKind,
        args: Vec<Arg>,
    ) -> Built {
        let builder = self.builder();
        self.builders.for_syntax_expansion_build_and_sequence(
            self.graph,
            builder,
            syntax_node,
            kind,
            args,
        )
    }

    /// Record an error node for `node`, sequence it, and accumulate it.
    fn make_error_at_node(&mut self, message: impl Into<SmolStr>, node: NodeId) -> NodeId {
        let inner_nodes = if self.graph.kind(node).is_syntax() {
            Vec::new()
        } else {
            vec![node]
        };
        let error = self
            .build_and_sequence_for(
                node,
                NodeKind::Error,
                vec![Arg::str(message), Arg::nodes(inner_nodes)],
            )
            .node();
        self.errors.push(error);
        error
    }

    // =========================================================================
    // The dynamic-programming driver
    // =========================================================================

    /// Expand a node to its analyzed form.
    pub fn expand(&mut self, node: NodeId) -> NodeId {
        self.continue_expanding(node)
    }

    fn continue_expanding(&mut self, node: NodeId) -> NodeId {
        match self.frame().memo.lookup(node) {
            Some(MemoEntry::Done(result)) => return result,
            Some(MemoEntry::InProgress) => {
                return self.make_error_at_node("Circular dependency in expansion.", node);
            }
            None => {}
        }

        let Some(pattern) = find_matching_pattern(EXPANSION_PATTERNS, self.graph, node) else {
            let kind = self.graph.kind(node);
            return self.make_error_at_node(
                format!("No expansion pattern matches node kind {}.", kind.name()),
                node,
            );
        };
        let handler = pattern.handler;

        self.frame_mut().memo.begin(node);
        let result = match handler(self, node) {
            Step::Done(result) => self.reduction.reduce_node(self.graph, result),
            Step::Continue(next) => self.continue_expanding(next),
        };
        self.frame_mut().memo.finish(node, result);
        result
    }

    /// Expand `node` speculatively: on errors, the builder memento is
    /// restored so partial sequencing is not observable, and the errors are
    /// returned instead of accumulated.
    pub fn attempt_expansion_of_node(&mut self, node: NodeId) -> (NodeId, Vec<NodeId>) {
        let builder = self.builder();
        let memento = self.builders.memento(builder);
        let saved_errors = std::mem::take(&mut self.errors);

        let result = self.expand(node);

        let expansion_errors = std::mem::replace(&mut self.errors, saved_errors);
        if !expansion_errors.is_empty() {
            self.builders.restore_memento(builder, memento);
        }
        (result, expansion_errors)
    }

    /// Expand a whole script: entry node, body, return node, and the
    /// `TopLevelScript` wrapper.
    pub fn expand_top_level_script(&mut self, node: NodeId) -> NodeId {
        tracing::debug!("expanding top-level script");
        let entry = self
            .build_and_sequence_for(node, NodeKind::SequenceEntry, vec![])
            .node();
        let script_result = self.expand(node);
        let predecessor = self.current_predecessor();
        let exit = self
            .build_and_sequence_for(
                node,
                NodeKind::SequenceReturn,
                vec![
                    Arg::node(script_result),
                    Arg::named_predecessor("predecessor", predecessor),
                ],
            )
            .node();
        self.build_for(
            node,
            NodeKind::TopLevelScript,
            vec![
                Arg::node(entry),
                Arg::named_predecessor("exit_point", Some(exit)),
            ],
        )
        .node()
    }

    /// Expand a node and read it back as a constant symbol, if it is one.
    fn evaluate_symbol(&mut self, node: NodeId) -> Option<SmolStr> {
        let analyzed = self.expand(node);
        if self.graph.kind(analyzed) == NodeKind::LiteralSymbol {
            Some(self.graph.str_attr(analyzed, "value").clone())
        } else {
            None
        }
    }

    // =========================================================================
    // Patterns
    // =========================================================================

    fn expand_syntax_error(&mut self, node: NodeId) -> Step {
        let message = self.graph.str_attr(node, "message").clone();
        Step::Done(self.make_error_at_node(message, node))
    }

    fn expand_syntax_array(&mut self, node: NodeId) -> Step {
        let elements = self.graph.inputs_attr(node, "elements").to_vec();
        let analyzed: Vec<NodeId> = elements
            .into_iter()
            .map(|element| self.expand(element))
            .collect();
        Step::Done(
            self.build_and_sequence_for(
                node,
                NodeKind::MutableArray,
                vec![Arg::nodes(analyzed)],
            )
            .node(),
        )
    }

    fn expand_syntax_literal_array(&mut self, node: NodeId) -> Step {
        let elements = self.graph.inputs_attr(node, "elements").to_vec();
        let analyzed: Vec<NodeId> = elements
            .into_iter()
            .map(|element| self.expand(element))
            .collect();
        Step::Done(
            self.build_for(node, NodeKind::Array, vec![Arg::nodes(analyzed)])
                .node(),
        )
    }

    /// `e0 op1 e1 op2 e2 ...` becomes a left-associative chain of message
    /// sends re-entered through the expander.
    fn expand_syntax_binary_expression_sequence(&mut self, node: NodeId) -> Step {
        let elements = self.graph.inputs_attr(node, "elements").to_vec();
        debug_assert!(!elements.is_empty());

        let mut previous = elements[0];
        let mut index = 1;
        while index + 1 < elements.len() {
            let operator = elements[index];
            let operand = elements[index + 1];
            previous = self.graph.construct(
                NodeKind::SyntaxMessageSend,
                vec![
                    Arg::derivation(Derivation::SyntaxExpansion { source: node }),
                    Arg::optional_node(Some(previous)),
                    Arg::node(operator),
                    Arg::nodes(vec![operand]),
                ],
            );
            index += 2;
        }
        Step::Continue(previous)
    }

    fn expand_syntax_literal_integer(&mut self, node: NodeId) -> Step {
        let value = self.graph.int_attr(node, "value");
        Step::Done(
            self.build_and_sequence_for(node, NodeKind::LiteralInteger, vec![Arg::int(value)])
                .node(),
        )
    }

    fn expand_syntax_literal_float(&mut self, node: NodeId) -> Step {
        let value = self.graph.data_attr(node, "value").clone();
        Step::Done(
            self.build_and_sequence_for(node, NodeKind::LiteralFloat, vec![Arg::data(value)])
                .node(),
        )
    }

    fn expand_syntax_literal_string(&mut self, node: NodeId) -> Step {
        let value = self.graph.data_attr(node, "value").clone();
        Step::Done(
            self.build_and_sequence_for(node, NodeKind::LiteralString, vec![Arg::data(value)])
                .node(),
        )
    }

    fn expand_syntax_literal_symbol(&mut self, node: NodeId) -> Step {
        let value = self.graph.data_attr(node, "value").clone();
        Step::Done(
            self.build_and_sequence_for(node, NodeKind::LiteralSymbol, vec![Arg::data(value)])
                .node(),
        )
    }

    fn expand_syntax_literal_character(&mut self, node: NodeId) -> Step {
        let value = self.graph.data_attr(node, "value").clone();
        Step::Done(
            self.build_and_sequence_for(node, NodeKind::LiteralCharacter, vec![Arg::data(value)])
                .node(),
        )
    }

    fn expand_syntax_identifier_reference(&mut self, node: NodeId) -> Step {
        let name = self.graph.str_attr(node, "value").clone();
        let environment = self.environment();
        match environment.lookup_symbol_recursively(self.graph, &name) {
            Some(binding) => Step::Continue(binding),
            None => Step::Done(self.make_error_at_node(
                format!("Failed to find a binding for symbol {name}."),
                node,
            )),
        }
    }

    /// The receiver is evaluated once; each cascaded message applies to it
    /// in order, and the last result is the cascade's value.
    fn expand_syntax_message_cascade(&mut self, node: NodeId) -> Step {
        let receiver_syntax = self.graph.input_attr(node, "receiver");
        let messages = self.graph.inputs_attr(node, "messages").to_vec();
        let receiver = self.expand(receiver_syntax);

        let mut result = receiver;
        for message in messages {
            if self.graph.kind(message) == NodeKind::SyntaxCascadeMessage {
                let selector = self.graph.input_attr(message, "selector");
                let arguments = self.graph.inputs_attr(message, "arguments").to_vec();
                let send = self.graph.construct(
                    NodeKind::SyntaxMessageSend,
                    vec![
                        Arg::derivation(Derivation::SyntaxExpansion {
                            source: message,
                        }),
                        Arg::optional_node(Some(receiver)),
                        Arg::node(selector),
                        Arg::nodes(arguments),
                    ],
                );
                result = self.expand(send);
            } else {
                result = self.expand(message);
            }
        }
        Step::Done(result)
    }

    /// A receiverless send requires a constant selector and rewrites into
    /// an application of the identically named binding.
    fn expand_syntax_message_send_without_receiver(&mut self, node: NodeId) -> Step {
        let selector_syntax = self.graph.input_attr(node, "selector");
        let arguments = self.graph.inputs_attr(node, "arguments").to_vec();
        let Some(selector_value) = self.evaluate_symbol(selector_syntax) else {
            // Analyze the arguments anyway to discover more errors.
            for argument in arguments {
                self.expand(argument);
            }
            return Step::Done(self.make_error_at_node(
                "Cannot expand receiverless message send node without constant selector.",
                node,
            ));
        };

        let identifier = self.graph.construct(
            NodeKind::SyntaxIdentifierReference,
            vec![
                Arg::derivation(Derivation::SyntaxExpansion { source: node }),
                Arg::str(selector_value),
            ],
        );
        let application = self.graph.construct(
            NodeKind::SyntaxApplication,
            vec![
                Arg::derivation(Derivation::SyntaxExpansion { source: node }),
                Arg::node(identifier),
                Arg::nodes(arguments),
            ],
        );
        Step::Continue(application)
    }

    fn expand_syntax_message_send_with_receiver(&mut self, node: NodeId) -> Step {
        let selector_syntax = self.graph.input_attr(node, "selector");
        let receiver_syntax = self
            .graph
            .optional_input_attr(node, "receiver")
            .expect("pattern predicate guarantees a receiver");
        let arguments = self.graph.inputs_attr(node, "arguments").to_vec();

        let selector = self.expand(selector_syntax);
        let receiver = self.expand(receiver_syntax);
        let analyzed_arguments: Vec<NodeId> = arguments
            .into_iter()
            .map(|argument| self.expand(argument))
            .collect();

        let predecessor = self.current_predecessor();
        Step::Done(
            self.build_and_sequence_for(
                node,
                NodeKind::FxMessageSend,
                vec![
                    Arg::node(receiver),
                    Arg::node(selector),
                    Arg::nodes(analyzed_arguments),
                    Arg::named_predecessor("predecessor", predecessor),
                ],
            )
            .node(),
        )
    }

    /// Applications of pure (or always-inline) literal primitives stay
    /// pure data so GVN and reduction can fold them; everything else is an
    /// effectful application threaded on the spine.
    fn expand_syntax_application(&mut self, node: NodeId) -> Step {
        let functional_syntax = self.graph.input_attr(node, "functional");
        let arguments = self.graph.inputs_attr(node, "arguments").to_vec();

        let functional = self.expand(functional_syntax);
        let analyzed_arguments: Vec<NodeId> = arguments
            .into_iter()
            .map(|argument| self.expand(argument))
            .collect();

        let is_pure_primitive = self.graph.kind(functional)
            == NodeKind::LiteralPrimitiveFunction
            && (self.graph.bool_attr(functional, "pure")
                || self.graph.bool_attr(functional, "always_inline"));

        if is_pure_primitive {
            return Step::Done(
                self.build_for(
                    node,
                    NodeKind::Application,
                    vec![Arg::node(functional), Arg::nodes(analyzed_arguments)],
                )
                .node(),
            );
        }

        let predecessor = self.current_predecessor();
        Step::Done(
            self.build_and_sequence_for(
                node,
                NodeKind::FxApplication,
                vec![
                    Arg::node(functional),
                    Arg::nodes(analyzed_arguments),
                    Arg::named_predecessor("predecessor", predecessor),
                ],
            )
            .node(),
        )
    }

    /// Blocks get their own functional frame and builder scope. The body is
    /// analyzed down to a `SequenceReturn`; captures recorded on the frame
    /// during analysis become the definition's capture list.
    fn expand_syntax_block(&mut self, node: NodeId) -> Step {
        let position = self.graph.position_of(node);
        let functional_env = FunctionalEnv::new(self.environment(), position);
        let outer_builder = self.builder();
        let child_builder = self.builders.push_child(outer_builder);

        // The first argument is analyzed in the context of the enclosing
        // frame; the rest in the functional frame.
        let syntax_arguments = self.graph.inputs_attr(node, "arguments").to_vec();
        let mut analyzed_arguments = Vec::new();
        for (index, syntax_argument) in syntax_arguments.into_iter().enumerate() {
            if self.graph.kind(syntax_argument) != NodeKind::SyntaxArgument {
                self.expand(syntax_argument);
                continue;
            }
            let name = self.graph.str_attr(syntax_argument, "name").clone();
            let argument_builder = if index == 0 {
                outer_builder
            } else {
                child_builder
            };
            let argument = self
                .builders
                .for_syntax_expansion_build(
                    self.graph,
                    argument_builder,
                    syntax_argument,
                    NodeKind::Argument,
                    vec![Arg::int(index as i64), Arg::str(name)],
                )
                .node();
            functional_env.add_argument_binding(self.graph, argument);
            analyzed_arguments.push(argument);
        }

        self.frames.push(Frame {
            environment: Environment::Functional(functional_env.clone()),
            builder: child_builder,
            memo: DynProgMemo::new(),
        });
        let entry = self
            .build_and_sequence_for(node, NodeKind::SequenceEntry, vec![])
            .node();
        let body_syntax = self.graph.input_attr(node, "body");
        let body = self.expand(body_syntax);
        let body_predecessor = self.current_predecessor();
        let body_return = self
            .build_and_sequence_for(
                node,
                NodeKind::SequenceReturn,
                vec![
                    Arg::node(body),
                    Arg::named_predecessor("predecessor", body_predecessor),
                ],
            )
            .node();
        self.frames.pop();

        tracing::trace!(
            captures = functional_env.captured_values().len(),
            arguments = analyzed_arguments.len(),
            "analyzed block"
        );
        let block_definition = self
            .build_and_sequence_for(
                node,
                NodeKind::BlockDefinition,
                vec![
                    Arg::nodes(functional_env.capture_bindings()),
                    Arg::nodes(analyzed_arguments),
                    Arg::node(entry),
                    Arg::named_predecessor("exit_point", Some(body_return)),
                ],
            )
            .node();
        Step::Done(
            self.build_and_sequence_for(
                node,
                NodeKind::BlockInstance,
                vec![
                    Arg::nodes(functional_env.captured_values()),
                    Arg::node(block_definition),
                ],
            )
            .node(),
        )
    }

    /// Elements are analyzed for effect in order; the last one is the
    /// sequence's value. An empty sequence is nil.
    fn expand_syntax_sequence(&mut self, node: NodeId) -> Step {
        let elements = self.graph.inputs_attr(node, "elements").to_vec();
        self.expand_sequence_elements(node, elements)
    }

    fn expand_sequence_elements(&mut self, node: NodeId, elements: Vec<NodeId>) -> Step {
        if elements.is_empty() {
            return Step::Done(
                self.build_and_sequence_for(node, NodeKind::LiteralNil, vec![])
                    .node(),
            );
        }
        let last = *elements.last().expect("the sequence is non-empty");
        for element in &elements[..elements.len() - 1] {
            self.expand(*element);
        }
        Step::Continue(last)
    }

    /// Local declarations bind to nil; assignments rebind them later.
    /// Pragmas carry no analyzed semantics.
    fn expand_syntax_lexical_sequence(&mut self, node: NodeId) -> Step {
        let locals = self.graph.inputs_attr(node, "locals").to_vec();
        for local in locals {
            if self.graph.kind(local) != NodeKind::SyntaxLocalVariable {
                self.expand(local);
                continue;
            }
            let name = self.graph.str_attr(local, "name").clone();
            let nil = self
                .build_for(local, NodeKind::LiteralNil, vec![])
                .node();
            let environment = self.environment().child_with_symbol_binding(name, nil);
            self.set_environment(environment);
        }

        let elements = self.graph.inputs_attr(node, "elements").to_vec();
        self.expand_sequence_elements(node, elements)
    }

    /// `name := value` analyzes the value and rebinds the identifier for
    /// the rest of the enclosing scope; the assignment's own value is the
    /// assigned one.
    fn expand_syntax_assignment(&mut self, node: NodeId) -> Step {
        let store = self.graph.input_attr(node, "store");
        let value_syntax = self.graph.input_attr(node, "value");
        if self.graph.kind(store) != NodeKind::SyntaxIdentifierReference {
            self.expand(value_syntax);
            return Step::Done(
                self.make_error_at_node("Assignment target must be an identifier.", node),
            );
        }

        let name = self.graph.str_attr(store, "value").clone();
        let value = self.expand(value_syntax);
        let environment = self.environment().child_with_symbol_binding(name, value);
        self.set_environment(environment);
        Step::Done(value)
    }

    /// `^e` in tail position is the value of `e`; the enclosing functional
    /// closes the spine with its own return node.
    fn expand_syntax_return(&mut self, node: NodeId) -> Step {
        Step::Continue(self.graph.input_attr(node, "expression"))
    }

    fn expand_unhandled_syntax(&mut self, node: NodeId) -> Step {
        let kind = self.graph.kind(node);
        Step::Done(self.make_error_at_node(
            format!("Cannot expand syntax node {} in this position.", kind.name()),
            node,
        ))
    }

    fn expand_analyzed_node(&mut self, node: NodeId) -> Step {
        Step::Done(node)
    }
}
