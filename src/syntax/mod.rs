//! Lowering from the parse tree into the syntax IR.
//!
//! The syntax IR mirrors the parse tree one-to-one using the shared graph
//! node machinery; every lowered node carries a source-code derivation
//! pointing back at its position. Syntax nodes are constructed directly on
//! the graph (no GVN): their identity is positional, one node per
//! occurrence in the source.

use crate::asg::{Arg, AsgGraph, DataValue, Derivation, NodeId, NodeKind};
use crate::parser::{ParseNode, ParseNodeKind};

/// Lower a parse tree into syntax-IR nodes, returning the root.
pub fn lower_parse_tree(graph: &mut AsgGraph, node: &ParseNode) -> NodeId {
    let derivation = Arg::derivation(Derivation::SourceCode(node.position.clone()));
    match &node.kind {
        ParseNodeKind::Error { message, inner } => {
            let inner = lower_all(graph, inner);
            graph.construct(
                NodeKind::SyntaxError,
                vec![derivation, Arg::str(message.as_str()), Arg::nodes(inner)],
            )
        }
        ParseNodeKind::Application {
            functional,
            arguments,
        } => {
            let functional = lower_parse_tree(graph, functional);
            let arguments = lower_all(graph, arguments);
            graph.construct(
                NodeKind::SyntaxApplication,
                vec![derivation, Arg::node(functional), Arg::nodes(arguments)],
            )
        }
        ParseNodeKind::Assignment { store, value } => {
            let store = lower_parse_tree(graph, store);
            let value = lower_parse_tree(graph, value);
            graph.construct(
                NodeKind::SyntaxAssignment,
                vec![derivation, Arg::node(store), Arg::node(value)],
            )
        }
        ParseNodeKind::Argument { name } => graph.construct(
            NodeKind::SyntaxArgument,
            vec![derivation, Arg::str(name.clone())],
        ),
        ParseNodeKind::Array { elements } => {
            let elements = lower_all(graph, elements);
            graph.construct(
                NodeKind::SyntaxArray,
                vec![derivation, Arg::nodes(elements)],
            )
        }
        ParseNodeKind::LiteralArray { elements } => {
            let elements = lower_all(graph, elements);
            graph.construct(
                NodeKind::SyntaxLiteralArray,
                vec![derivation, Arg::nodes(elements)],
            )
        }
        ParseNodeKind::BinaryExpressionSequence { elements } => {
            let elements = lower_all(graph, elements);
            graph.construct(
                NodeKind::SyntaxBinaryExpressionSequence,
                vec![derivation, Arg::nodes(elements)],
            )
        }
        ParseNodeKind::Block { arguments, body } => {
            let arguments = lower_all(graph, arguments);
            let body = lower_parse_tree(graph, body);
            graph.construct(
                NodeKind::SyntaxBlock,
                vec![derivation, Arg::nodes(arguments), Arg::node(body)],
            )
        }
        ParseNodeKind::CascadeMessage {
            selector,
            arguments,
        } => {
            let selector = lower_parse_tree(graph, selector);
            let arguments = lower_all(graph, arguments);
            graph.construct(
                NodeKind::SyntaxCascadeMessage,
                vec![derivation, Arg::node(selector), Arg::nodes(arguments)],
            )
        }
        ParseNodeKind::IdentifierReference { name } => graph.construct(
            NodeKind::SyntaxIdentifierReference,
            vec![derivation, Arg::str(name.clone())],
        ),
        ParseNodeKind::LexicalSequence {
            locals,
            pragmas,
            elements,
        } => {
            let locals = lower_all(graph, locals);
            let pragmas = lower_all(graph, pragmas);
            let elements = lower_all(graph, elements);
            graph.construct(
                NodeKind::SyntaxLexicalSequence,
                vec![
                    derivation,
                    Arg::nodes(locals),
                    Arg::nodes(pragmas),
                    Arg::nodes(elements),
                ],
            )
        }
        ParseNodeKind::LocalVariable { name } => graph.construct(
            NodeKind::SyntaxLocalVariable,
            vec![derivation, Arg::str(name.clone())],
        ),
        ParseNodeKind::LiteralCharacter { value } => graph.construct(
            NodeKind::SyntaxLiteralCharacter,
            vec![derivation, Arg::data(DataValue::Char(*value))],
        ),
        ParseNodeKind::LiteralFloat { value } => graph.construct(
            NodeKind::SyntaxLiteralFloat,
            vec![derivation, Arg::data(DataValue::Float(*value))],
        ),
        ParseNodeKind::LiteralInteger { value } => graph.construct(
            NodeKind::SyntaxLiteralInteger,
            vec![derivation, Arg::int(*value)],
        ),
        ParseNodeKind::LiteralSymbol { value } => graph.construct(
            NodeKind::SyntaxLiteralSymbol,
            vec![derivation, Arg::str(value.clone())],
        ),
        ParseNodeKind::LiteralString { value } => graph.construct(
            NodeKind::SyntaxLiteralString,
            vec![derivation, Arg::str(value.as_str())],
        ),
        ParseNodeKind::MessageCascade { receiver, messages } => {
            let receiver = lower_parse_tree(graph, receiver);
            let messages = lower_all(graph, messages);
            graph.construct(
                NodeKind::SyntaxMessageCascade,
                vec![derivation, Arg::node(receiver), Arg::nodes(messages)],
            )
        }
        ParseNodeKind::MessageSend {
            receiver,
            selector,
            arguments,
        } => {
            let receiver = receiver
                .as_ref()
                .map(|receiver| lower_parse_tree(graph, receiver));
            let selector = lower_parse_tree(graph, selector);
            let arguments = lower_all(graph, arguments);
            graph.construct(
                NodeKind::SyntaxMessageSend,
                vec![
                    derivation,
                    Arg::optional_node(receiver),
                    Arg::node(selector),
                    Arg::nodes(arguments),
                ],
            )
        }
        ParseNodeKind::Pragma {
            selector,
            arguments,
        } => {
            let selector = lower_parse_tree(graph, selector);
            let arguments = lower_all(graph, arguments);
            graph.construct(
                NodeKind::SyntaxPragma,
                vec![derivation, Arg::node(selector), Arg::nodes(arguments)],
            )
        }
        ParseNodeKind::Return { expression } => {
            let expression = lower_parse_tree(graph, expression);
            graph.construct(
                NodeKind::SyntaxReturn,
                vec![derivation, Arg::node(expression)],
            )
        }
        ParseNodeKind::Sequence { elements } => {
            let elements = lower_all(graph, elements);
            graph.construct(
                NodeKind::SyntaxSequence,
                vec![derivation, Arg::nodes(elements)],
            )
        }
    }
}

fn lower_all(graph: &mut AsgGraph, nodes: &[ParseNode]) -> Vec<NodeId> {
    nodes
        .iter()
        .map(|node| lower_parse_tree(graph, node))
        .collect()
}
