//! Parse-tree data types.
//!
//! Every node carries its [`SourcePosition`]. Scanner and parser errors are
//! embedded in the tree as `Error` nodes rather than aborting the parse; a
//! walk with [`collect_errors`] recovers them for reporting.

use smol_str::SmolStr;

use crate::base::SourcePosition;

/// A parse-tree node: a position plus a tagged variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseNode {
    pub position: SourcePosition,
    pub kind: ParseNodeKind,
}

/// The closed set of parse-tree variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseNodeKind {
    Error {
        message: String,
        inner: Vec<ParseNode>,
    },
    Application {
        functional: Box<ParseNode>,
        arguments: Vec<ParseNode>,
    },
    Assignment {
        store: Box<ParseNode>,
        value: Box<ParseNode>,
    },
    Argument {
        name: SmolStr,
    },
    Array {
        elements: Vec<ParseNode>,
    },
    LiteralArray {
        elements: Vec<ParseNode>,
    },
    BinaryExpressionSequence {
        elements: Vec<ParseNode>,
    },
    Block {
        arguments: Vec<ParseNode>,
        body: Box<ParseNode>,
    },
    CascadeMessage {
        selector: Box<ParseNode>,
        arguments: Vec<ParseNode>,
    },
    IdentifierReference {
        name: SmolStr,
    },
    LexicalSequence {
        locals: Vec<ParseNode>,
        pragmas: Vec<ParseNode>,
        elements: Vec<ParseNode>,
    },
    LocalVariable {
        name: SmolStr,
    },
    LiteralCharacter {
        value: char,
    },
    LiteralFloat {
        value: f64,
    },
    LiteralInteger {
        value: i64,
    },
    LiteralSymbol {
        value: SmolStr,
    },
    LiteralString {
        value: String,
    },
    MessageCascade {
        receiver: Box<ParseNode>,
        messages: Vec<ParseNode>,
    },
    MessageSend {
        receiver: Option<Box<ParseNode>>,
        selector: Box<ParseNode>,
        arguments: Vec<ParseNode>,
    },
    Pragma {
        selector: Box<ParseNode>,
        arguments: Vec<ParseNode>,
    },
    Return {
        expression: Box<ParseNode>,
    },
    Sequence {
        elements: Vec<ParseNode>,
    },
}

impl ParseNode {
    pub fn new(position: SourcePosition, kind: ParseNodeKind) -> Self {
        Self { position, kind }
    }

    pub fn error(position: SourcePosition, message: impl Into<String>) -> Self {
        Self::new(
            position,
            ParseNodeKind::Error {
                message: message.into(),
                inner: Vec::new(),
            },
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ParseNodeKind::Error { .. })
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, ParseNodeKind::Sequence { .. })
    }

    pub fn is_literal_integer(&self) -> bool {
        matches!(self.kind, ParseNodeKind::LiteralInteger { .. })
    }

    pub fn is_message_send(&self) -> bool {
        matches!(self.kind, ParseNodeKind::MessageSend { .. })
    }

    pub fn is_message_cascade(&self) -> bool {
        matches!(self.kind, ParseNodeKind::MessageCascade { .. })
    }

    pub fn is_binary_expression_sequence(&self) -> bool {
        matches!(self.kind, ParseNodeKind::BinaryExpressionSequence { .. })
    }

    /// Split a message send (or the tail of a binary expression sequence)
    /// into a cascade receiver and its first cascaded message.
    ///
    /// `a foo: 1; bar` cascades `foo: 1` and `bar` to `a`, so the receiver of
    /// the first message becomes the cascade receiver. Plain expressions
    /// cascade with no leading message: `a; bar` sends only `bar`.
    pub fn into_cascade_receiver_and_first_message(self) -> (ParseNode, Option<ParseNode>) {
        let position = self.position.clone();
        match self.kind {
            ParseNodeKind::MessageSend {
                receiver: Some(receiver),
                selector,
                arguments,
            } => (
                *receiver,
                Some(ParseNode::new(
                    position,
                    ParseNodeKind::CascadeMessage {
                        selector,
                        arguments,
                    },
                )),
            ),
            ParseNodeKind::BinaryExpressionSequence { mut elements } if elements.len() >= 3 => {
                let operand = elements.pop().unwrap();
                let operator = elements.pop().unwrap();
                let receiver = if elements.len() == 1 {
                    elements.pop().unwrap()
                } else {
                    ParseNode::new(
                        position.clone(),
                        ParseNodeKind::BinaryExpressionSequence { elements },
                    )
                };
                let message = ParseNode::new(
                    position,
                    ParseNodeKind::CascadeMessage {
                        selector: Box::new(operator),
                        arguments: vec![operand],
                    },
                );
                (receiver, Some(message))
            }
            kind => (ParseNode::new(position, kind), None),
        }
    }
}

/// Collect every error node in the tree, in source order.
pub fn collect_errors(node: &ParseNode) -> Vec<(&SourcePosition, &str)> {
    let mut errors = Vec::new();
    collect_errors_into(node, &mut errors);
    errors
}

fn collect_errors_into<'a>(node: &'a ParseNode, errors: &mut Vec<(&'a SourcePosition, &'a str)>) {
    if let ParseNodeKind::Error { message, .. } = &node.kind {
        errors.push((&node.position, message));
    }
    for child in children_of(node) {
        collect_errors_into(child, errors);
    }
}

fn children_of(node: &ParseNode) -> Vec<&ParseNode> {
    match &node.kind {
        ParseNodeKind::Error { inner, .. } => inner.iter().collect(),
        ParseNodeKind::Application {
            functional,
            arguments,
        } => std::iter::once(&**functional).chain(arguments).collect(),
        ParseNodeKind::Assignment { store, value } => vec![&**store, &**value],
        ParseNodeKind::Argument { .. }
        | ParseNodeKind::IdentifierReference { .. }
        | ParseNodeKind::LocalVariable { .. }
        | ParseNodeKind::LiteralCharacter { .. }
        | ParseNodeKind::LiteralFloat { .. }
        | ParseNodeKind::LiteralInteger { .. }
        | ParseNodeKind::LiteralSymbol { .. }
        | ParseNodeKind::LiteralString { .. } => Vec::new(),
        ParseNodeKind::Array { elements }
        | ParseNodeKind::LiteralArray { elements }
        | ParseNodeKind::BinaryExpressionSequence { elements }
        | ParseNodeKind::Sequence { elements } => elements.iter().collect(),
        ParseNodeKind::Block { arguments, body } => {
            arguments.iter().chain(std::iter::once(&**body)).collect()
        }
        ParseNodeKind::CascadeMessage {
            selector,
            arguments,
        }
        | ParseNodeKind::Pragma {
            selector,
            arguments,
        } => std::iter::once(&**selector).chain(arguments).collect(),
        ParseNodeKind::LexicalSequence {
            locals,
            pragmas,
            elements,
        } => locals.iter().chain(pragmas).chain(elements).collect(),
        ParseNodeKind::MessageCascade { receiver, messages } => {
            std::iter::once(&**receiver).chain(messages).collect()
        }
        ParseNodeKind::MessageSend {
            receiver,
            selector,
            arguments,
        } => receiver
            .iter()
            .map(|r| &**r)
            .chain(std::iter::once(&**selector))
            .chain(arguments)
            .collect(),
        ParseNodeKind::Return { expression } => vec![&**expression],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(kind: ParseNodeKind) -> ParseNode {
        ParseNode::new(SourcePosition::empty(), kind)
    }

    #[test]
    fn test_cascade_split_of_message_send() {
        let send = at(ParseNodeKind::MessageSend {
            receiver: Some(Box::new(at(ParseNodeKind::IdentifierReference {
                name: "a".into(),
            }))),
            selector: Box::new(at(ParseNodeKind::LiteralSymbol { value: "foo:".into() })),
            arguments: vec![at(ParseNodeKind::LiteralInteger { value: 1 })],
        });
        let (receiver, first) = send.into_cascade_receiver_and_first_message();
        assert!(matches!(
            receiver.kind,
            ParseNodeKind::IdentifierReference { .. }
        ));
        assert!(matches!(
            first.unwrap().kind,
            ParseNodeKind::CascadeMessage { .. }
        ));
    }

    #[test]
    fn test_cascade_split_of_binary_sequence() {
        let sequence = at(ParseNodeKind::BinaryExpressionSequence {
            elements: vec![
                at(ParseNodeKind::LiteralInteger { value: 1 }),
                at(ParseNodeKind::LiteralSymbol { value: "+".into() }),
                at(ParseNodeKind::LiteralInteger { value: 2 }),
                at(ParseNodeKind::LiteralSymbol { value: "*".into() }),
                at(ParseNodeKind::LiteralInteger { value: 3 }),
            ],
        });
        let (receiver, first) = sequence.into_cascade_receiver_and_first_message();
        // The receiver keeps `1 + 2`; the cascaded message is `* 3`.
        match receiver.kind {
            ParseNodeKind::BinaryExpressionSequence { elements } => assert_eq!(elements.len(), 3),
            other => panic!("expected binary sequence, got {other:?}"),
        }
        match first.unwrap().kind {
            ParseNodeKind::CascadeMessage { arguments, .. } => assert_eq!(arguments.len(), 1),
            other => panic!("expected cascade message, got {other:?}"),
        }
    }

    #[test]
    fn test_collect_errors_walks_nested_nodes() {
        let tree = at(ParseNodeKind::Sequence {
            elements: vec![
                at(ParseNodeKind::LiteralInteger { value: 1 }),
                ParseNode::error(SourcePosition::empty(), "boom"),
            ],
        });
        let errors = collect_errors(&tree);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1, "boom");
    }
}
