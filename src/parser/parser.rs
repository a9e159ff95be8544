//! Recursive descent parser for the Smalltalk-flavored surface syntax.
//!
//! Produces a [`ParseNode`] tree with error recovery: unexpected tokens
//! become embedded `Error` nodes and the parse always completes. Precedence
//! (tightest first): unary postfix sends and applications, binary operator
//! sequences (strict left-to-right, no arithmetic precedence), keyword
//! sends, cascades, assignment, statement sequences.

use std::rc::Rc;

use smol_str::SmolStr;

use crate::base::{SourceCode, SourcePosition};

use super::lexer::{Token, TokenKind, scan_source_string};
use super::parse_tree::{ParseNode, ParseNodeKind};

/// Parse an in-memory string.
pub fn parse_source_string(text: &str, name: &str) -> (Rc<SourceCode>, ParseNode) {
    let (source, tokens) = scan_source_string(text, name);
    (source, parse_tokens(&tokens))
}

/// Parse a pre-scanned token list into a top-level expression tree.
pub fn parse_tokens(tokens: &[Token]) -> ParseNode {
    let mut state = ParserState {
        tokens,
        position: 0,
    };
    state.parse_lexical_sequence_until(TokenKind::EndOfSource)
}

fn is_binary_expression_operator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Operator | TokenKind::LessThan | TokenKind::GreaterThan | TokenKind::Bar
    )
}

/// Unescape a quoted body: `''` collapses to `'`.
fn parse_escaped_string(text: &str) -> String {
    let mut unescaped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' && chars.peek() == Some(&'\'') {
            chars.next();
        }
        unescaped.push(c);
    }
    unescaped
}

/// Parse an integer token, honoring `<radix>r<digits>` notation. A negative
/// radix negates the value (`-2r1010` is -10).
fn parse_integer_constant(text: &str) -> Option<i64> {
    let Some(index) = text.find(['r', 'R']) else {
        return text.parse().ok();
    };
    let radix: i64 = text[..index].parse().ok()?;
    if !(2..=36).contains(&radix.abs()) {
        return None;
    }
    let magnitude = i64::from_str_radix(&text[index + 1..], radix.unsigned_abs() as u32).ok()?;
    Some(if radix < 0 { -magnitude } else { magnitude })
}

struct ParserState<'a> {
    tokens: &'a [Token],
    position: usize,
}

impl<'a> ParserState<'a> {
    // =========================================================================
    // Token inspection and consumption
    // =========================================================================

    fn at_end(&self) -> bool {
        self.peek_kind(0) == TokenKind::EndOfSource
    }

    fn peek_kind(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.position + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::EndOfSource)
    }

    fn peek(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.position + offset)
    }

    fn advance(&mut self) {
        debug_assert!(self.position < self.tokens.len());
        self.position += 1;
    }

    fn next_token(&mut self) -> &'a Token {
        let token = &self.tokens[self.position];
        self.position += 1;
        token
    }

    fn current_source_position(&self) -> SourcePosition {
        if self.position < self.tokens.len() {
            return self.tokens[self.position].position.clone();
        }
        self.tokens
            .last()
            .map(|t| t.position.clone())
            .unwrap_or_else(SourcePosition::empty)
    }

    fn previous_source_position(&self) -> SourcePosition {
        debug_assert!(self.position > 0);
        self.tokens[self.position - 1].position.clone()
    }

    /// Position spanning from the token at `starting_position` through the
    /// previously consumed token.
    fn source_position_from(&self, starting_position: usize) -> SourcePosition {
        let start = self.tokens[starting_position].position.clone();
        if self.position > starting_position {
            start.to(&self.previous_source_position())
        } else {
            start.until(&self.current_source_position())
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    /// Expect `kind` after `node`; on mismatch, wrap `node` together with an
    /// error node into a sequence so the error stays embedded in the tree.
    fn expect_adding_error_to_node(&mut self, expected: TokenKind, node: ParseNode) -> ParseNode {
        if self.peek_kind(0) == expected {
            self.advance();
            return node;
        }
        let error_position = self.current_source_position();
        let error = ParseNode::error(
            error_position.clone(),
            format!("Expected token of kind {expected:?}."),
        );
        let position = node.position.to(&error_position);
        ParseNode::new(
            position,
            ParseNodeKind::Sequence {
                elements: vec![node, error],
            },
        )
    }

    /// Consume one token (propagating scanner error messages) and produce an
    /// error node, so the parser always makes progress.
    fn advance_with_expected_error(&mut self, message: &str) -> ParseNode {
        if self.peek_kind(0) == TokenKind::Error {
            let token = self.next_token();
            let error_message = token.error_message.unwrap_or("Malformed token.");
            return ParseNode::error(token.position.clone(), error_message);
        }
        if self.at_end() {
            return ParseNode::error(self.current_source_position(), message);
        }
        let position = self.current_source_position();
        self.advance();
        ParseNode::error(position, message)
    }

    // =========================================================================
    // Literals
    // =========================================================================

    fn parse_literal_integer(&mut self) -> ParseNode {
        let token = self.next_token();
        match parse_integer_constant(token.text()) {
            Some(value) => ParseNode::new(
                token.position.clone(),
                ParseNodeKind::LiteralInteger { value },
            ),
            None => ParseNode::error(token.position.clone(), "Invalid integer literal."),
        }
    }

    fn parse_literal_float(&mut self) -> ParseNode {
        let token = self.next_token();
        match token.text().parse::<f64>() {
            Ok(value) => ParseNode::new(
                token.position.clone(),
                ParseNodeKind::LiteralFloat { value },
            ),
            Err(_) => ParseNode::error(token.position.clone(), "Invalid float literal."),
        }
    }

    fn parse_literal_string(&mut self) -> ParseNode {
        let token = self.next_token();
        let text = token.text();
        let value = parse_escaped_string(&text[1..text.len() - 1]);
        ParseNode::new(token.position.clone(), ParseNodeKind::LiteralString { value })
    }

    fn parse_literal_character(&mut self) -> ParseNode {
        let token = self.next_token();
        match token.text().chars().nth(1) {
            Some(value) => ParseNode::new(
                token.position.clone(),
                ParseNodeKind::LiteralCharacter { value },
            ),
            None => ParseNode::error(token.position.clone(), "Incomplete character literal."),
        }
    }

    fn parse_literal_symbol(&mut self) -> ParseNode {
        let token = self.next_token();
        let body = &token.text()[1..];
        let value: SmolStr = if body.starts_with('\'') {
            parse_escaped_string(&body[1..body.len() - 1]).into()
        } else {
            body.into()
        };
        ParseNode::new(token.position.clone(), ParseNodeKind::LiteralSymbol { value })
    }

    fn parse_literal(&mut self) -> ParseNode {
        match self.peek_kind(0) {
            TokenKind::Integer => self.parse_literal_integer(),
            TokenKind::Float => self.parse_literal_float(),
            TokenKind::String => self.parse_literal_string(),
            TokenKind::Character => self.parse_literal_character(),
            TokenKind::Symbol => self.parse_literal_symbol(),
            _ => self.advance_with_expected_error("Expected a literal expression."),
        }
    }

    // =========================================================================
    // Terms
    // =========================================================================

    fn parse_identifier(&mut self) -> ParseNode {
        let token = self.next_token();
        ParseNode::new(
            token.position.clone(),
            ParseNodeKind::IdentifierReference {
                name: token.text().into(),
            },
        )
    }

    fn parse_term(&mut self) -> ParseNode {
        match self.peek_kind(0) {
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::LeftParent => self.parse_parenthesis(),
            TokenKind::LeftBracket => self.parse_block(),
            TokenKind::LeftCurlyBracket => self.parse_dynamic_array(),
            TokenKind::LiteralArrayStart => self.parse_literal_array(),
            _ => self.parse_literal(),
        }
    }

    fn parse_parenthesis(&mut self) -> ParseNode {
        debug_assert_eq!(self.peek_kind(0), TokenKind::LeftParent);
        self.advance();

        // `(+)` reads a parenthesized binary operator as an identifier.
        if is_binary_expression_operator(self.peek_kind(0))
            && self.peek_kind(1) == TokenKind::RightParent
        {
            let token = self.next_token();
            self.advance();
            return ParseNode::new(
                token.position.clone(),
                ParseNodeKind::IdentifierReference {
                    name: token.text().into(),
                },
            );
        }

        let expression = self.parse_sequence_until(TokenKind::RightParent);
        self.expect_adding_error_to_node(TokenKind::RightParent, expression)
    }

    fn parse_block(&mut self) -> ParseNode {
        let start = self.position;
        debug_assert_eq!(self.peek_kind(0), TokenKind::LeftBracket);
        self.advance();

        let mut arguments = Vec::new();
        while self.peek_kind(0) == TokenKind::Colon {
            self.advance();
            if self.peek_kind(0) == TokenKind::Identifier {
                let token = self.next_token();
                arguments.push(ParseNode::new(
                    token.position.clone(),
                    ParseNodeKind::Argument {
                        name: token.text().into(),
                    },
                ));
            } else {
                arguments.push(self.advance_with_expected_error("Expected an argument name."));
            }
        }
        if !arguments.is_empty() {
            if self.peek_kind(0) == TokenKind::Bar {
                self.advance();
            } else {
                arguments.push(ParseNode::error(
                    self.current_source_position(),
                    "Expected '|' after block arguments.",
                ));
            }
        }

        let body = self.parse_lexical_sequence_until(TokenKind::RightBracket);
        let body = self.expect_adding_error_to_node(TokenKind::RightBracket, body);
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::Block {
                arguments,
                body: Box::new(body),
            },
        )
    }

    fn parse_dynamic_array(&mut self) -> ParseNode {
        let start = self.position;
        debug_assert_eq!(self.peek_kind(0), TokenKind::LeftCurlyBracket);
        self.advance();
        let mut elements = self.parse_expression_list_until(TokenKind::RightCurlyBracket);
        if self.peek_kind(0) == TokenKind::RightCurlyBracket {
            self.advance();
        } else {
            elements.push(ParseNode::error(
                self.current_source_position(),
                "Expected right curly bracket.",
            ));
        }
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::Array { elements },
        )
    }

    fn parse_literal_array(&mut self) -> ParseNode {
        let start = self.position;
        self.advance(); // #( or nested (
        let mut elements = Vec::new();
        while !self.at_end() && self.peek_kind(0) != TokenKind::RightParent {
            elements.push(self.parse_literal_array_element());
        }
        let node = ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::LiteralArray { elements },
        );
        self.expect_adding_error_to_node(TokenKind::RightParent, node)
    }

    fn parse_literal_array_element(&mut self) -> ParseNode {
        match self.peek_kind(0) {
            TokenKind::Integer
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::Character
            | TokenKind::Symbol => self.parse_literal(),
            // Bare identifiers, keywords and operators inside a literal
            // array denote symbols.
            TokenKind::Identifier
            | TokenKind::Keyword
            | TokenKind::MultiKeyword
            | TokenKind::Operator
            | TokenKind::LessThan
            | TokenKind::GreaterThan
            | TokenKind::Caret
            | TokenKind::Bar => {
                let token = self.next_token();
                ParseNode::new(
                    token.position.clone(),
                    ParseNodeKind::LiteralSymbol {
                        value: token.text().into(),
                    },
                )
            }
            TokenKind::LiteralArrayStart | TokenKind::LeftParent => self.parse_literal_array(),
            _ => self.advance_with_expected_error("Expected a literal array element."),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_unary_postfix_expression(&mut self) -> ParseNode {
        let start = self.position;
        let mut receiver = self.parse_term();
        loop {
            match self.peek_kind(0) {
                TokenKind::Identifier => {
                    let token = self.next_token();
                    let selector = ParseNode::new(
                        token.position.clone(),
                        ParseNodeKind::LiteralSymbol {
                            value: token.text().into(),
                        },
                    );
                    let position = receiver.position.to(&selector.position);
                    receiver = ParseNode::new(
                        position,
                        ParseNodeKind::MessageSend {
                            receiver: Some(Box::new(receiver)),
                            selector: Box::new(selector),
                            arguments: Vec::new(),
                        },
                    );
                }
                TokenKind::LeftParent => {
                    self.advance();
                    let mut arguments = self.parse_expression_list_until(TokenKind::RightParent);
                    if self.peek_kind(0) == TokenKind::RightParent {
                        self.advance();
                    } else {
                        arguments.push(ParseNode::error(
                            self.current_source_position(),
                            "Expected right parenthesis.",
                        ));
                    }
                    receiver = ParseNode::new(
                        self.source_position_from(start),
                        ParseNodeKind::Application {
                            functional: Box::new(receiver),
                            arguments,
                        },
                    );
                }
                _ => break,
            }
        }
        receiver
    }

    fn parse_binary_expression_sequence(&mut self) -> ParseNode {
        let start = self.position;
        let operand = self.parse_unary_postfix_expression();
        if !is_binary_expression_operator(self.peek_kind(0)) {
            return operand;
        }

        let mut elements = vec![operand];
        while is_binary_expression_operator(self.peek_kind(0)) {
            let operator_token = self.next_token();
            elements.push(ParseNode::new(
                operator_token.position.clone(),
                ParseNodeKind::LiteralSymbol {
                    value: operator_token.text().into(),
                },
            ));
            elements.push(self.parse_unary_postfix_expression());
        }
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::BinaryExpressionSequence { elements },
        )
    }

    /// Parse a run of `keyword: argument` pairs, returning the glued selector
    /// symbol and the arguments.
    fn parse_keyword_run(&mut self) -> (ParseNode, Vec<ParseNode>) {
        debug_assert_eq!(self.peek_kind(0), TokenKind::Keyword);
        let mut selector_text = String::new();
        let mut arguments = Vec::new();
        let first_position = self.current_source_position();
        let mut last_position = first_position.clone();
        while self.peek_kind(0) == TokenKind::Keyword {
            let keyword_token = self.next_token();
            last_position = keyword_token.position.clone();
            selector_text.push_str(keyword_token.text());
            arguments.push(self.parse_binary_expression_sequence());
        }
        let selector = ParseNode::new(
            first_position.to(&last_position),
            ParseNodeKind::LiteralSymbol {
                value: selector_text.into(),
            },
        );
        (selector, arguments)
    }

    /// A keyword expression with no receiver, e.g. `printNl: 42`, becomes a
    /// receiverless message send (expanded later into an application).
    fn parse_keyword_application(&mut self) -> ParseNode {
        let start = self.position;
        let (selector, arguments) = self.parse_keyword_run();
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::MessageSend {
                receiver: None,
                selector: Box::new(selector),
                arguments,
            },
        )
    }

    fn parse_keyword_message_send(&mut self) -> ParseNode {
        let start = self.position;
        let receiver = self.parse_binary_expression_sequence();
        if self.peek_kind(0) != TokenKind::Keyword {
            return receiver;
        }
        let (selector, arguments) = self.parse_keyword_run();
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::MessageSend {
                receiver: Some(Box::new(receiver)),
                selector: Box::new(selector),
                arguments,
            },
        )
    }

    fn parse_cascaded_message(&mut self) -> ParseNode {
        let start = self.position;
        match self.peek_kind(0) {
            TokenKind::Identifier => {
                let token = self.next_token();
                let selector = ParseNode::new(
                    token.position.clone(),
                    ParseNodeKind::LiteralSymbol {
                        value: token.text().into(),
                    },
                );
                ParseNode::new(
                    self.source_position_from(start),
                    ParseNodeKind::CascadeMessage {
                        selector: Box::new(selector),
                        arguments: Vec::new(),
                    },
                )
            }
            TokenKind::Keyword => {
                let (selector, arguments) = self.parse_keyword_run();
                ParseNode::new(
                    self.source_position_from(start),
                    ParseNodeKind::CascadeMessage {
                        selector: Box::new(selector),
                        arguments,
                    },
                )
            }
            _ => self.advance_with_expected_error("Expected a cascaded message send."),
        }
    }

    fn parse_message_send_cascade(&mut self) -> ParseNode {
        let start = self.position;
        let first_message = self.parse_keyword_message_send();
        if self.peek_kind(0) != TokenKind::Semicolon {
            return first_message;
        }

        let (receiver, first_cascaded) = first_message.into_cascade_receiver_and_first_message();
        let mut messages = Vec::new();
        if let Some(first_cascaded) = first_cascaded {
            messages.push(first_cascaded);
        }
        while self.peek_kind(0) == TokenKind::Semicolon {
            self.advance();
            messages.push(self.parse_cascaded_message());
        }
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::MessageCascade {
                receiver: Box::new(receiver),
                messages,
            },
        )
    }

    fn parse_low_precedence_expression(&mut self) -> ParseNode {
        if self.peek_kind(0) == TokenKind::Keyword {
            return self.parse_keyword_application();
        }
        self.parse_message_send_cascade()
    }

    fn parse_assignment_expression(&mut self) -> ParseNode {
        let start = self.position;
        let store = self.parse_low_precedence_expression();
        if self.peek_kind(0) != TokenKind::Assignment {
            return store;
        }
        self.advance();
        let value = self.parse_assignment_expression();
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::Assignment {
                store: Box::new(store),
                value: Box::new(value),
            },
        )
    }

    fn parse_expression(&mut self) -> ParseNode {
        self.parse_assignment_expression()
    }

    /// A statement is an expression, optionally introduced by `^`.
    fn parse_statement(&mut self) -> ParseNode {
        if self.peek_kind(0) == TokenKind::Caret {
            let start = self.position;
            self.advance();
            let expression = self.parse_expression();
            return ParseNode::new(
                self.source_position_from(start),
                ParseNodeKind::Return {
                    expression: Box::new(expression),
                },
            );
        }
        self.parse_expression()
    }

    // =========================================================================
    // Sequences
    // =========================================================================

    fn parse_expression_list_until(&mut self, delimiter: TokenKind) -> Vec<ParseNode> {
        let mut elements = Vec::new();

        // Chop the initial dots
        while self.peek_kind(0) == TokenKind::Dot {
            self.advance();
        }

        let mut expects_expression = true;
        while !self.at_end() && self.peek_kind(0) != delimiter {
            if !expects_expression {
                elements.push(ParseNode::error(
                    self.current_source_position(),
                    "Expected dot before expression.",
                ));
            }
            elements.push(self.parse_statement());

            expects_expression = false;
            while self.peek_kind(0) == TokenKind::Dot {
                expects_expression = true;
                self.advance();
            }
        }
        elements
    }

    fn parse_sequence_until(&mut self, delimiter: TokenKind) -> ParseNode {
        let start = self.position;
        let mut elements = self.parse_expression_list_until(delimiter);
        if elements.len() == 1 {
            return elements.pop().unwrap();
        }
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::Sequence { elements },
        )
    }

    fn parse_pragma(&mut self) -> ParseNode {
        let start = self.position;
        debug_assert_eq!(self.peek_kind(0), TokenKind::LessThan);
        self.advance();

        let pragma = match self.peek_kind(0) {
            TokenKind::Keyword => {
                let mut selector_text = String::new();
                let mut arguments = Vec::new();
                let first_position = self.current_source_position();
                let mut last_position = first_position.clone();
                while self.peek_kind(0) == TokenKind::Keyword {
                    let keyword_token = self.next_token();
                    last_position = keyword_token.position.clone();
                    selector_text.push_str(keyword_token.text());
                    // Pragma arguments stop short of binary operators so the
                    // closing `>` is not swallowed as an operator.
                    arguments.push(self.parse_unary_postfix_expression());
                }
                let selector = ParseNode::new(
                    first_position.to(&last_position),
                    ParseNodeKind::LiteralSymbol {
                        value: selector_text.into(),
                    },
                );
                ParseNode::new(
                    self.source_position_from(start),
                    ParseNodeKind::Pragma {
                        selector: Box::new(selector),
                        arguments,
                    },
                )
            }
            TokenKind::Identifier => {
                let token = self.next_token();
                let selector = ParseNode::new(
                    token.position.clone(),
                    ParseNodeKind::LiteralSymbol {
                        value: token.text().into(),
                    },
                );
                ParseNode::new(
                    self.source_position_from(start),
                    ParseNodeKind::Pragma {
                        selector: Box::new(selector),
                        arguments: Vec::new(),
                    },
                )
            }
            _ => self.advance_with_expected_error("Expected a pragma selector."),
        };
        self.expect_adding_error_to_node(TokenKind::GreaterThan, pragma)
    }

    /// A lexical sequence allows pragmas and `| local |` declarations at its
    /// head; without either it degrades to a plain sequence (or the single
    /// statement itself).
    fn parse_lexical_sequence_until(&mut self, delimiter: TokenKind) -> ParseNode {
        let start = self.position;

        let mut pragmas = Vec::new();
        while self.peek_kind(0) == TokenKind::LessThan {
            pragmas.push(self.parse_pragma());
        }

        let mut locals = Vec::new();
        let mut has_local_declarations = false;
        if self.peek_kind(0) == TokenKind::Bar {
            has_local_declarations = true;
            self.advance();
            while self.peek_kind(0) == TokenKind::Identifier {
                let token = self.next_token();
                locals.push(ParseNode::new(
                    token.position.clone(),
                    ParseNodeKind::LocalVariable {
                        name: token.text().into(),
                    },
                ));
            }
            if self.peek_kind(0) == TokenKind::Bar {
                self.advance();
            } else {
                locals.push(ParseNode::error(
                    self.current_source_position(),
                    "Expected '|' after local variable declarations.",
                ));
            }
        }

        let mut elements = self.parse_expression_list_until(delimiter);
        if pragmas.is_empty() && !has_local_declarations {
            if elements.len() == 1 {
                return elements.pop().unwrap();
            }
            return ParseNode::new(
                self.source_position_from(start),
                ParseNodeKind::Sequence { elements },
            );
        }
        ParseNode::new(
            self.source_position_from(start),
            ParseNodeKind::LexicalSequence {
                locals,
                pragmas,
                elements,
            },
        )
    }
}
