//! Logos-based scanner for the Smalltalk-flavored surface syntax.
//!
//! Fast tokenization using the logos crate. The raw logos tokens are
//! converted into position-carrying [`Token`]s; whitespace and `"..."`
//! comments are consumed here and never reach the parser.

use std::rc::Rc;

use logos::Logos;

use crate::base::{SourceCode, SourcePosition};

/// Token kinds as seen by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EndOfSource,
    Error,

    Character,
    Float,
    Identifier,
    Integer,
    Keyword,
    MultiKeyword,
    Operator,
    String,
    Symbol,

    LeftParent,
    RightParent,
    LeftBracket,
    RightBracket,
    LeftCurlyBracket,
    RightCurlyBracket,
    LessThan,
    GreaterThan,
    Colon,
    Bar,
    Assignment,
    Semicolon,
    Comma,
    Dot,
    Caret,
    LiteralArrayStart,
    ByteArrayStart,
}

/// A scanned token. The position carries the source, so the token text is
/// always recoverable via [`Token::text`].
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub position: SourcePosition,
    pub error_message: Option<&'static str>,
}

impl Token {
    pub fn text(&self) -> &str {
        self.position.text()
    }
}

/// Logos token enum. Trivia is kept as real variants so the scanner wrapper
/// can track line/column across it before dropping it.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum RawToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[\x00-\x20]+")]
    Whitespace,

    #[regex(r#""[^"]*""#, priority = 6)]
    Comment,

    #[regex(r#""[^"]*"#, priority = 5)]
    IncompleteComment,

    // =========================================================================
    // IDENTIFIERS, KEYWORDS
    // =========================================================================
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*:")]
    Keyword,

    #[regex(r"([A-Za-z_][A-Za-z0-9_]*:){2,}")]
    MultiKeyword,

    // =========================================================================
    // NUMBERS
    // =========================================================================
    // A leading sign is part of the number only when directly adjacent to a
    // digit; `1 + 2` scans the `+` as an operator, `1+2` scans `+2`.
    #[regex(r"[+\-]?[0-9]+([rR][0-9A-Za-z_]+)?")]
    Integer,

    #[regex(r"[+\-]?[0-9]+\.[0-9]+([eE][+\-]?[0-9]+)?")]
    Float,

    // =========================================================================
    // STRINGS, SYMBOLS, CHARACTERS
    // =========================================================================
    #[regex(r"'([^']|'')*'", priority = 6)]
    String,

    #[regex(r"'([^']|'')*", priority = 5)]
    IncompleteString,

    #[regex(r"#[A-Za-z_][A-Za-z0-9_]*(:([A-Za-z_][A-Za-z0-9_]*:)*)?")]
    #[regex(r"#[+\-/\\*~<>=@,%|&?!^]+")]
    Symbol,

    #[regex(r"#'([^']|'')*'", priority = 6)]
    SymbolString,

    #[regex(r"#'([^']|'')*", priority = 5)]
    IncompleteSymbolString,

    #[regex(r"\$(?s:.)")]
    Character,

    #[token("$")]
    IncompleteCharacter,

    #[token("#(")]
    LiteralArrayStart,

    #[token("#[")]
    ByteArrayStart,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token("(")]
    LeftParent,
    #[token(")")]
    RightParent,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("{")]
    LeftCurlyBracket,
    #[token("}")]
    RightCurlyBracket,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
    #[token(":=")]
    Assignment,
    #[token(":")]
    Colon,

    // A lone `|` is a Bar (block header, local declarations); a longer
    // operator run that starts with `|` stays an operator.
    #[token("|", priority = 10)]
    Bar,

    #[regex(r"[+\-/\\*~<>=@,%|&?!^]+")]
    Operator,
}

/// Line/column bookkeeping while walking lexemes in order.
struct PositionTracker {
    index: usize,
    line: usize,
    column: usize,
    previous_cr: bool,
}

impl PositionTracker {
    fn new() -> Self {
        Self {
            index: 0,
            line: 1,
            column: 1,
            previous_cr: false,
        }
    }

    fn advance_over(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                '\r' => {
                    self.line += 1;
                    self.column = 1;
                    self.previous_cr = true;
                }
                '\n' => {
                    if !self.previous_cr {
                        self.line += 1;
                        self.column = 1;
                    }
                    self.previous_cr = false;
                }
                _ => {
                    self.column += 1;
                    self.previous_cr = false;
                }
            }
        }
        self.index += text.len();
    }
}

fn classify(raw: RawToken, text: &str) -> (TokenKind, Option<&'static str>) {
    match raw {
        RawToken::Whitespace | RawToken::Comment => unreachable!("trivia is filtered out"),
        RawToken::IncompleteComment => (TokenKind::Error, Some("Incomplete multiline comment.")),
        RawToken::Identifier => (TokenKind::Identifier, None),
        RawToken::Keyword => (TokenKind::Keyword, None),
        RawToken::MultiKeyword => (TokenKind::MultiKeyword, None),
        RawToken::Integer => (TokenKind::Integer, None),
        RawToken::Float => (TokenKind::Float, None),
        RawToken::String => (TokenKind::String, None),
        RawToken::IncompleteString => (TokenKind::Error, Some("Incomplete string literal.")),
        RawToken::Symbol | RawToken::SymbolString => (TokenKind::Symbol, None),
        RawToken::IncompleteSymbolString => {
            (TokenKind::Error, Some("Incomplete symbol string literal."))
        }
        RawToken::Character => (TokenKind::Character, None),
        RawToken::IncompleteCharacter => {
            (TokenKind::Error, Some("Incomplete character literal."))
        }
        RawToken::LiteralArrayStart => (TokenKind::LiteralArrayStart, None),
        RawToken::ByteArrayStart => (TokenKind::ByteArrayStart, None),
        RawToken::LeftParent => (TokenKind::LeftParent, None),
        RawToken::RightParent => (TokenKind::RightParent, None),
        RawToken::LeftBracket => (TokenKind::LeftBracket, None),
        RawToken::RightBracket => (TokenKind::RightBracket, None),
        RawToken::LeftCurlyBracket => (TokenKind::LeftCurlyBracket, None),
        RawToken::RightCurlyBracket => (TokenKind::RightCurlyBracket, None),
        RawToken::Semicolon => (TokenKind::Semicolon, None),
        RawToken::Dot => (TokenKind::Dot, None),
        RawToken::Assignment => (TokenKind::Assignment, None),
        RawToken::Colon => (TokenKind::Colon, None),
        RawToken::Bar => (TokenKind::Bar, None),
        // Single-character runs of `<`, `>` and `^` get dedicated kinds; the
        // parser treats `<` and `>` as binary operators but also needs them
        // for pragma delimiters, and `^` introduces returns.
        RawToken::Operator => match text {
            "<" => (TokenKind::LessThan, None),
            ">" => (TokenKind::GreaterThan, None),
            "^" => (TokenKind::Caret, None),
            _ => (TokenKind::Operator, None),
        },
    }
}

/// Scan a whole source into tokens, ending with an `EndOfSource` token.
pub fn scan_source_code(source: &Rc<SourceCode>) -> Vec<Token> {
    let mut lexer = RawToken::lexer(&source.text);
    let mut tracker = PositionTracker::new();
    let mut tokens = Vec::new();

    while let Some(raw) = lexer.next() {
        let text = lexer.slice();
        let start_index = tracker.index;
        let start_line = tracker.line;
        let start_column = tracker.column;
        tracker.advance_over(text);

        let (kind, error_message) = match raw {
            Ok(RawToken::Whitespace) | Ok(RawToken::Comment) => continue,
            Ok(raw) => classify(raw, text),
            Err(()) => (TokenKind::Error, Some("Unexpected character.")),
        };

        tokens.push(Token {
            kind,
            position: SourcePosition::new(
                source.clone(),
                start_index,
                tracker.index,
                start_line,
                start_column,
                tracker.line,
                tracker.column,
            ),
            error_message,
        });
    }

    tokens.push(Token {
        kind: TokenKind::EndOfSource,
        position: SourcePosition::new(
            source.clone(),
            tracker.index,
            tracker.index,
            tracker.line,
            tracker.column,
            tracker.line,
            tracker.column,
        ),
        error_message: None,
    });
    tokens
}

/// Scan an in-memory string.
pub fn scan_source_string(text: &str, name: &str) -> (Rc<SourceCode>, Vec<Token>) {
    let source = SourceCode::from_string(text, name);
    let tokens = scan_source_code(&source);
    (source, tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let (_, tokens) = scan_source_string(input, "<test>");
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty() {
        assert_eq!(kinds(""), vec![TokenKind::EndOfSource]);
    }

    #[test]
    fn test_comment() {
        assert_eq!(kinds("\"A comment\""), vec![TokenKind::EndOfSource]);
    }

    #[test]
    fn test_incomplete_comment() {
        assert_eq!(kinds("\"A comment"), vec![TokenKind::Error, TokenKind::EndOfSource]);
    }

    #[test]
    fn test_string() {
        assert_eq!(kinds("'My String'"), vec![TokenKind::String, TokenKind::EndOfSource]);
    }

    #[test]
    fn test_incomplete_string() {
        assert_eq!(kinds("'My String"), vec![TokenKind::Error, TokenKind::EndOfSource]);
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            kinds("foo at: 1 put: 2"),
            vec![
                TokenKind::Identifier,
                TokenKind::Keyword,
                TokenKind::Integer,
                TokenKind::Keyword,
                TokenKind::Integer,
                TokenKind::EndOfSource,
            ]
        );
    }

    #[test]
    fn test_multi_keyword() {
        assert_eq!(kinds("at:put:"), vec![TokenKind::MultiKeyword, TokenKind::EndOfSource]);
    }

    #[test]
    fn test_radix_integer() {
        let (_, tokens) = scan_source_string("2r1010 16rFF", "<test>");
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].text(), "2r1010");
        assert_eq!(tokens[1].kind, TokenKind::Integer);
        assert_eq!(tokens[1].text(), "16rFF");
    }

    #[test]
    fn test_float_with_exponent() {
        let (_, tokens) = scan_source_string("3.14 1.0e10", "<test>");
        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(tokens[1].kind, TokenKind::Float);
        assert_eq!(tokens[1].text(), "1.0e10");
    }

    #[test]
    fn test_signed_integer_binds_only_when_adjacent() {
        assert_eq!(
            kinds("1 + 2"),
            vec![
                TokenKind::Integer,
                TokenKind::Operator,
                TokenKind::Integer,
                TokenKind::EndOfSource,
            ]
        );
        assert_eq!(kinds("-42"), vec![TokenKind::Integer, TokenKind::EndOfSource]);
    }

    #[test]
    fn test_symbols() {
        let (_, tokens) = scan_source_string("#foo #at:put: #'quoted sym' #+", "<test>");
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::Symbol));
        assert_eq!(tokens[1].text(), "#at:put:");
        assert_eq!(tokens[3].text(), "#+");
    }

    #[test]
    fn test_literal_array_start() {
        assert_eq!(
            kinds("#(1 2)"),
            vec![
                TokenKind::LiteralArrayStart,
                TokenKind::Integer,
                TokenKind::Integer,
                TokenKind::RightParent,
                TokenKind::EndOfSource,
            ]
        );
    }

    #[test]
    fn test_character() {
        let (_, tokens) = scan_source_string("$a $ ", "<test>");
        assert_eq!(tokens[0].kind, TokenKind::Character);
        // `$ ` is a space character literal, not an incomplete one
        assert_eq!(tokens[1].kind, TokenKind::Character);
    }

    #[test]
    fn test_block_tokens() {
        assert_eq!(
            kinds("[:x | x]"),
            vec![
                TokenKind::LeftBracket,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Bar,
                TokenKind::Identifier,
                TokenKind::RightBracket,
                TokenKind::EndOfSource,
            ]
        );
    }

    #[test]
    fn test_assignment_and_cascade_tokens() {
        assert_eq!(
            kinds("x := y; z."),
            vec![
                TokenKind::Identifier,
                TokenKind::Assignment,
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Identifier,
                TokenKind::Dot,
                TokenKind::EndOfSource,
            ]
        );
    }

    #[test]
    fn test_single_angle_and_caret_get_own_kinds() {
        assert_eq!(
            kinds("< > ^ <="),
            vec![
                TokenKind::LessThan,
                TokenKind::GreaterThan,
                TokenKind::Caret,
                TokenKind::Operator,
                TokenKind::EndOfSource,
            ]
        );
    }

    #[test]
    fn test_string_escape_scans_as_one_token() {
        let (_, tokens) = scan_source_string("'it''s'", "<test>");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text(), "'it''s'");
    }

    #[test]
    fn test_positions_track_lines() {
        let (_, tokens) = scan_source_string("a\nb", "<test>");
        assert_eq!(tokens[0].position.start_line, 1);
        assert_eq!(tokens[1].position.start_line, 2);
        assert_eq!(tokens[1].position.start_column, 1);
    }
}
