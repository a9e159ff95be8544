//! Position tracking for parse-tree and graph nodes.
//!
//! Positions carry both byte indices (for slicing token text out of the
//! source) and 1-indexed line/column pairs (for diagnostics).

use std::fmt;
use std::rc::Rc;

/// A loaded source file or string.
///
/// Positions hold an `Rc<SourceCode>`, so the text is read once and shared
/// by every token and node derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCode {
    pub directory: Option<String>,
    pub name: String,
    pub language: String,
    pub text: String,
}

impl SourceCode {
    pub fn new(directory: Option<String>, name: impl Into<String>, text: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            directory,
            name: name.into(),
            language: "smalltalk".to_string(),
            text: text.into(),
        })
    }

    /// Wrap an in-memory string, named `<string>` unless told otherwise.
    pub fn from_string(text: impl Into<String>, name: impl Into<String>) -> Rc<Self> {
        Self::new(None, name, text)
    }
}

impl fmt::Display for SourceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.directory {
            Some(dir) if !dir.is_empty() => write!(f, "{}/{}", dir, self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// A region of source code (byte span + 1-indexed line/column coordinates).
///
/// The empty position (used for synthesized nodes with no source) displays
/// as `<no position>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub source: Option<Rc<SourceCode>>,
    pub start_index: usize,
    pub end_index: usize,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourcePosition {
    pub fn new(
        source: Rc<SourceCode>,
        start_index: usize,
        end_index: usize,
        start_line: usize,
        start_column: usize,
        end_line: usize,
        end_column: usize,
    ) -> Self {
        Self {
            source: Some(source),
            start_index,
            end_index,
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// The empty position for nodes with no source derivation.
    pub fn empty() -> Self {
        Self {
            source: None,
            start_index: 0,
            end_index: 0,
            start_line: 0,
            start_column: 0,
            end_line: 0,
            end_column: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none()
    }

    /// The source text covered by this position.
    pub fn text(&self) -> &str {
        match &self.source {
            Some(source) => &source.text[self.start_index..self.end_index],
            None => "",
        }
    }

    /// Span from the start of `self` up to (but not including) the start of `end`.
    pub fn until(&self, end: &SourcePosition) -> SourcePosition {
        SourcePosition {
            source: self.source.clone(),
            start_index: self.start_index,
            end_index: end.start_index,
            start_line: self.start_line,
            start_column: self.start_column,
            end_line: end.start_line,
            end_column: end.start_column,
        }
    }

    /// Span from the start of `self` through the end of `end`.
    pub fn to(&self, end: &SourcePosition) -> SourcePosition {
        SourcePosition {
            source: self.source.clone(),
            start_index: self.start_index,
            end_index: end.end_index,
            start_line: self.start_line,
            start_column: self.start_column,
            end_line: end.end_line,
            end_column: end.end_column,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(
                f,
                "{}:{}.{}-{}.{}",
                source, self.start_line, self.start_column, self.end_line, self.end_column
            ),
            None => write!(f, "<no position>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_text() {
        let source = SourceCode::from_string("hello world", "<string>");
        let position = SourcePosition::new(source, 0, 5, 1, 1, 1, 6);
        assert_eq!(position.text(), "hello");
    }

    #[test]
    fn test_position_display() {
        let source = SourceCode::from_string("x", "script.st");
        let position = SourcePosition::new(source, 0, 1, 1, 1, 1, 2);
        assert_eq!(position.to_string(), "script.st:1.1-1.2");
    }

    #[test]
    fn test_empty_position_display() {
        assert_eq!(SourcePosition::empty().to_string(), "<no position>");
    }

    #[test]
    fn test_until_and_to() {
        let source = SourceCode::from_string("abcdef", "<string>");
        let a = SourcePosition::new(source.clone(), 0, 2, 1, 1, 1, 3);
        let b = SourcePosition::new(source, 4, 6, 1, 5, 1, 7);
        assert_eq!(a.until(&b).text(), "abcd");
        assert_eq!(a.to(&b).text(), "abcdef");
    }
}
