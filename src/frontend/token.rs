use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(line: usize, col: usize) -> Self {
        Span { line, col }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// One whitespace-delimited lexeme together with where it came from.
///
/// The file name is shared between all tokens of one source via `Rc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub file: Rc<str>,
    pub span: Span,
    pub lexeme: String,
}

impl Token {
    /// `file:line:col` prefix used by diagnostics.
    #[cfg(test)]
    pub fn location(&self) -> String {
        format!("{}:{}", self.file, self.span)
    }
}
