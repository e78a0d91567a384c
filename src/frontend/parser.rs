use crate::bytecode::Op;
use crate::frontend::token::{Span, Token};

/// A lexeme that is neither a keyword nor an integer literal.
///
/// `line` and `col` are 1-based, taken from the token's span.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{file}:{line}:{col}: cannot parse '{lexeme}' as an operation: {reason}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub lexeme: String,
    pub reason: String,
}

impl ParseError {
    fn new(token: &Token, reason: impl Into<String>) -> Self {
        ParseError {
            file: token.file.to_string(),
            line: token.span.line,
            col: token.span.col,
            lexeme: token.lexeme.clone(),
            reason: reason.into(),
        }
    }
}

/// Map one token to its operation. Jump targets are left unresolved.
pub fn parse_op(token: &Token) -> Result<Op, ParseError> {
    let op = match token.lexeme.as_str() {
        "+" => Op::Plus,
        "-" => Op::Minus,
        "=" => Op::Equal,
        ">" => Op::Greater,
        "." => Op::Dump,
        "dup" => Op::Dup,
        "if" => Op::If(None),
        "else" => Op::Else(None),
        "end" => Op::End,
        word => match word.parse::<i64>() {
            Ok(n) => Op::Push(n),
            Err(e) => return Err(ParseError::new(token, e.to_string())),
        },
    };
    Ok(op)
}

/// Parse a whole token stream, stopping at the first bad lexeme.
pub fn parse_tokens<I>(tokens: I) -> Result<Vec<(Op, Span)>, ParseError>
where
    I: IntoIterator<Item = Token>,
{
    tokens
        .into_iter()
        .map(|t| parse_op(&t).map(|op| (op, t.span)))
        .collect()
}
