use crate::bytecode::Op;
use crate::frontend::parser::parse_op;
use crate::frontend::token::Token;
use std::io::{self, Write};

pub struct TokenDumper {
    pub color: bool,
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const YEL: &'static str = "\x1b[33m";
    const RED: &'static str = "\x1b[31m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn dump<I, W>(&self, tokens: I, out: &mut W) -> io::Result<()>
    where
        I: IntoIterator<Item = Token>,
        W: Write,
    {
        for t in tokens {
            self.print_one(&t, out)?;
        }
        Ok(())
    }

    fn print_one<W: Write>(&self, t: &Token, out: &mut W) -> io::Result<()> {
        let kind = kind(t);
        let (colr, reset) = if self.color {
            (Self::color(kind), Self::RESET)
        } else {
            ("", "")
        };

        writeln!(
            out,
            "[{:02}:{:02}] {}{:<8} {}{}",
            t.span.line, t.span.col, colr, kind, t.lexeme, reset
        )
    }

    fn color(kind: &str) -> &'static str {
        match kind {
            "INT" => Self::CYN,
            "OP" | "CMP" => Self::MAG,
            "KEYWORD" => Self::YEL,
            _ => Self::RED,
        }
    }
}

/// Token kind as the parser sees it.
fn kind(token: &Token) -> &'static str {
    match parse_op(token) {
        Ok(Op::Push(_)) => "INT",
        Ok(Op::Plus | Op::Minus | Op::Dump) => "OP",
        Ok(Op::Equal | Op::Greater) => "CMP",
        Ok(Op::Dup | Op::If(_) | Op::Else(_) | Op::End) => "KEYWORD",
        Err(_) => "UNKNOWN",
    }
}
