use crate::frontend::token::{Span, Token};
use std::rc::Rc;
use std::str::Lines;

/// Splits source text into whitespace-delimited tokens.
///
/// The lexer is an iterator that produces tokens lazily. Cloning it yields an
/// independent cursor, so the same token sequence can be walked again from
/// any point.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    file: Rc<str>,
    lines: Lines<'a>,
    current: Option<&'a str>,
    line: usize,
    // byte offset into `current` where scanning resumes
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(file: &str, source: &'a str) -> Self {
        Lexer {
            file: Rc::from(file),
            lines: source.lines(),
            current: None,
            line: 0,
            offset: 0,
        }
    }

    fn next_line(&mut self) -> bool {
        match self.lines.next() {
            Some(l) => {
                self.current = Some(l);
                self.line += 1;
                self.offset = 0;
                true
            }
            None => {
                self.current = None;
                false
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let line = match self.current {
                Some(l) => l,
                None => {
                    if !self.next_line() {
                        return None;
                    }
                    continue;
                }
            };

            let rest = &line[self.offset..];
            let start = match rest.find(|c: char| !c.is_whitespace()) {
                Some(s) => self.offset + s,
                None => {
                    self.current = None;
                    continue;
                }
            };
            let end = line[start..]
                .find(char::is_whitespace)
                .map(|e| start + e)
                .unwrap_or(line.len());

            self.offset = end;

            // columns count characters, not bytes
            let col = line[..start].chars().count() + 1;

            return Some(Token {
                file: Rc::clone(&self.file),
                span: Span::new(self.line, col),
                lexeme: line[start..end].to_string(),
            });
        }
    }
}
