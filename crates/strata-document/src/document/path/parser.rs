//! Path string parser
//!
//! Grammar: `key`, `.key`, `['key']`, `["key"]`, `.0`, `[0]`, `[-1]`, chained
//! in any order. Strings without quote or bracket characters take a fast path
//! that splits on `.`; everything else goes through the scanner, which must
//! consume the whole input or fail with the offset it stopped at.

use super::ast::{PathKey, Token};
use crate::document::DocumentError;

/// Parse a path string into a canonical key
pub fn parse(input: &str) -> Result<PathKey, DocumentError> {
    if input.is_empty() {
        return Ok(PathKey::root());
    }
    if !input.contains(&['[', ']', '\'', '"'][..]) {
        return parse_dotted(input);
    }
    Parser::new(input).parse_path()
}

fn syntax_error(input: &str, offset: usize, reason: &str) -> DocumentError {
    DocumentError::PathSyntax {
        path: input.to_string(),
        offset,
        reason: reason.to_string(),
    }
}

fn coerce_segment(segment: &str) -> Token {
    if segment.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = segment.parse::<i64>() {
            return Token::Index(index);
        }
    }
    Token::Key(segment.to_string())
}

/// Fast path: split on `.` and coerce all-digit segments to indices
fn parse_dotted(input: &str) -> Result<PathKey, DocumentError> {
    let (body, base) = match input.strip_prefix('.') {
        Some(rest) => (rest, 1),
        None => (input, 0),
    };

    let mut tokens = Vec::new();
    let mut offset = base;
    for segment in body.split('.') {
        if segment.is_empty() {
            return Err(syntax_error(input, offset, "empty path segment"));
        }
        tokens.push(coerce_segment(segment));
        offset += segment.len() + 1;
    }
    Ok(PathKey::new(tokens))
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self, c: char) {
        self.pos += c.len_utf8();
    }

    fn error(&self, reason: &str) -> DocumentError {
        syntax_error(self.input, self.pos, reason)
    }

    fn expect_char(&mut self, expected: char) -> Result<(), DocumentError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance(c);
                Ok(())
            }
            Some(_) => Err(self.error(&format!("expected '{}'", expected))),
            None => Err(self.error(&format!("expected '{}', got end of input", expected))),
        }
    }

    fn parse_path(&mut self) -> Result<PathKey, DocumentError> {
        let mut tokens = Vec::new();

        // A bare key is only allowed as the first token
        if !matches!(self.peek(), Some('.') | Some('[')) {
            tokens.push(self.parse_bare_segment()?);
        }

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.advance(c);
                    tokens.push(self.parse_bare_segment()?);
                }
                '[' => {
                    self.advance(c);
                    tokens.push(self.parse_bracket()?);
                }
                _ => return Err(self.error("expected '.' or '['")),
            }
        }

        Ok(PathKey::new(tokens))
    }

    fn parse_bare_segment(&mut self) -> Result<Token, DocumentError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            match c {
                '.' | '[' => break,
                ']' | '\'' | '"' => return Err(self.error("unexpected character in key")),
                _ => self.advance(c),
            }
        }
        if self.pos == start {
            return Err(self.error("empty path segment"));
        }
        Ok(coerce_segment(&self.input[start..self.pos]))
    }

    fn parse_bracket(&mut self) -> Result<Token, DocumentError> {
        let token = match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.advance(quote);
                Token::Key(self.parse_quoted(quote)?)
            }
            Some(c) if c == '-' || c.is_ascii_digit() => Token::Index(self.parse_integer()?),
            Some(_) => return Err(self.error("expected quoted key or index")),
            None => return Err(self.error("unterminated bracket")),
        };
        self.expect_char(']')?;
        Ok(token)
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, DocumentError> {
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    self.advance('\\');
                    match self.peek() {
                        Some(c) => {
                            out.push(c);
                            self.advance(c);
                        }
                        None => return Err(self.error("dangling escape")),
                    }
                }
                Some(c) if c == quote => {
                    self.advance(c);
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.advance(c);
                }
                None => return Err(self.error("unterminated quoted key")),
            }
        }
    }

    fn parse_integer(&mut self) -> Result<i64, DocumentError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance('-');
        }
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            self.advance(c);
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| syntax_error(self.input, start, "invalid index"))
    }
}
