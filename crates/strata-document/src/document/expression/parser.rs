//! Query expression parser
//!
//! Precedence, loosest first: `||`, `&&`, `!`, comparisons, operands.

use super::ast::{CompareOp, Expr, Literal, VarPath};
use crate::document::path::{PathKey, Token};
use crate::document::DocumentError;

/// Parse a query expression
pub fn parse(input: &str) -> Result<Expr, DocumentError> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_or()?;
    parser.skip_whitespace();
    if parser.pos < input.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
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

    fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            self.advance(c.len_utf8());
        }
    }

    fn error(&self, reason: &str) -> DocumentError {
        DocumentError::InvalidQuery(format!(
            "{} at offset {} in '{}'",
            reason, self.pos, self.input
        ))
    }

    fn expect_char(&mut self, expected: char) -> Result<(), DocumentError> {
        if self.peek() == Some(expected) {
            self.advance(expected.len_utf8());
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn parse_or(&mut self) -> Result<Expr, DocumentError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if !self.remaining().starts_with("||") {
                return Ok(left);
            }
            self.advance(2);
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
    }

    fn parse_and(&mut self) -> Result<Expr, DocumentError> {
        let mut left = self.parse_not()?;
        loop {
            self.skip_whitespace();
            if !self.remaining().starts_with("&&") {
                return Ok(left);
            }
            self.advance(2);
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
    }

    fn parse_not(&mut self) -> Result<Expr, DocumentError> {
        self.skip_whitespace();
        if self.peek() == Some('!') && !self.remaining().starts_with("!=") {
            self.advance(1);
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, DocumentError> {
        let left = self.parse_operand()?;
        self.skip_whitespace();
        match self.try_parse_compare_op() {
            Some(op) => {
                let right = self.parse_operand()?;
                Ok(Expr::Compare {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                })
            }
            None => Ok(left),
        }
    }

    fn try_parse_compare_op(&mut self) -> Option<CompareOp> {
        let rem = self.remaining();
        let (op, len) = if rem.starts_with("==") {
            (CompareOp::Eq, 2)
        } else if rem.starts_with("!=") {
            (CompareOp::Ne, 2)
        } else if rem.starts_with("<=") {
            (CompareOp::Le, 2)
        } else if rem.starts_with(">=") {
            (CompareOp::Ge, 2)
        } else if rem.starts_with('<') {
            (CompareOp::Lt, 1)
        } else if rem.starts_with('>') {
            (CompareOp::Gt, 1)
        } else if rem.starts_with("in") && !rem[2..].starts_with(is_ident_char) {
            (CompareOp::In, 2)
        } else {
            return None;
        };
        self.advance(len);
        Some(op)
    }

    fn parse_operand(&mut self) -> Result<Expr, DocumentError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance(1);
                let expr = self.parse_or()?;
                self.skip_whitespace();
                self.expect_char(')')?;
                Ok(expr)
            }
            Some('"') | Some('\'') => Ok(Expr::Literal(Literal::Str(self.parse_quoted_string()?))),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                Ok(Expr::Literal(self.parse_number_literal()?))
            }
            Some(c) if is_ident_start(c) => {
                let ident = self.parse_identifier()?;
                match ident.as_str() {
                    "true" => Ok(Expr::Literal(Literal::Bool(true))),
                    "false" => Ok(Expr::Literal(Literal::Bool(false))),
                    "null" => Ok(Expr::Literal(Literal::Null)),
                    _ => Ok(Expr::Path(VarPath {
                        variable: ident,
                        key: self.parse_path_tail()?,
                    })),
                }
            }
            Some(_) => Err(self.error("expected operand")),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn parse_identifier(&mut self) -> Result<String, DocumentError> {
        let start = self.pos;
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            self.advance(c.len_utf8());
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// `.key`, `.0`, `[0]`, `['key']` segments following a variable
    fn parse_path_tail(&mut self) -> Result<PathKey, DocumentError> {
        let mut key = PathKey::root();
        loop {
            match self.peek() {
                Some('.') => {
                    self.advance(1);
                    let segment = self.parse_identifier()?;
                    if segment.bytes().all(|b| b.is_ascii_digit()) {
                        let index = segment
                            .parse()
                            .map_err(|_| self.error("invalid index"))?;
                        key.push(Token::Index(index));
                    } else {
                        key.push(Token::Key(segment));
                    }
                }
                Some('[') => {
                    self.advance(1);
                    self.skip_whitespace();
                    match self.peek() {
                        Some('"') | Some('\'') => {
                            let segment = self.parse_quoted_string()?;
                            key.push(Token::Key(segment));
                        }
                        _ => match self.parse_number_literal()? {
                            Literal::Int(index) => key.push(Token::Index(index)),
                            _ => return Err(self.error("expected integer index")),
                        },
                    }
                    self.skip_whitespace();
                    self.expect_char(']')?;
                }
                _ => return Ok(key),
            }
        }
    }

    fn parse_quoted_string(&mut self) -> Result<String, DocumentError> {
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        self.advance(1);
        let mut out = String::new();
        loop {
            match self.peek() {
                Some('\\') => {
                    self.advance(1);
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    out.push(escaped);
                    self.advance(escaped.len_utf8());
                }
                Some(c) if c == quote => {
                    self.advance(1);
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.advance(c.len_utf8());
                }
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_number_literal(&mut self) -> Result<Literal, DocumentError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance(1);
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
        if self.peek() == Some('.') {
            self.advance(1);
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance(1);
            }
            let val: f64 = self.input[start..self.pos]
                .parse()
                .map_err(|_| self.error("invalid number"))?;
            Ok(Literal::Float(val))
        } else {
            let val: i64 = self.input[start..self.pos]
                .parse()
                .map_err(|_| self.error("invalid integer"))?;
            Ok(Literal::Int(val))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::path::resolve;

    fn path(var: &str, key: &str) -> Expr {
        Expr::Path(VarPath {
            variable: var.into(),
            key: resolve(key).unwrap(),
        })
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("42").unwrap(), Expr::Literal(Literal::Int(42)));
        assert_eq!(parse("-1.5").unwrap(), Expr::Literal(Literal::Float(-1.5)));
        assert_eq!(parse("'x'").unwrap(), Expr::Literal(Literal::Str("x".into())));
        assert_eq!(parse("null").unwrap(), Expr::Literal(Literal::Null));
        assert_eq!(parse(" true ").unwrap(), Expr::Literal(Literal::Bool(true)));
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(parse("d").unwrap(), path("d", ""));
        assert_eq!(parse("d.a.b[0]").unwrap(), path("d", "a.b[0]"));
        assert_eq!(parse("d['x y'].z").unwrap(), path("d", "['x y'].z"));
        assert_eq!(parse("d.l.1").unwrap(), path("d", "l[1]"));
    }

    #[test]
    fn test_parse_comparison() {
        let expr = parse("d.price < 10").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                left: Box::new(path("d", "price")),
                op: CompareOp::Lt,
                right: Box::new(Expr::Literal(Literal::Int(10))),
            }
        );
    }

    #[test]
    fn test_parse_in_operator() {
        let expr = parse("'BC' in d.s").unwrap();
        assert!(matches!(expr, Expr::Compare { op: CompareOp::In, .. }));
        // identifiers that start with "in" are not the operator
        assert!(parse("d.index").is_ok());
    }

    #[test]
    fn test_precedence() {
        let expr = parse("d.a == 1 || d.b == 2 && !d.c").unwrap();
        match expr {
            Expr::Or(_, right) => assert!(matches!(*right, Expr::And(_, _))),
            other => panic!("expected or at the top, got {}", other),
        }
        let grouped = parse("(d.a == 1 || d.b == 2) && d.c").unwrap();
        assert!(matches!(grouped, Expr::And(_, _)));
    }

    #[test]
    fn test_not_equal_is_not_negation() {
        let expr = parse("d.a != 1").unwrap();
        assert!(matches!(expr, Expr::Compare { op: CompareOp::Ne, .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("d.a ==").unwrap_err(), DocumentError::InvalidQuery(_)));
        assert!(parse("(d.a").is_err());
        assert!(parse("d.a 1").is_err());
        assert!(parse("'open").is_err());
        assert!(parse("").is_err());
    }
}
