//! Query expression AST

use std::fmt;

use crate::document::path::PathKey;
use crate::document::value::Document;

/// Literal value in an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Quoted string
    Str(String),
}

impl Literal {
    /// The literal as a document
    pub fn to_document(&self) -> Document {
        match self {
            Literal::Null => Document::null(),
            Literal::Bool(b) => (*b).into(),
            Literal::Int(i) => (*i).into(),
            Literal::Float(f) => (*f).into(),
            Literal::Str(s) => s.as_str().into(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`: substring, element or key membership
    In,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::In => "in",
        };
        f.write_str(op)
    }
}

/// A path rooted at a bound variable, e.g. `d.a['b c'][0]`
#[derive(Debug, Clone, PartialEq)]
pub struct VarPath {
    /// Variable name
    pub variable: String,
    /// Path below the variable
    pub key: PathKey,
}

impl fmt::Display for VarPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.variable)?;
        let rendered = self.key.to_string();
        if rendered.is_empty() || rendered.starts_with('[') {
            write!(f, "{}", rendered)
        } else {
            write!(f, ".{}", rendered)
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal(Literal),
    /// Variable path
    Path(VarPath),
    /// Binary comparison
    Compare {
        /// Left operand
        left: Box<Expr>,
        /// Operator
        op: CompareOp,
        /// Right operand
        right: Box<Expr>,
    },
    /// Logical and
    And(Box<Expr>, Box<Expr>),
    /// Logical or
    Or(Box<Expr>, Box<Expr>),
    /// Logical not
    Not(Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Path(path) => write!(f, "{}", path),
            Expr::Compare { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::And(a, b) => write!(f, "({} && {})", a, b),
            Expr::Or(a, b) => write!(f, "({} || {})", a, b),
            Expr::Not(e) => write!(f, "!{}", e),
        }
    }
}
