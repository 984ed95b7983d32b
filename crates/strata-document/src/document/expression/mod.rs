//! Query expressions
//!
//! A small template language evaluated against one document bound to a
//! variable (by default `d`):
//!
//! ```text
//! d.price < 10 && 'rust' in d.tags
//! !(d.meta['x y'] == null) || d.items[0].qty >= 2
//! ```

pub mod ast;
pub mod eval;
pub mod parser;

pub use ast::{CompareOp, Expr, Literal, VarPath};
pub use eval::{evaluate, Scope};
pub use parser::parse;

use std::fmt;

use super::navigate::Navigator;
use super::value::Document;
use super::Result;

/// A parsed query with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    source: String,
    expr: Expr,
}

impl Query {
    /// Parse a query expression
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            expr: parse(source)?,
        })
    }

    /// Source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed expression
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate with `doc` bound to `variable`
    pub fn evaluate(&self, doc: &Document, variable: &str, navigator: Navigator<'_>) -> Result<Document> {
        evaluate(&self.expr, &Scope::new(variable, doc).with_navigator(navigator))
    }

    /// Whether the query is truthy for `doc`
    pub fn matches(&self, doc: &Document, variable: &str, navigator: Navigator<'_>) -> Result<bool> {
        self.evaluate(doc, variable, navigator).map(|v| v.is_truthy())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
