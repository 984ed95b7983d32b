//! Query expression evaluation

use std::cmp::Ordering;

use super::ast::{CompareOp, Expr};
use crate::document::matcher::values_equal;
use crate::document::navigate::Navigator;
use crate::document::value::{Document, Scalar};
use crate::document::{DocumentError, Result};

/// A single variable binding for evaluation
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    /// Name the document is bound to
    pub variable: &'a str,
    /// The bound document
    pub document: &'a Document,
    /// Navigation used to resolve paths
    pub navigator: Navigator<'a>,
}

impl<'a> Scope<'a> {
    /// Bind `document` to `variable` with the standard navigator
    pub fn new(variable: &'a str, document: &'a Document) -> Self {
        Self {
            variable,
            document,
            navigator: Navigator::standard(),
        }
    }

    /// Use a different navigator
    pub fn with_navigator(mut self, navigator: Navigator<'a>) -> Self {
        self.navigator = navigator;
        self
    }
}

/// Evaluate `expr` in `scope`.
///
/// Paths that run into a missing key or index evaluate to null; an unbound
/// variable or indexing into a scalar is an error.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Document> {
    match expr {
        Expr::Literal(lit) => Ok(lit.to_document()),
        Expr::Path(path) => {
            if path.variable != scope.variable {
                return Err(DocumentError::InvalidQuery(format!(
                    "unknown variable '{}'",
                    path.variable
                )));
            }
            match scope.navigator.get_key(scope.document, &path.key) {
                Ok(value) => Ok(value.clone()),
                Err(e) if e.is_missing_path() => Ok(Document::null()),
                Err(e) => Err(e),
            }
        }
        Expr::Compare { left, op, right } => {
            let left = evaluate(left, scope)?;
            let right = evaluate(right, scope)?;
            Ok(compare(&left, *op, &right).into())
        }
        Expr::And(a, b) => {
            let result = evaluate(a, scope)?.is_truthy() && evaluate(b, scope)?.is_truthy();
            Ok(result.into())
        }
        Expr::Or(a, b) => {
            let result = evaluate(a, scope)?.is_truthy() || evaluate(b, scope)?.is_truthy();
            Ok(result.into())
        }
        Expr::Not(e) => Ok((!evaluate(e, scope)?.is_truthy()).into()),
    }
}

fn compare(left: &Document, op: CompareOp, right: &Document) -> bool {
    match op {
        CompareOp::Eq => equal(left, right),
        CompareOp::Ne => !equal(left, right),
        CompareOp::Lt => ordering(left, right) == Some(Ordering::Less),
        CompareOp::Le => matches!(ordering(left, right), Some(Ordering::Less | Ordering::Equal)),
        CompareOp::Gt => ordering(left, right) == Some(Ordering::Greater),
        CompareOp::Ge => matches!(
            ordering(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::In => contains(right, left),
    }
}

fn equal(left: &Document, right: &Document) -> bool {
    match (left.as_str(), right.as_str()) {
        (Some(a), Some(b)) => a == b,
        _ => values_equal(left, right),
    }
}

fn ordering(left: &Document, right: &Document) -> Option<Ordering> {
    match (left, right) {
        (Document::Scalar(Scalar::Str(a)), Document::Scalar(Scalar::Str(b))) => Some(a.cmp(b)),
        (Document::Scalar(Scalar::Bool(a)), Document::Scalar(Scalar::Bool(b))) => Some(a.cmp(b)),
        (Document::Scalar(a), Document::Scalar(b)) if a.is_number() && b.is_number() => {
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        _ => None,
    }
}

/// Membership: substring of a string, element of a sequence or set, key of a mapping
fn contains(haystack: &Document, needle: &Document) -> bool {
    match haystack {
        Document::Scalar(Scalar::Str(text)) => needle.as_str().is_some_and(|n| text.contains(n)),
        Document::Sequence(items) | Document::Set(items) => {
            items.iter().any(|item| equal(item, needle))
        }
        Document::Mapping(map) => needle.as_str().is_some_and(|k| map.contains_key(k)),
        Document::Record(record) => record.values().any(|item| equal(item, needle)),
        Document::Scalar(_) => false,
    }
}
