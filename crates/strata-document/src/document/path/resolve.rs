//! Normalization of path-like keys

use std::path::{Component, Path, PathBuf};

use super::ast::{PathKey, PathLike, Token};
use super::parser::parse;
use crate::document::DocumentError;

/// Anything that can be normalized into a canonical [`PathKey`]
pub trait IntoPathKey {
    /// Resolve into the canonical token tuple
    fn into_path_key(self) -> Result<PathKey, DocumentError>;
}

/// Resolve any supported representation into a canonical key.
///
/// Resolving an already canonical key returns it unchanged.
pub fn resolve(key: impl IntoPathKey) -> Result<PathKey, DocumentError> {
    key.into_path_key()
}

impl IntoPathKey for PathKey {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(self)
    }
}

impl IntoPathKey for &PathKey {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(self.clone())
    }
}

impl IntoPathKey for &str {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        parse(self)
    }
}

impl IntoPathKey for String {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        parse(&self)
    }
}

impl IntoPathKey for &String {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        parse(self)
    }
}

impl IntoPathKey for Token {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(PathKey::new(vec![self]))
    }
}

impl IntoPathKey for i64 {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(PathKey::new(vec![Token::Index(self)]))
    }
}

impl IntoPathKey for usize {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(PathKey::new(vec![Token::Index(self as i64)]))
    }
}

impl IntoPathKey for Vec<Token> {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(PathKey::new(self))
    }
}

impl IntoPathKey for &[Token] {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(PathKey::new(self.to_vec()))
    }
}

impl<const N: usize> IntoPathKey for [Token; N] {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(PathKey::new(self.into()))
    }
}

impl IntoPathKey for &Path {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(self
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .map(|part| match part.parse::<i64>() {
                Ok(index) if part.bytes().all(|b| b.is_ascii_digit()) => Token::Index(index),
                _ => Token::Key(part.into_owned()),
            })
            .collect())
    }
}

impl IntoPathKey for PathBuf {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        self.as_path().into_path_key()
    }
}

impl IntoPathKey for PathLike {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        match self {
            PathLike::Root => Ok(PathKey::root()),
            PathLike::Text(text) => parse(&text),
            PathLike::Token(token) => token.into_path_key(),
            PathLike::Tokens(key) => Ok(key),
        }
    }
}

impl IntoPathKey for &PathLike {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        self.clone().into_path_key()
    }
}

impl<T: IntoPathKey> IntoPathKey for Option<T> {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        match self {
            Some(key) => key.into_path_key(),
            None => Ok(PathKey::root()),
        }
    }
}

impl IntoPathKey for () {
    fn into_path_key(self) -> Result<PathKey, DocumentError> {
        Ok(PathKey::root())
    }
}

/// Concatenate two path-like keys.
///
/// Two plain strings are joined textually, inserting a `.` only where the
/// right-hand side does not already start with `.` or `[`. Any other
/// combination is resolved to tokens and concatenated.
pub fn combine(a: impl Into<PathLike>, b: impl Into<PathLike>) -> Result<PathLike, DocumentError> {
    match (a.into(), b.into()) {
        (PathLike::Text(left), PathLike::Text(right)) => {
            let joined = if left.is_empty() {
                right
            } else if right.is_empty() {
                left
            } else if right.starts_with('[') || right.starts_with('.') {
                format!("{}{}", left, right)
            } else {
                format!("{}.{}", left, right)
            };
            Ok(PathLike::Text(joined))
        }
        (left, right) => {
            let left = left.into_path_key()?;
            let right = right.into_path_key()?;
            Ok(PathLike::Tokens(left.concat(&right)))
        }
    }
}

/// Collapse a key to its smallest surface form: root, a bare token, or the tuple
pub fn minimize(key: &PathKey) -> PathLike {
    match key.tokens() {
        [] => PathLike::Root,
        [single] => PathLike::Token(single.clone()),
        _ => PathLike::Tokens(key.clone()),
    }
}
