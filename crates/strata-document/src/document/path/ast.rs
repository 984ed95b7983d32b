//! Canonical path key types

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a path: a mapping key / attribute name or a sequence index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Token {
    /// Sequence index; negative values count from the end
    Index(i64),
    /// Mapping key or attribute name
    Key(String),
}

impl Token {
    /// Key payload
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Token::Key(k) => Some(k),
            Token::Index(_) => None,
        }
    }

    /// Index payload
    pub fn as_index(&self) -> Option<i64> {
        match self {
            Token::Index(i) => Some(*i),
            Token::Key(_) => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Index(i) => write!(f, "{}", i),
            Token::Key(k) => write!(f, "{}", k),
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Key(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Key(value)
    }
}

impl From<i64> for Token {
    fn from(value: i64) -> Self {
        Token::Index(value)
    }
}

impl From<i32> for Token {
    fn from(value: i32) -> Self {
        Token::Index(value.into())
    }
}

impl From<usize> for Token {
    fn from(value: usize) -> Self {
        Token::Index(value as i64)
    }
}

/// Canonical path: an ordered tuple of tokens. The empty key addresses the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathKey(Vec<Token>);

impl PathKey {
    /// The root path
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    /// Tokens in order
    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    /// Consume into the token vector
    pub fn into_tokens(self) -> Vec<Token> {
        self.0
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Alias of [`PathKey::is_root`]
    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// Append a token in place
    pub fn push(&mut self, token: impl Into<Token>) {
        self.0.push(token.into());
    }

    /// Remove and return the last token
    pub fn pop(&mut self) -> Option<Token> {
        self.0.pop()
    }

    /// A new path with one more token
    pub fn child(&self, token: impl Into<Token>) -> Self {
        let mut tokens = Vec::with_capacity(self.0.len() + 1);
        tokens.extend_from_slice(&self.0);
        tokens.push(token.into());
        Self(tokens)
    }

    /// Concatenate two paths
    pub fn concat(&self, other: &PathKey) -> Self {
        let mut tokens = self.0.clone();
        tokens.extend_from_slice(&other.0);
        Self(tokens)
    }

    /// Parent path and last token, `None` at the root
    pub fn split_last(&self) -> Option<(PathKey, &Token)> {
        let (last, parent) = self.0.split_last()?;
        Some((PathKey(parent.to_vec()), last))
    }

    /// Last token
    pub fn last(&self) -> Option<&Token> {
        self.0.last()
    }

    /// Prefix made of the first `n` tokens
    pub fn prefix(&self, n: usize) -> PathKey {
        PathKey(self.0[..n.min(self.0.len())].to_vec())
    }

    /// Whether `prefix` is a (non-strict) prefix of this path
    pub fn starts_with(&self, prefix: &PathKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Iterate the tokens
    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }
}

impl From<Vec<Token>> for PathKey {
    fn from(value: Vec<Token>) -> Self {
        Self(value)
    }
}

impl FromIterator<Token> for PathKey {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PathKey {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Whether a key can be written as `.key` and parse back unchanged
fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && !key.bytes().all(|b| b.is_ascii_digit())
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '$'))
}

impl fmt::Display for PathKey {
    /// Renders the canonical string form, which parses back to the same key
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            match token {
                Token::Index(idx) => write!(f, "[{}]", idx)?,
                Token::Key(key) if is_plain_key(key) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", key)?;
                }
                Token::Key(key) => {
                    let escaped = key.replace('\\', "\\\\").replace('\'', "\\'");
                    write!(f, "['{}']", escaped)?;
                }
            }
        }
        Ok(())
    }
}

/// A path in any surface form, as returned by `combine` and `minimize`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathLike {
    /// The root (`None` / empty)
    Root,
    /// Unparsed path text
    Text(String),
    /// A single bare token
    Token(Token),
    /// A token tuple
    Tokens(PathKey),
}

impl From<&str> for PathLike {
    fn from(value: &str) -> Self {
        PathLike::Text(value.to_string())
    }
}

impl From<String> for PathLike {
    fn from(value: String) -> Self {
        PathLike::Text(value)
    }
}

impl From<Token> for PathLike {
    fn from(value: Token) -> Self {
        PathLike::Token(value)
    }
}

impl From<i64> for PathLike {
    fn from(value: i64) -> Self {
        PathLike::Token(Token::Index(value))
    }
}

impl From<PathKey> for PathLike {
    fn from(value: PathKey) -> Self {
        PathLike::Tokens(value)
    }
}

impl From<Vec<Token>> for PathLike {
    fn from(value: Vec<Token>) -> Self {
        PathLike::Tokens(PathKey::new(value))
    }
}

impl<T: Into<PathLike>> From<Option<T>> for PathLike {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PathLike::Root)
    }
}
