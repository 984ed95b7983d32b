//! Find, find/replace and find/remove over a single document

use std::collections::BTreeMap;

use tracing::debug;

use super::config::EngineConfig;
use super::flatten::{FlatValue, PathDict};
use super::matcher::{MatchResult, MatchShape, ValueMatcher};
use super::navigate::{Replacement, WriteBatch};
use super::path::PathKey;
use super::traversal::{contains, find_paths, TraversalOptions};
use super::value::{Document, Scalar};
use super::{DocumentError, Result};

/// Options shared by the search family
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Skip paths that cannot be navigated instead of failing
    pub skip_missing: bool,
    /// At collection level, drop documents that were not changed
    pub changed_only: bool,
    /// Traversal order and guards
    pub traversal: TraversalOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl SearchOptions {
    /// Defaults taken from an engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            skip_missing: config.skip_missing,
            changed_only: false,
            traversal: TraversalOptions::from_config(config),
        }
    }

    /// Set `skip_missing`
    pub fn skip_missing(mut self, skip_missing: bool) -> Self {
        self.skip_missing = skip_missing;
        self
    }

    /// Set `changed_only`
    pub fn changed_only(mut self, changed_only: bool) -> Self {
        self.changed_only = changed_only;
        self
    }

    /// Replace the traversal options
    pub fn traversal(mut self, traversal: TraversalOptions) -> Self {
        self.traversal = traversal;
        self
    }
}

/// What `find` returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FindReturn {
    /// Whether anything matched
    #[default]
    Bool,
    /// Matched values by path
    Values,
    /// Per-path match descriptions
    Matches(MatchShape),
}

/// Result of `find`
#[derive(Debug, Clone, PartialEq)]
pub enum FindOutput {
    /// Whether anything matched
    Bool(bool),
    /// Matched values by path
    Values(PathDict),
    /// Per-path match descriptions
    Matches(BTreeMap<PathKey, MatchResult>),
}

impl FindOutput {
    /// Whether the output reports any match
    pub fn found(&self) -> bool {
        match self {
            FindOutput::Bool(b) => *b,
            FindOutput::Values(values) => !values.is_empty(),
            FindOutput::Matches(matches) => !matches.is_empty(),
        }
    }

    /// Convert into a document: a bool, or a mapping from canonical path strings
    pub fn into_document(self) -> Result<Document> {
        Ok(match self {
            FindOutput::Bool(b) => b.into(),
            FindOutput::Values(values) => Document::mapping(values.into_iter().map(|(path, value)| {
                let value = match value {
                    FlatValue::Value(v) => v,
                    FlatValue::Marker(m) => Document::from(m.to_string()),
                };
                (path.to_string(), value)
            })),
            FindOutput::Matches(matches) => {
                let mut entries = Vec::with_capacity(matches.len());
                for (path, result) in matches {
                    let value = serde_json::to_value(&result)
                        .map_err(|e| DocumentError::Serialization(e.to_string()))?;
                    entries.push((path.to_string(), Document::from(value)));
                }
                Document::mapping(entries)
            }
        })
    }
}

/// Search `doc` for values accepted by `matcher`
pub fn find(doc: &Document, matcher: &ValueMatcher, ret: FindReturn, options: &SearchOptions) -> FindOutput {
    let predicate = |node: &Document| matcher.matches(node);
    match ret {
        FindReturn::Bool => FindOutput::Bool(contains(doc, predicate, &options.traversal)),
        FindReturn::Values => FindOutput::Values(
            find_paths(doc, predicate, &options.traversal)
                .into_iter()
                .map(|(path, value)| (path, FlatValue::Value(value)))
                .collect(),
        ),
        FindReturn::Matches(shape) => FindOutput::Matches(
            find_paths(doc, predicate, &options.traversal)
                .into_iter()
                .map(|(path, value)| (path, matcher.describe(&value, shape)))
                .collect(),
        ),
    }
}

/// Run a write, downgrading a missing path to a skip when allowed
fn tolerate_missing(result: Result<()>, path: &PathKey, skip_missing: bool) -> Result<()> {
    match result {
        Err(e) if skip_missing && e.is_missing_path() => {
            debug!(path = %path, error = %e, "skipping missing path");
            Ok(())
        }
        other => other,
    }
}

/// Replace every match inside a write batch.
///
/// String values matched by a string target have the matched substrings
/// replaced when the replacement is a string; every other match is replaced
/// as a whole.
pub fn find_replace_in(
    batch: &mut WriteBatch<'_>,
    matcher: &ValueMatcher,
    replacement: &Replacement,
    options: &SearchOptions,
) -> Result<()> {
    let matches = find_paths(batch.document(), |node| matcher.matches(node), &options.traversal);
    for (path, value) in matches {
        let new_value = match (replacement, value.as_str()) {
            (Replacement::Value(Document::Scalar(Scalar::Str(with))), Some(text)) => {
                match matcher.replace_in(text, with) {
                    Some(replaced) => Replacement::Value(replaced.into()),
                    None => replacement.clone(),
                }
            }
            _ => replacement.clone(),
        };
        tolerate_missing(batch.set(&path, new_value), &path, options.skip_missing)?;
    }
    Ok(())
}

/// Remove every match inside a write batch
pub fn find_remove_in(
    batch: &mut WriteBatch<'_>,
    matcher: &ValueMatcher,
    options: &SearchOptions,
) -> Result<()> {
    let mut paths: Vec<PathKey> = find_paths(batch.document(), |node| matcher.matches(node), &options.traversal)
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    // highest indices first so earlier removals do not shift later ones
    paths.sort_unstable_by(|a, b| b.cmp(a));
    for path in paths {
        let result = batch.remove(&path).map(|_| ());
        tolerate_missing(result, &path, options.skip_missing)?;
    }
    Ok(())
}

/// Copy-on-write find/replace
pub fn find_replace(
    doc: &Document,
    matcher: &ValueMatcher,
    replacement: impl Into<Replacement>,
    options: &SearchOptions,
) -> Result<Document> {
    let mut batch = WriteBatch::new(doc);
    find_replace_in(&mut batch, matcher, &replacement.into(), options)?;
    Ok(batch.finish())
}

/// Copy-on-write find/remove
pub fn find_remove(doc: &Document, matcher: &ValueMatcher, options: &SearchOptions) -> Result<Document> {
    let mut batch = WriteBatch::new(doc);
    find_remove_in(&mut batch, matcher, options)?;
    Ok(batch.finish())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::matcher::Target;
    use crate::document::path::resolve;
    use serde_json::json;

    fn opts() -> SearchOptions {
        SearchOptions::default()
    }

    #[test]
    fn test_find_bool() {
        let m = ValueMatcher::single("BC").unwrap();
        let yes = Document::from(json!({"s": "ABC"}));
        let no = Document::from(json!({"s": "CDE"}));
        assert_eq!(find(&yes, &m, FindReturn::Bool, &opts()), FindOutput::Bool(true));
        assert_eq!(find(&no, &m, FindReturn::Bool, &opts()), FindOutput::Bool(false));
    }

    #[test]
    fn test_find_values() {
        let doc = Document::from(json!({"a": ["xBC", 1], "b": {"c": "BCy"}}));
        let m = ValueMatcher::single("BC").unwrap();
        let FindOutput::Values(found) = find(&doc, &m, FindReturn::Values, &opts()) else {
            panic!("expected values");
        };
        assert_eq!(found.len(), 2);
        assert_eq!(
            found.get(&resolve("b.c").unwrap()),
            Some(&FlatValue::Value("BCy".into()))
        );
    }

    #[test]
    fn test_find_matches_offsets() {
        let doc = Document::from(json!({"s": "aBCaBC"}));
        let m = ValueMatcher::single("BC").unwrap();
        let out = find(&doc, &m, FindReturn::Matches(MatchShape::Offsets), &opts());
        let FindOutput::Matches(found) = out.clone() else {
            panic!("expected matches");
        };
        assert_eq!(
            found.get(&resolve("s").unwrap()),
            Some(&MatchResult::Offsets(vec![1, 4]))
        );
        assert_eq!(out.into_document().unwrap().to_json(), json!({"s": [1, 4]}));
    }

    #[test]
    fn test_find_replace_substring() {
        let m = ValueMatcher::single("BC").unwrap();
        let replaced = find_replace(&Document::from("ABC"), &m, "XY", &opts()).unwrap();
        assert_eq!(replaced, Document::from("AXY"));
    }

    #[test]
    fn test_find_replace_whole_value() {
        let doc = Document::from(json!({"a": 1, "b": [1, 2]}));
        let m = ValueMatcher::single(Target::from(1_i64)).unwrap();
        let replaced = find_replace(&doc, &m, Document::from(9), &opts()).unwrap();
        assert_eq!(replaced.to_json(), json!({"a": 9, "b": [9, 2]}));
    }

    #[test]
    fn test_find_replace_with_function() {
        let doc = Document::from(json!({"a": 2, "b": "x"}));
        let m = ValueMatcher::single(Target::predicate(|d| d.as_i64().is_some())).unwrap();
        let double = Replacement::with(|d| Ok(Document::from(d.as_i64().unwrap_or(0) * 2)));
        let replaced = find_replace(&doc, &m, double, &opts()).unwrap();
        assert_eq!(replaced.to_json(), json!({"a": 4, "b": "x"}));
    }

    #[test]
    fn test_find_remove_highest_index_first() {
        let doc = Document::from(json!({"l": ["x", "keep", "x", "x"], "m": {"k": "x"}}));
        let m = ValueMatcher::single(Target::Value("x".into())).unwrap();
        let removed = find_remove(&doc, &m, &opts()).unwrap();
        assert_eq!(removed.to_json(), json!({"l": ["keep"], "m": {}}));
    }

    #[test]
    fn test_find_remove_root_match_fails() {
        let m = ValueMatcher::single("x").unwrap();
        let err = find_remove(&Document::from("x"), &m, &opts()).unwrap_err();
        assert!(matches!(err, DocumentError::TypeMismatch(_)));
    }
}
