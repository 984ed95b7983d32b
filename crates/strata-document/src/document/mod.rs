//! Path-addressable document engine
//!
//! This module provides navigation and transformation over nested
//! semi-structured documents:
//! - Canonical path keys with a string syntax (`a.b[0]['x y']`)
//! - Reads, copy-on-write writes and removals by path
//! - Bounded DFS/BFS traversal with kind filters
//! - Value matching (exact, regex, fuzzy, predicates) and find/replace
//! - Flattening to path dictionaries and exact reconstruction
//! - Collections with parallel step application and pipelines
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐  ┌──────────────┐  ┌──────────────┐   │
//! │  │ DocumentCollection│ │   Pipeline   │  │    Query     │   │
//! │  │ apply / reduce    │ │ Step / Task  │  │  expressions │   │
//! │  └──────────────────┘  └──────────────┘  └──────────────┘   │
//! ├─────────────────────────────────────────────────────────────┤
//! │   Search (find / replace / remove)  │  Flatten / Unflatten   │
//! ├─────────────────────────────────────────────────────────────┤
//! │   ValueMatcher → StringMatcher (regex, fuzzy)  │  Traversal   │
//! ├─────────────────────────────────────────────────────────────┤
//! │   Navigator + WriteBatch (copy-on-write)  │  Accessors       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  PathKey / path parser                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use strata_document::document::{Document, Engine, ValueMatcher};
//! use serde_json::json;
//!
//! let engine = Engine::default();
//! let doc = Document::from(json!({"a": {"b": [1, 2, 3]}, "c": "hello"}));
//!
//! assert_eq!(engine.get(&doc, "a.b[-1]").unwrap(), &Document::from(3));
//!
//! let updated = engine.set(&doc, "a.b[0]", 10).unwrap();
//! assert_eq!(updated.to_json(), json!({"a": {"b": [10, 2, 3]}, "c": "hello"}));
//!
//! let matcher = ValueMatcher::single("ell").unwrap();
//! assert!(engine.contains(&doc, &matcher));
//! ```

pub mod accessor;
pub mod collection;
pub mod config;
pub mod expression;
pub mod flatten;
pub mod matcher;
pub mod navigate;
pub mod path;
pub mod pipeline;
pub mod search;
pub mod traversal;
pub mod value;

pub use accessor::{AccessorRegistry, AttributeAccessor, RecordFields, SequenceEnds};
pub use collection::{Applied, DocumentCollection, Selector};
pub use config::{ConfigOverrides, EngineConfig, TraversalOrder};
pub use expression::Query;
pub use flatten::{
    flatten, path_dict_from_document, path_dict_to_document, path_dict_to_json, unflatten,
    FlatValue, FlattenOptions, Marker, PathDict,
};
pub use matcher::{
    MatchResult, MatchShape, PredicateFn, Strategy, StringMatchOptions, StringMatcher, Target,
    ValueMatcher,
};
pub use navigate::{Navigator, ReplaceFn, Replacement, WriteBatch};
pub use path::{IntoPathKey, PathKey, PathLike, Token};
pub use pipeline::{Pipeline, Step, StepArgs, StepContext, StepFn, StepKind, Task};
pub use search::{FindOutput, FindReturn, SearchOptions};
pub use traversal::{TraversalOptions, Visit};
pub use value::{Document, DocumentBuilder, DocumentKind, Mapping, Record, Scalar};

use std::sync::Arc;

use tracing::debug;

/// Document engine errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    /// Malformed path string
    #[error("Invalid path '{path}' at offset {offset}: {reason}")]
    PathSyntax {
        /// Input text
        path: String,
        /// Byte offset of the failure
        offset: usize,
        /// What went wrong
        reason: String,
    },

    /// A token could not be followed
    #[error("Path not found: '{path}' (at '{token}'): {reason}")]
    Navigation {
        /// Full path being followed
        path: String,
        /// Token that failed
        token: String,
        /// What was missing
        reason: String,
    },

    /// Operation not valid for the value's kind
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Input admits more than one reading
    #[error("Ambiguous input: {0}")]
    Ambiguity(String),

    /// Regex or group selection failed
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Step could not be resolved or its arguments are malformed
    #[error("Invalid step: {0}")]
    InvalidStep(String),

    /// Query expression failed to parse or evaluate
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A user step failed
    #[error("Task failed: {0}")]
    Task(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DocumentError {
    /// Whether this is a missing-path failure that `skip_missing` may absorb
    pub fn is_missing_path(&self) -> bool {
        matches!(self, DocumentError::Navigation { .. })
    }
}

impl From<serde_json::Error> for DocumentError {
    fn from(e: serde_json::Error) -> Self {
        DocumentError::Serialization(e.to_string())
    }
}

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Entry point bundling configuration and accessors.
///
/// Every operation reads its defaults from the [`EngineConfig`] captured at
/// construction; there is no global mutable state.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    accessors: Arc<AccessorRegistry>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: Arc::new(EngineConfig::default()),
            accessors: Arc::new(AccessorRegistry::standard()),
        }
    }
}

impl Engine {
    /// Create an engine with a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            max_depth = config.max_depth,
            traversal = %config.traversal,
            parallel = config.parallel,
            "document engine configured"
        );
        Ok(Self {
            config: Arc::new(config),
            accessors: Arc::new(AccessorRegistry::standard()),
        })
    }

    /// Replace the accessor registry
    pub fn with_accessors(mut self, accessors: AccessorRegistry) -> Self {
        self.accessors = Arc::new(accessors);
        self
    }

    /// Derive an engine with an override layer applied
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Result<Self> {
        let config = self.config.with_overrides(overrides);
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            accessors: Arc::clone(&self.accessors),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registered accessors
    pub fn accessors(&self) -> &AccessorRegistry {
        &self.accessors
    }

    /// Navigator honoring `attribute_access`
    pub fn navigator(&self) -> Navigator<'_> {
        if self.config.attribute_access {
            Navigator::new(Some(self.accessors.as_ref()))
        } else {
            Navigator::items_only()
        }
    }

    /// Execution context for steps and collections
    pub fn context(&self) -> StepContext<'_> {
        StepContext::new(&self.config, self.navigator())
    }

    /// Traversal options from configuration
    pub fn traversal_options(&self) -> TraversalOptions {
        TraversalOptions::from_config(&self.config)
    }

    /// Search options from configuration
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions::from_config(&self.config)
    }

    /// String matching defaults from configuration
    pub fn match_options(&self) -> StringMatchOptions {
        StringMatchOptions::default()
            .ignore_case(self.config.ignore_case)
            .threshold(self.config.fuzzy_threshold)
    }

    /// Build a matcher using configured string defaults
    pub fn matcher(&self, targets: Vec<Target>, find_all: bool) -> Result<ValueMatcher> {
        ValueMatcher::new(targets, find_all, self.match_options())
    }

    /// Read the value at `key`
    pub fn get<'d>(&self, doc: &'d Document, key: impl IntoPathKey) -> Result<&'d Document> {
        self.navigator().get(doc, key)
    }

    /// Read the value at `key`, wrapped in its original path structure
    pub fn get_keep_path(&self, doc: &Document, key: impl IntoPathKey) -> Result<Document> {
        self.navigator().get_keep_path(doc, key)
    }

    /// Copy-on-write set
    pub fn set(
        &self,
        doc: &Document,
        key: impl IntoPathKey,
        value: impl Into<Replacement>,
    ) -> Result<Document> {
        self.navigator().set(doc, key, value)
    }

    /// Set, mutating `doc`
    pub fn set_in_place(
        &self,
        doc: &mut Document,
        key: impl IntoPathKey,
        value: impl Into<Replacement>,
    ) -> Result<()> {
        self.navigator().set_in_place(doc, key, value)
    }

    /// Copy-on-write remove
    pub fn remove(&self, doc: &Document, key: impl IntoPathKey) -> Result<Document> {
        self.navigator().remove(doc, key)
    }

    /// Remove, mutating `doc`; returns the removed value
    pub fn remove_in_place(&self, doc: &mut Document, key: impl IntoPathKey) -> Result<Document> {
        self.navigator().remove_in_place(doc, key)
    }

    /// Start a batch of writes sharing one copy of each touched prefix
    pub fn batch(&self, doc: &Document) -> WriteBatch<'_> {
        WriteBatch::with_navigator(self.navigator(), doc)
    }

    /// Whether any value in `doc` satisfies `matcher`
    pub fn contains(&self, doc: &Document, matcher: &ValueMatcher) -> bool {
        traversal::contains(doc, |d| matcher.matches(d), &self.traversal_options())
    }

    /// Locate matching values
    pub fn find(&self, doc: &Document, matcher: &ValueMatcher, ret: FindReturn) -> FindOutput {
        search::find(doc, matcher, ret, &self.search_options())
    }

    /// Replace matching values
    pub fn find_replace(
        &self,
        doc: &Document,
        matcher: &ValueMatcher,
        replacement: &Replacement,
    ) -> Result<Document> {
        let mut batch = self.batch(doc);
        search::find_replace_in(&mut batch, matcher, replacement, &self.search_options())?;
        Ok(batch.finish())
    }

    /// Remove matching values
    pub fn find_remove(&self, doc: &Document, matcher: &ValueMatcher) -> Result<Document> {
        let mut batch = self.batch(doc);
        search::find_remove_in(&mut batch, matcher, &self.search_options())?;
        Ok(batch.finish())
    }

    /// Flatten with configured bounds
    pub fn flatten(&self, doc: &Document, annotate_all: bool) -> PathDict {
        flatten(doc, &FlattenOptions::from_config(&self.config).annotate_all(annotate_all))
    }

    /// Rebuild a document from a path dictionary
    pub fn unflatten(&self, dict: &PathDict) -> Result<Document> {
        unflatten(dict)
    }

    /// Evaluate a query expression against `doc`
    pub fn query(&self, doc: &Document, expr: &str) -> Result<Document> {
        Query::parse(expr)?.evaluate(doc, &self.config.query_variable, self.navigator())
    }

    /// Resolve a named step with configured defaults
    pub fn step(&self, name: &str, args: StepArgs) -> Result<Step> {
        Step::named_with(name, args, &self.config)
    }

    /// Build a pipeline from its JSON form with configured defaults
    pub fn pipeline(&self, definition: &serde_json::Value) -> Result<Pipeline> {
        Pipeline::from_json_with(definition, &self.config)
    }

    /// Run one step against one document; `None` means it was dropped
    pub fn run(&self, step: &Step, doc: &Document) -> Result<Option<Document>> {
        step.run(doc, &self.context())
    }

    /// Move the value at `from` to `to`
    pub fn move_value(
        &self,
        doc: &Document,
        from: impl IntoPathKey,
        to: impl IntoPathKey,
    ) -> Result<Document> {
        self.run_required(&Step::move_value(from, to)?, doc)
    }

    /// Rename the mapping key at `key`, keeping its position
    pub fn rename(&self, doc: &Document, key: impl IntoPathKey, name: &str) -> Result<Document> {
        self.run_required(&Step::rename(key, name)?, doc)
    }

    /// Move the listed keys of the mapping at `key` to the front
    pub fn reorder(&self, doc: &Document, key: impl IntoPathKey, order: Vec<String>) -> Result<Document> {
        self.run_required(&Step::reorder(key, order)?, doc)
    }

    /// Serialize to JSON text
    pub fn dump(&self, doc: &Document, pretty: bool) -> Result<String> {
        let text = if pretty {
            serde_json::to_string_pretty(doc)?
        } else {
            serde_json::to_string(doc)?
        };
        Ok(text)
    }

    /// Whether the query is truthy for `doc`
    pub fn filter(&self, doc: &Document, expr: &str) -> Result<bool> {
        Query::parse(expr)?.matches(doc, &self.config.query_variable, self.navigator())
    }

    fn run_required(&self, step: &Step, doc: &Document) -> Result<Document> {
        // skip_missing only drops at collection level; a single document fails
        let step = step.clone().skip_missing(false);
        Ok(self.run(&step, doc)?.unwrap_or_else(|| doc.clone()))
    }

    /// Apply a step to every document of `collection`
    pub fn apply(&self, collection: &DocumentCollection, step: &Step) -> Result<Applied> {
        collection.apply_with(step, &self.context())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Upper;

    impl AttributeAccessor for Upper {
        fn position(&self, target: &Document, name: &str) -> Option<usize> {
            target
                .as_mapping()
                .and_then(|m| m.get_index_of(&name.to_lowercase()))
        }
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let config = EngineConfig {
            query_variable: "1x".into(),
            ..Default::default()
        };
        assert!(matches!(Engine::new(config), Err(DocumentError::Config(_))));
    }

    #[test]
    fn test_engine_overrides() {
        let engine = Engine::default();
        let derived = engine
            .with_overrides(&ConfigOverrides {
                query_variable: Some("doc".into()),
                ..Default::default()
            })
            .unwrap();
        let doc = Document::from(json!({"n": 3}));
        assert_eq!(derived.query(&doc, "doc.n > 2").unwrap(), Document::from(true));
        assert_eq!(engine.config().query_variable, "d");
    }

    #[test]
    fn test_attribute_access_toggle() {
        let mut registry = AccessorRegistry::standard();
        registry.register_kind(DocumentKind::Mapping, Arc::new(Upper));
        let engine = Engine::default().with_accessors(registry);
        let doc = Document::from(json!({"name": "x"}));
        assert_eq!(engine.get(&doc, "NAME").unwrap().as_str(), Some("x"));

        let strict = engine
            .with_overrides(&ConfigOverrides {
                attribute_access: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert!(strict.get(&doc, "NAME").unwrap_err().is_missing_path());
    }

    #[test]
    fn test_sequence_ends_through_engine() {
        let engine = Engine::default();
        let doc = Document::from(json!({"l": [1, 2, 3]}));
        assert_eq!(engine.get(&doc, "l.last").unwrap(), &Document::from(3));
        assert_eq!(engine.get(&doc, "l.first").unwrap(), &Document::from(1));

        let updated = engine.set(&doc, "l.last", 30).unwrap();
        assert_eq!(updated.to_json(), json!({"l": [1, 2, 30]}));

        let empty = Document::from(json!({"l": []}));
        assert!(engine.get(&empty, "l.last").unwrap_err().is_missing_path());

        let strict = engine
            .with_overrides(&ConfigOverrides {
                attribute_access: Some(false),
                ..Default::default()
            })
            .unwrap();
        assert!(strict.get(&doc, "l.last").unwrap_err().is_missing_path());
    }

    #[test]
    fn test_engine_ignore_case_default() {
        let engine = Engine::new(EngineConfig {
            ignore_case: true,
            ..Default::default()
        })
        .unwrap();
        let matcher = engine.matcher(vec!["HELLO".into()], false).unwrap();
        let doc = Document::from(json!({"greeting": "say hello"}));
        assert!(engine.contains(&doc, &matcher));
    }

    #[test]
    fn test_engine_find_replace_and_remove() {
        let engine = Engine::default();
        let doc = Document::from(json!({"a": "foo", "b": ["foo", "bar"]}));
        let matcher = ValueMatcher::new(
            vec!["foo".into()],
            false,
            StringMatchOptions::new(Strategy::Exact),
        )
        .unwrap();
        let replaced = engine
            .find_replace(&doc, &matcher, &Replacement::from("baz"))
            .unwrap();
        assert_eq!(replaced.to_json(), json!({"a": "baz", "b": ["baz", "bar"]}));
        let removed = engine.find_remove(&doc, &matcher).unwrap();
        assert_eq!(removed.to_json(), json!({"b": ["bar"]}));
    }

    #[test]
    fn test_engine_structural_ops() {
        let engine = Engine::default();
        let doc = Document::from(json!({"a": 1, "b": {"c": 2}}));
        let moved = engine.move_value(&doc, "b.c", "c").unwrap();
        assert_eq!(moved.to_json(), json!({"a": 1, "b": {}, "c": 2}));
        let renamed = engine.rename(&doc, "a", "z").unwrap();
        assert_eq!(engine.dump(&renamed, false).unwrap(), r#"{"z":1,"b":{"c":2}}"#);
        let reordered = engine.reorder(&doc, (), vec!["b".into()]).unwrap();
        assert_eq!(engine.dump(&reordered, false).unwrap(), r#"{"b":{"c":2},"a":1}"#);
        assert!(engine.filter(&doc, "d.b.c == 2").unwrap());
    }

    #[test]
    fn test_engine_apply_uses_config() {
        let engine = Engine::new(EngineConfig {
            skip_missing: true,
            ..Default::default()
        })
        .unwrap();
        let docs: DocumentCollection = vec![Document::from(json!({"a": 1})), Document::from(json!({}))]
            .into_iter()
            .collect();
        let out = engine.apply(&docs, &Step::get("a").unwrap()).unwrap();
        assert_eq!(out.into_vec(), vec![Document::from(1)]);
        assert!(engine.move_value(&Document::from(json!({})), "x", "y").is_err());
    }

    #[test]
    fn test_error_display() {
        let err = DocumentError::Navigation {
            path: "a.b".into(),
            token: "b".into(),
            reason: "no such key".into(),
        };
        assert_eq!(err.to_string(), "Path not found: 'a.b' (at 'b'): no such key");
        assert!(err.is_missing_path());
        assert!(!DocumentError::Task("x".into()).is_missing_path());
    }
}
