//! Steps: the unit of work applied to one document
//!
//! Named steps are resolved against a closed registry when the [`Step`] is
//! built, so argument errors surface before any document is touched.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::{default_config, StepContext};
use crate::document::config::EngineConfig;
use crate::document::expression::Query;
use crate::document::flatten::{
    flatten, path_dict_from_document, path_dict_to_document, unflatten, FlattenOptions,
};
use crate::document::matcher::{MatchShape, Strategy, StringMatchOptions, Target, ValueMatcher};
use crate::document::navigate::{Replacement, WriteBatch};
use crate::document::path::{parse, IntoPathKey, PathKey, Token};
use crate::document::search::{self, FindReturn, SearchOptions};
use crate::document::value::{Document, Mapping};
use crate::document::{DocumentError, Result};

/// User step: returns the new document, or `None` to drop it
pub type StepFn = Arc<dyn Fn(&Document, &StepArgs) -> Result<Option<Document>> + Send + Sync>;

/// Names of the built-in steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Read a path
    Get,
    /// Write a path
    Set,
    /// Remove a path
    Remove,
    /// Move a value between paths
    Move,
    /// Rename a mapping key in place
    Rename,
    /// Reorder the keys of a mapping
    Reorder,
    /// Search for values
    Find,
    /// Replace matched values
    FindReplace,
    /// Remove matched values
    FindRemove,
    /// Flatten to a path mapping
    Flatten,
    /// Rebuild from a path mapping
    Unflatten,
    /// Evaluate a query expression
    Query,
    /// Keep documents for which a query is truthy
    Filter,
    /// Serialize to a JSON string
    Dump,
}

impl StepKind {
    /// Every built-in step
    pub const ALL: [StepKind; 14] = [
        StepKind::Get,
        StepKind::Set,
        StepKind::Remove,
        StepKind::Move,
        StepKind::Rename,
        StepKind::Reorder,
        StepKind::Find,
        StepKind::FindReplace,
        StepKind::FindRemove,
        StepKind::Flatten,
        StepKind::Unflatten,
        StepKind::Query,
        StepKind::Filter,
        StepKind::Dump,
    ];

    /// Registry name
    pub fn name(self) -> &'static str {
        match self {
            StepKind::Get => "get",
            StepKind::Set => "set",
            StepKind::Remove => "remove",
            StepKind::Move => "move",
            StepKind::Rename => "rename",
            StepKind::Reorder => "reorder",
            StepKind::Find => "find",
            StepKind::FindReplace => "find_replace",
            StepKind::FindRemove => "find_remove",
            StepKind::Flatten => "flatten",
            StepKind::Unflatten => "unflatten",
            StepKind::Query => "query",
            StepKind::Filter => "filter",
            StepKind::Dump => "dump",
        }
    }

    /// Look up a step by registry name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Positional and keyword arguments of a step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepArgs {
    /// Positional arguments
    pub positional: Vec<Document>,
    /// Keyword arguments, in insertion order
    pub keyword: IndexMap<String, Document>,
}

impl StepArgs {
    /// No arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Document>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Add a keyword argument
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Document>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    /// Arguments from JSON: an array is positional, an object is keyword,
    /// null is empty and any other value is a single positional argument
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::new(),
            serde_json::Value::Array(items) => Self {
                positional: items.iter().cloned().map(Document::from).collect(),
                keyword: IndexMap::new(),
            },
            serde_json::Value::Object(map) => Self {
                positional: Vec::new(),
                keyword: map
                    .iter()
                    .map(|(k, v)| (k.clone(), Document::from(v.clone())))
                    .collect(),
            },
            other => Self::new().arg(Document::from(other.clone())),
        }
    }

    /// Argument by keyword, falling back to position
    pub fn get(&self, index: usize, name: &str) -> Option<&Document> {
        self.keyword.get(name).or_else(|| self.positional.get(index))
    }

    fn required(&self, step: StepKind, index: usize, name: &str) -> Result<&Document> {
        self.get(index, name).ok_or_else(|| {
            DocumentError::InvalidStep(format!("{} requires argument '{}'", step, name))
        })
    }

    fn path(&self, step: StepKind, index: usize, name: &str) -> Result<PathKey> {
        path_argument(step, name, self.required(step, index, name)?)
    }

    fn text(&self, step: StepKind, index: usize, name: &str) -> Result<String> {
        let value = self.required(step, index, name)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid_argument(step, name, "a string", value))
    }

    fn flag(&self, step: StepKind, name: &str, default: bool) -> Result<bool> {
        match self.keyword.get(name) {
            None => Ok(default),
            Some(value) => value
                .as_bool()
                .ok_or_else(|| invalid_argument(step, name, "a bool", value)),
        }
    }

    fn count(&self, step: StepKind, name: &str) -> Result<Option<usize>> {
        match self.keyword.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| invalid_argument(step, name, "a non-negative integer", value)),
        }
    }
}

fn invalid_argument(step: StepKind, name: &str, expected: &str, found: &Document) -> DocumentError {
    DocumentError::InvalidStep(format!(
        "{}: argument '{}' must be {}, found {}",
        step,
        name,
        expected,
        found.kind()
    ))
}

/// A path argument: a path string, an integer, null for the root or a list of tokens
fn path_argument(step: StepKind, name: &str, value: &Document) -> Result<PathKey> {
    if value.is_null() {
        return Ok(PathKey::root());
    }
    if let Some(text) = value.as_str() {
        return parse(text);
    }
    if let Some(index) = value.as_i64() {
        return Ok(PathKey::new(vec![Token::Index(index)]));
    }
    if let Some(items) = value.as_sequence() {
        return items
            .iter()
            .map(|item| match (item.as_str(), item.as_i64()) {
                (Some(key), _) => Ok(Token::Key(key.to_string())),
                (None, Some(index)) => Ok(Token::Index(index)),
                _ => Err(invalid_argument(step, name, "a path token", item)),
            })
            .collect();
    }
    Err(invalid_argument(step, name, "a path", value))
}

/// `{"not": x}` negates, strings are patterns, everything else matches by value
fn target_argument(value: &Document) -> Target {
    if let Some(map) = value.as_mapping() {
        if let (1, Some(inner)) = (map.len(), map.get("not")) {
            return !target_argument(inner);
        }
    }
    match value.as_str() {
        Some(pattern) => Target::Pattern(pattern.to_string()),
        None => Target::Value(value.clone()),
    }
}

fn matcher_argument(step: StepKind, args: &StepArgs, config: &EngineConfig) -> Result<ValueMatcher> {
    let raw = args
        .keyword
        .get("targets")
        .map_or_else(|| args.required(step, 0, "target"), Ok)?;
    let targets = match raw.as_sequence() {
        Some(items) => items.iter().map(target_argument).collect(),
        None => vec![target_argument(raw)],
    };

    let strategy = match args.keyword.get("strategy") {
        None => Strategy::default(),
        Some(value) => value
            .as_str()
            .and_then(Strategy::from_name)
            .ok_or_else(|| invalid_argument(step, "strategy", "a strategy name", value))?,
    };
    let mut options = StringMatchOptions::new(strategy)
        .ignore_case(args.flag(step, "ignore_case", config.ignore_case)?)
        .threshold(config.fuzzy_threshold);
    if let Some(value) = args.keyword.get("threshold") {
        let threshold = value
            .as_f64()
            .ok_or_else(|| invalid_argument(step, "threshold", "a number", value))?;
        options = options.threshold(threshold);
    }
    if let Some(group) = args.count(step, "group")? {
        options = options.group(group);
    }
    if let Some(distance) = args.count(step, "max_distance")? {
        options = options.max_distance(distance);
    }
    ValueMatcher::new(targets, args.flag(step, "find_all", false)?, options)
}

fn find_return_argument(step: StepKind, args: &StepArgs) -> Result<FindReturn> {
    let Some(value) = args.keyword.get("return") else {
        return Ok(FindReturn::Bool);
    };
    match value.as_str() {
        Some("bool") => Ok(FindReturn::Bool),
        Some("values") => Ok(FindReturn::Values),
        Some("matches") => Ok(FindReturn::Matches(MatchShape::Bool)),
        Some("offsets") => Ok(FindReturn::Matches(MatchShape::Offsets)),
        Some("ranges") => Ok(FindReturn::Matches(MatchShape::Ranges)),
        Some("strings") => Ok(FindReturn::Matches(MatchShape::Strings)),
        _ => Err(invalid_argument(step, "return", "one of bool, values, matches, offsets, ranges, strings", value)),
    }
}

/// A resolved built-in step
#[derive(Debug, Clone)]
enum Action {
    Get { key: PathKey, keep_path: bool },
    Set { key: PathKey, value: Replacement },
    Remove { key: PathKey },
    Move { from: PathKey, to: PathKey },
    Rename { key: PathKey, name: String },
    Reorder { key: PathKey, order: Vec<String> },
    Find { matcher: ValueMatcher, ret: FindReturn },
    FindReplace { matcher: ValueMatcher, replacement: Replacement, changed_only: bool },
    FindRemove { matcher: ValueMatcher, changed_only: bool },
    Flatten { annotate_all: bool },
    Unflatten,
    Query(Query),
    Filter(Query),
    Dump { pretty: bool },
}

impl Action {
    fn resolve(kind: StepKind, args: &StepArgs, config: &EngineConfig) -> Result<Self> {
        Ok(match kind {
            StepKind::Get => Action::Get {
                key: args.path(kind, 0, "key")?,
                keep_path: args.flag(kind, "keep_path", false)?,
            },
            StepKind::Set => Action::Set {
                key: args.path(kind, 0, "key")?,
                value: args.required(kind, 1, "value")?.clone().into(),
            },
            StepKind::Remove => Action::Remove {
                key: args.path(kind, 0, "key")?,
            },
            StepKind::Move => Action::Move {
                from: args.path(kind, 0, "from")?,
                to: args.path(kind, 1, "to")?,
            },
            StepKind::Rename => Action::Rename {
                key: args.path(kind, 0, "key")?,
                name: args.text(kind, 1, "name")?,
            },
            StepKind::Reorder => {
                let order = args.required(kind, 1, "order")?;
                let names = order
                    .as_sequence()
                    .ok_or_else(|| invalid_argument(kind, "order", "a list of keys", order))?
                    .iter()
                    .map(|name| {
                        name.as_str()
                            .map(str::to_string)
                            .ok_or_else(|| invalid_argument(kind, "order", "a list of keys", name))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Action::Reorder {
                    key: args.path(kind, 0, "key")?,
                    order: names,
                }
            }
            StepKind::Find => Action::Find {
                matcher: matcher_argument(kind, args, config)?,
                ret: find_return_argument(kind, args)?,
            },
            StepKind::FindReplace => Action::FindReplace {
                matcher: matcher_argument(kind, args, config)?,
                replacement: args.required(kind, 1, "replacement")?.clone().into(),
                changed_only: args.flag(kind, "changed_only", false)?,
            },
            StepKind::FindRemove => Action::FindRemove {
                matcher: matcher_argument(kind, args, config)?,
                changed_only: args.flag(kind, "changed_only", false)?,
            },
            StepKind::Flatten => Action::Flatten {
                annotate_all: args.flag(kind, "annotate_all", false)?,
            },
            StepKind::Unflatten => Action::Unflatten,
            StepKind::Query => Action::Query(Query::parse(&args.text(kind, 0, "expr")?)?),
            StepKind::Filter => Action::Filter(Query::parse(&args.text(kind, 0, "expr")?)?),
            StepKind::Dump => Action::Dump {
                pretty: args.flag(kind, "pretty", false)?,
            },
        })
    }

    fn kind(&self) -> StepKind {
        match self {
            Action::Get { .. } => StepKind::Get,
            Action::Set { .. } => StepKind::Set,
            Action::Remove { .. } => StepKind::Remove,
            Action::Move { .. } => StepKind::Move,
            Action::Rename { .. } => StepKind::Rename,
            Action::Reorder { .. } => StepKind::Reorder,
            Action::Find { .. } => StepKind::Find,
            Action::FindReplace { .. } => StepKind::FindReplace,
            Action::FindRemove { .. } => StepKind::FindRemove,
            Action::Flatten { .. } => StepKind::Flatten,
            Action::Unflatten => StepKind::Unflatten,
            Action::Query(_) => StepKind::Query,
            Action::Filter(_) => StepKind::Filter,
            Action::Dump { .. } => StepKind::Dump,
        }
    }

    fn run(&self, doc: &Document, ctx: &StepContext<'_>, skip_missing: bool) -> Result<Option<Document>> {
        let nav = ctx.navigator;
        let search_options = || SearchOptions::from_config(ctx.config).skip_missing(skip_missing);
        match self {
            Action::Get { key, keep_path } => {
                if *keep_path {
                    nav.get_keep_path(doc, key).map(Some)
                } else {
                    nav.get_key(doc, key).cloned().map(Some)
                }
            }
            Action::Set { key, value } => nav.set(doc, key, value.clone()).map(Some),
            Action::Remove { key } => nav.remove(doc, key).map(Some),
            Action::Move { from, to } => {
                let mut batch = WriteBatch::with_navigator(nav, doc);
                let value = batch.remove(from)?;
                batch.set(to, value)?;
                Ok(Some(batch.finish()))
            }
            Action::Rename { key, name } => rename(ctx, doc, key, name).map(Some),
            Action::Reorder { key, order } => reorder(ctx, doc, key, order).map(Some),
            Action::Find { matcher, ret } => search::find(doc, matcher, *ret, &search_options())
                .into_document()
                .map(Some),
            Action::FindReplace {
                matcher,
                replacement,
                changed_only,
            } => {
                let mut batch = WriteBatch::with_navigator(nav, doc);
                let checkpoint = batch.checkpoint();
                search::find_replace_in(&mut batch, matcher, replacement, &search_options())?;
                Ok(keep_if_changed(batch, checkpoint, *changed_only))
            }
            Action::FindRemove {
                matcher,
                changed_only,
            } => {
                let mut batch = WriteBatch::with_navigator(nav, doc);
                let checkpoint = batch.checkpoint();
                search::find_remove_in(&mut batch, matcher, &search_options())?;
                Ok(keep_if_changed(batch, checkpoint, *changed_only))
            }
            Action::Flatten { annotate_all } => {
                let options = FlattenOptions::from_config(ctx.config).annotate_all(*annotate_all);
                Ok(Some(path_dict_to_document(&flatten(doc, &options))))
            }
            Action::Unflatten => unflatten(&path_dict_from_document(doc)?).map(Some),
            Action::Query(query) => query
                .evaluate(doc, &ctx.config.query_variable, nav)
                .map(Some),
            Action::Filter(query) => {
                let keep = query.matches(doc, &ctx.config.query_variable, nav)?;
                Ok(keep.then(|| doc.clone()))
            }
            Action::Dump { pretty } => {
                let text = if *pretty {
                    serde_json::to_string_pretty(doc)?
                } else {
                    serde_json::to_string(doc)?
                };
                Ok(Some(text.into()))
            }
        }
    }
}

fn keep_if_changed(batch: WriteBatch<'_>, checkpoint: usize, changed_only: bool) -> Option<Document> {
    if changed_only && !batch.grew(checkpoint) {
        None
    } else {
        Some(batch.finish())
    }
}

fn mapping_at<'d>(ctx: &StepContext<'_>, doc: &'d Document, key: &PathKey) -> Result<&'d Mapping> {
    let node = ctx.navigator.get_key(doc, key)?;
    node.as_mapping().ok_or_else(|| {
        DocumentError::TypeMismatch(format!("expected a mapping at '{}', found {}", key, node.kind()))
    })
}

fn missing_key(key: &PathKey, name: &str) -> DocumentError {
    DocumentError::Navigation {
        path: key.to_string(),
        token: name.to_string(),
        reason: "key not found in mapping".to_string(),
    }
}

/// Rename the last key of `key`, keeping its position in the parent mapping
fn rename(ctx: &StepContext<'_>, doc: &Document, key: &PathKey, name: &str) -> Result<Document> {
    let (parent, last) = key
        .split_last()
        .ok_or_else(|| DocumentError::TypeMismatch("cannot rename the root".to_string()))?;
    let old = match last {
        Token::Key(k) => k.clone(),
        Token::Index(i) => i.to_string(),
    };
    let map = mapping_at(ctx, doc, &parent)?;
    if !map.contains_key(&old) {
        return Err(missing_key(key, &old));
    }
    let renamed: Mapping = map
        .iter()
        .filter(|(k, _)| k.as_str() != name || **k == old)
        .map(|(k, v)| {
            let k = if *k == old { name.to_string() } else { k.clone() };
            (k, v.clone())
        })
        .collect();
    ctx.navigator.set(doc, &parent, Document::from(renamed))
}

/// Put the listed keys first, in order, followed by the rest
fn reorder(ctx: &StepContext<'_>, doc: &Document, key: &PathKey, order: &[String]) -> Result<Document> {
    let map = mapping_at(ctx, doc, key)?;
    let mut reordered = Mapping::with_capacity(map.len());
    for name in order {
        let value = map.get(name).ok_or_else(|| missing_key(&key.child(name.as_str()), name))?;
        reordered.insert(name.clone(), value.clone());
    }
    for (k, v) in map {
        if !reordered.contains_key(k) {
            reordered.insert(k.clone(), v.clone());
        }
    }
    ctx.navigator.set(doc, key, Document::from(reordered))
}

#[derive(Clone)]
enum Inner {
    Builtin {
        action: Action,
        skip_missing: Option<bool>,
    },
    Func {
        func: StepFn,
        args: StepArgs,
    },
    Chain(Vec<Step>),
}

/// A unit of work applied to one document at a time
#[derive(Clone)]
pub struct Step {
    inner: Inner,
    raw: bool,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Builtin { action, skip_missing } => f
                .debug_struct("Step")
                .field("action", action)
                .field("skip_missing", skip_missing)
                .field("raw", &self.raw)
                .finish(),
            Inner::Func { args, .. } => f
                .debug_struct("Step")
                .field("func", &"<fn>")
                .field("args", args)
                .field("raw", &self.raw)
                .finish(),
            Inner::Chain(steps) => f
                .debug_struct("Step")
                .field("chain", steps)
                .field("raw", &self.raw)
                .finish(),
        }
    }
}

impl Step {
    fn from_inner(inner: Inner) -> Self {
        Self { inner, raw: false }
    }

    fn builtin(action: Action) -> Self {
        Self::from_inner(Inner::Builtin {
            action,
            skip_missing: None,
        })
    }

    /// Resolve a built-in step by name with default configuration
    pub fn named(name: &str, args: StepArgs) -> Result<Self> {
        Self::named_with(name, args, default_config())
    }

    /// Resolve a built-in step by name; string-matching defaults come from `config`
    pub fn named_with(name: &str, args: StepArgs, config: &EngineConfig) -> Result<Self> {
        let kind = StepKind::from_name(name)
            .ok_or_else(|| DocumentError::InvalidStep(format!("unknown step '{}'", name)))?;
        Self::resolve(kind, args, config)
    }

    /// Resolve a built-in step
    pub fn resolve(kind: StepKind, args: StepArgs, config: &EngineConfig) -> Result<Self> {
        let skip_missing = match args.keyword.get("skip_missing") {
            None => None,
            Some(value) => Some(
                value
                    .as_bool()
                    .ok_or_else(|| invalid_argument(kind, "skip_missing", "a bool", value))?,
            ),
        };
        let action = Action::resolve(kind, &args, config)?;
        debug!(step = %kind, "resolved step");
        Ok(Self::from_inner(Inner::Builtin { action, skip_missing }))
    }

    /// A user function with no arguments
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&Document, &StepArgs) -> Result<Option<Document>> + Send + Sync + 'static,
    {
        Self::func_with(f, StepArgs::new())
    }

    /// A user function bound to arguments
    pub fn func_with<F>(f: F, args: StepArgs) -> Self
    where
        F: Fn(&Document, &StepArgs) -> Result<Option<Document>> + Send + Sync + 'static,
    {
        Self::from_inner(Inner::Func {
            func: Arc::new(f),
            args,
        })
    }

    /// A user function mapping each document to a new one
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(&Document) -> Result<Document> + Send + Sync + 'static,
    {
        Self::func(move |doc, _| f(doc).map(Some))
    }

    /// Run steps in sequence; a dropped document stops the chain
    pub fn chain(steps: Vec<Step>) -> Self {
        Self::from_inner(Inner::Chain(steps))
    }

    /// A query expression step
    pub fn expr(source: &str) -> Result<Self> {
        Ok(Self::builtin(Action::Query(Query::parse(source)?)))
    }

    /// Read `key`
    pub fn get(key: impl IntoPathKey) -> Result<Self> {
        Ok(Self::builtin(Action::Get {
            key: key.into_path_key()?,
            keep_path: false,
        }))
    }

    /// Read `key`, keeping its surrounding path structure
    pub fn get_keep_path(key: impl IntoPathKey) -> Result<Self> {
        Ok(Self::builtin(Action::Get {
            key: key.into_path_key()?,
            keep_path: true,
        }))
    }

    /// Write `value` at `key`
    pub fn set(key: impl IntoPathKey, value: impl Into<Replacement>) -> Result<Self> {
        Ok(Self::builtin(Action::Set {
            key: key.into_path_key()?,
            value: value.into(),
        }))
    }

    /// Remove `key`
    pub fn remove(key: impl IntoPathKey) -> Result<Self> {
        Ok(Self::builtin(Action::Remove {
            key: key.into_path_key()?,
        }))
    }

    /// Move the value at `from` to `to`
    pub fn move_value(from: impl IntoPathKey, to: impl IntoPathKey) -> Result<Self> {
        Ok(Self::builtin(Action::Move {
            from: from.into_path_key()?,
            to: to.into_path_key()?,
        }))
    }

    /// Rename the mapping key at `key`
    pub fn rename(key: impl IntoPathKey, name: impl Into<String>) -> Result<Self> {
        Ok(Self::builtin(Action::Rename {
            key: key.into_path_key()?,
            name: name.into(),
        }))
    }

    /// Reorder the mapping at `key`
    pub fn reorder(key: impl IntoPathKey, order: Vec<String>) -> Result<Self> {
        Ok(Self::builtin(Action::Reorder {
            key: key.into_path_key()?,
            order,
        }))
    }

    /// Search each document
    pub fn find(matcher: ValueMatcher, ret: FindReturn) -> Self {
        Self::builtin(Action::Find { matcher, ret })
    }

    /// Replace matches in each document
    pub fn find_replace(matcher: ValueMatcher, replacement: impl Into<Replacement>, changed_only: bool) -> Self {
        Self::builtin(Action::FindReplace {
            matcher,
            replacement: replacement.into(),
            changed_only,
        })
    }

    /// Remove matches from each document
    pub fn find_remove(matcher: ValueMatcher, changed_only: bool) -> Self {
        Self::builtin(Action::FindRemove { matcher, changed_only })
    }

    /// Flatten each document
    pub fn flatten(annotate_all: bool) -> Self {
        Self::builtin(Action::Flatten { annotate_all })
    }

    /// Rebuild each document from its flattened form
    pub fn unflatten() -> Self {
        Self::builtin(Action::Unflatten)
    }

    /// Keep documents for which `source` is truthy
    pub fn filter(source: &str) -> Result<Self> {
        Ok(Self::builtin(Action::Filter(Query::parse(source)?)))
    }

    /// Serialize each document to JSON text
    pub fn dump(pretty: bool) -> Self {
        Self::builtin(Action::Dump { pretty })
    }

    /// Return results as a plain list instead of a collection
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Override `skip_missing` for built-in steps, recursively through chains
    pub fn skip_missing(mut self, skip: bool) -> Self {
        match &mut self.inner {
            Inner::Builtin { skip_missing, .. } => *skip_missing = Some(skip),
            Inner::Func { .. } => {}
            Inner::Chain(steps) => {
                let inner = std::mem::take(steps);
                *steps = inner.into_iter().map(|s| s.skip_missing(skip)).collect();
            }
        }
        self
    }

    /// Whether results are returned raw
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// Built-in kind, if this is a built-in step
    pub fn kind(&self) -> Option<StepKind> {
        match &self.inner {
            Inner::Builtin { action, .. } => Some(action.kind()),
            _ => None,
        }
    }

    /// Run against one document; `None` drops it.
    ///
    /// Missing paths in built-in steps are absorbed when `skip_missing` is in
    /// effect. Errors from user functions always propagate.
    pub fn run(&self, doc: &Document, ctx: &StepContext<'_>) -> Result<Option<Document>> {
        match &self.inner {
            Inner::Builtin { action, skip_missing } => {
                let skip = skip_missing.unwrap_or(ctx.config.skip_missing);
                match action.run(doc, ctx, skip) {
                    Err(e) if skip && e.is_missing_path() => {
                        debug!(step = %action.kind(), error = %e, "dropping document with missing path");
                        Ok(None)
                    }
                    other => other,
                }
            }
            Inner::Func { func, args } => func(doc, args),
            Inner::Chain(steps) => {
                let mut current = doc.clone();
                for step in steps {
                    match step.run(&current, ctx)? {
                        Some(next) => current = next,
                        None => return Ok(None),
                    }
                }
                Ok(Some(current))
            }
        }
    }
}

/// A step bound to one document
#[derive(Debug, Clone, Copy)]
pub struct Task<'a> {
    step: &'a Step,
    document: &'a Document,
}

impl<'a> Task<'a> {
    /// Bind `step` to `document`
    pub fn new(step: &'a Step, document: &'a Document) -> Self {
        Self { step, document }
    }

    /// The bound document
    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Execute the task
    pub fn run(&self, ctx: &StepContext<'_>) -> Result<Option<Document>> {
        self.step.run(self.document, ctx)
    }
}
