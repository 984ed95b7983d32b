//! Flattening documents into path dictionaries and back
//!
//! A [`PathDict`] maps canonical paths to leaf values. Containers that were
//! expanded can be annotated with a [`Marker`] so their kind survives the
//! round trip; without markers, integer-keyed levels come back as sequences
//! and string-keyed levels as mappings.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::config::EngineConfig;
use super::path::{parse, PathKey, Token};
use super::traversal::{walk, TraversalOptions, Visit};
use super::value::{Document, Mapping, Record};
use super::{DocumentError, Result};

/// Kind annotation for an expanded container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$marker", rename_all = "lowercase")]
pub enum Marker {
    /// String-keyed mapping
    Mapping,
    /// Ordered sequence
    Sequence,
    /// Unordered collection
    Set,
    /// Named record with its field names
    Record {
        /// Record type name
        name: String,
        /// Field names in positional order
        fields: Vec<String>,
    },
}

impl Marker {
    /// Marker for a container, `None` for scalars
    pub fn of(doc: &Document) -> Option<Self> {
        match doc {
            Document::Scalar(_) => None,
            Document::Mapping(_) => Some(Marker::Mapping),
            Document::Sequence(_) => Some(Marker::Sequence),
            Document::Set(_) => Some(Marker::Set),
            Document::Record(record) => Some(Marker::Record {
                name: record.name().to_string(),
                fields: record.field_names().map(str::to_string).collect(),
            }),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Mapping => write!(f, "<mapping>"),
            Marker::Sequence => write!(f, "<sequence>"),
            Marker::Set => write!(f, "<set>"),
            Marker::Record { name, fields } => write!(f, "<record {}({})>", name, fields.join(", ")),
        }
    }
}

/// Entry of a path dictionary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlatValue {
    /// Leaf value, or a container that was not expanded
    Value(Document),
    /// Expanded container annotation
    Marker(Marker),
}

impl From<Document> for FlatValue {
    fn from(value: Document) -> Self {
        FlatValue::Value(value)
    }
}

impl From<Marker> for FlatValue {
    fn from(value: Marker) -> Self {
        FlatValue::Marker(value)
    }
}

/// Paths mapped to leaf values and optional container markers
pub type PathDict = BTreeMap<PathKey, FlatValue>;

/// Options for [`flatten`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Emit a marker for every expanded container
    pub annotate_all: bool,
    /// Containers at this depth are emitted as values
    pub max_depth: usize,
    /// Containers with more children than this are emitted as values
    pub max_len: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl FlattenOptions {
    /// Defaults taken from an engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            annotate_all: false,
            max_depth: config.max_depth,
            max_len: config.max_len,
        }
    }

    /// Set `annotate_all`
    pub fn annotate_all(mut self, annotate_all: bool) -> Self {
        self.annotate_all = annotate_all;
        self
    }
}

/// Flatten `doc` into one entry per leaf or capped container
pub fn flatten(doc: &Document, options: &FlattenOptions) -> PathDict {
    let traversal = TraversalOptions::default()
        .max_depth(options.max_depth)
        .max_len(options.max_len);
    let mut out = PathDict::new();
    walk(doc, &traversal, |path, node| {
        if node.is_empty() || !traversal.expands(node, path.len()) {
            out.insert(path.clone(), FlatValue::Value(node.clone()));
            return Visit::Skip;
        }
        if options.annotate_all && (!path.is_root() || !is_inferred(node)) {
            if let Some(marker) = Marker::of(node) {
                out.insert(path.clone(), FlatValue::Marker(marker));
            }
        }
        Visit::Continue
    });
    out
}

/// Mappings and sequences are recovered from their key kinds, so the root
/// only carries a marker for sets and records
fn is_inferred(node: &Document) -> bool {
    matches!(node, Document::Mapping(_) | Document::Sequence(_))
}

/// Prefix tree built from a path dictionary
#[derive(Debug, Default)]
struct Trie {
    entry: Option<FlatValue>,
    children: BTreeMap<Token, Trie>,
}

/// Rebuild a document from a path dictionary
pub fn unflatten(dict: &PathDict) -> Result<Document> {
    let mut root = Trie::default();
    for (path, value) in dict {
        if path.is_root() && dict.len() > 1 && matches!(value, FlatValue::Value(_)) {
            return Err(DocumentError::Ambiguity(
                "root value next to other paths".to_string(),
            ));
        }
        let mut node = &mut root;
        for token in path {
            node = node.children.entry(token.clone()).or_default();
        }
        node.entry = Some(value.clone());
    }
    if root.entry.is_none() && root.children.is_empty() {
        return Ok(Document::from(Mapping::new()));
    }
    build(root, &mut PathKey::root())
}

fn build(node: Trie, path: &mut PathKey) -> Result<Document> {
    let marker = match node.entry {
        Some(FlatValue::Value(value)) => {
            if !node.children.is_empty() {
                return Err(DocumentError::Ambiguity(format!(
                    "value at '{}' also has children",
                    path
                )));
            }
            return Ok(value);
        }
        Some(FlatValue::Marker(marker)) => Some(marker),
        None => None,
    };

    let all_indices = node.children.keys().all(|t| matches!(t, Token::Index(_)));
    let all_keys = node.children.keys().all(|t| matches!(t, Token::Key(_)));
    let marker = match marker {
        Some(marker) => marker,
        None if all_indices => Marker::Sequence,
        None if all_keys => Marker::Mapping,
        None => {
            return Err(DocumentError::TypeMismatch(format!(
                "mixed integer and string keys under '{}'",
                path
            )))
        }
    };

    let mut children = Vec::with_capacity(node.children.len());
    for (token, child) in node.children {
        path.push(token.clone());
        let value = build(child, path)?;
        path.pop();
        children.push((token, value));
    }
    assemble(marker, children, path)
}

/// Check that sequence-like children are exactly `0..n`
fn positional(children: Vec<(Token, Document)>, path: &PathKey) -> Result<Vec<Document>> {
    children
        .into_iter()
        .enumerate()
        .map(|(expected, (token, value))| match token {
            Token::Index(i) if i == expected as i64 => Ok(value),
            other => Err(DocumentError::TypeMismatch(format!(
                "expected index {} under '{}', found '{}'",
                expected, path, other
            ))),
        })
        .collect()
}

fn assemble(marker: Marker, children: Vec<(Token, Document)>, path: &PathKey) -> Result<Document> {
    Ok(match marker {
        Marker::Mapping => Document::mapping(
            children
                .into_iter()
                .map(|(token, value)| (token.to_string(), value)),
        ),
        Marker::Sequence => Document::sequence(positional(children, path)?),
        Marker::Set => Document::set(positional(children, path)?),
        Marker::Record { name, fields } => {
            let values = positional(children, path)?;
            if values.len() != fields.len() {
                return Err(DocumentError::TypeMismatch(format!(
                    "record '{}' at '{}' expects {} fields, found {}",
                    name,
                    path,
                    fields.len(),
                    values.len()
                )));
            }
            Document::from(Record::new(name, fields.into_iter().zip(values).collect()))
        }
    })
}

/// Marker key used when a path dictionary is encoded as a document
pub const MARKER_KEY: &str = "$marker";

fn marker_to_json(marker: &Marker) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    match marker {
        Marker::Mapping => {
            object.insert(MARKER_KEY.into(), "mapping".into());
        }
        Marker::Sequence => {
            object.insert(MARKER_KEY.into(), "sequence".into());
        }
        Marker::Set => {
            object.insert(MARKER_KEY.into(), "set".into());
        }
        Marker::Record { name, fields } => {
            object.insert(MARKER_KEY.into(), "record".into());
            object.insert("name".into(), name.as_str().into());
            object.insert("fields".into(), fields.clone().into());
        }
    }
    serde_json::Value::Object(object)
}

/// Render a path dictionary as a JSON object keyed by canonical path
/// strings; markers become `{"$marker": kind}` objects
pub fn path_dict_to_json(dict: &PathDict) -> serde_json::Value {
    serde_json::Value::Object(
        dict.iter()
            .map(|(path, value)| {
                let rendered = match value {
                    FlatValue::Value(v) => v.to_json(),
                    FlatValue::Marker(m) => marker_to_json(m),
                };
                (path.to_string(), rendered)
            })
            .collect(),
    )
}

/// Encode a path dictionary as a mapping document, as [`path_dict_to_json`]
pub fn path_dict_to_document(dict: &PathDict) -> Document {
    Document::mapping(dict.iter().map(|(path, value)| {
        let rendered = match value {
            FlatValue::Value(v) => v.clone(),
            FlatValue::Marker(m) => Document::from(marker_to_json(m)),
        };
        (path.to_string(), rendered)
    }))
}

/// Decode a mapping produced by [`path_dict_to_document`]
pub fn path_dict_from_document(doc: &Document) -> Result<PathDict> {
    let map = doc.as_mapping().ok_or_else(|| {
        DocumentError::TypeMismatch(format!("expected a path mapping, found {}", doc.kind()))
    })?;
    let mut dict = PathDict::new();
    for (path, value) in map {
        let is_marker = value
            .as_mapping()
            .is_some_and(|m| m.contains_key(MARKER_KEY));
        let entry = if is_marker {
            let marker: Marker = serde_json::from_value(value.to_json())
                .map_err(|e| DocumentError::Serialization(format!("bad marker at '{}': {}", path, e)))?;
            FlatValue::Marker(marker)
        } else {
            FlatValue::Value(value.clone())
        };
        dict.insert(parse(path)?, entry);
    }
    Ok(dict)
}
