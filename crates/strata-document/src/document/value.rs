//! Document value model
//!
//! A [`Document`] is a closed tagged variant over the container kinds the
//! engine understands. Children live behind [`Arc`], so cloning a document is
//! cheap and untouched subtrees keep their identity across copy-on-write
//! updates (see [`Document::ptr_eq`]).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::path::Token;

/// Insertion-ordered string-keyed mapping backing [`Document::Mapping`]
pub type Mapping = IndexMap<String, Document>;

/// Leaf values
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Scalar {
    /// Null / absent
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// UTF-8 string
    Str(String),
}

impl Scalar {
    /// Numeric view of the scalar, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Whether this scalar is an integer or a float
    pub fn is_number(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }
}

/// A named record: an ordered tuple whose positions also carry field names
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    name: String,
    fields: Vec<(String, Document)>,
}

impl Record {
    /// Create a record from a type name and its fields, in order
    pub fn new(name: impl Into<String>, fields: Vec<(String, Document)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Record type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in positional order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Field values in positional order
    pub fn values(&self) -> impl Iterator<Item = &Document> {
        self.fields.iter().map(|(_, value)| value)
    }

    /// Value at a position
    pub fn get(&self, index: usize) -> Option<&Document> {
        self.fields.get(index).map(|(_, value)| value)
    }

    /// Mutable value at a position
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Document> {
        self.fields.get_mut(index).map(|(_, value)| value)
    }

    /// Position of a named field
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field == name)
    }

    /// Value of a named field
    pub fn field(&self, name: &str) -> Option<&Document> {
        self.position(name).and_then(|i| self.get(i))
    }

    /// Mutable value of a named field
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Document> {
        let index = self.position(name)?;
        self.get_mut(index)
    }
}

/// Kind tag of a document node, used for dispatch and type guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Any leaf value
    Scalar,
    /// String-keyed map
    Mapping,
    /// Ordered sequence
    Sequence,
    /// Unordered collection
    Set,
    /// Named record
    Record,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::Scalar => "scalar",
            DocumentKind::Mapping => "mapping",
            DocumentKind::Sequence => "sequence",
            DocumentKind::Set => "set",
            DocumentKind::Record => "record",
        };
        f.write_str(name)
    }
}

/// A semi-structured document node
#[derive(Debug, Clone)]
pub enum Document {
    /// Leaf value
    Scalar(Scalar),
    /// String-keyed, insertion-ordered map
    Mapping(Arc<Mapping>),
    /// Ordered sequence
    Sequence(Arc<Vec<Document>>),
    /// Unordered collection; iteration order is not part of its value
    Set(Arc<Vec<Document>>),
    /// Named record
    Record(Arc<Record>),
}

impl Default for Document {
    fn default() -> Self {
        Document::Scalar(Scalar::Null)
    }
}

impl Document {
    /// The null document
    pub fn null() -> Self {
        Self::default()
    }

    /// Build a mapping from key/value pairs
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Document)>,
    {
        Document::Mapping(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Build an ordered sequence
    pub fn sequence(items: Vec<Document>) -> Self {
        Document::Sequence(Arc::new(items))
    }

    /// Build an unordered collection; duplicates are removed
    pub fn set(items: Vec<Document>) -> Self {
        let mut unique: Vec<Document> = Vec::with_capacity(items.len());
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Document::Set(Arc::new(unique))
    }

    /// Build a named record
    pub fn record(name: impl Into<String>, fields: Vec<(String, Document)>) -> Self {
        Document::Record(Arc::new(Record::new(name, fields)))
    }

    /// Kind of this node
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Scalar(_) => DocumentKind::Scalar,
            Document::Mapping(_) => DocumentKind::Mapping,
            Document::Sequence(_) => DocumentKind::Sequence,
            Document::Set(_) => DocumentKind::Set,
            Document::Record(_) => DocumentKind::Record,
        }
    }

    /// Whether this node can hold children
    pub fn is_container(&self) -> bool {
        !matches!(self, Document::Scalar(_))
    }

    /// Number of direct children, `None` for scalars
    pub fn len(&self) -> Option<usize> {
        match self {
            Document::Scalar(_) => None,
            Document::Mapping(map) => Some(map.len()),
            Document::Sequence(items) | Document::Set(items) => Some(items.len()),
            Document::Record(record) => Some(record.len()),
        }
    }

    /// Whether this is an empty container (scalars are never empty)
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Direct children with the token addressing each of them.
    ///
    /// Sets are materialized in their current order, which carries no meaning.
    pub fn children(&self) -> Vec<(Token, &Document)> {
        match self {
            Document::Scalar(_) => Vec::new(),
            Document::Mapping(map) => map
                .iter()
                .map(|(k, v)| (Token::Key(k.clone()), v))
                .collect(),
            Document::Sequence(items) | Document::Set(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Token::Index(i as i64), v))
                .collect(),
            Document::Record(record) => record
                .values()
                .enumerate()
                .map(|(i, v)| (Token::Index(i as i64), v))
                .collect(),
        }
    }

    /// Identity comparison: true when both are the same shared container
    pub fn ptr_eq(&self, other: &Document) -> bool {
        match (self, other) {
            (Document::Mapping(a), Document::Mapping(b)) => Arc::ptr_eq(a, b),
            (Document::Sequence(a), Document::Sequence(b)) => Arc::ptr_eq(a, b),
            (Document::Set(a), Document::Set(b)) => Arc::ptr_eq(a, b),
            (Document::Record(a), Document::Record(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Scalar payload, if this is a scalar
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Document::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer payload
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Document::Scalar(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Numeric payload (integers are widened)
    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_f64)
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Document::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is the null scalar
    pub fn is_null(&self) -> bool {
        matches!(self, Document::Scalar(Scalar::Null))
    }

    /// Mapping payload
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Document::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Sequence payload
    pub fn as_sequence(&self) -> Option<&[Document]> {
        match self {
            Document::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Record payload
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Document::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Truthiness: null, false, zero, empty strings and empty containers are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Document::Scalar(Scalar::Null) => false,
            Document::Scalar(Scalar::Bool(b)) => *b,
            Document::Scalar(Scalar::Int(i)) => *i != 0,
            Document::Scalar(Scalar::Float(f)) => *f != 0.0,
            Document::Scalar(Scalar::Str(s)) => !s.is_empty(),
            other => !other.is_empty(),
        }
    }

    /// Convert to a JSON value. Sets become arrays and records become objects
    /// keyed by field name; non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Document::Scalar(a), Document::Scalar(b)) => a == b,
            (Document::Mapping(a), Document::Mapping(b)) => Arc::ptr_eq(a, b) || a == b,
            (Document::Sequence(a), Document::Sequence(b)) => Arc::ptr_eq(a, b) || a == b,
            (Document::Set(a), Document::Set(b)) => Arc::ptr_eq(a, b) || multiset_eq(a, b),
            (Document::Record(a), Document::Record(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

/// Order-insensitive equality for unordered collections
fn multiset_eq(a: &[Document], b: &[Document]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    'outer: for item in a {
        for (i, candidate) in b.iter().enumerate() {
            if !used[i] && item == candidate {
                used[i] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<Scalar> for Document {
    fn from(value: Scalar) -> Self {
        Document::Scalar(value)
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Document::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Document::Scalar(Scalar::Int(value))
    }
}

impl From<i32> for Document {
    fn from(value: i32) -> Self {
        Document::Scalar(Scalar::Int(value.into()))
    }
}

impl From<usize> for Document {
    fn from(value: usize) -> Self {
        Document::Scalar(Scalar::Int(value as i64))
    }
}

impl From<f64> for Document {
    fn from(value: f64) -> Self {
        Document::Scalar(Scalar::Float(value))
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Document::Scalar(Scalar::Str(value))
    }
}

impl From<Vec<Document>> for Document {
    fn from(value: Vec<Document>) -> Self {
        Document::sequence(value)
    }
}

impl From<Mapping> for Document {
    fn from(value: Mapping) -> Self {
        Document::Mapping(Arc::new(value))
    }
}

impl From<Record> for Document {
    fn from(value: Record) -> Self {
        Document::Record(Arc::new(value))
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Document::null(),
            serde_json::Value::Bool(b) => b.into(),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => i.into(),
                None => n.as_f64().map(Document::from).unwrap_or_default(),
            },
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(items) => {
                Document::sequence(items.into_iter().map(Document::from).collect())
            }
            serde_json::Value::Object(map) => {
                Document::mapping(map.into_iter().map(|(k, v)| (k, Document::from(v))))
            }
        }
    }
}

impl From<&Document> for serde_json::Value {
    fn from(value: &Document) -> Self {
        match value {
            Document::Scalar(Scalar::Null) => serde_json::Value::Null,
            Document::Scalar(Scalar::Bool(b)) => serde_json::Value::Bool(*b),
            Document::Scalar(Scalar::Int(i)) => serde_json::Value::Number((*i).into()),
            Document::Scalar(Scalar::Float(f)) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Document::Scalar(Scalar::Str(s)) => serde_json::Value::String(s.clone()),
            Document::Mapping(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
            Document::Sequence(items) | Document::Set(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Document::Record(record) => serde_json::Value::Object(
                record
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Document> for serde_json::Value {
    fn from(value: Document) -> Self {
        serde_json::Value::from(&value)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Document::Scalar(Scalar::Null) => serializer.serialize_unit(),
            Document::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Document::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            Document::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            Document::Scalar(Scalar::Str(s)) => serializer.serialize_str(s),
            Document::Mapping(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Document::Sequence(items) | Document::Set(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    out.serialize_element(item)?;
                }
                out.end()
            }
            Document::Record(record) => {
                let mut out = serializer.serialize_map(Some(record.len()))?;
                for (k, v) in &record.fields {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Document::from)
    }
}

/// Fluent builder for mapping documents
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    data: Mapping,
}

impl DocumentBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set any field
    pub fn value(mut self, key: &str, value: impl Into<Document>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Set a null field
    pub fn null(mut self, key: &str) -> Self {
        self.data.insert(key.to_string(), Document::null());
        self
    }

    /// Set a sequence field
    pub fn array(mut self, key: &str, items: Vec<Document>) -> Self {
        self.data.insert(key.to_string(), Document::sequence(items));
        self
    }

    /// Build the document
    pub fn build(self) -> Document {
        Document::Mapping(Arc::new(self.data))
    }
}
