//! Tree navigation and copy-on-write mutation
//!
//! Reads walk the token tuple from the root. Writes walk to the parent of the
//! target, taking ownership of each container on the way: a container is
//! copied unless an earlier write of the same [`WriteBatch`] already copied
//! it, so a batch of writes under a common prefix copies that prefix once and
//! every untouched subtree keeps its identity.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::accessor::{standard_registry, AccessorRegistry};
use super::path::{IntoPathKey, PathKey, Token};
use super::value::{Document, Mapping};
use super::{DocumentError, Result};

/// Function computing a new value from the current one
pub type ReplaceFn = Arc<dyn Fn(&Document) -> Result<Document> + Send + Sync>;

/// The value written by `set`
#[derive(Clone)]
pub enum Replacement {
    /// Write this value
    Value(Document),
    /// Compute the value from the current one at the same path
    With(ReplaceFn),
}

impl Replacement {
    /// Wrap a function of the current value
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Document) -> Result<Document> + Send + Sync + 'static,
    {
        Replacement::With(Arc::new(f))
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacement::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Replacement::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

impl From<Document> for Replacement {
    fn from(value: Document) -> Self {
        Replacement::Value(value)
    }
}

impl From<serde_json::Value> for Replacement {
    fn from(value: serde_json::Value) -> Self {
        Replacement::Value(value.into())
    }
}

impl From<i64> for Replacement {
    fn from(value: i64) -> Self {
        Replacement::Value(value.into())
    }
}

impl From<i32> for Replacement {
    fn from(value: i32) -> Self {
        Replacement::Value(value.into())
    }
}

impl From<f64> for Replacement {
    fn from(value: f64) -> Self {
        Replacement::Value(value.into())
    }
}

impl From<bool> for Replacement {
    fn from(value: bool) -> Self {
        Replacement::Value(value.into())
    }
}

impl From<&str> for Replacement {
    fn from(value: &str) -> Self {
        Replacement::Value(value.into())
    }
}

impl From<String> for Replacement {
    fn from(value: String) -> Self {
        Replacement::Value(value.into())
    }
}

/// Resolved child location inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Key(String),
    Pos(usize),
}

/// Write location: an existing child or a new one
#[derive(Debug)]
enum WriteSlot {
    Existing(Slot),
    Insert(String),
    Append,
}

/// Why a token could not be followed
#[derive(Debug)]
enum Miss {
    Missing(String),
    Type(String),
}

impl Miss {
    fn into_error(self, key: &PathKey, token: &Token) -> DocumentError {
        match self {
            Miss::Missing(reason) => DocumentError::Navigation {
                path: key.to_string(),
                token: token.to_string(),
                reason,
            },
            Miss::Type(reason) => {
                DocumentError::TypeMismatch(format!("{} at '{}'", reason, key))
            }
        }
    }
}

/// Map a possibly negative index onto `0..len`
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

fn slot_ref<'d>(node: &'d Document, slot: &Slot) -> Option<&'d Document> {
    match (node, slot) {
        (Document::Mapping(map), Slot::Key(k)) => map.get(k),
        (Document::Mapping(map), Slot::Pos(i)) => map.get_index(*i).map(|(_, v)| v),
        (Document::Sequence(items) | Document::Set(items), Slot::Pos(i)) => items.get(*i),
        (Document::Record(record), Slot::Pos(i)) => record.get(*i),
        _ => None,
    }
}

/// Take ownership of a shared container, copying it when `fresh` or when it
/// is still referenced elsewhere
fn own<'a, T: Clone>(arc: &'a mut Arc<T>, fresh: bool, copies: &mut usize) -> &'a mut T {
    if fresh || Arc::strong_count(arc) > 1 || Arc::weak_count(arc) > 0 {
        *arc = Arc::new(T::clone(arc));
        *copies += 1;
    }
    Arc::make_mut(arc)
}

fn slot_mut<'d>(
    node: &'d mut Document,
    slot: &Slot,
    fresh: bool,
    copies: &mut usize,
) -> Option<&'d mut Document> {
    match (node, slot) {
        (Document::Mapping(map), Slot::Key(k)) => own(map, fresh, copies).get_mut(k),
        (Document::Mapping(map), Slot::Pos(i)) => {
            own(map, fresh, copies).get_index_mut(*i).map(|(_, v)| v)
        }
        (Document::Sequence(items) | Document::Set(items), Slot::Pos(i)) => {
            own(items, fresh, copies).get_mut(*i)
        }
        (Document::Record(record), Slot::Pos(i)) => own(record, fresh, copies).get_mut(*i),
        _ => None,
    }
}

/// Nest `value` under single-key mappings mirroring `key`
pub fn wrap_in_path(key: &PathKey, value: Document) -> Document {
    key.iter().rev().fold(value, |inner, token| {
        let mut map = Mapping::new();
        map.insert(token.to_string(), inner);
        Document::from(map)
    })
}

/// Write operation applied at the end of a path
enum Op {
    Set(Replacement),
    Remove,
}

/// Tracks which prefixes a batch has already copied
#[derive(Debug, Default, Clone)]
struct CopyTracker {
    touched: HashSet<PathKey>,
    // subtrees stored by `set`; the batch already owns everything below them
    owned: Vec<PathKey>,
    copies: usize,
}

impl CopyTracker {
    fn is_fresh(&self, prefix: &PathKey) -> bool {
        !self.touched.contains(prefix) && !self.owned.iter().any(|root| prefix.starts_with(root))
    }

    fn mark(&mut self, key: &PathKey) {
        for n in 0..=key.len() {
            self.touched.insert(key.prefix(n));
        }
    }
}

/// Navigation bound to an accessor registry
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    accessors: Option<&'a AccessorRegistry>,
}

impl Default for Navigator<'static> {
    fn default() -> Self {
        Self::standard()
    }
}

impl Navigator<'static> {
    /// Navigator using the standard accessor registry
    pub fn standard() -> Self {
        Self {
            accessors: Some(standard_registry()),
        }
    }

    /// Navigator with attribute fallback disabled
    pub fn items_only() -> Self {
        Self { accessors: None }
    }
}

impl<'a> Navigator<'a> {
    /// Navigator using the given registry; `None` disables attribute fallback
    pub fn new(accessors: Option<&'a AccessorRegistry>) -> Self {
        Self { accessors }
    }

    fn attribute(&self, node: &Document, name: &str) -> Option<Slot> {
        self.accessors
            .and_then(|registry| registry.position(node, name))
            .map(Slot::Pos)
    }

    fn locate(&self, node: &Document, token: &Token) -> std::result::Result<Slot, Miss> {
        let missing = |what: &str| Miss::Missing(format!("{} not found in {}", what, node.kind()));
        match (node, token) {
            (Document::Mapping(map), Token::Key(k)) => {
                if map.contains_key(k) {
                    Ok(Slot::Key(k.clone()))
                } else {
                    self.attribute(node, k).ok_or_else(|| missing("key"))
                }
            }
            (Document::Mapping(map), Token::Index(i)) => {
                let k = i.to_string();
                if map.contains_key(&k) {
                    Ok(Slot::Key(k))
                } else {
                    Err(missing("key"))
                }
            }
            (Document::Sequence(items) | Document::Set(items), Token::Index(i)) => {
                normalize_index(*i, items.len())
                    .map(Slot::Pos)
                    .ok_or_else(|| missing("index"))
            }
            (Document::Record(record), Token::Index(i)) => normalize_index(*i, record.len())
                .map(Slot::Pos)
                .ok_or_else(|| missing("index")),
            (_, Token::Key(k)) => self.attribute(node, k).ok_or_else(|| missing("attribute")),
            (Document::Scalar(_), Token::Index(_)) => {
                Err(Miss::Type("indexing into a scalar".to_string()))
            }
        }
    }

    fn locate_for_write(&self, node: &Document, token: &Token) -> std::result::Result<WriteSlot, Miss> {
        match self.locate(node, token) {
            Ok(slot) => Ok(WriteSlot::Existing(slot)),
            Err(Miss::Missing(reason)) => match (node, token) {
                (Document::Mapping(_), Token::Key(k)) => Ok(WriteSlot::Insert(k.clone())),
                (Document::Mapping(_), Token::Index(i)) => Ok(WriteSlot::Insert(i.to_string())),
                (Document::Sequence(items) | Document::Set(items), Token::Index(i))
                    if *i == items.len() as i64 =>
                {
                    Ok(WriteSlot::Append)
                }
                _ => Err(Miss::Missing(reason)),
            },
            Err(other) => Err(other),
        }
    }

    /// Borrow the value at `key`
    pub fn get<'d>(&self, doc: &'d Document, key: impl IntoPathKey) -> Result<&'d Document> {
        let key = key.into_path_key()?;
        self.get_key(doc, &key)
    }

    /// Borrow the value at an already resolved key
    pub fn get_key<'d>(&self, doc: &'d Document, key: &PathKey) -> Result<&'d Document> {
        let mut node = doc;
        for token in key {
            let slot = self
                .locate(node, token)
                .map_err(|miss| miss.into_error(key, token))?;
            node = slot_ref(node, &slot)
                .ok_or_else(|| Miss::Missing("stale slot".into()).into_error(key, token))?;
        }
        Ok(node)
    }

    /// The value at `key` wrapped in nested single-key mappings mirroring the path
    pub fn get_keep_path(&self, doc: &Document, key: impl IntoPathKey) -> Result<Document> {
        let key = key.into_path_key()?;
        let value = self.get_key(doc, &key)?.clone();
        Ok(wrap_in_path(&key, value))
    }

    /// Whether `key` can be followed to a value
    pub fn exists(&self, doc: &Document, key: &PathKey) -> bool {
        self.get_key(doc, key).is_ok()
    }

    /// Copy-on-write set returning the new document
    pub fn set(
        &self,
        doc: &Document,
        key: impl IntoPathKey,
        value: impl Into<Replacement>,
    ) -> Result<Document> {
        let mut batch = WriteBatch::with_navigator(*self, doc);
        batch.set(key, value)?;
        Ok(batch.finish())
    }

    /// Set on the caller's document
    pub fn set_in_place(
        &self,
        doc: &mut Document,
        key: impl IntoPathKey,
        value: impl Into<Replacement>,
    ) -> Result<()> {
        let key = key.into_path_key()?;
        self.write(doc, &key, Op::Set(value.into()), None).map(|_| ())
    }

    /// Copy-on-write removal returning the new document
    pub fn remove(&self, doc: &Document, key: impl IntoPathKey) -> Result<Document> {
        let mut batch = WriteBatch::with_navigator(*self, doc);
        batch.remove(key)?;
        Ok(batch.finish())
    }

    /// Remove from the caller's document, returning the removed value
    pub fn remove_in_place(&self, doc: &mut Document, key: impl IntoPathKey) -> Result<Document> {
        let key = key.into_path_key()?;
        self.write(doc, &key, Op::Remove, None)
            .map(Option::unwrap_or_default)
    }

    fn write(
        &self,
        root: &mut Document,
        key: &PathKey,
        op: Op,
        mut tracker: Option<&mut CopyTracker>,
    ) -> Result<Option<Document>> {
        let Some((last, parents)) = key.tokens().split_last() else {
            return match op {
                Op::Set(replacement) => {
                    let value = match replacement {
                        Replacement::Value(v) => v,
                        Replacement::With(f) => f(root)?,
                    };
                    if let Some(tracker) = tracker {
                        tracker.mark(key);
                    }
                    Ok(Some(std::mem::replace(root, value)))
                }
                Op::Remove => Err(DocumentError::TypeMismatch(
                    "cannot remove the root document".to_string(),
                )),
            };
        };

        let mut copies = 0;
        let mut prefix = PathKey::root();
        let mut node = root;
        for token in parents {
            let fresh = tracker.as_ref().is_some_and(|t| t.is_fresh(&prefix));
            let slot = self
                .locate(node, token)
                .map_err(|miss| miss.into_error(key, token))?;
            node = slot_mut(node, &slot, fresh, &mut copies)
                .ok_or_else(|| Miss::Missing("stale slot".into()).into_error(key, token))?;
            prefix.push(token.clone());
        }

        let fresh = tracker.as_ref().is_some_and(|t| t.is_fresh(&prefix));
        let is_set = matches!(op, Op::Set(_));
        let previous = match op {
            Op::Set(replacement) => {
                let target = self
                    .locate_for_write(node, last)
                    .map_err(|miss| miss.into_error(key, last))?;
                let value = match replacement {
                    Replacement::Value(v) => v,
                    Replacement::With(f) => match &target {
                        WriteSlot::Existing(slot) => {
                            let current = slot_ref(node, slot).ok_or_else(|| {
                                Miss::Missing("stale slot".into()).into_error(key, last)
                            })?;
                            f(current)?
                        }
                        _ => {
                            return Err(Miss::Missing("no current value to update".into())
                                .into_error(key, last))
                        }
                    },
                };
                store(node, target, value, fresh, &mut copies)
                    .map_err(|miss| miss.into_error(key, last))?
            }
            Op::Remove => {
                let slot = self
                    .locate(node, last)
                    .map_err(|miss| miss.into_error(key, last))?;
                Some(take(node, slot, fresh, &mut copies).map_err(|miss| miss.into_error(key, last))?)
            }
        };

        trace!(path = %key, copies, "write applied");
        if let Some(tracker) = tracker.as_deref_mut() {
            tracker.copies += copies;
            tracker.mark(key);
            if is_set {
                tracker.owned.push(key.clone());
            }
        }
        Ok(previous)
    }
}

/// Write `value` at `target` inside the container `node`
fn store(
    node: &mut Document,
    target: WriteSlot,
    value: Document,
    fresh: bool,
    copies: &mut usize,
) -> std::result::Result<Option<Document>, Miss> {
    match (node, target) {
        (Document::Mapping(map), WriteSlot::Insert(k)) => {
            own(map, fresh, copies).insert(k, value);
            Ok(None)
        }
        (Document::Sequence(items), WriteSlot::Append) => {
            own(items, fresh, copies).push(value);
            Ok(None)
        }
        (Document::Set(items), WriteSlot::Append) => {
            if !items.contains(&value) {
                own(items, fresh, copies).push(value);
            }
            Ok(None)
        }
        // a set never holds two equal members; replacing one with a value
        // already present merges them
        (Document::Set(items), WriteSlot::Existing(Slot::Pos(i)))
            if items.iter().enumerate().any(|(j, member)| j != i && *member == value) =>
        {
            let items = own(items, fresh, copies);
            if i < items.len() {
                Ok(Some(items.remove(i)))
            } else {
                Err(Miss::Missing("stale slot".into()))
            }
        }
        (node, WriteSlot::Existing(slot)) => match slot_mut(node, &slot, fresh, copies) {
            Some(child) => Ok(Some(std::mem::replace(child, value))),
            None => Err(Miss::Missing("stale slot".into())),
        },
        (node, _) => Err(Miss::Type(format!("cannot insert into {}", node.kind()))),
    }
}

/// Remove the child at `slot` from the container `node`
fn take(
    node: &mut Document,
    slot: Slot,
    fresh: bool,
    copies: &mut usize,
) -> std::result::Result<Document, Miss> {
    let removed = match (node, &slot) {
        (Document::Mapping(map), Slot::Key(k)) => own(map, fresh, copies).shift_remove(k),
        (Document::Mapping(map), Slot::Pos(i)) => {
            own(map, fresh, copies).shift_remove_index(*i).map(|(_, v)| v)
        }
        (Document::Sequence(items) | Document::Set(items), Slot::Pos(i)) => {
            let items = own(items, fresh, copies);
            (*i < items.len()).then(|| items.remove(*i))
        }
        (Document::Record(_), _) => {
            return Err(Miss::Type("cannot remove a record field".to_string()))
        }
        _ => None,
    };
    removed.ok_or_else(|| Miss::Missing("stale slot".into()))
}

/// A group of copy-on-write writes against one document.
///
/// The batch starts out sharing every node with the source document. Each
/// write copies only the containers on its path that no earlier write of the
/// batch has copied yet.
#[derive(Debug, Clone)]
pub struct WriteBatch<'a> {
    nav: Navigator<'a>,
    doc: Document,
    tracker: CopyTracker,
    written: Vec<PathKey>,
}

impl WriteBatch<'static> {
    /// Start a batch over `doc` with the standard navigator
    pub fn new(doc: &Document) -> Self {
        Self::with_navigator(Navigator::standard(), doc)
    }
}

impl<'a> WriteBatch<'a> {
    /// Start a batch over `doc`
    pub fn with_navigator(nav: Navigator<'a>, doc: &Document) -> Self {
        Self {
            nav,
            doc: doc.clone(),
            tracker: CopyTracker::default(),
            written: Vec::new(),
        }
    }

    /// Set `key` to `value`
    pub fn set(&mut self, key: impl IntoPathKey, value: impl Into<Replacement>) -> Result<()> {
        let key = key.into_path_key()?;
        self.nav.write(
            &mut self.doc,
            &key,
            Op::Set(value.into()),
            Some(&mut self.tracker),
        )?;
        self.written.push(key);
        Ok(())
    }

    /// Remove `key`, returning the removed value
    pub fn remove(&mut self, key: impl IntoPathKey) -> Result<Document> {
        let key = key.into_path_key()?;
        let removed = self
            .nav
            .write(&mut self.doc, &key, Op::Remove, Some(&mut self.tracker))?
            .unwrap_or_default();
        self.written.push(key);
        Ok(removed)
    }

    /// Read from the working document
    pub fn get(&self, key: impl IntoPathKey) -> Result<&Document> {
        self.nav.get(&self.doc, key)
    }

    /// The working document
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Paths written so far, in order
    pub fn written(&self) -> &[PathKey] {
        &self.written
    }

    /// Number of containers copied so far
    pub fn copies(&self) -> usize {
        self.tracker.copies
    }

    /// Marker for [`WriteBatch::grew`]
    pub fn checkpoint(&self) -> usize {
        self.written.len()
    }

    /// Whether a write landed since `checkpoint`
    pub fn grew(&self, checkpoint: usize) -> bool {
        self.written.len() > checkpoint
    }

    /// Finish the batch and return the new document
    pub fn finish(self) -> Document {
        self.doc
    }
}

/// Borrow the value at `key` using the standard navigator
pub fn get(doc: &Document, key: impl IntoPathKey) -> Result<&Document> {
    Navigator::standard().get(doc, key)
}

/// The value at `key`, wrapped in nested mappings mirroring the path
pub fn get_keep_path(doc: &Document, key: impl IntoPathKey) -> Result<Document> {
    Navigator::standard().get_keep_path(doc, key)
}

/// Copy-on-write set
pub fn set(doc: &Document, key: impl IntoPathKey, value: impl Into<Replacement>) -> Result<Document> {
    Navigator::standard().set(doc, key, value)
}

/// In-place set
pub fn set_in_place(
    doc: &mut Document,
    key: impl IntoPathKey,
    value: impl Into<Replacement>,
) -> Result<()> {
    Navigator::standard().set_in_place(doc, key, value)
}

/// Copy-on-write removal
pub fn remove(doc: &Document, key: impl IntoPathKey) -> Result<Document> {
    Navigator::standard().remove(doc, key)
}

/// In-place removal, returning the removed value
pub fn remove_in_place(doc: &mut Document, key: impl IntoPathKey) -> Result<Document> {
    Navigator::standard().remove_in_place(doc, key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::path::resolve;
    use serde_json::json;

    fn sample() -> Document {
        Document::from(json!({"s": "ABC", "d2": {"l": [1, 2]}}))
    }

    fn sum(doc: &Document) -> Result<Document> {
        let items = doc
            .as_sequence()
            .ok_or_else(|| DocumentError::Task("not a sequence".into()))?;
        Ok(items.iter().filter_map(Document::as_i64).sum::<i64>().into())
    }

    #[test]
    fn test_get_nested() {
        let doc = sample();
        assert_eq!(get(&doc, "d2.l[0]").unwrap(), &Document::from(1));
        assert_eq!(get(&doc, "d2.l[-1]").unwrap(), &Document::from(2));
        assert_eq!(get(&doc, "").unwrap(), &doc);
    }

    #[test]
    fn test_get_missing_is_navigation_error() {
        let err = get(&sample(), "d2.x").unwrap_err();
        assert!(err.is_missing_path());
        assert!(get(&sample(), "d2.l[5]").unwrap_err().is_missing_path());
    }

    #[test]
    fn test_index_into_scalar_is_type_mismatch() {
        let err = get(&sample(), "s[0]").unwrap_err();
        assert!(matches!(err, DocumentError::TypeMismatch(_)));
    }

    #[test]
    fn test_get_keep_path() {
        let kept = get_keep_path(&sample(), "d2.l").unwrap();
        assert_eq!(kept.to_json(), json!({"d2": {"l": [1, 2]}}));
    }

    #[test]
    fn test_integer_token_on_mapping_uses_string_key() {
        let doc = Document::from(json!({"a": {"0": "zero"}}));
        assert_eq!(get(&doc, "a.0").unwrap(), &Document::from("zero"));
    }

    #[test]
    fn test_record_field_by_name() {
        let doc = Document::mapping([(
            "p",
            Document::record("Point", vec![("x".into(), 1.into()), ("y".into(), 2.into())]),
        )]);
        assert_eq!(get(&doc, "p.y").unwrap(), &Document::from(2));
        assert_eq!(get(&doc, "p[0]").unwrap(), &Document::from(1));
        assert!(Navigator::items_only().get(&doc, "p.y").is_err());

        let updated = set(&doc, "p.x", 10).unwrap();
        assert_eq!(get(&updated, "p.x").unwrap(), &Document::from(10));
        assert_eq!(updated.as_mapping().unwrap()["p"].kind(), crate::document::DocumentKind::Record);
    }

    #[test]
    fn test_set_with_function() {
        let doc = sample();
        let updated = set(&doc, "d2.l", Replacement::with(sum)).unwrap();
        assert_eq!(updated.to_json(), json!({"s": "ABC", "d2": {"l": 3}}));
        // the source is untouched
        assert_eq!(doc, sample());
    }

    #[test]
    fn test_set_inserts_and_appends() {
        let doc = sample();
        let updated = set(&doc, "d2.new", "x").unwrap();
        assert_eq!(get(&updated, "d2.new").unwrap(), &Document::from("x"));
        let appended = set(&doc, "d2.l[2]", 3).unwrap();
        assert_eq!(get(&appended, "d2.l").unwrap().len(), Some(3));
        assert!(set(&doc, "d2.l[7]", 3).unwrap_err().is_missing_path());
    }

    #[test]
    fn test_set_member_never_duplicates() {
        let doc = Document::mapping([("s", Document::set(vec!["a".into(), "b".into(), "c".into()]))]);

        let merged = set(&doc, "s[0]", "b").unwrap();
        let members = get(&merged, "s").unwrap();
        assert_eq!(members.len(), Some(2));
        assert_eq!(members, &Document::set(vec!["b".into(), "c".into()]));

        let replaced = set(&doc, "s[0]", "z").unwrap();
        assert_eq!(get(&replaced, "s").unwrap(), &Document::set(vec!["z".into(), "b".into(), "c".into()]));
        // the source is untouched
        assert_eq!(get(&doc, "s").unwrap().len(), Some(3));
    }

    #[test]
    fn test_set_root_replaces_document() {
        let updated = set(&sample(), "", 5).unwrap();
        assert_eq!(updated, Document::from(5));
    }

    #[test]
    fn test_remove() {
        let doc = sample();
        let removed = remove(&doc, "d2.l[0]").unwrap();
        assert_eq!(removed.to_json(), json!({"s": "ABC", "d2": {"l": [2]}}));
        assert!(matches!(
            remove(&doc, "").unwrap_err(),
            DocumentError::TypeMismatch(_)
        ));
    }

    #[test]
    fn test_in_place() {
        let mut doc = sample();
        set_in_place(&mut doc, "s", "Z").unwrap();
        let removed = remove_in_place(&mut doc, "d2").unwrap();
        assert_eq!(removed.to_json(), json!({"l": [1, 2]}));
        assert_eq!(doc.to_json(), json!({"s": "Z"}));
    }

    #[test]
    fn test_untouched_siblings_keep_identity() {
        let doc = Document::from(json!({"a": {"x": 1}, "b": {"y": 2}}));
        let updated = set(&doc, "a.x", 5).unwrap();
        let before = get(&doc, "b").unwrap();
        let after = get(&updated, "b").unwrap();
        assert!(before.ptr_eq(after));
        assert!(!get(&doc, "a").unwrap().ptr_eq(get(&updated, "a").unwrap()));
    }

    #[test]
    fn test_batch_copies_shared_prefix_once() {
        let doc = Document::from(json!({"a": {"b": {"c": 1}, "x": {"y": 1}}, "s": {"t": 1}}));
        let mut batch = WriteBatch::new(&doc);
        batch.set("a.b", Document::from(json!({"c": 0}))).unwrap();
        let after_first = batch.copies();
        assert_eq!(after_first, 2);
        batch.set("a.b.c", 2).unwrap();
        assert_eq!(batch.copies(), after_first);
        batch.set("a.x.y", 3).unwrap();
        // only the fresh "a.x" container is copied
        assert_eq!(batch.copies(), after_first + 1);

        let checkpoint = batch.checkpoint();
        assert!(!batch.grew(checkpoint));
        let updated = batch.finish();
        assert_eq!(
            updated.to_json(),
            json!({"a": {"b": {"c": 2}, "x": {"y": 3}}, "s": {"t": 1}})
        );
        assert!(get(&doc, "s").unwrap().ptr_eq(get(&updated, "s").unwrap()));
        assert_eq!(get(&doc, "a.b.c").unwrap(), &Document::from(1));
    }

    #[test]
    fn test_batch_tracks_written_paths() {
        let mut batch = WriteBatch::new(&sample());
        let checkpoint = batch.checkpoint();
        batch.set("s", "x").unwrap();
        assert!(batch.grew(checkpoint));
        assert_eq!(batch.written(), &[resolve("s").unwrap()]);
    }

    #[test]
    fn test_set_then_get_is_inverse() {
        let doc = sample();
        for path in ["s", "d2.l[1]", "d2.extra", "d2"] {
            let updated = set(&doc, path, "v").unwrap();
            assert_eq!(get(&updated, path).unwrap(), &Document::from("v"));
        }
    }
}
