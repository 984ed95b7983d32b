//! Document collections
//!
//! An ordered list of documents with `apply` (map), `reduce` and
//! `groupby_reduce`. `apply` runs one [`Task`] per document, on the rayon
//! pool when the `parallel` feature is enabled and the collection is large
//! enough; results keep their input positions either way.

use std::ops::Index;

use tracing::{debug, trace};

use super::matcher::ValueMatcher;
use super::navigate::Replacement;
use super::path::{IntoPathKey, PathKey};
use super::pipeline::{Step, StepContext, Task};
use super::search::FindReturn;
use super::value::Document;
use super::{DocumentError, Result};

/// Which documents to select
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// One position; negative counts from the end
    Index(isize),
    /// A slice with optional bounds and a non-zero step
    Range {
        /// First position
        start: Option<isize>,
        /// Position after the last
        stop: Option<isize>,
        /// Stride; negative walks backwards
        step: isize,
    },
    /// Keep positions whose flag is true; length must match
    Mask(Vec<bool>),
    /// Explicit positions
    Indices(Vec<isize>),
}

impl Selector {
    /// `start..stop` with step 1
    pub fn range(start: isize, stop: isize) -> Self {
        Selector::Range {
            start: Some(start),
            stop: Some(stop),
            step: 1,
        }
    }
}

/// Outcome of [`DocumentCollection::apply`]
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Results as a new collection
    Collection(DocumentCollection),
    /// Results as a plain list, for steps marked raw
    Raw(Vec<Document>),
}

impl Applied {
    /// Results as a collection, whichever form they came in
    pub fn into_collection(self) -> DocumentCollection {
        match self {
            Applied::Collection(collection) => collection,
            Applied::Raw(docs) => DocumentCollection::from(docs),
        }
    }

    /// Results as a plain list
    pub fn into_vec(self) -> Vec<Document> {
        match self {
            Applied::Collection(collection) => collection.into_vec(),
            Applied::Raw(docs) => docs,
        }
    }
}

/// Ordered documents plus a `single_item` flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentCollection {
    docs: Vec<Document>,
    single_item: bool,
}

impl From<Vec<Document>> for DocumentCollection {
    fn from(docs: Vec<Document>) -> Self {
        Self {
            docs,
            single_item: false,
        }
    }
}

impl FromIterator<Document> for DocumentCollection {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl IntoIterator for DocumentCollection {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentCollection {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}

impl Index<usize> for DocumentCollection {
    type Output = Document;

    fn index(&self, index: usize) -> &Document {
        &self.docs[index]
    }
}

fn out_of_range(index: isize, len: usize) -> DocumentError {
    DocumentError::Navigation {
        path: format!("[{}]", index),
        token: index.to_string(),
        reason: format!("index out of range for collection of {}", len),
    }
}

fn normalize(index: isize, len: usize) -> Option<usize> {
    let len = isize::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Positions selected by a slice, following the usual start/stop/step rules
fn slice_positions(len: usize, start: Option<isize>, stop: Option<isize>, step: isize) -> Result<Vec<usize>> {
    if step == 0 {
        return Err(DocumentError::TypeMismatch("slice step cannot be zero".to_string()));
    }
    let n = isize::try_from(len)
        .map_err(|_| DocumentError::TypeMismatch("collection too large to slice".to_string()))?;
    let shift = |v: isize| if v < 0 { v + n } else { v };
    let mut positions = Vec::new();
    if step > 0 {
        let mut i = start.map_or(0, |v| shift(v).clamp(0, n));
        let end = stop.map_or(n, |v| shift(v).clamp(0, n));
        while i < end {
            positions.push(i as usize);
            i += step;
        }
    } else {
        let mut i = start.map_or(n - 1, |v| shift(v).clamp(-1, n - 1));
        let end = stop.map_or(-1, |v| shift(v).clamp(-1, n - 1));
        while i > end {
            positions.push(i as usize);
            i += step;
        }
    }
    Ok(positions)
}

impl DocumentCollection {
    /// Empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection standing for exactly one document
    pub fn single(doc: Document) -> Self {
        Self {
            docs: vec![doc],
            single_item: true,
        }
    }

    /// Number of documents
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the collection is empty
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Whether this collection stands for a single document
    pub fn is_single_item(&self) -> bool {
        self.single_item
    }

    fn settle(&mut self) {
        if self.docs.len() != 1 {
            self.single_item = false;
        }
    }

    /// Document at `index`
    pub fn get(&self, index: usize) -> Option<&Document> {
        self.docs.get(index)
    }

    /// Iterate over documents
    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.docs.iter()
    }

    /// Borrow as a slice
    pub fn as_slice(&self) -> &[Document] {
        &self.docs
    }

    /// Take the documents
    pub fn into_vec(self) -> Vec<Document> {
        self.docs
    }

    /// Append a document
    pub fn push(&mut self, doc: Document) {
        self.docs.push(doc);
        self.settle();
    }

    /// Insert at `index`; panics past the end like `Vec::insert`
    pub fn insert(&mut self, index: usize, doc: Document) {
        self.docs.insert(index, doc);
        self.settle();
    }

    /// Remove the document at `index`
    pub fn remove(&mut self, index: isize) -> Result<Document> {
        let pos = normalize(index, self.docs.len()).ok_or_else(|| out_of_range(index, self.docs.len()))?;
        let removed = self.docs.remove(pos);
        self.settle();
        Ok(removed)
    }

    /// Replace the document at `index`
    pub fn replace(&mut self, index: isize, doc: Document) -> Result<Document> {
        let pos = normalize(index, self.docs.len()).ok_or_else(|| out_of_range(index, self.docs.len()))?;
        Ok(std::mem::replace(&mut self.docs[pos], doc))
    }

    /// Append several documents
    pub fn extend<I: IntoIterator<Item = Document>>(&mut self, docs: I) {
        self.docs.extend(docs);
        self.settle();
    }

    /// Select documents by position, mask or slice
    pub fn select(&self, selector: &Selector) -> Result<DocumentCollection> {
        let len = self.docs.len();
        match selector {
            Selector::Index(index) => {
                let pos = normalize(*index, len).ok_or_else(|| out_of_range(*index, len))?;
                Ok(Self::single(self.docs[pos].clone()))
            }
            Selector::Range { start, stop, step } => Ok(slice_positions(len, *start, *stop, *step)?
                .into_iter()
                .map(|pos| self.docs[pos].clone())
                .collect()),
            Selector::Mask(mask) => {
                if mask.len() != len {
                    return Err(DocumentError::TypeMismatch(format!(
                        "mask of length {} for collection of {}",
                        mask.len(),
                        len
                    )));
                }
                Ok(self
                    .docs
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(doc, _)| doc.clone())
                    .collect())
            }
            Selector::Indices(indices) => indices
                .iter()
                .map(|index| {
                    normalize(*index, len)
                        .map(|pos| self.docs[pos].clone())
                        .ok_or_else(|| out_of_range(*index, len))
                })
                .collect(),
        }
    }

    /// Apply a step with the default context
    pub fn apply(&self, step: &Step) -> Result<Applied> {
        self.apply_with(step, &StepContext::standard())
    }

    /// Apply a step to every document.
    ///
    /// Dropped documents are excluded; any task error fails the call.
    pub fn apply_with(&self, step: &Step, ctx: &StepContext<'_>) -> Result<Applied> {
        let parallel = cfg!(feature = "parallel")
            && ctx.config.parallel
            && self.docs.len() > ctx.config.parallel_threshold;
        debug!(
            tasks = self.docs.len(),
            parallel,
            step = ?step.kind(),
            "applying step"
        );
        let results = run_tasks(&self.docs, step, ctx, parallel)?;
        let total = results.len();
        let kept: Vec<Document> = results.into_iter().flatten().collect();
        trace!(kept = kept.len(), dropped = total - kept.len(), "step applied");

        if step.is_raw() {
            return Ok(Applied::Raw(kept));
        }
        let single_item = self.single_item && kept.len() == 1;
        Ok(Applied::Collection(DocumentCollection {
            docs: kept,
            single_item,
        }))
    }

    /// Left fold over the documents.
    ///
    /// Without an initializer the first document seeds the accumulator; an
    /// empty collection without one yields `None`.
    pub fn reduce<F>(&self, reducer: F, initializer: Option<Document>) -> Result<Option<Document>>
    where
        F: Fn(&Document, &Document) -> Result<Document>,
    {
        fold(self.docs.iter(), &reducer, initializer)
    }

    /// [`DocumentCollection::groupby_reduce_with`] with the default context
    pub fn groupby_reduce<F>(
        &self,
        reducer: F,
        initializer: Option<Document>,
        by: impl IntoPathKey,
        uniform_groups: bool,
    ) -> Result<Vec<Document>>
    where
        F: Fn(&Document, &Document) -> Result<Document> + Sync,
    {
        self.groupby_reduce_with(reducer, initializer, by, uniform_groups, &StepContext::standard())
    }

    /// Group by the value at `by`, then fold each group.
    ///
    /// With `uniform_groups` only contiguous runs of equal values form a
    /// group; otherwise equal values anywhere share one. Groups come out in
    /// first-seen order.
    pub fn groupby_reduce_with<F>(
        &self,
        reducer: F,
        initializer: Option<Document>,
        by: impl IntoPathKey,
        uniform_groups: bool,
        ctx: &StepContext<'_>,
    ) -> Result<Vec<Document>>
    where
        F: Fn(&Document, &Document) -> Result<Document> + Sync,
    {
        let by = by.into_path_key()?;
        let groups = self.group(&by, uniform_groups, ctx)?;
        let parallel = cfg!(feature = "parallel") && ctx.config.parallel && groups.len() > 1;
        debug!(groups = groups.len(), by = %by, uniform_groups, parallel, "reducing groups");

        let folded = fold_groups(&groups, &reducer, initializer.as_ref(), parallel)?;
        Ok(folded.into_iter().flatten().collect())
    }

    fn group(&self, by: &PathKey, uniform_groups: bool, ctx: &StepContext<'_>) -> Result<Vec<Vec<&Document>>> {
        let mut groups: Vec<Vec<&Document>> = Vec::new();
        let mut last_key: Option<&Document> = None;
        let mut seen: Vec<(&Document, usize)> = Vec::new();

        for doc in &self.docs {
            let key = match ctx.navigator.get_key(doc, by) {
                Ok(key) => key,
                Err(e) if ctx.config.skip_missing && e.is_missing_path() => {
                    debug!(by = %by, error = %e, "skipping document without group key");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if uniform_groups {
                match groups.last_mut() {
                    Some(group) if last_key == Some(key) => group.push(doc),
                    _ => groups.push(vec![doc]),
                }
                last_key = Some(key);
            } else {
                match seen.iter().find(|(existing, _)| *existing == key) {
                    Some(&(_, slot)) => groups[slot].push(doc),
                    None => {
                        seen.push((key, groups.len()));
                        groups.push(vec![doc]);
                    }
                }
            }
        }
        Ok(groups)
    }

    /// Read `key` from each document
    pub fn get_path(&self, key: impl IntoPathKey) -> Result<DocumentCollection> {
        self.eager(Step::get(key)?)
    }

    /// Write `value` at `key` in each document
    pub fn set(&self, key: impl IntoPathKey, value: impl Into<Replacement>) -> Result<DocumentCollection> {
        self.eager(Step::set(key, value)?)
    }

    /// Remove `key` from each document
    pub fn remove_path(&self, key: impl IntoPathKey) -> Result<DocumentCollection> {
        self.eager(Step::remove(key)?)
    }

    /// Move `from` to `to` in each document
    pub fn move_value(&self, from: impl IntoPathKey, to: impl IntoPathKey) -> Result<DocumentCollection> {
        self.eager(Step::move_value(from, to)?)
    }

    /// Rename the mapping key at `key` in each document
    pub fn rename(&self, key: impl IntoPathKey, name: impl Into<String>) -> Result<DocumentCollection> {
        self.eager(Step::rename(key, name)?)
    }

    /// Reorder the mapping at `key` in each document
    pub fn reorder(&self, key: impl IntoPathKey, order: Vec<String>) -> Result<DocumentCollection> {
        self.eager(Step::reorder(key, order)?)
    }

    /// Search each document
    pub fn find(&self, matcher: ValueMatcher, ret: FindReturn) -> Result<DocumentCollection> {
        self.eager(Step::find(matcher, ret))
    }

    /// Replace matches in each document
    pub fn find_replace(
        &self,
        matcher: ValueMatcher,
        replacement: impl Into<Replacement>,
        changed_only: bool,
    ) -> Result<DocumentCollection> {
        self.eager(Step::find_replace(matcher, replacement, changed_only))
    }

    /// Remove matches from each document
    pub fn find_remove(&self, matcher: ValueMatcher, changed_only: bool) -> Result<DocumentCollection> {
        self.eager(Step::find_remove(matcher, changed_only))
    }

    /// Flatten each document
    pub fn flatten(&self, annotate_all: bool) -> Result<DocumentCollection> {
        self.eager(Step::flatten(annotate_all))
    }

    /// Rebuild each document from its flattened form
    pub fn unflatten(&self) -> Result<DocumentCollection> {
        self.eager(Step::unflatten())
    }

    /// Evaluate a query against each document
    pub fn query(&self, expr: &str) -> Result<DocumentCollection> {
        self.eager(Step::expr(expr)?)
    }

    /// Keep documents for which `expr` is truthy
    pub fn filter(&self, expr: &str) -> Result<DocumentCollection> {
        self.eager(Step::filter(expr)?)
    }

    /// Serialize each document to JSON text
    pub fn dump(&self, pretty: bool) -> Result<DocumentCollection> {
        self.eager(Step::dump(pretty))
    }

    fn eager(&self, step: Step) -> Result<DocumentCollection> {
        self.apply(&step).map(Applied::into_collection)
    }
}

fn fold<'d, F>(
    docs: impl Iterator<Item = &'d Document>,
    reducer: &F,
    initializer: Option<Document>,
) -> Result<Option<Document>>
where
    F: Fn(&Document, &Document) -> Result<Document>,
{
    let mut acc = initializer;
    for doc in docs {
        acc = Some(match acc {
            None => doc.clone(),
            Some(current) => reducer(&current, doc)?,
        });
    }
    Ok(acc)
}

#[cfg(feature = "parallel")]
fn run_tasks(docs: &[Document], step: &Step, ctx: &StepContext<'_>, parallel: bool) -> Result<Vec<Option<Document>>> {
    use rayon::prelude::*;

    if parallel {
        docs.par_iter().map(|doc| Task::new(step, doc).run(ctx)).collect()
    } else {
        docs.iter().map(|doc| Task::new(step, doc).run(ctx)).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn run_tasks(docs: &[Document], step: &Step, ctx: &StepContext<'_>, _parallel: bool) -> Result<Vec<Option<Document>>> {
    docs.iter().map(|doc| Task::new(step, doc).run(ctx)).collect()
}

#[cfg(feature = "parallel")]
fn fold_groups<F>(
    groups: &[Vec<&Document>],
    reducer: &F,
    initializer: Option<&Document>,
    parallel: bool,
) -> Result<Vec<Option<Document>>>
where
    F: Fn(&Document, &Document) -> Result<Document> + Sync,
{
    use rayon::prelude::*;

    let fold_one = |group: &Vec<&Document>| fold(group.iter().copied(), reducer, initializer.cloned());
    if parallel {
        groups.par_iter().map(fold_one).collect()
    } else {
        groups.iter().map(fold_one).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn fold_groups<F>(
    groups: &[Vec<&Document>],
    reducer: &F,
    initializer: Option<&Document>,
    _parallel: bool,
) -> Result<Vec<Option<Document>>>
where
    F: Fn(&Document, &Document) -> Result<Document> + Sync,
{
    groups
        .iter()
        .map(|group| fold(group.iter().copied(), reducer, initializer.cloned()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::config::EngineConfig;
    use crate::document::navigate::Navigator;
    use serde_json::json;

    fn collection(values: Vec<serde_json::Value>) -> DocumentCollection {
        values.into_iter().map(Document::from).collect()
    }

    fn as_json(collection: &DocumentCollection) -> Vec<serde_json::Value> {
        collection.iter().map(Document::to_json).collect()
    }

    fn sum_n(acc: &Document, doc: &Document) -> Result<Document> {
        let a = acc.as_mapping().and_then(|m| m.get("n")).and_then(Document::as_i64).unwrap_or(0);
        let b = doc.as_mapping().and_then(|m| m.get("n")).and_then(Document::as_i64).unwrap_or(0);
        Ok(Document::from(json!({"n": a + b})))
    }

    #[test]
    fn test_single_item_flag() {
        let mut c = DocumentCollection::single(Document::from(1));
        assert!(c.is_single_item());
        c.push(Document::from(2));
        assert!(!c.is_single_item());
        c.remove(-1).unwrap();
        assert!(!c.is_single_item());
    }

    #[test]
    fn test_select() {
        let c = collection(vec![json!(0), json!(1), json!(2), json!(3)]);
        let one = c.select(&Selector::Index(-1)).unwrap();
        assert!(one.is_single_item());
        assert_eq!(as_json(&one), vec![json!(3)]);
        assert_eq!(as_json(&c.select(&Selector::range(1, 3)).unwrap()), vec![json!(1), json!(2)]);
        let reversed = c
            .select(&Selector::Range {
                start: None,
                stop: None,
                step: -2,
            })
            .unwrap();
        assert_eq!(as_json(&reversed), vec![json!(3), json!(1)]);
        let masked = c.select(&Selector::Mask(vec![true, false, false, true])).unwrap();
        assert_eq!(as_json(&masked), vec![json!(0), json!(3)]);
        let picked = c.select(&Selector::Indices(vec![2, -4])).unwrap();
        assert_eq!(as_json(&picked), vec![json!(2), json!(0)]);

        assert!(c.select(&Selector::Index(4)).unwrap_err().is_missing_path());
        assert!(c.select(&Selector::Mask(vec![true])).is_err());
        assert!(c
            .select(&Selector::Range {
                start: None,
                stop: None,
                step: 0
            })
            .is_err());
    }

    #[test]
    fn test_apply_keeps_positions() {
        let c: DocumentCollection = (0..200).map(|i| Document::from(json!({"i": i}))).collect();
        let step = Step::get("i").unwrap();
        let out = c.apply(&step).unwrap().into_vec();
        let expected: Vec<Document> = (0..200).map(|i| Document::from(i as i64)).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_apply_sequential_and_raw() {
        let config = EngineConfig {
            parallel: false,
            ..Default::default()
        };
        let ctx = StepContext::new(&config, Navigator::standard());
        let c = DocumentCollection::single(Document::from(json!({"n": 1})));
        match c.apply_with(&Step::get("n").unwrap(), &ctx).unwrap() {
            Applied::Collection(out) => {
                assert!(out.is_single_item());
                assert_eq!(out[0], Document::from(1));
            }
            Applied::Raw(_) => panic!("expected a collection"),
        }
        let raw = c.apply_with(&Step::get("n").unwrap().raw(), &ctx).unwrap();
        assert_eq!(raw, Applied::Raw(vec![Document::from(1)]));
    }

    #[test]
    fn test_apply_skip_missing_drops_documents() {
        let c = collection(vec![json!({"a": 1}), json!({}), json!({"a": 3})]);
        assert!(c.apply(&Step::get("a").unwrap()).is_err());
        let out = c.apply(&Step::get("a").unwrap().skip_missing(true)).unwrap();
        assert_eq!(out.into_vec(), vec![Document::from(1), Document::from(3)]);
    }

    #[test]
    fn test_apply_task_failure_fails_call() {
        let c = collection(vec![json!(1), json!(2)]);
        let step = Step::func(|doc, _| {
            if doc.as_i64() == Some(2) {
                Err(DocumentError::Task("boom".into()))
            } else {
                Ok(Some(doc.clone()))
            }
        })
        .skip_missing(true);
        assert_eq!(c.apply(&step).unwrap_err(), DocumentError::Task("boom".into()));
    }

    #[test]
    fn test_reduce() {
        let c = collection(vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
        assert_eq!(c.reduce(sum_n, None).unwrap().unwrap().to_json(), json!({"n": 6}));
        let seeded = c.reduce(sum_n, Some(Document::from(json!({"n": 10})))).unwrap();
        assert_eq!(seeded.unwrap().to_json(), json!({"n": 16}));
        assert_eq!(DocumentCollection::new().reduce(sum_n, None).unwrap(), None);
    }

    #[test]
    fn test_groupby_reduce() {
        let c = collection(vec![
            json!({"g": 1, "n": 1}),
            json!({"g": 2, "n": 2}),
            json!({"g": 1, "n": 4}),
        ]);
        let uniform = c.groupby_reduce(sum_n, None, "g", true).unwrap();
        assert_eq!(uniform.len(), 3);
        let global = c.groupby_reduce(sum_n, None, "g", false).unwrap();
        let sums: Vec<_> = global.iter().map(Document::to_json).collect();
        // a single-document group folds to the document itself
        assert_eq!(sums, vec![json!({"n": 5}), json!({"g": 2, "n": 2})]);
    }

    #[test]
    fn test_groupby_keys_compare_as_documents() {
        let c = collection(vec![
            json!({"g": {"a": 1, "b": 2}, "n": 1}),
            json!({"g": {"b": 2, "a": 1}, "n": 2}),
        ]);
        let uniform = c.groupby_reduce(sum_n, None, "g", true).unwrap();
        let global = c.groupby_reduce(sum_n, None, "g", false).unwrap();
        assert_eq!(uniform.len(), 1);
        assert_eq!(global, uniform);
        assert_eq!(global[0].to_json(), json!({"n": 3}));

        let sets = DocumentCollection::from(vec![
            Document::mapping([("g", Document::set(vec!["x".into(), "y".into()])), ("n", 1.into())]),
            Document::mapping([("g", Document::set(vec!["y".into(), "x".into()])), ("n", 5.into())]),
        ]);
        let grouped = sets.groupby_reduce(sum_n, None, "g", false).unwrap();
        assert_eq!(grouped.len(), 1);
    }

    #[test]
    fn test_groupby_missing_key() {
        let c = collection(vec![json!({"g": 1, "n": 1}), json!({"n": 2})]);
        assert!(c.groupby_reduce(sum_n, None, "g", false).unwrap_err().is_missing_path());

        let config = EngineConfig {
            skip_missing: true,
            ..Default::default()
        };
        let ctx = StepContext::new(&config, Navigator::standard());
        let out = c.groupby_reduce_with(sum_n, None, "g", false, &ctx).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_eager_methods() {
        let c = collection(vec![json!({"a": {"b": 1}, "s": "foo"}), json!({"a": {"b": 2}, "s": "bar"})]);
        assert_eq!(
            as_json(&c.set("a.b", 0).unwrap()),
            vec![json!({"a": {"b": 0}, "s": "foo"}), json!({"a": {"b": 0}, "s": "bar"})]
        );
        assert_eq!(as_json(&c.filter("d.a.b > 1").unwrap()), vec![json!({"a": {"b": 2}, "s": "bar"})]);
        assert_eq!(as_json(&c.query("d.s").unwrap()), vec![json!("foo"), json!("bar")]);
        let changed = c
            .find_replace(ValueMatcher::single("fo").unwrap(), "FO", true)
            .unwrap();
        assert_eq!(as_json(&changed), vec![json!({"a": {"b": 1}, "s": "FOo"})]);
        assert_eq!(as_json(&c.remove_path("a").unwrap()), vec![json!({"s": "foo"}), json!({"s": "bar"})]);
    }
}
