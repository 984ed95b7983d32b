//! Iterative traversal engine
//!
//! Traversals keep an explicit frontier of `(path, depth, node)` entries: a
//! stack for depth-first order and a queue for breadth-first order. Containers
//! past the depth or length guards, or of an excluded kind, are treated as
//! opaque leaves.

use std::collections::VecDeque;

use tracing::trace;

use super::config::{EngineConfig, TraversalOrder};
use super::path::PathKey;
use super::value::{Document, DocumentKind};
use super::Result;

/// Traversal order and guards
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalOptions {
    /// Depth-first or breadth-first
    pub order: TraversalOrder,
    /// Container kinds that are never expanded
    pub exclude: Vec<DocumentKind>,
    /// Container kinds that are always eligible; overrides `exclude`
    pub include: Vec<DocumentKind>,
    /// Containers with more children than this are not expanded
    pub max_len: usize,
    /// Containers at this depth are not expanded
    pub max_depth: usize,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl TraversalOptions {
    /// Defaults taken from an engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            order: config.traversal,
            exclude: Vec::new(),
            include: Vec::new(),
            max_len: config.max_len,
            max_depth: config.max_depth,
        }
    }

    /// Set the traversal order
    pub fn order(mut self, order: TraversalOrder) -> Self {
        self.order = order;
        self
    }

    /// Never expand containers of this kind
    pub fn exclude(mut self, kind: DocumentKind) -> Self {
        self.exclude.push(kind);
        self
    }

    /// Always consider containers of this kind, even if excluded
    pub fn include(mut self, kind: DocumentKind) -> Self {
        self.include.push(kind);
        self
    }

    /// Set the depth guard
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the length guard
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Whether `node` found at `depth` should have its children visited
    pub fn expands(&self, node: &Document, depth: usize) -> bool {
        let Some(len) = node.len() else {
            return false;
        };
        let kind = node.kind();
        let allowed = self.include.contains(&kind) || !self.exclude.contains(&kind);
        allowed && depth < self.max_depth && len <= self.max_len
    }
}

/// What a visitor wants after seeing a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep going, descending into this node
    Continue,
    /// Keep going without descending into this node
    Skip,
    /// End the traversal
    Stop,
}

/// Visit every reachable node in the configured order
pub fn walk<F>(doc: &Document, options: &TraversalOptions, mut visit: F)
where
    F: FnMut(&PathKey, &Document) -> Visit,
{
    let mut frontier: VecDeque<(PathKey, usize, &Document)> = VecDeque::new();
    frontier.push_back((PathKey::root(), 0, doc));

    loop {
        let next = match options.order {
            TraversalOrder::Dfs => frontier.pop_back(),
            TraversalOrder::Bfs => frontier.pop_front(),
        };
        let Some((path, depth, node)) = next else {
            break;
        };

        match visit(&path, node) {
            Visit::Stop => return,
            Visit::Skip => continue,
            Visit::Continue => {}
        }

        if !options.expands(node, depth) {
            if node.is_container() {
                trace!(path = %path, depth, kind = %node.kind(), "container not expanded");
            }
            continue;
        }

        let children = node.children();
        match options.order {
            // reversed so the first child is popped first
            TraversalOrder::Dfs => {
                for (token, child) in children.into_iter().rev() {
                    frontier.push_back((path.child(token), depth + 1, child));
                }
            }
            TraversalOrder::Bfs => {
                for (token, child) in children {
                    frontier.push_back((path.child(token), depth + 1, child));
                }
            }
        }
    }
}

/// Whether any reachable node satisfies `predicate`; returns on the first match
pub fn contains<P>(doc: &Document, predicate: P, options: &TraversalOptions) -> bool
where
    P: Fn(&Document) -> bool,
{
    let mut found = false;
    walk(doc, options, |_, node| {
        if predicate(node) {
            found = true;
            Visit::Stop
        } else {
            Visit::Continue
        }
    });
    found
}

/// Every node satisfying `predicate` with its path; matched nodes are not descended into
pub fn find_paths<P>(doc: &Document, predicate: P, options: &TraversalOptions) -> Vec<(PathKey, Document)>
where
    P: Fn(&Document) -> bool,
{
    let mut matches = Vec::new();
    walk(doc, options, |path, node| {
        if predicate(node) {
            matches.push((path.clone(), node.clone()));
            Visit::Skip
        } else {
            Visit::Continue
        }
    });
    matches
}

/// Rebuild `doc` with every matching node replaced.
///
/// Only the containers on a path to a replaced node are rebuilt; all other
/// subtrees are shared with `doc`. With `check_any_first`, a document with no
/// match is returned as-is.
pub fn find_and_replace<P, R>(
    doc: &Document,
    predicate: P,
    replace: R,
    check_any_first: bool,
    options: &TraversalOptions,
) -> Result<Document>
where
    P: Fn(&Document) -> bool,
    R: Fn(&Document) -> Result<Document>,
{
    if check_any_first && !contains(doc, &predicate, options) {
        return Ok(doc.clone());
    }
    let rebuilt = rebuild(doc, 0, &predicate, &replace, options)?;
    Ok(rebuilt.unwrap_or_else(|| doc.clone()))
}

/// `None` when nothing under `node` changed
fn rebuild<P, R>(
    node: &Document,
    depth: usize,
    predicate: &P,
    replace: &R,
    options: &TraversalOptions,
) -> Result<Option<Document>>
where
    P: Fn(&Document) -> bool,
    R: Fn(&Document) -> Result<Document>,
{
    if predicate(node) {
        return replace(node).map(Some);
    }
    if !options.expands(node, depth) {
        return Ok(None);
    }

    let rebuilt = match node {
        Document::Scalar(_) => None,
        Document::Mapping(map) => {
            let mut out = None;
            for (i, child) in map.values().enumerate() {
                if let Some(new) = rebuild(child, depth + 1, predicate, replace, options)? {
                    let copy = out.get_or_insert_with(|| map.as_ref().clone());
                    if let Some((_, slot)) = copy.get_index_mut(i) {
                        *slot = new;
                    }
                }
            }
            out.map(Document::from)
        }
        Document::Sequence(items) | Document::Set(items) => {
            let mut out: Option<Vec<Document>> = None;
            for (i, child) in items.iter().enumerate() {
                if let Some(new) = rebuild(child, depth + 1, predicate, replace, options)? {
                    out.get_or_insert_with(|| items.as_ref().clone())[i] = new;
                }
            }
            out.map(|items| match node {
                Document::Set(_) => Document::set(items),
                _ => Document::sequence(items),
            })
        }
        Document::Record(record) => {
            let mut out = None;
            for (i, child) in record.values().enumerate() {
                if let Some(new) = rebuild(child, depth + 1, predicate, replace, options)? {
                    let copy = out.get_or_insert_with(|| record.as_ref().clone());
                    if let Some(slot) = copy.get_mut(i) {
                        *slot = new;
                    }
                }
            }
            out.map(Document::from)
        }
    };
    Ok(rebuilt)
}
