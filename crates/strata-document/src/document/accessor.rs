//! Attribute accessors
//!
//! When a string token is not found through item access, navigation may fall
//! back to an attribute accessor registered for the node. Accessors map an
//! attribute name onto one of the node's positional children, so reads and
//! copy-on-write writes through an attribute go through the same code path
//! as indexed access.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::value::{Document, DocumentKind};

/// Exposes named attributes of a node as positions of its children
pub trait AttributeAccessor: Send + Sync + fmt::Debug {
    /// Position of the child exposed under `name`, if any
    fn position(&self, target: &Document, name: &str) -> Option<usize>;
}

/// Resolves record field names
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordFields;

impl AttributeAccessor for RecordFields {
    fn position(&self, target: &Document, name: &str) -> Option<usize> {
        target.as_record()?.position(name)
    }
}

/// Exposes `first` and `last` on sequences
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceEnds;

impl AttributeAccessor for SequenceEnds {
    fn position(&self, target: &Document, name: &str) -> Option<usize> {
        let len = target.as_sequence()?.len();
        match name {
            "first" if len > 0 => Some(0),
            "last" if len > 0 => Some(len - 1),
            _ => None,
        }
    }
}

/// Registry of accessors, looked up by record type name first and node kind second
#[derive(Debug, Clone, Default)]
pub struct AccessorRegistry {
    by_record: HashMap<String, Arc<dyn AttributeAccessor>>,
    by_kind: HashMap<DocumentKind, Arc<dyn AttributeAccessor>>,
}

impl AccessorRegistry {
    /// A registry with no accessors; attribute fallback always fails
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard registry: record fields by name, `first`/`last` on sequences
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_kind(DocumentKind::Record, Arc::new(RecordFields));
        registry.register_kind(DocumentKind::Sequence, Arc::new(SequenceEnds));
        registry
    }

    /// Register an accessor for every node of a kind
    pub fn register_kind(&mut self, kind: DocumentKind, accessor: Arc<dyn AttributeAccessor>) {
        self.by_kind.insert(kind, accessor);
    }

    /// Register an accessor for records with the given type name
    pub fn register_record(&mut self, name: impl Into<String>, accessor: Arc<dyn AttributeAccessor>) {
        self.by_record.insert(name.into(), accessor);
    }

    /// Whether any accessor is registered
    pub fn is_empty(&self) -> bool {
        self.by_record.is_empty() && self.by_kind.is_empty()
    }

    /// Resolve an attribute of `target` to a child position
    pub fn position(&self, target: &Document, name: &str) -> Option<usize> {
        let by_name = target
            .as_record()
            .and_then(|record| self.by_record.get(record.name()));
        by_name
            .or_else(|| self.by_kind.get(&target.kind()))
            .and_then(|accessor| accessor.position(target, name))
    }
}

/// Process-wide standard registry used by the free navigation functions
pub fn standard_registry() -> &'static AccessorRegistry {
    static REGISTRY: OnceLock<AccessorRegistry> = OnceLock::new();
    REGISTRY.get_or_init(AccessorRegistry::standard)
}
