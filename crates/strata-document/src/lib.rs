#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! # strata-document
//!
//! Path-addressable engine for nested semi-structured documents: navigation,
//! search, copy-on-write mutation, flattening and collection pipelines.

pub mod document;

pub use document::{
    Document, DocumentCollection, DocumentError, Engine, EngineConfig, PathKey, Pipeline, Result,
    Step, ValueMatcher,
};
