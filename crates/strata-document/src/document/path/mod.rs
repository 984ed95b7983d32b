//! Path-like keys
//!
//! Every surface form a caller may use to address a location (dotted or
//! bracketed strings, token lists, single tokens, filesystem-style paths,
//! `None`) normalizes to one canonical [`PathKey`].
//!
//! ```text
//! "a.b[0]"  ─┐
//! ["a","b",0] ├──▶ PathKey(Key("a"), Key("b"), Index(0))
//! a/b/0     ─┘
//! ```

pub mod ast;
pub mod parser;
pub mod resolve;

pub use ast::{PathKey, PathLike, Token};
pub use parser::parse;
pub use resolve::{combine, minimize, resolve, IntoPathKey};
