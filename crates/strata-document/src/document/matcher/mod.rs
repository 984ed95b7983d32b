//! Search matchers
//!
//! [`StringMatcher`] compares a pattern against string candidates using one
//! of several [`Strategy`] values. [`ValueMatcher`] combines any number of
//! [`Target`]s (values, patterns, predicates, negations) into the predicate
//! driven by the traversal engine.

pub mod fuzzy;
pub mod string;
pub mod value;

pub use fuzzy::{find_approximate, levenshtein_distance, similarity, FuzzyMatch};
pub use string::{
    MatchResult, MatchShape, Strategy, StringMatchOptions, StringMatcher, DEFAULT_FUZZY_THRESHOLD,
};
pub use value::{values_equal, PredicateFn, Target, ValueMatcher};
