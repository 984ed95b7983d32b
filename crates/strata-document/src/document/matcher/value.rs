//! Matching document values against a set of targets

use std::fmt;
use std::ops::Not;
use std::sync::Arc;

use super::string::{MatchResult, MatchShape, StringMatchOptions, StringMatcher};
use crate::document::value::{Document, Scalar};
use crate::document::Result;

/// Predicate over a candidate value
pub type PredicateFn = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// One thing a value may be matched against
#[derive(Clone)]
pub enum Target {
    /// Compared by value; string values are matched with the string matcher
    Value(Document),
    /// String pattern for the string matcher
    Pattern(String),
    /// Invoked with the candidate
    Predicate(PredicateFn),
    /// Negation of the inner target
    Not(Box<Target>),
}

impl Target {
    /// Wrap a predicate
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Document) -> bool + Send + Sync + 'static,
    {
        Target::Predicate(Arc::new(f))
    }
}

impl Not for Target {
    type Output = Target;

    fn not(self) -> Target {
        Target::Not(Box::new(self))
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Target::Pattern(p) => f.debug_tuple("Pattern").field(p).finish(),
            Target::Predicate(_) => f.write_str("Predicate(<fn>)"),
            Target::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
        }
    }
}

impl From<&str> for Target {
    fn from(value: &str) -> Self {
        Target::Pattern(value.to_string())
    }
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        Target::Pattern(value)
    }
}

impl From<Document> for Target {
    fn from(value: Document) -> Self {
        Target::Value(value)
    }
}

impl From<i64> for Target {
    fn from(value: i64) -> Self {
        Target::Value(value.into())
    }
}

impl From<i32> for Target {
    fn from(value: i32) -> Self {
        Target::Value(value.into())
    }
}

impl From<f64> for Target {
    fn from(value: f64) -> Self {
        Target::Value(value.into())
    }
}

impl From<bool> for Target {
    fn from(value: bool) -> Self {
        Target::Value(value.into())
    }
}

#[derive(Clone)]
enum Check {
    Value(Document),
    Text(StringMatcher),
    Predicate(PredicateFn),
}

#[derive(Clone)]
struct CompiledTarget {
    negate: bool,
    check: Check,
}

impl CompiledTarget {
    fn compile(target: &Target, negate: bool, options: &StringMatchOptions) -> Result<Self> {
        let check = match target {
            Target::Not(inner) => return Self::compile(inner, !negate, options),
            Target::Pattern(p) | Target::Value(Document::Scalar(Scalar::Str(p))) => {
                Check::Text(StringMatcher::new(p.clone(), options.clone())?)
            }
            Target::Value(v) => Check::Value(v.clone()),
            Target::Predicate(f) => Check::Predicate(Arc::clone(f)),
        };
        Ok(Self { negate, check })
    }

    fn test(&self, candidate: &Document) -> bool {
        let raw = match &self.check {
            Check::Predicate(f) => f(candidate),
            Check::Text(m) => candidate.as_str().is_some_and(|s| m.is_match(s)),
            Check::Value(v) => values_equal(v, candidate),
        };
        raw != self.negate
    }

    fn positive_text(&self) -> Option<&StringMatcher> {
        match &self.check {
            Check::Text(m) if !self.negate => Some(m),
            _ => None,
        }
    }
}

/// Equality used for value targets: booleans only equal booleans, numbers
/// compare numerically across integer and float, anything else needs equal kinds
pub fn values_equal(target: &Document, candidate: &Document) -> bool {
    match (target, candidate) {
        (Document::Scalar(Scalar::Bool(a)), Document::Scalar(Scalar::Bool(b))) => a == b,
        (Document::Scalar(Scalar::Bool(_)), _) | (_, Document::Scalar(Scalar::Bool(_))) => false,
        (Document::Scalar(a), Document::Scalar(b)) if a.is_number() && b.is_number() => {
            a.as_f64() == b.as_f64()
        }
        _ => target.kind() == candidate.kind() && target == candidate,
    }
}

/// Matches candidates against targets: any target (OR) by default, every
/// target (AND) with `find_all`. Negation applies to its own target before
/// the targets are combined.
#[derive(Clone)]
pub struct ValueMatcher {
    targets: Vec<Target>,
    compiled: Vec<CompiledTarget>,
    find_all: bool,
}

impl fmt::Debug for ValueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueMatcher")
            .field("targets", &self.targets)
            .field("find_all", &self.find_all)
            .finish()
    }
}

impl ValueMatcher {
    /// Compile targets; string targets use `options`
    pub fn new(targets: Vec<Target>, find_all: bool, options: StringMatchOptions) -> Result<Self> {
        let compiled = targets
            .iter()
            .map(|target| CompiledTarget::compile(target, false, &options))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            targets,
            compiled,
            find_all,
        })
    }

    /// Match any of `targets` with substring string matching
    pub fn any(targets: Vec<Target>) -> Result<Self> {
        Self::new(targets, false, StringMatchOptions::default())
    }

    /// Match every one of `targets` with substring string matching
    pub fn all(targets: Vec<Target>) -> Result<Self> {
        Self::new(targets, true, StringMatchOptions::default())
    }

    /// Match a single target with substring string matching
    pub fn single(target: impl Into<Target>) -> Result<Self> {
        Self::any(vec![target.into()])
    }

    /// The source targets
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Whether every target must match
    pub fn find_all(&self) -> bool {
        self.find_all
    }

    /// Whether `candidate` satisfies the targets
    pub fn matches(&self, candidate: &Document) -> bool {
        if self.compiled.is_empty() {
            return false;
        }
        if self.find_all {
            self.compiled.iter().all(|t| t.test(candidate))
        } else {
            self.compiled.iter().any(|t| t.test(candidate))
        }
    }

    /// Whether any positive string target exists, so matches can be
    /// replaced inside string values
    pub fn has_text_targets(&self) -> bool {
        self.compiled.iter().any(|t| t.positive_text().is_some())
    }

    /// Byte ranges matched in a string candidate by the positive string targets
    pub fn spans(&self, candidate: &str) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = self
            .compiled
            .iter()
            .filter_map(CompiledTarget::positive_text)
            .flat_map(|m| m.spans(candidate))
            .collect();
        spans.sort_unstable();
        spans.dedup();
        spans
    }

    /// Describe how `candidate` matched, in `shape`.
    ///
    /// Non-string candidates are reported as `Bool`.
    pub fn describe(&self, candidate: &Document, shape: MatchShape) -> MatchResult {
        let Some(text) = candidate.as_str() else {
            return MatchResult::Bool(self.matches(candidate));
        };
        let spans = self.spans(text);
        match shape {
            MatchShape::Bool => MatchResult::Bool(self.matches(candidate)),
            MatchShape::Offsets => MatchResult::Offsets(spans.into_iter().map(|(s, _)| s).collect()),
            MatchShape::Ranges => MatchResult::Ranges(spans),
            MatchShape::Strings => MatchResult::Strings(
                spans
                    .into_iter()
                    .map(|(s, e)| text[s..e].to_string())
                    .collect(),
            ),
        }
    }

    /// Replace the substrings matched by each positive string target in turn.
    ///
    /// Returns `None` when no substring was replaced.
    pub fn replace_in(&self, candidate: &str, replacement: &str) -> Option<String> {
        let mut current: Option<String> = None;
        for matcher in self.compiled.iter().filter_map(CompiledTarget::positive_text) {
            let source = current.as_deref().unwrap_or(candidate);
            if let Some(replaced) = matcher.replace(source, replacement) {
                current = Some(replaced);
            }
        }
        current
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::matcher::Strategy;

    fn doc(s: &str) -> Document {
        Document::from(s)
    }

    #[test]
    fn test_string_target_uses_substring_match() {
        let m = ValueMatcher::single("BC").unwrap();
        assert!(m.matches(&doc("ABC")));
        assert!(!m.matches(&doc("CDE")));
        assert!(!m.matches(&Document::from(1)));
    }

    #[test]
    fn test_numbers_compare_across_int_and_float() {
        let m = ValueMatcher::single(Target::from(2_i64)).unwrap();
        assert!(m.matches(&Document::from(2.0)));
        assert!(!m.matches(&Document::from(true)));
    }

    #[test]
    fn test_bools_compare_by_value() {
        let m = ValueMatcher::single(true).unwrap();
        assert!(m.matches(&Document::from(true)));
        assert!(!m.matches(&Document::from(1)));
    }

    #[test]
    fn test_predicate_target() {
        let m = ValueMatcher::single(Target::predicate(|d| d.as_i64().is_some_and(|i| i > 3)))
            .unwrap();
        assert!(m.matches(&Document::from(4)));
        assert!(!m.matches(&Document::from(3)));
    }

    #[test]
    fn test_container_targets_need_same_kind() {
        let target = Document::sequence(vec![1.into()]);
        let m = ValueMatcher::single(target.clone()).unwrap();
        assert!(m.matches(&target));
        assert!(!m.matches(&Document::set(vec![1.into()])));
    }

    #[test]
    fn test_double_negation() {
        let m = ValueMatcher::single(!!Target::from("A")).unwrap();
        assert!(m.matches(&doc("A")));
    }

    #[test]
    fn test_empty_targets_never_match() {
        let m = ValueMatcher::any(vec![]).unwrap();
        assert!(!m.matches(&doc("anything")));
    }

    #[test]
    fn test_options_apply_to_string_targets() {
        let options = StringMatchOptions::new(Strategy::Exact).ignore_case(true);
        let m = ValueMatcher::new(vec!["abc".into()], false, options).unwrap();
        assert!(m.matches(&doc("ABC")));
        assert!(!m.matches(&doc("ABCD")));
    }

    #[test]
    fn test_replace_in() {
        let m = ValueMatcher::single("BC").unwrap();
        assert_eq!(m.replace_in("ABC", "XY").as_deref(), Some("AXY"));
        assert_eq!(m.replace_in("CDE", "XY"), None);
        // negated targets never drive replacement
        let m = ValueMatcher::single(!Target::from("Q")).unwrap();
        assert!(!m.has_text_targets());
        assert_eq!(m.replace_in("ABC", "XY"), None);
    }

    #[test]
    fn test_describe() {
        let m = ValueMatcher::any(vec!["a".into(), "n".into()]).unwrap();
        assert_eq!(
            m.describe(&doc("banana"), MatchShape::Offsets),
            MatchResult::Offsets(vec![1, 2, 3, 4, 5])
        );
        assert_eq!(
            m.describe(&Document::from(3), MatchShape::Ranges),
            MatchResult::Bool(false)
        );
    }
}
