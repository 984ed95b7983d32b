//! String matching strategies
//!
//! Literal strategies are compiled to an escaped, anchored regex once at
//! construction; regex patterns are compiled as given; fuzzy matching runs
//! the approximate search in [`super::fuzzy`].

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::fuzzy::{distance_for_threshold, find_approximate};
use crate::document::{DocumentError, Result};

/// Similarity threshold used when a fuzzy matcher sets neither a threshold
/// nor a maximum distance
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 80.0;

/// How a pattern is compared against a candidate string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Whole string equality
    Exact,
    /// Prefix
    Start,
    /// Suffix
    End,
    /// Substring
    #[default]
    Contains,
    /// Regular expression
    Regex,
    /// Approximate substring within an edit distance
    Fuzzy,
}

impl Strategy {
    /// Parse a strategy name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "exact" => Some(Self::Exact),
            "start" | "startswith" => Some(Self::Start),
            "end" | "endswith" => Some(Self::End),
            "contains" | "in" => Some(Self::Contains),
            "regex" | "re" => Some(Self::Regex),
            "fuzzy" => Some(Self::Fuzzy),
            _ => None,
        }
    }
}

/// Shape of a match result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchShape {
    /// Whether anything matched
    #[default]
    Bool,
    /// Start byte offset of each match
    Offsets,
    /// `(start, end)` byte range of each match
    Ranges,
    /// Matched substrings
    Strings,
}

/// Result of matching one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MatchResult {
    /// Whether anything matched
    Bool(bool),
    /// Start byte offsets
    Offsets(Vec<usize>),
    /// Byte ranges
    Ranges(Vec<(usize, usize)>),
    /// Matched substrings
    Strings(Vec<String>),
}

impl MatchResult {
    /// Whether the result reports at least one match
    pub fn is_match(&self) -> bool {
        match self {
            MatchResult::Bool(b) => *b,
            MatchResult::Offsets(v) => !v.is_empty(),
            MatchResult::Ranges(v) => !v.is_empty(),
            MatchResult::Strings(v) => !v.is_empty(),
        }
    }
}

/// Options for [`StringMatcher::new`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StringMatchOptions {
    /// Matching strategy
    pub strategy: Strategy,
    /// Case-fold pattern and candidate
    pub ignore_case: bool,
    /// Capture group reported by regex matches
    pub group: Option<usize>,
    /// Maximum edit distance for fuzzy matches
    pub max_distance: Option<usize>,
    /// Similarity threshold in `[0, 100]` for fuzzy matches
    pub threshold: Option<f64>,
}

impl StringMatchOptions {
    /// Options for a strategy
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Set case folding
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Report this capture group
    pub fn group(mut self, group: usize) -> Self {
        self.group = Some(group);
        self
    }

    /// Set the fuzzy edit distance
    pub fn max_distance(mut self, max_distance: usize) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    /// Set the fuzzy similarity threshold
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

#[derive(Debug, Clone)]
enum Compiled {
    Regex { regex: Regex, group: usize },
    Fuzzy { max_distance: usize },
}

/// A compiled string pattern
#[derive(Debug, Clone)]
pub struct StringMatcher {
    pattern: String,
    options: StringMatchOptions,
    compiled: Compiled,
}

impl PartialEq for StringMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.options == other.options
    }
}

impl StringMatcher {
    /// Compile `pattern` with the given options
    pub fn new(pattern: impl Into<String>, options: StringMatchOptions) -> Result<Self> {
        let pattern = pattern.into();
        let compiled = match options.strategy {
            Strategy::Fuzzy => {
                let len = pattern.chars().count();
                let max_distance = match (options.max_distance, options.threshold) {
                    (Some(d), _) => d,
                    (None, Some(t)) => distance_for_threshold(len, t),
                    (None, None) => distance_for_threshold(len, DEFAULT_FUZZY_THRESHOLD),
                };
                Compiled::Fuzzy { max_distance }
            }
            strategy => {
                let source = match strategy {
                    Strategy::Exact => format!("^{}$", regex::escape(&pattern)),
                    Strategy::Start => format!("^{}", regex::escape(&pattern)),
                    Strategy::End => format!("{}$", regex::escape(&pattern)),
                    Strategy::Contains => regex::escape(&pattern),
                    _ => pattern.clone(),
                };
                let regex = RegexBuilder::new(&source)
                    .case_insensitive(options.ignore_case)
                    .build()
                    .map_err(|e| DocumentError::InvalidPattern(format!("{}: {}", pattern, e)))?;
                let groups = regex.captures_len() - 1;
                let group = match options.group {
                    Some(g) if g > groups => {
                        return Err(DocumentError::InvalidPattern(format!(
                            "{}: no capture group {}",
                            pattern, g
                        )))
                    }
                    Some(g) => g,
                    None if groups == 1 => 1,
                    None => 0,
                };
                Compiled::Regex { regex, group }
            }
        };
        Ok(Self {
            pattern,
            options,
            compiled,
        })
    }

    /// Substring matcher
    pub fn contains(pattern: impl Into<String>) -> Result<Self> {
        Self::new(pattern, StringMatchOptions::new(Strategy::Contains))
    }

    /// Whole-string matcher
    pub fn exact(pattern: impl Into<String>) -> Result<Self> {
        Self::new(pattern, StringMatchOptions::new(Strategy::Exact))
    }

    /// Regular expression matcher
    pub fn regex(pattern: impl Into<String>) -> Result<Self> {
        Self::new(pattern, StringMatchOptions::new(Strategy::Regex))
    }

    /// Approximate matcher at a similarity threshold
    pub fn fuzzy(pattern: impl Into<String>, threshold: f64) -> Result<Self> {
        Self::new(
            pattern,
            StringMatchOptions::new(Strategy::Fuzzy).threshold(threshold),
        )
    }

    /// The source pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The options the matcher was built with
    pub fn options(&self) -> &StringMatchOptions {
        &self.options
    }

    /// Edit distance accepted by a fuzzy matcher
    pub fn max_distance(&self) -> Option<usize> {
        match self.compiled {
            Compiled::Fuzzy { max_distance } => Some(max_distance),
            Compiled::Regex { .. } => None,
        }
    }

    /// Whether `candidate` matches
    pub fn is_match(&self, candidate: &str) -> bool {
        match &self.compiled {
            Compiled::Regex { regex, group: 0 } => regex.is_match(candidate),
            _ => !self.spans(candidate).is_empty(),
        }
    }

    /// Byte ranges of every non-overlapping match, left to right
    pub fn spans(&self, candidate: &str) -> Vec<(usize, usize)> {
        match &self.compiled {
            Compiled::Regex { regex, group } => regex
                .captures_iter(candidate)
                .filter_map(|caps| caps.get(*group))
                .map(|m| (m.start(), m.end()))
                .collect(),
            Compiled::Fuzzy { max_distance } => find_approximate(
                &self.pattern,
                candidate,
                *max_distance,
                self.options.ignore_case,
            )
            .into_iter()
            .map(|m| (m.start, m.end))
            .collect(),
        }
    }

    /// Match `candidate` and report the result in `shape`
    pub fn find(&self, candidate: &str, shape: MatchShape) -> MatchResult {
        match shape {
            MatchShape::Bool => MatchResult::Bool(self.is_match(candidate)),
            MatchShape::Offsets => {
                MatchResult::Offsets(self.spans(candidate).into_iter().map(|(s, _)| s).collect())
            }
            MatchShape::Ranges => MatchResult::Ranges(self.spans(candidate)),
            MatchShape::Strings => MatchResult::Strings(
                self.spans(candidate)
                    .into_iter()
                    .map(|(s, e)| candidate[s..e].to_string())
                    .collect(),
            ),
        }
    }

    /// Replace every matched substring of `candidate` with `replacement`.
    ///
    /// Returns `None` when nothing matched.
    pub fn replace(&self, candidate: &str, replacement: &str) -> Option<String> {
        let spans = self.spans(candidate);
        if spans.is_empty() {
            return None;
        }
        let mut out = String::with_capacity(candidate.len());
        let mut cursor = 0;
        for (start, end) in spans {
            out.push_str(&candidate[cursor..start]);
            out.push_str(replacement);
            cursor = end;
        }
        out.push_str(&candidate[cursor..]);
        Some(out)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn matcher(pattern: &str, strategy: Strategy) -> StringMatcher {
        StringMatcher::new(pattern, StringMatchOptions::new(strategy)).unwrap()
    }

    #[test]
    fn test_literal_strategies() {
        assert!(matcher("BC", Strategy::Contains).is_match("ABC"));
        assert!(!matcher("BC", Strategy::Exact).is_match("ABC"));
        assert!(matcher("ABC", Strategy::Exact).is_match("ABC"));
        assert!(matcher("AB", Strategy::Start).is_match("ABC"));
        assert!(!matcher("BC", Strategy::Start).is_match("ABC"));
        assert!(matcher("BC", Strategy::End).is_match("ABC"));
    }

    #[test]
    fn test_literal_patterns_are_escaped() {
        assert!(matcher("a.c", Strategy::Contains).is_match("xa.cx"));
        assert!(!matcher("a.c", Strategy::Contains).is_match("abc"));
    }

    #[test]
    fn test_ignore_case() {
        let m = StringMatcher::new("bc", StringMatchOptions::new(Strategy::Contains).ignore_case(true))
            .unwrap();
        assert!(m.is_match("ABC"));
        assert!(!matcher("bc", Strategy::Contains).is_match("ABC"));
    }

    #[test]
    fn test_shapes() {
        let m = matcher("a", Strategy::Contains);
        assert_eq!(m.find("banana", MatchShape::Bool), MatchResult::Bool(true));
        assert_eq!(
            m.find("banana", MatchShape::Offsets),
            MatchResult::Offsets(vec![1, 3, 5])
        );
        assert_eq!(
            m.find("banana", MatchShape::Ranges),
            MatchResult::Ranges(vec![(1, 2), (3, 4), (5, 6)])
        );
        assert_eq!(
            m.find("bAn", MatchShape::Strings),
            MatchResult::Strings(vec![])
        );
    }

    #[test]
    fn test_regex_auto_selects_single_group() {
        let m = matcher(r"id=(\d+)", Strategy::Regex);
        assert_eq!(
            m.find("id=42 id=7", MatchShape::Strings),
            MatchResult::Strings(vec!["42".into(), "7".into()])
        );
    }

    #[test]
    fn test_regex_explicit_group() {
        let m = StringMatcher::new(
            r"(\w+)@(\w+)",
            StringMatchOptions::new(Strategy::Regex).group(2),
        )
        .unwrap();
        assert_eq!(
            m.find("me@host", MatchShape::Strings),
            MatchResult::Strings(vec!["host".into()])
        );
        // two groups and none requested: the whole match
        let m = matcher(r"(\w+)@(\w+)", Strategy::Regex);
        assert_eq!(
            m.find("me@host", MatchShape::Strings),
            MatchResult::Strings(vec!["me@host".into()])
        );
    }

    #[test]
    fn test_invalid_regex() {
        let err = StringMatcher::regex("(unclosed").unwrap_err();
        assert!(matches!(err, DocumentError::InvalidPattern(_)));
        let err = StringMatcher::new("(a)", StringMatchOptions::new(Strategy::Regex).group(3))
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidPattern(_)));
    }

    #[test]
    fn test_fuzzy() {
        assert_eq!(StringMatcher::fuzzy("receive", 80.0).unwrap().max_distance(), Some(1));
        let m = StringMatcher::fuzzy("receive", 70.0).unwrap();
        assert_eq!(m.max_distance(), Some(2));
        assert!(m.is_match("I will recieve it"));
        assert!(!m.is_match("nothing here"));
    }

    #[test]
    fn test_replace() {
        let m = matcher("BC", Strategy::Contains);
        assert_eq!(m.replace("ABC", "XY").as_deref(), Some("AXY"));
        assert_eq!(m.replace("CDE", "XY"), None);
        let m = matcher("a", Strategy::Contains);
        assert_eq!(m.replace("banana", "o").as_deref(), Some("bonono"));
    }

    #[test]
    fn test_strategy_from_name() {
        assert_eq!(Strategy::from_name("FUZZY"), Some(Strategy::Fuzzy));
        assert_eq!(Strategy::from_name("startswith"), Some(Strategy::Start));
        assert_eq!(Strategy::from_name("nope"), None);
    }
}
