//! Engine configuration
//!
//! [`EngineConfig`] is an immutable value threaded through the engine at
//! construction time. Override layers ([`ConfigOverrides`]) are resolved once
//! with [`EngineConfig::with_overrides`]; nothing reads settings lazily.

use serde::Deserialize;

use super::DocumentError;

/// Traversal order used by search and flatten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalOrder {
    /// Depth-first (LIFO stack)
    #[default]
    Dfs,
    /// Breadth-first (FIFO queue)
    Bfs,
}

impl std::fmt::Display for TraversalOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dfs => write!(f, "dfs"),
            Self::Bfs => write!(f, "bfs"),
        }
    }
}

/// Configuration for a document [`Engine`](super::Engine).
///
/// # Example (TOML)
///
/// ```toml
/// [engine]
/// max_depth = 64
/// max_len = 100000
/// traversal = "bfs"
/// ignore_case = true
/// parallel = true
/// parallel_threshold = 64
/// query_variable = "d"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Containers at this depth are not expanded by traversals.
    pub max_depth: usize,

    /// Containers with more children than this are treated as opaque leaves.
    pub max_len: usize,

    /// Default traversal order.
    pub traversal: TraversalOrder,

    /// Case-fold string matching by default.
    pub ignore_case: bool,

    /// Allow string tokens to fall back to registered attribute accessors.
    pub attribute_access: bool,

    /// Skip missing paths (or documents) instead of failing.
    pub skip_missing: bool,

    /// Run `apply` across documents on the rayon pool.
    pub parallel: bool,

    /// Minimum collection size before `apply` goes parallel.
    pub parallel_threshold: usize,

    /// Name the document is bound to in query expressions.
    pub query_variable: String,

    /// Default fuzzy similarity threshold in `[0, 100]`.
    pub fuzzy_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 128,
            max_len: usize::MAX,
            traversal: TraversalOrder::Dfs,
            ignore_case: false,
            attribute_access: true,
            skip_missing: false,
            parallel: true,
            parallel_threshold: 32,
            query_variable: "d".to_string(),
            fuzzy_threshold: 80.0,
        }
    }
}

impl EngineConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), DocumentError> {
        let var = &self.query_variable;
        let valid_ident = var
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_')
            && var.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid_ident {
            return Err(DocumentError::Config(format!(
                "query_variable must be an identifier, got '{}'",
                var
            )));
        }
        if !(0.0..=100.0).contains(&self.fuzzy_threshold) {
            return Err(DocumentError::Config(format!(
                "fuzzy_threshold must be within [0, 100], got {}",
                self.fuzzy_threshold
            )));
        }
        Ok(())
    }

    /// Resolve an override layer on top of this configuration
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Self {
        let mut cfg = self.clone();
        if let Some(v) = overrides.max_depth {
            cfg.max_depth = v;
        }
        if let Some(v) = overrides.max_len {
            cfg.max_len = v;
        }
        if let Some(v) = overrides.traversal {
            cfg.traversal = v;
        }
        if let Some(v) = overrides.ignore_case {
            cfg.ignore_case = v;
        }
        if let Some(v) = overrides.attribute_access {
            cfg.attribute_access = v;
        }
        if let Some(v) = overrides.skip_missing {
            cfg.skip_missing = v;
        }
        if let Some(v) = overrides.parallel {
            cfg.parallel = v;
        }
        if let Some(v) = overrides.parallel_threshold {
            cfg.parallel_threshold = v;
        }
        if let Some(v) = &overrides.query_variable {
            cfg.query_variable = v.clone();
        }
        if let Some(v) = overrides.fuzzy_threshold {
            cfg.fuzzy_threshold = v;
        }
        cfg
    }
}

/// Optional per-layer settings; unset fields inherit from the layer below
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ConfigOverrides {
    pub max_depth: Option<usize>,
    pub max_len: Option<usize>,
    pub traversal: Option<TraversalOrder>,
    pub ignore_case: Option<bool>,
    pub attribute_access: Option<bool>,
    pub skip_missing: Option<bool>,
    pub parallel: Option<bool>,
    pub parallel_threshold: Option<usize>,
    pub query_variable: Option<String>,
    pub fuzzy_threshold: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_depth, 128);
        assert_eq!(cfg.max_len, usize::MAX);
        assert_eq!(cfg.traversal, TraversalOrder::Dfs);
        assert!(!cfg.ignore_case);
        assert!(cfg.attribute_access);
        assert!(!cfg.skip_missing);
        assert_eq!(cfg.query_variable, "d");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize_from_toml() {
        let toml_str = r#"
            max_depth = 8
            traversal = "bfs"
            ignore_case = true
            query_variable = "doc"
        "#;
        let cfg: EngineConfig = toml::from_str(toml_str).expect("valid TOML");
        assert_eq!(cfg.max_depth, 8);
        assert_eq!(cfg.traversal, TraversalOrder::Bfs);
        assert!(cfg.ignore_case);
        assert_eq!(cfg.query_variable, "doc");
        // unspecified fields keep their defaults
        assert_eq!(cfg.parallel_threshold, 32);
    }

    #[test]
    fn test_overrides_resolve_once() {
        let base = EngineConfig::default();
        let overrides = ConfigOverrides {
            max_depth: Some(3),
            skip_missing: Some(true),
            ..Default::default()
        };
        let cfg = base.with_overrides(&overrides);
        assert_eq!(cfg.max_depth, 3);
        assert!(cfg.skip_missing);
        assert_eq!(cfg.traversal, base.traversal);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = EngineConfig {
            query_variable: "1x".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DocumentError::Config(_))));

        let cfg = EngineConfig {
            fuzzy_threshold: 120.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_traversal_order_display() {
        assert_eq!(TraversalOrder::Dfs.to_string(), "dfs");
        assert_eq!(TraversalOrder::Bfs.to_string(), "bfs");
    }
}
