//! Steps and pipelines
//!
//! A pipeline is an ordered list of steps run against each document of a
//! collection. Its JSON form is a list whose items are:
//!
//! ```text
//! "unflatten"                               named step, no arguments
//! ["get", "a.b"]                            named step, positional arguments
//! {"find": {"target": "x", "return": "values"}}   named step, keyword arguments
//! [["get", "a"], ["dump"]]                  nested pipeline
//! "d.n > 1"                                 query expression
//! ```

pub mod step;

pub use step::{Step, StepArgs, StepFn, StepKind, Task};

use std::sync::OnceLock;

use super::config::EngineConfig;
use super::navigate::Navigator;
use super::value::Document;
use super::{DocumentError, Result};

pub(crate) fn default_config() -> &'static EngineConfig {
    static CONFIG: OnceLock<EngineConfig> = OnceLock::new();
    CONFIG.get_or_init(EngineConfig::default)
}

/// Configuration and navigation shared by every task of one `apply`
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Engine configuration
    pub config: &'a EngineConfig,
    /// Path navigation
    pub navigator: Navigator<'a>,
}

impl<'a> StepContext<'a> {
    /// Bundle a configuration and navigator
    pub fn new(config: &'a EngineConfig, navigator: Navigator<'a>) -> Self {
        Self { config, navigator }
    }
}

impl StepContext<'static> {
    /// Default configuration with the standard navigator
    pub fn standard() -> Self {
        Self::new(default_config(), Navigator::standard())
    }
}

impl Default for StepContext<'static> {
    fn default() -> Self {
        Self::standard()
    }
}

/// An ordered list of steps
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a step in place
    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Steps in order
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Parse the JSON form with default configuration
    pub fn from_json(definition: &serde_json::Value) -> Result<Self> {
        Self::from_json_with(definition, default_config())
    }

    /// Parse the JSON form; string-matching defaults come from `config`
    pub fn from_json_with(definition: &serde_json::Value, config: &EngineConfig) -> Result<Self> {
        let steps = match definition {
            serde_json::Value::Array(items) if !starts_with_name(items) => items
                .iter()
                .map(|item| step_from_json(item, config))
                .collect::<Result<Vec<_>>>()?,
            single => vec![step_from_json(single, config)?],
        };
        Ok(Self { steps })
    }

    /// Collapse into a single chained step
    pub fn into_step(self) -> Step {
        Step::chain(self.steps)
    }

    /// Run every step against one document; `None` means it was dropped
    pub fn run(&self, doc: &Document, ctx: &StepContext<'_>) -> Result<Option<Document>> {
        let mut current = doc.clone();
        for step in &self.steps {
            match step.run(&current, ctx)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

impl From<Pipeline> for Step {
    fn from(pipeline: Pipeline) -> Self {
        pipeline.into_step()
    }
}

impl FromIterator<Step> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

fn starts_with_name(items: &[serde_json::Value]) -> bool {
    items.first().is_some_and(serde_json::Value::is_string)
        && items.len() > 1
        && !items[1..].iter().all(is_step_form)
}

/// Whether a list item could itself be a step, so `["dump", "unflatten"]` is two steps
fn is_step_form(item: &serde_json::Value) -> bool {
    match item {
        serde_json::Value::String(name) => StepKind::from_name(name).is_some(),
        serde_json::Value::Array(inner) => inner.first().is_some_and(serde_json::Value::is_string),
        serde_json::Value::Object(map) => {
            map.len() == 1 && map.keys().all(|name| StepKind::from_name(name).is_some())
        }
        _ => false,
    }
}

fn step_from_json(item: &serde_json::Value, config: &EngineConfig) -> Result<Step> {
    match item {
        serde_json::Value::String(text) => match StepKind::from_name(text) {
            Some(kind) => Step::resolve(kind, StepArgs::new(), config),
            None => Step::expr(text).map_err(|e| {
                DocumentError::InvalidStep(format!(
                    "'{}' is neither a step name nor a query: {}",
                    text, e
                ))
            }),
        },
        serde_json::Value::Array(items) => match items.split_first() {
            Some((serde_json::Value::String(name), rest)) => {
                let args = StepArgs::from_json(&serde_json::Value::Array(rest.to_vec()));
                Step::named_with(name, args, config)
            }
            _ => Ok(Pipeline::from_json_with(item, config)?.into_step()),
        },
        serde_json::Value::Object(map) if map.len() == 1 => {
            let (name, args) = map
                .iter()
                .next()
                .ok_or_else(|| DocumentError::InvalidStep("empty step object".to_string()))?;
            Step::named_with(name, StepArgs::from_json(args), config)
        }
        other => Err(DocumentError::InvalidStep(format!(
            "cannot build a step from {}",
            other
        ))),
    }
}
