//! Step output type with declared-arity binding.

use crate::errors::OutputShapeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Named values handed to a step, keyed by asset or parameter name.
///
/// Ordered so that canonical hashing and debug output are deterministic.
pub type Bindings = BTreeMap<String, Value>;

/// The value returned by a step's task.
///
/// The shape must match the step's declared outputs exactly: `Unit` for no
/// outputs, `Single` for one, and `Tuple` (positional) or `Named` (by key)
/// for several. Values are opaque to the engine and handed on verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", content = "value", rename_all = "snake_case")]
pub enum StepOutput {
    /// No value.
    Unit,
    /// A single value bound to the sole declared output.
    Single(Value),
    /// Values bound positionally to the declared outputs.
    Tuple(Vec<Value>),
    /// Values bound by name to the declared outputs.
    Named(BTreeMap<String, Value>),
}

impl StepOutput {
    /// Creates a single-value output.
    #[must_use]
    pub fn single(value: impl Into<Value>) -> Self {
        Self::Single(value.into())
    }

    /// Creates a positional output.
    #[must_use]
    pub fn tuple(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Tuple(values.into_iter().collect())
    }

    /// Creates a named output.
    #[must_use]
    pub fn named<K: Into<String>>(values: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Named(values.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the raw value as a single JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Unit => Value::Null,
            Self::Single(v) => v.clone(),
            Self::Tuple(values) => Value::Array(values.clone()),
            Self::Named(map) => Value::Object(map.clone().into_iter().collect()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Unit => "no value".to_string(),
            Self::Single(_) => "a single value".to_string(),
            Self::Tuple(values) => format!("a tuple of {} value(s)", values.len()),
            Self::Named(map) => format!(
                "named values [{}]",
                map.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        }
    }

    /// Binds this output to the step's declared output names.
    ///
    /// # Errors
    ///
    /// Returns an [`OutputShapeError`] if the shape does not match the
    /// declaration exactly.
    pub fn bind(&self, step: &str, declared: &[String]) -> Result<Bindings, OutputShapeError> {
        let mismatch = || OutputShapeError {
            step: step.to_string(),
            declared: declared.to_vec(),
            actual: self.describe(),
        };

        match (self, declared.len()) {
            (Self::Unit, 0) => Ok(Bindings::new()),
            (Self::Single(v), 1) => Ok(std::iter::once((declared[0].clone(), v.clone())).collect()),
            (Self::Tuple(values), n) if n > 1 && values.len() == n => Ok(declared
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect()),
            (Self::Named(map), n) if n > 1 && map.len() == n => declared
                .iter()
                .map(|name| {
                    map.get(name)
                        .map(|v| (name.clone(), v.clone()))
                        .ok_or_else(mismatch)
                })
                .collect(),
            _ => Err(mismatch()),
        }
    }
}
