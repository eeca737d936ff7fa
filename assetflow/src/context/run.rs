//! Per-run identity.

use crate::core::Bindings;
use crate::utils::generate_run_id;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter names the engine binds for every step, in addition to its inputs.
pub const CONTEXT_PARAMS: [&str; 3] = ["run_id", "pipeline_name", "step_name"];

/// Identity of one pipeline run, plus the named parameters it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Unique ID of the run.
    pub run_id: String,
    /// Name of the running pipeline.
    pub pipeline_name: String,
    /// Parameters registered on the engine context.
    #[serde(default)]
    pub params: Bindings,
}

impl RunInfo {
    /// Creates run info with an explicit ID.
    #[must_use]
    pub fn new(run_id: impl Into<String>, pipeline_name: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            pipeline_name: pipeline_name.into(),
            params: Bindings::new(),
        }
    }

    /// Creates run info with a fresh, time-ordered run ID.
    #[must_use]
    pub fn generate(pipeline_name: impl Into<String>) -> Self {
        Self::new(generate_run_id(), pipeline_name)
    }

    /// Sets the run parameters.
    #[must_use]
    pub fn with_params(mut self, params: Bindings) -> Self {
        self.params = params;
        self
    }

    /// Resolves a parameter visible to `step_name`.
    ///
    /// Built-in names win over registered parameters.
    #[must_use]
    pub fn param(&self, name: &str, step_name: &str) -> Option<Value> {
        match name {
            "run_id" => Some(Value::String(self.run_id.clone())),
            "pipeline_name" => Some(Value::String(self.pipeline_name.clone())),
            "step_name" => Some(Value::String(step_name.to_string())),
            other => self.params.get(other).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = RunInfo::generate("etl");
        let b = RunInfo::generate("etl");
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.pipeline_name, "etl");
    }

    #[test]
    fn test_param_resolution() {
        let mut params = Bindings::new();
        params.insert("threshold".into(), json!(0.5));
        params.insert("run_id".into(), json!("shadowed"));
        let run = RunInfo::new("r-1", "etl").with_params(params);

        assert_eq!(run.param("run_id", "a"), Some(json!("r-1")));
        assert_eq!(run.param("pipeline_name", "a"), Some(json!("etl")));
        assert_eq!(run.param("step_name", "train"), Some(json!("train")));
        assert_eq!(run.param("threshold", "a"), Some(json!(0.5)));
        assert_eq!(run.param("missing", "a"), None);
    }
}
