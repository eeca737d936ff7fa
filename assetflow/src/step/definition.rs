//! The step definition and its builder.

use super::{CachePolicy, Condition, JsonCodec, KeyContext, NoOpTask, Task, ValueCodec};
use crate::context::RunInfo;
use crate::core::{Bindings, ResourceRequest};
use crate::utils::{canonical_json, generate_uuid, short_digest};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Hashes a step's resolved inputs.
///
/// Inputs are rendered as canonical JSON first, so key order and map
/// representation never change the result.
#[must_use]
pub fn input_fingerprint(inputs: &Bindings) -> String {
    let object = Value::Object(inputs.clone().into_iter().collect());
    short_digest(canonical_json(&object).as_bytes())
}

/// A unit of work in a pipeline.
#[derive(Clone)]
pub struct Step {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    cache_policy: CachePolicy,
    retry: u32,
    condition: Option<Condition>,
    resources: ResourceRequest,
    group: Option<String>,
    timeout: Option<Duration>,
    code_version: String,
    codec: Arc<dyn ValueCodec>,
    task: Arc<dyn Task>,
    fingerprint: String,
}

impl Step {
    /// Starts building a step around a task.
    #[must_use]
    pub fn builder(name: impl Into<String>, task: Arc<dyn Task>) -> StepBuilder {
        StepBuilder::new(name, task)
    }

    /// Starts building a step that does nothing.
    #[must_use]
    pub fn noop(name: impl Into<String>) -> StepBuilder {
        StepBuilder::new(name, Arc::new(NoOpTask))
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared input asset names.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Returns the declared output asset names, in binding order.
    #[must_use]
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Returns the cache policy.
    #[must_use]
    pub fn cache_policy(&self) -> &CachePolicy {
        &self.cache_policy
    }

    /// Returns the number of retries after the first attempt.
    #[must_use]
    pub fn retry(&self) -> u32 {
        self.retry
    }

    /// Returns the run condition, if any.
    #[must_use]
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Returns the resource request.
    #[must_use]
    pub fn resources(&self) -> &ResourceRequest {
        &self.resources
    }

    /// Returns the execution-group label, if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Returns the declared timeout.
    ///
    /// Carried as configuration only; the executor does not enforce it.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the codec used for cached outputs.
    #[must_use]
    pub fn codec(&self) -> &dyn ValueCodec {
        self.codec.as_ref()
    }

    /// Returns the task.
    #[must_use]
    pub fn task(&self) -> &Arc<dyn Task> {
        &self.task
    }

    /// Returns the code fingerprint.
    ///
    /// Derived from the step's definition (name, inputs, outputs, cache policy
    /// kind, codec tag and code version). Stable while the definition is
    /// unchanged; bump the code version whenever the task logic changes.
    #[must_use]
    pub fn code_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Computes the cache key for a set of resolved inputs.
    ///
    /// A disabled policy yields a fresh random key that can never match a
    /// stored entry.
    #[must_use]
    pub fn cache_key(&self, inputs: &Bindings, run: &RunInfo) -> String {
        match &self.cache_policy {
            CachePolicy::Disabled => format!("{}:uncached:{}", self.name, generate_uuid()),
            CachePolicy::CodeFingerprint => format!("{}:{}", self.name, self.fingerprint),
            CachePolicy::InputFingerprint => format!(
                "{}:{}:{}",
                self.name,
                self.fingerprint,
                input_fingerprint(inputs)
            ),
            CachePolicy::Custom(func) => func(
                inputs,
                &KeyContext {
                    step_name: &self.name,
                    code_fingerprint: &self.fingerprint,
                    run,
                },
            ),
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("cache_policy", &self.cache_policy)
            .field("retry", &self.retry)
            .field("group", &self.group)
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Step`].
#[derive(Debug)]
pub struct StepBuilder {
    step: Step,
}

impl StepBuilder {
    /// Creates a builder for a step with no inputs or outputs.
    #[must_use]
    pub fn new(name: impl Into<String>, task: Arc<dyn Task>) -> Self {
        Self {
            step: Step {
                name: name.into(),
                inputs: Vec::new(),
                outputs: Vec::new(),
                cache_policy: CachePolicy::Disabled,
                retry: 0,
                condition: None,
                resources: ResourceRequest::default(),
                group: None,
                timeout: None,
                code_version: String::new(),
                codec: Arc::new(JsonCodec),
                task,
                fingerprint: String::new(),
            },
        }
    }

    /// Adds a consumed asset.
    #[must_use]
    pub fn input(mut self, asset: impl Into<String>) -> Self {
        self.step.inputs.push(asset.into());
        self
    }

    /// Adds several consumed assets.
    #[must_use]
    pub fn inputs(mut self, assets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.step.inputs.extend(assets.into_iter().map(Into::into));
        self
    }

    /// Adds a produced asset.
    #[must_use]
    pub fn output(mut self, asset: impl Into<String>) -> Self {
        self.step.outputs.push(asset.into());
        self
    }

    /// Adds several produced assets, in binding order.
    #[must_use]
    pub fn outputs(mut self, assets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.step.outputs.extend(assets.into_iter().map(Into::into));
        self
    }

    /// Sets the cache policy.
    #[must_use]
    pub fn cache(mut self, policy: CachePolicy) -> Self {
        self.step.cache_policy = policy;
        self
    }

    /// Sets the number of retries after the first attempt.
    #[must_use]
    pub fn retry(mut self, retries: u32) -> Self {
        self.step.retry = retries;
        self
    }

    /// Sets the run condition.
    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.step.condition = Some(condition);
        self
    }

    /// Sets the resource request.
    #[must_use]
    pub fn resources(mut self, resources: ResourceRequest) -> Self {
        self.step.resources = resources;
        self
    }

    /// Sets the execution-group label.
    ///
    /// A blank label leaves the step ungrouped.
    #[must_use]
    pub fn group(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.step.group = (!label.trim().is_empty()).then_some(label);
        self
    }

    /// Sets the declared timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.step.timeout = Some(timeout);
        self
    }

    /// Sets the code version feeding the fingerprint.
    #[must_use]
    pub fn code_version(mut self, version: impl Into<String>) -> Self {
        self.step.code_version = version.into();
        self
    }

    /// Sets the codec used for cached outputs.
    #[must_use]
    pub fn codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.step.codec = codec;
        self
    }

    /// Finishes the step and computes its fingerprint.
    #[must_use]
    pub fn build(mut self) -> Step {
        let mut sorted_inputs = self.step.inputs.clone();
        sorted_inputs.sort();
        let definition = json!({
            "name": self.step.name,
            "inputs": sorted_inputs,
            "outputs": self.step.outputs,
            "cache_policy": self.step.cache_policy.kind(),
            "codec": self.step.codec.type_tag(),
            "code_version": self.step.code_version,
        });
        self.step.fingerprint = short_digest(canonical_json(&definition).as_bytes());
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run_info() -> RunInfo {
        RunInfo::new("run-1", "test")
    }

    fn trainer(version: &str, policy: CachePolicy) -> Step {
        Step::noop("train")
            .inputs(["features", "labels"])
            .output("model")
            .cache(policy)
            .code_version(version)
            .build()
    }

    #[test]
    fn test_builder_sets_fields() {
        let step = Step::noop("train")
            .input("features")
            .outputs(["model", "metrics"])
            .retry(3)
            .group("gpu")
            .timeout(Duration::from_secs(60))
            .resources(ResourceRequest::new().with_cpu("2"))
            .build();

        assert_eq!(step.name(), "train");
        assert_eq!(step.inputs(), ["features".to_string()]);
        assert_eq!(step.outputs(), ["model".to_string(), "metrics".to_string()]);
        assert_eq!(step.retry(), 3);
        assert_eq!(step.group(), Some("gpu"));
        assert_eq!(step.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(step.resources().cpu.as_deref(), Some("2"));
        assert_eq!(step.codec().type_tag(), JsonCodec::TAG);
    }

    #[test]
    fn test_blank_group_label_is_ungrouped() {
        assert_eq!(Step::noop("a").group("").build().group(), None);
        assert_eq!(Step::noop("b").group("  ").build().group(), None);
        assert_eq!(Step::noop("c").group("gpu").group("").build().group(), None);
    }

    #[test]
    fn test_code_fingerprint_is_stable() {
        let a = trainer("v1", CachePolicy::CodeFingerprint);
        let b = trainer("v1", CachePolicy::CodeFingerprint);
        assert_eq!(a.code_fingerprint(), b.code_fingerprint());
        assert_eq!(a.code_fingerprint().len(), 32);
    }

    #[test]
    fn test_code_fingerprint_changes_with_logic() {
        let a = trainer("v1", CachePolicy::CodeFingerprint);
        let b = trainer("v2", CachePolicy::CodeFingerprint);
        assert_ne!(a.code_fingerprint(), b.code_fingerprint());
    }

    #[test]
    fn test_code_fingerprint_ignores_input_declaration_order() {
        let a = Step::noop("s").inputs(["a", "b"]).build();
        let b = Step::noop("s").inputs(["b", "a"]).build();
        assert_eq!(a.code_fingerprint(), b.code_fingerprint());
    }

    #[test]
    fn test_code_key_ignores_inputs() {
        let step = trainer("v1", CachePolicy::CodeFingerprint);
        let mut inputs = Bindings::new();
        inputs.insert("features".into(), json!([1, 2]));
        let key1 = step.cache_key(&inputs, &run_info());
        inputs.insert("features".into(), json!([3]));
        let key2 = step.cache_key(&inputs, &run_info());

        assert_eq!(key1, key2);
        assert_eq!(key1, format!("train:{}", step.code_fingerprint()));
    }

    #[test]
    fn test_input_key_is_order_insensitive() {
        let step = trainer("v1", CachePolicy::InputFingerprint);

        let first: Bindings = serde_json::from_value(json!({
            "features": {"b": 2, "a": 1},
            "labels": [1, 0],
        }))
        .unwrap();
        let mut second = Bindings::new();
        second.insert("labels".into(), json!([1, 0]));
        second.insert("features".into(), json!({"a": 1, "b": 2}));

        let key1 = step.cache_key(&first, &run_info());
        let key2 = step.cache_key(&second, &run_info());
        assert_eq!(key1, key2);
        assert!(key1.starts_with(&format!("train:{}:", step.code_fingerprint())));
        assert_eq!(key1.split(':').count(), 3);
    }

    #[test]
    fn test_input_key_changes_with_values() {
        let step = trainer("v1", CachePolicy::InputFingerprint);
        let mut inputs = Bindings::new();
        inputs.insert("features".into(), json!({"a": 1}));
        let key1 = step.cache_key(&inputs, &run_info());
        inputs.insert("features".into(), json!({"a": 2}));
        let key2 = step.cache_key(&inputs, &run_info());
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_disabled_key_never_repeats() {
        let step = trainer("v1", CachePolicy::Disabled);
        let inputs = Bindings::new();
        assert_ne!(
            step.cache_key(&inputs, &run_info()),
            step.cache_key(&inputs, &run_info())
        );
    }

    #[test]
    fn test_custom_key_function() {
        let step = trainer(
            "v1",
            CachePolicy::custom(|inputs, ctx| {
                format!("{}:{}:{}", ctx.step_name, ctx.run.pipeline_name, inputs.len())
            }),
        );
        let mut inputs = Bindings::new();
        inputs.insert("features".into(), json!(1));
        assert_eq!(step.cache_key(&inputs, &run_info()), "train:test:1");
    }
}
