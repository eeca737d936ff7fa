//! The executor.

use super::AssetMap;
use crate::context::{EngineContext, RunInfo};
use crate::core::{Bindings, ExecutionResult, StepOutput};
use crate::events::types;
use crate::graph::{ExecutionUnit, StepGroup};
use crate::observability::SpanTimer;
use crate::step::Step;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};

enum Resolved {
    Ready(Bindings),
    Withheld(String),
    Missing(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Runs steps and groups against an [`EngineContext`].
#[derive(Debug, Clone)]
pub struct Executor {
    ctx: Arc<EngineContext>,
}

impl Executor {
    /// Creates an executor.
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Returns the engine context.
    #[must_use]
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Runs one execution unit, returning one result per step attempted.
    pub async fn execute_unit(
        &self,
        unit: &ExecutionUnit,
        available: &AssetMap,
        run: &RunInfo,
    ) -> Vec<ExecutionResult> {
        match unit {
            ExecutionUnit::Single(step) => vec![self.execute_step(step, available, run).await],
            ExecutionUnit::Group(group) => self.execute_group(group, available, run).await,
        }
    }

    /// Runs a group's members in order.
    ///
    /// Members read from a running map seeded with `available` and extended
    /// by earlier members. After the first failed member, the remaining
    /// members are reported as skipped without running.
    pub async fn execute_group(
        &self,
        group: &StepGroup,
        available: &AssetMap,
        run: &RunInfo,
    ) -> Vec<ExecutionResult> {
        let span = info_span!("group", group = %group.label(), run_id = %run.run_id);
        async {
            debug!(members = group.members().len(), "Running group");
            let mut running = available.clone();
            let mut results = Vec::with_capacity(group.members().len());
            let mut members = group.members().iter();

            while let Some(member) = members.next() {
                let result = self
                    .execute_step(member, &running, run)
                    .await
                    .with_group(Some(group.label()));
                running.absorb(member, &result);
                let failed = result.is_failure();
                results.push(result);

                if failed {
                    for rest in members.by_ref() {
                        warn!(step = %rest.name(), failed_member = %member.name(), "Skipping group member");
                        self.emit(
                            types::GROUP_MEMBER_SKIPPED,
                            json!({
                                "run_id": run.run_id,
                                "group": group.label(),
                                "step": rest.name(),
                                "failed_member": member.name(),
                            }),
                        );
                        results.push(ExecutionResult::skipped_after_group_failure(
                            rest.name(),
                            group.label(),
                            member.name(),
                        ));
                    }
                    break;
                }
            }

            results
        }
        .instrument(span)
        .await
    }

    /// Runs one step: condition, cache lookup, then bounded retry.
    pub async fn execute_step(
        &self,
        step: &Step,
        available: &AssetMap,
        run: &RunInfo,
    ) -> ExecutionResult {
        let span = info_span!("step", step = %step.name(), run_id = %run.run_id);
        async {
            let timer = SpanTimer::start(step.name());
            self.emit(
                types::STEP_STARTED,
                json!({"run_id": run.run_id, "step": step.name()}),
            );
            let result = self.run_step(step, available, run).await;
            result.with_duration_ms(timer.finish())
        }
        .instrument(span)
        .await
    }

    async fn run_step(&self, step: &Step, available: &AssetMap, run: &RunInfo) -> ExecutionResult {
        let inputs = match Self::resolve_inputs(step, available) {
            Resolved::Ready(inputs) => inputs,
            Resolved::Withheld(asset) => {
                let reason = format!("input '{asset}' was not produced: its producer was skipped");
                return self.skip(step, run, reason);
            }
            Resolved::Missing(asset) => {
                let error = format!("missing input asset '{asset}'");
                return self.fail(step, run, error.clone(), vec![error], 0);
            }
        };

        if let Some(condition) = step.condition() {
            let bound: Bindings = condition
                .params()
                .iter()
                .filter_map(|name| {
                    inputs
                        .get(name)
                        .cloned()
                        .or_else(|| run.param(name, step.name()))
                        .map(|value| (name.clone(), value))
                })
                .collect();

            match condition.evaluate(&bound) {
                Ok(true) => {}
                Ok(false) => return self.skip(step, run, "condition returned false".to_string()),
                Err(e) => {
                    warn!(error = %e, "Condition failed, skipping step");
                    return self.skip(step, run, format!("condition raised: {e}"));
                }
            }
        }

        let cache = self
            .ctx
            .cache()
            .filter(|_| step.cache_policy().is_enabled());
        let cache_key = cache.and_then(|_| Self::compute_cache_key(step, &inputs, run));

        if let (Some(cache), Some(key)) = (cache, &cache_key) {
            if let Some((output, assets)) =
                cache.get_bound(key, step.codec(), step.name(), step.outputs())
            {
                info!(cache_key = %key, "Cache hit");
                self.emit(
                    types::STEP_CACHE_HIT,
                    json!({"run_id": run.run_id, "step": step.name(), "cache_key": key}),
                );
                return ExecutionResult::from_cache(step.name(), &output, assets);
            }
        }

        let mut trace = Vec::new();
        let max_attempt = step.retry();
        let mut attempt = 0;
        loop {
            let outcome = AssertUnwindSafe(step.task().run(&inputs))
                .catch_unwind()
                .await;

            let error = match outcome {
                Ok(Ok(output)) => match output.bind(step.name(), step.outputs()) {
                    Ok(assets) => {
                        let key = cache_key.as_deref();
                        return self.succeed(step, run, &output, assets, attempt, key);
                    }
                    Err(shape) => {
                        let error = shape.to_string();
                        trace.push(format!("attempt {}: {error}", attempt + 1));
                        return self.fail(step, run, error, trace, attempt);
                    }
                },
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("task panicked: {}", panic_message(payload.as_ref())),
            };

            trace.push(format!("attempt {}: {error}", attempt + 1));
            if attempt >= max_attempt {
                return self.fail(step, run, error, trace, attempt);
            }

            let delay = self.ctx.retry().delay_for_attempt(attempt);
            warn!(
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Step attempt failed, retrying"
            );
            self.emit(
                types::STEP_RETRYING,
                json!({
                    "run_id": run.run_id,
                    "step": step.name(),
                    "attempt": attempt + 1,
                    "delay_ms": u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "error": error,
                }),
            );
            self.ctx.sleeper().sleep(delay).await;
            attempt += 1;
        }
    }

    /// Returns `None` when a custom key function panics; the step then runs uncached.
    fn compute_cache_key(step: &Step, inputs: &Bindings, run: &RunInfo) -> Option<String> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| step.cache_key(inputs, run))) {
            Ok(key) => Some(key),
            Err(payload) => {
                warn!(
                    error = %panic_message(payload.as_ref()),
                    "Cache key function panicked, running uncached"
                );
                None
            }
        }
    }

    fn resolve_inputs(step: &Step, available: &AssetMap) -> Resolved {
        let mut inputs = Bindings::new();
        for name in step.inputs() {
            match available.get(name) {
                Some(value) => {
                    inputs.insert(name.clone(), value.clone());
                }
                None if available.is_withheld(name) => return Resolved::Withheld(name.clone()),
                None => return Resolved::Missing(name.clone()),
            }
        }
        Resolved::Ready(inputs)
    }

    fn succeed(
        &self,
        step: &Step,
        run: &RunInfo,
        output: &StepOutput,
        assets: Bindings,
        attempt: u32,
        cache_key: Option<&str>,
    ) -> ExecutionResult {
        if let (Some(cache), Some(key)) = (self.ctx.cache(), cache_key) {
            let stored = cache.set(key, output, step.codec(), step.name(), step.code_fingerprint());
            if let Err(e) = stored {
                warn!(cache_key = %key, error = %e, "Failed to cache step output");
            }
        }

        let mut result = ExecutionResult::succeeded(step.name(), output, assets, attempt);

        if let Some(materializer) = self.ctx.materializer() {
            for (name, value) in &result.assets {
                match materializer.materialize(value, name, &run.run_id, step.name()) {
                    Ok(uri) => {
                        result.artifact_uris.insert(name.clone(), uri);
                    }
                    Err(e) => warn!(asset = %name, error = %e, "Failed to materialize asset"),
                }
            }
        }

        info!(retries = attempt, "Step completed");
        self.emit(
            types::STEP_COMPLETED,
            json!({"run_id": run.run_id, "step": step.name(), "retries": attempt}),
        );
        result
    }

    fn fail(
        &self,
        step: &Step,
        run: &RunInfo,
        error: String,
        trace: Vec<String>,
        attempt: u32,
    ) -> ExecutionResult {
        warn!(error = %error, retries = attempt, "Step failed");
        self.emit(
            types::STEP_FAILED,
            json!({"run_id": run.run_id, "step": step.name(), "error": error, "retries": attempt}),
        );
        ExecutionResult::failed(step.name(), error, trace, attempt)
    }

    fn skip(&self, step: &Step, run: &RunInfo, reason: String) -> ExecutionResult {
        info!(reason = %reason, "Step skipped");
        self.emit(
            types::STEP_SKIPPED,
            json!({"run_id": run.run_id, "step": step.name(), "reason": reason}),
        );
        ExecutionResult::skipped(step.name(), reason)
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        self.ctx.event_sink().try_emit(event_type, Some(data));
    }
}
