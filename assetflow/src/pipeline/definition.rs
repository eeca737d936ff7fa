//! Pipeline definition, build and run.

use super::PipelineResult;
use crate::context::{EngineContext, RunInfo};
use crate::core::Bindings;
use crate::errors::{GraphValidationError, PipelineBuildError};
use crate::events::types;
use crate::executor::{AssetMap, Executor};
use crate::graph::{group_steps, ExecutionUnit, Graph};
use crate::step::Step;
use crate::utils::now_utc;
use parking_lot::RwLock;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// A validated, sorted and grouped pipeline.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    order: Vec<String>,
    units: Vec<ExecutionUnit>,
}

impl ExecutionPlan {
    /// Returns step names in topological order.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Returns the execution units in run order.
    #[must_use]
    pub fn units(&self) -> &[ExecutionUnit] {
        &self.units
    }
}

/// A named set of steps connected through their assets.
///
/// Steps run one unit at a time in dependency order. The plan is computed
/// on first use and recomputed after any change to the step list.
#[derive(Debug)]
pub struct Pipeline {
    name: String,
    steps: Vec<Step>,
    externals: BTreeSet<String>,
    ctx: Arc<EngineContext>,
    plan: RwLock<Option<Arc<ExecutionPlan>>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(name: impl Into<String>, ctx: EngineContext) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            externals: BTreeSet::new(),
            ctx: Arc::new(ctx),
            plan: RwLock::new(None),
        }
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the steps in registration order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Returns the declared external inputs.
    #[must_use]
    pub fn external_inputs(&self) -> &BTreeSet<String> {
        &self.externals
    }

    /// Returns the engine context.
    #[must_use]
    pub fn context(&self) -> &Arc<EngineContext> {
        &self.ctx
    }

    /// Appends a step.
    pub fn add(&mut self, step: Step) {
        self.steps.push(step);
        *self.plan.get_mut() = None;
    }

    /// Appends a step, builder style.
    #[must_use]
    pub fn with_step(mut self, step: Step) -> Self {
        self.add(step);
        self
    }

    /// Declares an asset supplied by the caller of [`run`](Self::run).
    pub fn external_input(&mut self, asset: impl Into<String>) {
        self.externals.insert(asset.into());
        *self.plan.get_mut() = None;
    }

    /// Declares an external input, builder style.
    #[must_use]
    pub fn with_external_input(mut self, asset: impl Into<String>) -> Self {
        self.external_input(asset);
        self
    }

    /// Lists every problem that would stop the pipeline from building.
    #[must_use]
    pub fn validate(&self) -> Vec<GraphValidationError> {
        self.validate_graph(&Graph::from_steps(&self.steps))
    }

    fn validate_graph(&self, graph: &Graph) -> Vec<GraphValidationError> {
        let mut errors = graph.validate(&self.externals);

        for step in &self.steps {
            let Some(condition) = step.condition() else {
                continue;
            };
            for param in condition.params() {
                if !step.inputs().contains(param) && !self.ctx.provides_param(param) {
                    errors.push(GraphValidationError::UnboundParameter {
                        step: step.name().to_string(),
                        parameter: param.clone(),
                    });
                }
            }
        }

        errors
    }

    /// Validates, sorts and groups the steps.
    ///
    /// Returns the cached plan while the step list is unchanged.
    pub fn build(&self) -> Result<Arc<ExecutionPlan>, PipelineBuildError> {
        if let Some(plan) = self.plan.read().as_ref() {
            return Ok(plan.clone());
        }

        let graph = Graph::from_steps(&self.steps);
        let errors = self.validate_graph(&graph);
        if !errors.is_empty() {
            return Err(PipelineBuildError::new(&self.name, errors));
        }

        let order = graph
            .topological_sort()
            .map_err(|cycle| PipelineBuildError::new(&self.name, vec![cycle.into()]))?;
        let units = group_steps(&order, &self.steps, self.ctx.accelerator_tiers());
        let plan = Arc::new(ExecutionPlan { order, units });

        *self.plan.write() = Some(plan.clone());
        Ok(plan)
    }

    /// Returns step names in topological order.
    pub fn execution_order(&self) -> Result<Vec<String>, PipelineBuildError> {
        Ok(self.build()?.order().to_vec())
    }

    /// Returns the execution units in run order.
    pub fn execution_units(&self) -> Result<Vec<ExecutionUnit>, PipelineBuildError> {
        Ok(self.build()?.units().to_vec())
    }

    /// Runs every unit in order, stopping at the first failed unit.
    ///
    /// Step failures are reported in the returned [`PipelineResult`]; only a
    /// pipeline that fails to build returns `Err`.
    pub async fn run(&self, inputs: Bindings) -> Result<PipelineResult, PipelineBuildError> {
        let plan = self
            .build()
            .inspect_err(|e| error!(pipeline = %self.name, error = %e, "Pipeline failed to build"))?;
        let run = RunInfo::generate(&self.name).with_params(self.ctx.params().clone());
        let span = info_span!("pipeline", pipeline = %self.name, run_id = %run.run_id);

        let result = self.run_plan(&plan, &run, inputs).instrument(span).await;

        if let Some(sink) = self.ctx.metadata_sink() {
            if let Err(e) = sink.save_run(&result.run_id, &result.to_dict()) {
                warn!(run_id = %result.run_id, error = %e, "Failed to save run metadata");
            }
        }

        Ok(result)
    }

    async fn run_plan(&self, plan: &ExecutionPlan, run: &RunInfo, inputs: Bindings) -> PipelineResult {
        let start_time = now_utc();
        info!(units = plan.units().len(), "Pipeline started");
        self.emit(
            types::PIPELINE_STARTED,
            json!({"run_id": run.run_id, "pipeline": self.name}),
        );

        let executor = Executor::new(self.ctx.clone());
        let mut available = AssetMap::new(inputs);
        let mut steps = Vec::new();
        let mut outputs = Bindings::new();
        let mut step_outputs = Bindings::new();
        let mut success = true;

        for unit in plan.units() {
            let results = executor.execute_unit(unit, &available, run).await;
            let failed = results.iter().any(|r| r.is_failure());

            for (step, result) in unit.steps().iter().zip(&results) {
                available.absorb(step, result);
                if result.success && !result.skipped {
                    outputs.extend(result.assets.clone());
                    if let Some(raw) = &result.output {
                        step_outputs.insert(step.name().to_string(), raw.clone());
                    }
                }
            }
            steps.extend(results);

            if failed {
                success = false;
                break;
            }
        }

        let result = PipelineResult {
            run_id: run.run_id.clone(),
            pipeline_name: self.name.clone(),
            success,
            start_time,
            end_time: now_utc(),
            steps,
            outputs,
            step_outputs,
        };

        if success {
            info!(duration_seconds = result.duration_seconds(), "Pipeline completed");
            self.emit(
                types::PIPELINE_COMPLETED,
                json!({"run_id": run.run_id, "pipeline": self.name}),
            );
        } else {
            let failed = result.failed_step().map(|s| s.step_name.clone());
            warn!(failed_step = ?failed, "Pipeline failed");
            self.emit(
                types::PIPELINE_FAILED,
                json!({"run_id": run.run_id, "pipeline": self.name, "failed_step": failed}),
            );
        }

        result
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        self.ctx.event_sink().try_emit(event_type, Some(data));
    }
}
