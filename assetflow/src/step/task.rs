//! Task trait and implementations.
//!
//! Tasks are the bodies of steps: given their resolved inputs they return a
//! [`StepOutput`] shaped like the step's declared outputs.

use crate::core::{Bindings, StepOutput};
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;

/// Trait for step bodies.
#[async_trait]
pub trait Task: Send + Sync + Debug {
    /// Runs the task.
    ///
    /// # Arguments
    ///
    /// * `inputs` - The step's declared inputs, resolved by asset name
    async fn run(&self, inputs: &Bindings) -> anyhow::Result<StepOutput>;
}

/// A synchronous closure-based task.
pub struct FnTask<F>
where
    F: Fn(&Bindings) -> anyhow::Result<StepOutput> + Send + Sync,
{
    func: F,
}

impl<F> FnTask<F>
where
    F: Fn(&Bindings) -> anyhow::Result<StepOutput> + Send + Sync,
{
    /// Creates a new closure-based task.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnTask<F>
where
    F: Fn(&Bindings) -> anyhow::Result<StepOutput> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTask").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Task for FnTask<F>
where
    F: Fn(&Bindings) -> anyhow::Result<StepOutput> + Send + Sync,
{
    async fn run(&self, inputs: &Bindings) -> anyhow::Result<StepOutput> {
        (self.func)(inputs)
    }
}

/// An async closure-based task.
///
/// The closure receives an owned copy of the inputs so the returned future
/// can be `'static`.
pub struct AsyncFnTask<F, Fut>
where
    F: Fn(Bindings) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send,
{
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnTask<F, Fut>
where
    F: Fn(Bindings) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send,
{
    /// Creates a new async closure-based task.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for AsyncFnTask<F, Fut>
where
    F: Fn(Bindings) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnTask").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Task for AsyncFnTask<F, Fut>
where
    F: Fn(Bindings) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<StepOutput>> + Send,
{
    async fn run(&self, inputs: &Bindings) -> anyhow::Result<StepOutput> {
        (self.func)(inputs.clone()).await
    }
}

/// A task that does nothing and returns no value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpTask;

#[async_trait]
impl Task for NoOpTask {
    async fn run(&self, _inputs: &Bindings) -> anyhow::Result<StepOutput> {
        Ok(StepOutput::Unit)
    }
}
