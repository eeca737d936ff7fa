//! Run conditions.

use crate::core::Bindings;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&Bindings) -> anyhow::Result<bool> + Send + Sync>;

/// A predicate deciding whether a step runs.
///
/// The condition declares the parameter names it reads. They are checked
/// against the step's inputs and the run parameters when the pipeline is
/// built, and at run time the predicate receives exactly those names.
#[derive(Clone)]
pub struct Condition {
    params: Vec<String>,
    predicate: Predicate,
}

impl Condition {
    /// Creates a condition reading `params`.
    pub fn new<F>(params: impl IntoIterator<Item = impl Into<String>>, predicate: F) -> Self
    where
        F: Fn(&Bindings) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            predicate: Arc::new(predicate),
        }
    }

    /// Creates a condition that reads nothing.
    pub fn always<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self::new(Vec::<String>::new(), move |_| Ok(predicate()))
    }

    /// Returns the declared parameter names.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Evaluates the predicate.
    ///
    /// A returned error or a panic inside the predicate is reported as `Err`
    /// with a description; callers treat both as a skip.
    pub fn evaluate(&self, bound: &Bindings) -> Result<bool, String> {
        match catch_unwind(AssertUnwindSafe(|| (self.predicate)(bound))) {
            Ok(Ok(run)) => Ok(run),
            Ok(Err(e)) => Err(format!("{e:#}")),
            Err(_) => Err("condition panicked".to_string()),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
