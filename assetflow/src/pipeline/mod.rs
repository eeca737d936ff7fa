//! Pipeline building and execution.
//!
//! This module provides:
//! - The [`Pipeline`] container and its build step
//! - Execution plans (sorted, grouped steps)
//! - Run results and the persisted run record

mod definition;
mod result;

pub use definition::{ExecutionPlan, Pipeline};
pub use result::PipelineResult;
