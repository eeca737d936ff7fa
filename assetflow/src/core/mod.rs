//! Core domain model types for assetflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Step status enum
//! - Step output type with declared-arity binding
//! - Resource requests and their aggregation
//! - Per-step execution results

mod output;
mod resources;
mod result;
mod status;

pub use output::{Bindings, StepOutput};
pub use resources::{parse_cpu, parse_memory, AcceleratorTiers, ResourceRequest};
pub use result::ExecutionResult;
pub use status::StepStatus;
