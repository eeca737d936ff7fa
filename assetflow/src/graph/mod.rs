//! Dependency resolution and execution-unit planning.
//!
//! Steps are connected through asset names: a step depending on an asset
//! depends on the single step producing it. The resulting graph is sorted
//! with Kahn's algorithm and the sorted steps are then folded into
//! execution units.

mod dependency;
mod grouping;

pub use dependency::Graph;
pub use grouping::{group_steps, ExecutionUnit, StepGroup};
