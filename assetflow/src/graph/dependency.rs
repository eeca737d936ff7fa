//! The asset dependency graph.

use crate::errors::{CycleDetectedError, GraphValidationError};
use crate::step::Step;
use std::collections::{BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone)]
struct Node {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    dependencies: Vec<usize>,
    dependents: Vec<usize>,
}

/// Steps as nodes, asset production as edges.
///
/// Nodes keep their insertion order, which is also the tie-break of
/// [`topological_sort`](Self::topological_sort).
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    producers: HashMap<String, usize>,
    issues: Vec<GraphValidationError>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph from steps and builds its edges.
    ///
    /// Registration problems are kept for [`validate`](Self::validate).
    #[must_use]
    pub fn from_steps<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Self {
        let mut graph = Self::new();
        for step in steps {
            // recorded in `issues`
            let _ = graph.add(step);
        }
        graph.build_edges();
        graph
    }

    /// Registers a step.
    ///
    /// A step whose name is already taken is rejected. A step declaring an
    /// output some earlier step already produces is registered, but the
    /// earlier step stays the asset's producer. Both problems are also kept
    /// for [`validate`](Self::validate).
    pub fn add(&mut self, step: &Step) -> Result<(), GraphValidationError> {
        if self.index.contains_key(step.name()) {
            let err = GraphValidationError::DuplicateStep {
                name: step.name().to_string(),
            };
            self.issues.push(err.clone());
            return Err(err);
        }

        let id = self.nodes.len();
        self.index.insert(step.name().to_string(), id);
        self.nodes.push(Node {
            name: step.name().to_string(),
            inputs: step.inputs().to_vec(),
            outputs: step.outputs().to_vec(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
        });

        let mut first_error = None;
        for asset in step.outputs() {
            if let Some(&owner) = self.producers.get(asset) {
                let err = GraphValidationError::DuplicateProducer {
                    asset: asset.clone(),
                    first: self.nodes[owner].name.clone(),
                    second: step.name().to_string(),
                };
                self.issues.push(err.clone());
                first_error.get_or_insert(err);
            } else {
                self.producers.insert(asset.clone(), id);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Connects every node to the producers of its inputs.
    ///
    /// Inputs without a producer create no edge.
    pub fn build_edges(&mut self) {
        for node in &mut self.nodes {
            node.dependencies.clear();
            node.dependents.clear();
        }

        for id in 0..self.nodes.len() {
            let mut deps: Vec<usize> = Vec::new();
            for asset in &self.nodes[id].inputs {
                if let Some(&producer) = self.producers.get(asset) {
                    if !deps.contains(&producer) {
                        deps.push(producer);
                    }
                }
            }
            for &producer in &deps {
                self.nodes[producer].dependents.push(id);
            }
            self.nodes[id].dependencies = deps;
        }
    }

    /// Orders nodes so that every dependency precedes its dependents.
    ///
    /// Uses the edges from the last [`build_edges`](Self::build_edges).
    /// Nodes are emitted in the order they become ready; nodes ready at the
    /// same time keep their insertion order.
    pub fn topological_sort(&self) -> Result<Vec<String>, CycleDetectedError> {
        let mut in_degree: Vec<usize> = self.nodes.iter().map(|n| n.dependencies.len()).collect();
        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&id| in_degree[id] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            for &dependent in &self.nodes[id].dependents {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = (0..self.nodes.len())
                .filter(|&id| in_degree[id] > 0)
                .map(|id| self.nodes[id].name.clone())
                .collect();
            return Err(CycleDetectedError::new(stuck));
        }

        Ok(order.into_iter().map(|id| self.nodes[id].name.clone()).collect())
    }

    /// Lists every problem with the graph.
    ///
    /// `externals` are assets supplied by the caller at run time; consuming
    /// them is not an undefined input.
    #[must_use]
    pub fn validate(&self, externals: &BTreeSet<String>) -> Vec<GraphValidationError> {
        let mut errors = self.issues.clone();

        for node in &self.nodes {
            for asset in &node.inputs {
                if !self.producers.contains_key(asset) && !externals.contains(asset) {
                    errors.push(GraphValidationError::UndefinedInput {
                        step: node.name.clone(),
                        asset: asset.clone(),
                    });
                }
            }
        }

        if let Err(cycle) = self.topological_sort() {
            errors.push(cycle.into());
        }

        errors
    }

    /// Returns the step producing `asset`.
    #[must_use]
    pub fn producer_of(&self, asset: &str) -> Option<&str> {
        self.producers
            .get(asset)
            .map(|&id| self.nodes[id].name.as_str())
    }

    /// Returns the steps `name` directly depends on, in input order.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<&str> {
        self.index.get(name).map_or_else(Vec::new, |&id| {
            self.nodes[id]
                .dependencies
                .iter()
                .map(|&dep| self.nodes[dep].name.as_str())
                .collect()
        })
    }

    /// Returns the outputs declared by `name`.
    #[must_use]
    pub fn outputs_of(&self, name: &str) -> Option<&[String]> {
        self.index
            .get(name)
            .map(|&id| self.nodes[id].outputs.as_slice())
    }

    /// Returns true if a step with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the node names in insertion order.
    #[must_use]
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
