//! Folding sorted steps into execution units.

use crate::core::{AcceleratorTiers, ResourceRequest};
use crate::step::Step;
use std::collections::{BTreeSet, HashMap};

/// Consecutive steps sharing a group label, run as one unit.
#[derive(Debug, Clone)]
pub struct StepGroup {
    label: String,
    members: Vec<Step>,
    resources: ResourceRequest,
}

impl StepGroup {
    fn new(label: &str, first: Step) -> Self {
        Self {
            label: label.to_string(),
            resources: first.resources().clone(),
            members: vec![first],
        }
    }

    fn push(&mut self, step: Step, tiers: &AcceleratorTiers) {
        self.resources = self.resources.merge(step.resources(), tiers);
        self.members.push(step);
    }

    /// Returns the group label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the members in execution order.
    #[must_use]
    pub fn members(&self) -> &[Step] {
        &self.members
    }

    /// Returns the merged resource request covering every member.
    #[must_use]
    pub fn resources(&self) -> &ResourceRequest {
        &self.resources
    }

    /// Returns the assets the group needs from outside itself.
    #[must_use]
    pub fn external_inputs(&self) -> BTreeSet<String> {
        let mut produced = BTreeSet::new();
        let mut needed = BTreeSet::new();
        for member in &self.members {
            for input in member.inputs() {
                if !produced.contains(input) {
                    needed.insert(input.clone());
                }
            }
            produced.extend(member.outputs().iter().cloned());
        }
        needed
    }
}

/// The thing the executor runs: a lone step or a group.
#[derive(Debug, Clone)]
pub enum ExecutionUnit {
    /// An ungrouped step.
    Single(Step),
    /// A run of steps sharing a label.
    Group(StepGroup),
}

impl ExecutionUnit {
    /// Returns the step name, or the group label.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Single(step) => step.name(),
            Self::Group(group) => group.label(),
        }
    }

    /// Returns the steps of this unit in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        match self {
            Self::Single(step) => std::slice::from_ref(step),
            Self::Group(group) => group.members(),
        }
    }

    /// Returns true if this unit is a group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }

    /// Returns the resource request of the unit.
    #[must_use]
    pub fn resources(&self) -> &ResourceRequest {
        match self {
            Self::Single(step) => step.resources(),
            Self::Group(group) => group.resources(),
        }
    }
}

/// Folds a topological order into execution units.
///
/// Consecutive steps with the same label form one group. A labeled step
/// whose neighbours carry other labels forms a group of one; unlabeled steps
/// always stand alone. Names in `order` without a matching step are ignored.
#[must_use]
pub fn group_steps(order: &[String], steps: &[Step], tiers: &AcceleratorTiers) -> Vec<ExecutionUnit> {
    let by_name: HashMap<&str, &Step> = steps.iter().map(|s| (s.name(), s)).collect();
    let mut units: Vec<ExecutionUnit> = Vec::new();

    for name in order {
        let Some(&step) = by_name.get(name.as_str()) else {
            continue;
        };

        match step.group().filter(|label| !label.trim().is_empty()) {
            None => units.push(ExecutionUnit::Single(step.clone())),
            Some(label) => match units.last_mut() {
                Some(ExecutionUnit::Group(current)) if current.label() == label => {
                    current.push(step.clone(), tiers);
                }
                _ => units.push(ExecutionUnit::Group(StepGroup::new(label, step.clone()))),
            },
        }
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn step(name: &str, group: Option<&str>) -> Step {
        let builder = Step::noop(name);
        match group {
            Some(label) => builder.group(label).build(),
            None => builder.build(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn shape(units: &[ExecutionUnit]) -> Vec<(String, Vec<String>)> {
        units
            .iter()
            .map(|u| {
                (
                    u.name().to_string(),
                    u.steps().iter().map(|s| s.name().to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_consecutive_labels_merge() {
        let steps = vec![
            step("a", None),
            step("b", Some("gpu")),
            step("c", Some("gpu")),
            step("d", None),
        ];
        let units = group_steps(&names(&["a", "b", "c", "d"]), &steps, &AcceleratorTiers::default());

        assert_eq!(
            shape(&units),
            vec![
                ("a".to_string(), names(&["a"])),
                ("gpu".to_string(), names(&["b", "c"])),
                ("d".to_string(), names(&["d"])),
            ]
        );
        assert!(!units[0].is_group());
        assert!(units[1].is_group());
    }

    #[test]
    fn test_interrupted_label_starts_new_group() {
        let steps = vec![
            step("a", Some("gpu")),
            step("b", None),
            step("c", Some("gpu")),
            step("d", Some("cpu")),
            step("e", Some("gpu")),
        ];
        let units = group_steps(
            &names(&["a", "b", "c", "d", "e"]),
            &steps,
            &AcceleratorTiers::default(),
        );
        let labels: Vec<&str> = units.iter().map(ExecutionUnit::name).collect();
        assert_eq!(labels, vec!["gpu", "b", "gpu", "cpu", "gpu"]);
        assert!(units.iter().filter(|u| u.is_group()).all(|u| u.steps().len() == 1));
    }

    #[test]
    fn test_unlabeled_steps_never_merge() {
        let steps = vec![step("a", None), step("b", None)];
        let units = group_steps(&names(&["a", "b"]), &steps, &AcceleratorTiers::default());
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn test_blank_labels_stay_single() {
        let steps = vec![step("a", Some("")), step("b", Some("")), step("c", Some(" "))];
        let units = group_steps(&names(&["a", "b", "c"]), &steps, &AcceleratorTiers::default());

        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| !u.is_group()));
    }

    #[test]
    fn test_group_follows_sorted_order() {
        let steps = vec![step("late", Some("g")), step("early", Some("g"))];
        let units = group_steps(&names(&["early", "late"]), &steps, &AcceleratorTiers::default());
        assert_eq!(shape(&units), vec![("g".to_string(), names(&["early", "late"]))]);
    }

    #[test]
    fn test_group_resources_are_merged() {
        let steps = vec![
            Step::noop("a")
                .group("train")
                .resources(
                    ResourceRequest::new()
                        .with_cpu("2")
                        .with_memory("4Gi")
                        .with_accelerator("T4", 2),
                )
                .build(),
            Step::noop("b")
                .group("train")
                .resources(
                    ResourceRequest::new()
                        .with_cpu("4")
                        .with_memory("8Gi")
                        .with_accelerator("A100", 1),
                )
                .build(),
            Step::noop("c")
                .group("train")
                .resources(ResourceRequest::new().with_cpu("500m"))
                .build(),
        ];
        let units = group_steps(&names(&["a", "b", "c"]), &steps, &AcceleratorTiers::default());

        assert_eq!(
            units[0].resources(),
            &ResourceRequest::new()
                .with_cpu("4")
                .with_memory("8Gi")
                .with_accelerator("A100", 2)
        );
    }

    #[test]
    fn test_group_external_inputs() {
        let steps = vec![
            Step::noop("a").group("g").input("raw").output("clean").build(),
            Step::noop("b").group("g").inputs(["clean", "labels"]).output("model").build(),
        ];
        let units = group_steps(&names(&["a", "b"]), &steps, &AcceleratorTiers::default());
        let ExecutionUnit::Group(group) = &units[0] else {
            panic!("expected a group");
        };
        let expected: BTreeSet<String> = ["labels".to_string(), "raw".to_string()].into();
        assert_eq!(group.external_inputs(), expected);
    }

    #[test]
    fn test_unknown_names_are_ignored() {
        let steps = vec![step("a", None)];
        let units = group_steps(&names(&["ghost", "a"]), &steps, &AcceleratorTiers::default());
        assert_eq!(units.len(), 1);
    }
}
