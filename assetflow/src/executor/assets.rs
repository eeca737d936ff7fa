//! The running map of produced assets.

use crate::core::{Bindings, ExecutionResult};
use crate::step::Step;
use serde_json::Value;
use std::collections::BTreeSet;

/// Assets available to the next unit of a run.
///
/// Also remembers which assets will never appear because their producer
/// was skipped, so consumers can be skipped in turn instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetMap {
    assets: Bindings,
    withheld: BTreeSet<String>,
}

impl AssetMap {
    /// Creates a map seeded with external inputs.
    #[must_use]
    pub fn new(seed: Bindings) -> Self {
        Self {
            assets: seed,
            withheld: BTreeSet::new(),
        }
    }

    /// Returns an asset.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.assets.get(name)
    }

    /// Returns true if the asset's producer was skipped in this run.
    #[must_use]
    pub fn is_withheld(&self, name: &str) -> bool {
        self.withheld.contains(name)
    }

    /// Returns every available asset.
    #[must_use]
    pub fn assets(&self) -> &Bindings {
        &self.assets
    }

    /// Consumes the map, returning the available assets.
    #[must_use]
    pub fn into_assets(self) -> Bindings {
        self.assets
    }

    /// Folds a step's result into the map.
    pub fn absorb(&mut self, step: &Step, result: &ExecutionResult) {
        if result.skipped {
            self.withheld.extend(step.outputs().iter().cloned());
        } else if result.success {
            for (name, value) in &result.assets {
                self.withheld.remove(name);
                self.assets.insert(name.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StepOutput;
    use serde_json::json;

    #[test]
    fn test_absorb_success_and_skip() {
        let mut seed = Bindings::new();
        seed.insert("raw".into(), json!(1));
        let mut map = AssetMap::new(seed);

        let producer = Step::noop("a").output("x").build();
        let mut assets = Bindings::new();
        assets.insert("x".into(), json!(5));
        map.absorb(
            &producer,
            &ExecutionResult::succeeded("a", &StepOutput::single(5), assets, 0),
        );
        assert_eq!(map.get("x"), Some(&json!(5)));
        assert_eq!(map.get("raw"), Some(&json!(1)));

        let skipped = Step::noop("b").output("y").build();
        map.absorb(&skipped, &ExecutionResult::skipped("b", "condition returned false"));
        assert!(map.is_withheld("y"));
        assert_eq!(map.get("y"), None);

        let failed = Step::noop("c").output("z").build();
        map.absorb(&failed, &ExecutionResult::failed("c", "boom", Vec::new(), 0));
        assert!(!map.is_withheld("z"));
        assert_eq!(map.into_assets().len(), 2);
    }
}
