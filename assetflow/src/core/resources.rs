//! Resource requests and their aggregation across co-scheduled steps.
//!
//! Aggregation is monotonic: a merged request never asks for less than any
//! of its members. CPU and memory keep the original string of the larger
//! operand (ties keep the first), so units survive the merge untouched.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

static CPU_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(m?)$").ok());

static MEMORY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*(Ki|Mi|Gi|Ti|K|M|G|T)?$").ok());

/// Parses a CPU quantity (`"2"`, `"1.5"`, `"500m"`) into cores.
#[must_use]
pub fn parse_cpu(raw: &str) -> Option<f64> {
    let caps = CPU_PATTERN.as_ref()?.captures(raw.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let millis = caps.get(2).is_some_and(|m| m.as_str() == "m");
    Some(if millis { value / 1000.0 } else { value })
}

/// Parses a memory quantity (`"4Gi"`, `"512Mi"`, `"2G"`, `"1024"`) into bytes.
#[must_use]
pub fn parse_memory(raw: &str) -> Option<f64> {
    let caps = MEMORY_PATTERN.as_ref()?.captures(raw.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier: f64 = match caps.get(2).map(|m| m.as_str()) {
        None => 1.0,
        Some("Ki") => 1024.0,
        Some("Mi") => 1024.0 * 1024.0,
        Some("Gi") => 1024.0 * 1024.0 * 1024.0,
        Some("Ti") => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        Some("K") => 1e3,
        Some("M") => 1e6,
        Some("G") => 1e9,
        Some("T") => 1e12,
        Some(_) => return None,
    };
    Some(value * multiplier)
}

/// Keeps the larger of two quantities by their parsed magnitude.
///
/// Unparseable values lose to parseable ones; when neither parses the first
/// operand wins.
fn max_quantity(
    first: Option<&String>,
    second: Option<&String>,
    parse: fn(&str) -> Option<f64>,
) -> Option<String> {
    match (first, second) {
        (None, None) => None,
        (Some(a), None) => Some(a.clone()),
        (None, Some(b)) => Some(b.clone()),
        (Some(a), Some(b)) => match (parse(a), parse(b)) {
            (Some(pa), Some(pb)) if pb > pa => Some(b.clone()),
            (None, Some(_)) => Some(b.clone()),
            _ => Some(a.clone()),
        },
    }
}

/// Capability ranking of accelerator type names.
///
/// Lookups are case-insensitive; unknown names rank lowest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorTiers {
    ranks: HashMap<String, u32>,
}

impl Default for AcceleratorTiers {
    fn default() -> Self {
        [
            ("K80", 1),
            ("P4", 2),
            ("T4", 3),
            ("P100", 4),
            ("V100", 5),
            ("A10G", 6),
            ("L4", 6),
            ("A100", 7),
            ("H100", 8),
        ]
        .into_iter()
        .fold(Self::empty(), |tiers, (name, rank)| tiers.with_tier(name, rank))
    }
}

impl AcceleratorTiers {
    /// Creates a table with no known accelerators.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ranks: HashMap::new(),
        }
    }

    /// Registers (or overrides) the rank of an accelerator type.
    #[must_use]
    pub fn with_tier(mut self, name: impl AsRef<str>, rank: u32) -> Self {
        self.ranks.insert(name.as_ref().to_uppercase(), rank);
        self
    }

    /// Returns the rank of an accelerator type.
    #[must_use]
    pub fn rank(&self, name: &str) -> u32 {
        self.ranks.get(&name.to_uppercase()).copied().unwrap_or(0)
    }

    /// Returns whichever name ranks higher, preferring `first` on ties.
    #[must_use]
    pub fn higher<'a>(&self, first: &'a str, second: &'a str) -> &'a str {
        if self.rank(second) > self.rank(first) {
            second
        } else {
            first
        }
    }
}

/// Compute resources requested by a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// CPU quantity, in cores or millicores (`"500m"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// Memory quantity with an optional binary or decimal suffix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    /// Accelerator type name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerator: Option<String>,
    /// Number of accelerators requested.
    #[serde(default)]
    pub accelerator_count: u32,
}

impl ResourceRequest {
    /// Creates an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the CPU quantity.
    #[must_use]
    pub fn with_cpu(mut self, cpu: impl Into<String>) -> Self {
        self.cpu = Some(cpu.into());
        self
    }

    /// Sets the memory quantity.
    #[must_use]
    pub fn with_memory(mut self, memory: impl Into<String>) -> Self {
        self.memory = Some(memory.into());
        self
    }

    /// Sets the accelerator type and count.
    #[must_use]
    pub fn with_accelerator(mut self, accelerator: impl Into<String>, count: u32) -> Self {
        self.accelerator = Some(accelerator.into());
        self.accelerator_count = count;
        self
    }

    /// Returns true if any accelerator is requested.
    #[must_use]
    pub fn has_accelerator(&self) -> bool {
        self.accelerator.is_some() || self.accelerator_count > 0
    }

    /// Returns true if nothing is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none() && !self.has_accelerator()
    }

    /// Merges two requests into one that satisfies both.
    #[must_use]
    pub fn merge(&self, other: &Self, tiers: &AcceleratorTiers) -> Self {
        let cpu = max_quantity(self.cpu.as_ref(), other.cpu.as_ref(), parse_cpu);
        let memory = max_quantity(self.memory.as_ref(), other.memory.as_ref(), parse_memory);

        let (accelerator, accelerator_count) = if !self.has_accelerator() {
            (other.accelerator.clone(), other.accelerator_count)
        } else if !other.has_accelerator() {
            (self.accelerator.clone(), self.accelerator_count)
        } else {
            let name = match (&self.accelerator, &other.accelerator) {
                (Some(a), Some(b)) => Some(tiers.higher(a, b).to_string()),
                (a, b) => a.clone().or_else(|| b.clone()),
            };
            (name, self.accelerator_count.max(other.accelerator_count))
        };

        Self {
            cpu,
            memory,
            accelerator,
            accelerator_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_cpu() {
        assert_eq!(parse_cpu("2"), Some(2.0));
        assert_eq!(parse_cpu("1.5"), Some(1.5));
        assert_eq!(parse_cpu("500m"), Some(0.5));
        assert_eq!(parse_cpu(" 250m "), Some(0.25));
        assert_eq!(parse_cpu("two"), None);
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(parse_memory("1Ki"), Some(1024.0));
        assert_eq!(parse_memory("4Gi"), Some(4.0 * 1024.0 * 1024.0 * 1024.0));
        assert_eq!(parse_memory("512Mi"), Some(512.0 * 1024.0 * 1024.0));
        assert_eq!(parse_memory("2G"), Some(2e9));
        assert_eq!(parse_memory("300M"), Some(3e8));
        assert_eq!(parse_memory("1024"), Some(1024.0));
        assert_eq!(parse_memory("lots"), None);
    }

    #[test]
    fn test_merge_cpu_and_memory_keeps_larger() {
        let a = ResourceRequest::new().with_cpu("2").with_memory("4Gi");
        let b = ResourceRequest::new().with_cpu("4").with_memory("8Gi");
        let merged = a.merge(&b, &AcceleratorTiers::default());
        assert_eq!(merged.cpu.as_deref(), Some("4"));
        assert_eq!(merged.memory.as_deref(), Some("8Gi"));
    }

    #[test]
    fn test_merge_compares_across_units() {
        let a = ResourceRequest::new().with_cpu("1500m").with_memory("1G");
        let b = ResourceRequest::new().with_cpu("1").with_memory("1000Mi");
        let merged = a.merge(&b, &AcceleratorTiers::default());
        assert_eq!(merged.cpu.as_deref(), Some("1500m"));
        // 1000Mi is 1.048e9 bytes, larger than 1G.
        assert_eq!(merged.memory.as_deref(), Some("1000Mi"));
    }

    #[test]
    fn test_merge_ties_keep_first_operand() {
        let a = ResourceRequest::new().with_cpu("1000m").with_memory("1Gi");
        let b = ResourceRequest::new().with_cpu("1").with_memory("1024Mi");
        let merged = a.merge(&b, &AcceleratorTiers::default());
        assert_eq!(merged.cpu.as_deref(), Some("1000m"));
        assert_eq!(merged.memory.as_deref(), Some("1Gi"));
    }

    #[test]
    fn test_merge_accelerator_prefers_higher_tier_and_larger_count() {
        let tiers = AcceleratorTiers::empty()
            .with_tier("tierA", 1)
            .with_tier("tierB", 2);
        let a = ResourceRequest::new().with_accelerator("tierA", 2);
        let b = ResourceRequest::new().with_accelerator("tierB", 1);
        let merged = a.merge(&b, &tiers);
        assert_eq!(merged.accelerator.as_deref(), Some("tierB"));
        assert_eq!(merged.accelerator_count, 2);
    }

    #[test]
    fn test_merge_accelerator_with_none_keeps_other() {
        let tiers = AcceleratorTiers::default();
        let none = ResourceRequest::new().with_cpu("1");
        let gpu = ResourceRequest::new().with_accelerator("T4", 3);

        let left = none.merge(&gpu, &tiers);
        assert_eq!(left.accelerator.as_deref(), Some("T4"));
        assert_eq!(left.accelerator_count, 3);

        let right = gpu.merge(&none, &tiers);
        assert_eq!(right.accelerator.as_deref(), Some("T4"));
        assert_eq!(right.accelerator_count, 3);
        assert_eq!(right.cpu.as_deref(), Some("1"));
    }

    #[test]
    fn test_default_tiers_are_case_insensitive() {
        let tiers = AcceleratorTiers::default();
        assert!(tiers.rank("a100") > tiers.rank("T4"));
        assert_eq!(tiers.higher("h100", "A100"), "h100");
        assert_eq!(tiers.rank("unknown"), 0);
    }

    #[test]
    fn test_merge_is_monotonic_over_members() {
        let tiers = AcceleratorTiers::default();
        let members = [
            ResourceRequest::new().with_cpu("500m"),
            ResourceRequest::new().with_memory("2Gi"),
            ResourceRequest::new().with_cpu("2").with_memory("1Gi"),
        ];
        let merged = members
            .iter()
            .fold(ResourceRequest::new(), |acc, r| acc.merge(r, &tiers));
        assert_eq!(merged.cpu.as_deref(), Some("2"));
        assert_eq!(merged.memory.as_deref(), Some("2Gi"));
        assert!(!merged.has_accelerator());
    }
}
