//! Cache policies.

use crate::context::RunInfo;
use crate::core::Bindings;
use std::fmt;
use std::sync::Arc;

/// A user-supplied cache key function.
pub type CacheKeyFn = Arc<dyn Fn(&Bindings, &KeyContext<'_>) -> String + Send + Sync>;

/// Context handed to a custom cache key function.
#[derive(Debug, Clone, Copy)]
pub struct KeyContext<'a> {
    /// The step being keyed.
    pub step_name: &'a str,
    /// The step's code fingerprint.
    pub code_fingerprint: &'a str,
    /// The current run.
    pub run: &'a RunInfo,
}

/// Which inputs feed a step's cache key.
#[derive(Clone, Default)]
pub enum CachePolicy {
    /// Never cache; every run invokes the task.
    #[default]
    Disabled,
    /// Key on the step's code fingerprint only.
    CodeFingerprint,
    /// Key on the code fingerprint and the canonical inputs.
    InputFingerprint,
    /// Key computed by a user function.
    Custom(CacheKeyFn),
}

impl CachePolicy {
    /// Creates a custom policy.
    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&Bindings, &KeyContext<'_>) -> String + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(func))
    }

    /// Returns the policy kind as a string.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::CodeFingerprint => "code_fingerprint",
            Self::InputFingerprint => "input_fingerprint",
            Self::Custom(_) => "custom",
        }
    }

    /// Returns true if the cache is consulted for this policy.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl fmt::Debug for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}
