//! Error types for the assetflow engine.
//!
//! Build-time problems are collected as [`GraphValidationError`] values and
//! reported together through [`PipelineBuildError`]. Run-time step failures
//! never surface as errors; they are recorded on the step's
//! [`ExecutionResult`](crate::core::ExecutionResult).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for assetflow operations.
#[derive(Debug, Error)]
pub enum AssetflowError {
    /// The pipeline failed validation and refused to build.
    #[error("{0}")]
    Build(#[from] PipelineBuildError),

    /// A single graph validation problem.
    #[error("{0}")]
    Graph(#[from] GraphValidationError),

    /// A cache store operation failed.
    #[error("{0}")]
    Cache(#[from] CacheError),

    /// A value could not be encoded or decoded.
    #[error("{0}")]
    Codec(#[from] CodecError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Diagnostic metadata attached to validation errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "GRAPH-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Raised when the dependency graph contains a cycle.
///
/// `steps` lists every node whose in-degree never reached zero during the
/// sort, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cycle detected among steps: {}", steps.join(", "))]
pub struct CycleDetectedError {
    /// Steps left unsorted because of the cycle.
    pub steps: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle error.
    #[must_use]
    pub fn new(steps: Vec<String>) -> Self {
        Self { steps }
    }
}

/// A single problem found while validating a pipeline's graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphValidationError {
    /// A step consumes an asset nobody produces and that is not declared external.
    #[error("Step '{step}' consumes undefined asset '{asset}'")]
    UndefinedInput {
        /// The consuming step.
        step: String,
        /// The missing asset name.
        asset: String,
    },

    /// Two steps declare the same output asset.
    #[error("Asset '{asset}' is produced by both '{first}' and '{second}'")]
    DuplicateProducer {
        /// The contested asset name.
        asset: String,
        /// The step registered first.
        first: String,
        /// The step that tried to produce it again.
        second: String,
    },

    /// Two steps share a name.
    #[error("Step '{name}' is registered more than once")]
    DuplicateStep {
        /// The repeated step name.
        name: String,
    },

    /// The graph is not acyclic.
    #[error("{0}")]
    Cycle(#[from] CycleDetectedError),

    /// A run condition reads a parameter that nothing can bind.
    #[error("Condition of step '{step}' reads unbound parameter '{parameter}'")]
    UnboundParameter {
        /// The step owning the condition.
        step: String,
        /// The parameter name.
        parameter: String,
    },
}

impl GraphValidationError {
    /// Returns the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UndefinedInput { .. } => "GRAPH-UNDEFINED-INPUT",
            Self::DuplicateProducer { .. } => "GRAPH-DUPLICATE-PRODUCER",
            Self::DuplicateStep { .. } => "GRAPH-DUPLICATE-STEP",
            Self::Cycle(_) => "GRAPH-CYCLE",
            Self::UnboundParameter { .. } => "GRAPH-UNBOUND-PARAM",
        }
    }

    /// Returns the steps involved in this problem.
    #[must_use]
    pub fn steps(&self) -> Vec<String> {
        match self {
            Self::UndefinedInput { step, .. } | Self::UnboundParameter { step, .. } => {
                vec![step.clone()]
            }
            Self::DuplicateProducer { first, second, .. } => vec![first.clone(), second.clone()],
            Self::DuplicateStep { name } => vec![name.clone()],
            Self::Cycle(err) => err.steps.clone(),
        }
    }

    /// Builds diagnostic metadata for reporting.
    #[must_use]
    pub fn error_info(&self) -> ErrorInfo {
        let info = ErrorInfo::new(self.code(), self.to_string());
        match self {
            Self::UndefinedInput { asset, .. } => info
                .with_context_entry("asset", asset.clone())
                .with_fix_hint("Add a step producing this asset or declare it as an external input."),
            Self::DuplicateProducer { asset, .. } => info
                .with_context_entry("asset", asset.clone())
                .with_fix_hint("Rename one of the outputs so each asset has a single producer."),
            Self::DuplicateStep { .. } => {
                info.with_fix_hint("Give every step a unique name.")
            }
            Self::Cycle(_) => {
                info.with_fix_hint("Remove one of the asset dependencies in the cycle to break it.")
            }
            Self::UnboundParameter { parameter, .. } => info
                .with_context_entry("parameter", parameter.clone())
                .with_fix_hint("Read only step inputs or registered run parameters in conditions."),
        }
    }
}

/// Raised when a pipeline refuses to build.
///
/// Carries every validation problem so a caller can fix them in one pass.
#[derive(Debug, Clone, Error)]
#[error(
    "Pipeline '{pipeline}' failed validation with {} error(s): {}",
    errors.len(),
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
)]
pub struct PipelineBuildError {
    /// The pipeline name.
    pub pipeline: String,
    /// Every problem found.
    pub errors: Vec<GraphValidationError>,
}

impl PipelineBuildError {
    /// Creates a new build error.
    #[must_use]
    pub fn new(pipeline: impl Into<String>, errors: Vec<GraphValidationError>) -> Self {
        Self {
            pipeline: pipeline.into(),
            errors,
        }
    }

    /// Returns true if any error has the given code.
    #[must_use]
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code() == code)
    }
}

/// Raised when a step's return value does not match its declared outputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Step '{step}' declares outputs [{}] but returned {actual}", declared.join(", "))]
pub struct OutputShapeError {
    /// The offending step.
    pub step: String,
    /// The declared output names.
    pub declared: Vec<String>,
    /// Description of what was returned.
    pub actual: String,
}

/// Errors raised by a [`ValueCodec`](crate::step::ValueCodec).
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoding failed.
    #[error("Codec '{tag}' failed to encode value: {message}")]
    Encode {
        /// The codec type tag.
        tag: String,
        /// Underlying message.
        message: String,
    },

    /// Decoding failed.
    #[error("Codec '{tag}' failed to decode value: {message}")]
    Decode {
        /// The codec type tag.
        tag: String,
        /// Underlying message.
        message: String,
    },
}

/// Errors raised by the cache store and its backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem access failed.
    #[error("Cache IO error at {path}: {source}")]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The entry index could not be read or written.
    #[error("Cache index error: {0}")]
    Index(#[from] serde_json::Error),

    /// The value could not be encoded for storage.
    #[error("{0}")]
    Codec(#[from] CodecError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config at {path}: {source}")]
    Read {
        /// The config path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for the schema.
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        /// The config path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// An environment override has an invalid value.
    #[error("Invalid value '{value}' for {var}")]
    InvalidEnv {
        /// The environment variable.
        var: String,
        /// The rejected value.
        value: String,
    },
}
