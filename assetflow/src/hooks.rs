//! Optional persistence hooks called by the engine.
//!
//! Both hooks are best-effort: their failures are logged and never change a
//! step's or a run's outcome.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Persists a step's output assets somewhere durable.
///
/// Called once per declared output after a successful, non-cached invocation.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactMaterializer: Send + Sync {
    /// Stores `value` under the asset `name` and returns its URI.
    fn materialize(
        &self,
        value: &Value,
        name: &str,
        run_id: &str,
        step_name: &str,
    ) -> anyhow::Result<String>;
}

/// Receives the run record once a run ends, whatever its outcome.
#[cfg_attr(test, mockall::automock)]
pub trait RunMetadataSink: Send + Sync {
    /// Saves the record produced by
    /// [`PipelineResult::to_dict`](crate::pipeline::PipelineResult::to_dict).
    fn save_run(&self, run_id: &str, metadata: &Value) -> anyhow::Result<()>;
}

/// Writes one JSON document per run, named `<run_id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileMetadataSink {
    dir: PathBuf,
}

impl JsonFileMetadataSink {
    /// Creates a sink writing into `dir`, created on first use.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path a run record is written to.
    #[must_use]
    pub fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }
}

impl RunMetadataSink for JsonFileMetadataSink {
    fn save_run(&self, run_id: &str, metadata: &Value) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(run_id), serde_json::to_vec_pretty(metadata)?)?;
        Ok(())
    }
}

/// Writes each asset as a JSON file under `<root>/<run_id>/<step>/<name>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileMaterializer {
    root: PathBuf,
}

impl JsonFileMaterializer {
    /// Creates a materializer rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactMaterializer for JsonFileMaterializer {
    fn materialize(
        &self,
        value: &Value,
        name: &str,
        run_id: &str,
        step_name: &str,
    ) -> anyhow::Result<String> {
        let dir = self.root.join(run_id).join(step_name);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{name}.json"));
        fs::write(&path, serde_json::to_vec(value)?)?;
        Ok(format!("file://{}", path.display()))
    }
}
