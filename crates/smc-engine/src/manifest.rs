use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smc_core::errors::ErrorInfo;
use smc_core::{ParamMap, RunProvenance, SmcError};

use crate::config::SamplerConfig;

/// JSON record of a completed run, written next to its diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Configuration used for the run.
    pub config: SamplerConfig,
    /// Seed, label and terminal ensemble hash.
    pub provenance: RunProvenance,
    /// Tempering values walked by the run.
    pub schedule: Vec<f64>,
    /// Number of ensembles in the returned history.
    pub steps: usize,
    /// Log of the marginal likelihood estimate.
    pub log_evidence: f64,
    /// Weighted mean of the final ensemble.
    pub final_mean: ParamMap,
    /// Checkpoint written during the run.
    pub checkpoint: Option<PathBuf>,
    /// Diagnostics CSV written during the run.
    pub metrics_file: Option<PathBuf>,
    /// UTC completion time, RFC 3339.
    pub completed_at: String,
}

impl RunManifest {
    /// Serialises the manifest as pretty JSON at `path`, creating parent
    /// directories as needed.
    pub fn write(&self, path: &Path) -> Result<(), SmcError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| manifest_error("manifest-mkdir", err, parent))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| manifest_error("manifest-serialize", err, path))?;
        fs::write(path, json).map_err(|err| manifest_error("manifest-write", err, path))
    }

    /// Reads back a manifest written by [`RunManifest::write`].
    pub fn load(path: &Path) -> Result<Self, SmcError> {
        let contents =
            fs::read_to_string(path).map_err(|err| manifest_error("manifest-read", err, path))?;
        serde_json::from_str(&contents).map_err(|err| manifest_error("manifest-parse", err, path))
    }
}

fn manifest_error(code: &str, err: impl ToString, path: &Path) -> SmcError {
    SmcError::Serde(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
    )
}

/// Current UTC time in the format used by manifests.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
