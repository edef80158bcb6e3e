use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smc_core::{ParamMap, SmcError};

use crate::checkpoint::{CheckpointStore, Mode};
use crate::hash::canonical_step_list_hash;

/// Statistics of one checkpointed ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Tempering position.
    pub index: usize,
    /// Tempering value, when the checkpoint recorded its schedule.
    pub phi: Option<f64>,
    /// Number of particles.
    pub particles: usize,
    /// Effective sample size.
    pub ess: f64,
    /// Log of the unnormalised weight sum contributing to the evidence.
    pub log_weight_sum: f64,
    /// Weighted mean of every parameter.
    pub mean: ParamMap,
}

/// Overview of a checkpoint file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    /// Inspected file.
    pub path: PathBuf,
    /// Per-position statistics.
    pub steps: Vec<StepSummary>,
    /// Log evidence over the stored positions.
    pub log_evidence: f64,
    /// Canonical hash of the stored history.
    pub ensemble_hash: String,
}

/// Loads a checkpoint and summarises every stored position.
pub fn summarize_checkpoint(path: &Path) -> Result<CheckpointSummary, SmcError> {
    let store = CheckpointStore::open(path, Mode::Read)?;
    let steps = store.read_step_list()?;
    let schedule = store.schedule();
    let summaries = steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            Ok(StepSummary {
                index,
                phi: schedule.get(index).copied(),
                particles: step.len(),
                ess: step.ess()?,
                log_weight_sum: step.log_unnormalized_weight_sum(),
                mean: step.mean()?,
            })
        })
        .collect::<Result<Vec<_>, SmcError>>()?;
    Ok(CheckpointSummary {
        path: path.to_path_buf(),
        steps: summaries,
        log_evidence: steps.log_bayes_evidence(),
        ensemble_hash: canonical_step_list_hash(&steps),
    })
}
