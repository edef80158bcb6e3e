use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smc_core::{SchemaVersion, SmcError, Step, StepList};
use tracing::debug;

/// Schema written by this version of the store.
pub const CHECKPOINT_SCHEMA: SchemaVersion = SchemaVersion::new(2, 0, 0);

/// Access mode of an open checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Load an existing checkpoint.
    Read,
    /// Start a new checkpoint, replacing any file at the path.
    Write,
}

/// Serializable checkpoint contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Schema of the payload.
    pub schema_version: SchemaVersion,
    /// Tempering schedule of the run that wrote the checkpoint, if recorded.
    pub schedule: Vec<f64>,
    /// Ensembles keyed by tempering position.
    pub steps: BTreeMap<usize, Step>,
}

impl Default for CheckpointPayload {
    fn default() -> Self {
        Self {
            schema_version: CHECKPOINT_SCHEMA,
            schedule: Vec::new(),
            steps: BTreeMap::new(),
        }
    }
}

impl CheckpointPayload {
    /// Restores the payload from disk.
    pub fn load(path: &Path) -> Result<Self, SmcError> {
        let bytes = fs::read(path).map_err(|err| storage_error("checkpoint-read", err, path))?;
        let payload: Self = bincode::deserialize(&bytes)
            .map_err(|err| storage_error("checkpoint-parse", err, path))?;
        if !CHECKPOINT_SCHEMA.reads(&payload.schema_version) {
            return Err(
                SmcError::storage("checkpoint-schema", "unsupported checkpoint schema")
                    .with_context("path", path.display().to_string())
                    .with_context("found", payload.schema_version.to_string())
                    .with_context("expected", CHECKPOINT_SCHEMA.to_string()),
            );
        }
        Ok(payload)
    }

    /// Writes the payload next to `path` and renames it into place, so a
    /// reader never observes a half-written checkpoint.
    pub fn store(&self, path: &Path) -> Result<(), SmcError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| storage_error("checkpoint-mkdir", err, parent))?;
        }
        let bytes = bincode::serialize(self)
            .map_err(|err| storage_error("checkpoint-serialize", err, path))?;
        let staging = staging_path(path);
        fs::write(&staging, bytes).map_err(|err| storage_error("checkpoint-write", err, &staging))?;
        fs::rename(&staging, path).map_err(|err| storage_error("checkpoint-write", err, path))
    }

    /// Reassembles the ordered history. Positions must be contiguous from 0.
    pub fn to_step_list(&self) -> Result<StepList, SmcError> {
        for (expected, index) in self.steps.keys().enumerate() {
            if *index != expected {
                return Err(SmcError::storage(
                    "checkpoint-gap",
                    "checkpoint is missing a tempering position",
                )
                .with_context("missing", expected.to_string())
                .with_context("next", index.to_string()));
            }
        }
        Ok(self.steps.values().cloned().collect())
    }
}

/// Durable history of a run, one entry per tempering position.
///
/// In write mode every call persists the whole payload before returning, so
/// the file always reflects the last completed position.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    mode: Mode,
    payload: CheckpointPayload,
}

impl CheckpointStore {
    /// Opens `path`. Read mode loads and validates the file; write mode
    /// starts an empty checkpoint and creates it on disk immediately.
    pub fn open(path: impl Into<PathBuf>, mode: Mode) -> Result<Self, SmcError> {
        let path = path.into();
        let payload = match mode {
            Mode::Read => CheckpointPayload::load(&path)?,
            Mode::Write => {
                let payload = CheckpointPayload::default();
                payload.store(&path)?;
                payload
            }
        };
        Ok(Self {
            path,
            mode,
            payload,
        })
    }

    /// File backing the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Schedule recorded alongside the steps.
    pub fn schedule(&self) -> &[f64] {
        &self.payload.schedule
    }

    /// Records the schedule of the run being written.
    pub fn record_schedule(&mut self, schedule: &[f64]) -> Result<(), SmcError> {
        self.ensure_writable()?;
        self.payload.schedule = schedule.to_vec();
        self.payload.store(&self.path)
    }

    /// Stores `step` under tempering position `index`, replacing any
    /// earlier entry there.
    pub fn write_step(&mut self, step: &Step, index: usize) -> Result<(), SmcError> {
        self.ensure_writable()?;
        self.payload.steps.insert(index, step.clone());
        self.payload.store(&self.path)?;
        debug!(index, path = %self.path.display(), "checkpointed step");
        Ok(())
    }

    /// Stores every step of `steps` under its position in the list.
    pub fn write_step_list(&mut self, steps: &StepList) -> Result<(), SmcError> {
        self.ensure_writable()?;
        for (index, step) in steps.iter().enumerate() {
            self.payload.steps.insert(index, step.clone());
        }
        self.payload.store(&self.path)?;
        debug!(steps = steps.len(), path = %self.path.display(), "checkpointed step list");
        Ok(())
    }

    /// Reconstructs the ordered history.
    pub fn read_step_list(&self) -> Result<StepList, SmcError> {
        self.payload
            .to_step_list()
            .map_err(|err| err.with_context("path", self.path.display().to_string()))
    }

    /// Flushes and releases the store.
    pub fn close(self) -> Result<(), SmcError> {
        match self.mode {
            Mode::Write => self.payload.store(&self.path),
            Mode::Read => Ok(()),
        }
    }

    fn ensure_writable(&self) -> Result<(), SmcError> {
        match self.mode {
            Mode::Write => Ok(()),
            Mode::Read => Err(
                SmcError::storage("checkpoint-mode", "checkpoint opened read-only")
                    .with_context("path", self.path.display().to_string()),
            ),
        }
    }
}

/// Loads the full history stored at `path`.
pub fn load_step_list(path: &Path) -> Result<StepList, SmcError> {
    CheckpointStore::open(path, Mode::Read)?.read_step_list()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn storage_error(code: &str, err: impl ToString, path: &Path) -> SmcError {
    SmcError::storage(code, err.to_string()).with_context("path", path.display().to_string())
}
