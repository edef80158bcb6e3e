//! Schema and provenance stamps for checkpoints and run manifests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Version of a persisted payload layout. Readers accept any payload with
/// the same major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when older readers can no longer decode the payload.
    pub major: u32,
    /// Bumped for additive fields.
    pub minor: u32,
    /// Bumped for fixes that leave the layout unchanged.
    pub patch: u32,
}

impl SchemaVersion {
    /// `major.minor.patch`.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// True when a payload written under `other` can be decoded by `self`.
    pub fn reads(&self, other: &SchemaVersion) -> bool {
        self.major == other.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// What produced a run: its seed, the resulting ensemble and the crate
/// versions involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Master seed every random stream was derived from.
    pub seed: u64,
    /// Free-form label of the seed policy.
    pub seed_label: Option<String>,
    /// Canonical hash of the full step history.
    pub ensemble_hash: String,
    /// Crate name to version.
    pub tool_versions: BTreeMap<String, String>,
}

impl RunProvenance {
    /// Provenance stamped with this crate's version.
    pub fn new(seed: u64, seed_label: Option<String>, ensemble_hash: String) -> Self {
        Self {
            seed,
            seed_label,
            ensemble_hash,
            tool_versions: BTreeMap::new(),
        }
        .with_tool(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Records `name` at `version`.
    pub fn with_tool(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool_versions.insert(name.into(), version.into());
        self
    }
}
