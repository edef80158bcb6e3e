//! Structured error types shared across SMC crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable machine readable error codes carried inside [`ErrorInfo::code`].
pub mod codes {
    /// A sampled parameter has no prior, or a prior is malformed.
    pub const INVALID_PRIOR_SPEC: &str = "invalid-prior-spec";
    /// A proposal scale is zero or negative.
    pub const NON_POSITIVE_SCALE: &str = "non-positive-scale";
    /// Proposal center and scales do not describe the same parameter set.
    pub const INVALID_PROPOSAL_SPEC: &str = "invalid-proposal-spec";
    /// Restart position outside the admissible range.
    pub const INVALID_RESTART_POSITION: &str = "invalid-restart-position";
    /// Checkpoint schedule disagrees with the configured one on the kept
    /// positions, or the checkpoint recorded no schedule.
    pub const MISMATCHED_RESTART_SCHEDULE: &str = "mismatched-restart-schedule";
    /// Particles within one step disagree on their parameter names.
    pub const MISMATCHED_PARAMETER_KEYS: &str = "mismatched-parameter-keys";
    /// Particle count of zero.
    pub const INVALID_PARTICLE_COUNT: &str = "invalid-particle-count";
    /// Tempering schedule is empty, decreasing or outside [0, 1].
    pub const INVALID_SCHEDULE: &str = "invalid-schedule";
    /// Restart requested without a checkpoint to load from.
    pub const MISSING_CHECKPOINT_SOURCE: &str = "missing-checkpoint-source";
    /// Every particle weight underflowed to zero.
    pub const DEGENERATE_WEIGHTS: &str = "degenerate-weights";
    /// Proposal covariance is not positive semi-definite.
    pub const COVARIANCE_SINGULAR: &str = "covariance-singular";
    /// The Markov kernel or the model it drives failed.
    pub const KERNEL_FAILURE: &str = "kernel-failure";
}

/// Structured payload attached to every [`SmcError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (indices, sizes, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the SMC engine.
///
/// None of these are recovered locally: every variant aborts the run and is
/// surfaced to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SmcError {
    /// Invalid run configuration detected before sampling starts.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Collapsed weights or an unusable covariance.
    #[error("numerical degeneracy: {0}")]
    Numerical(ErrorInfo),
    /// Failure raised by the Markov kernel or the model it evaluates.
    #[error("kernel failure: {0}")]
    Kernel(ErrorInfo),
    /// Checkpoint read or write failures.
    #[error("storage error: {0}")]
    Storage(ErrorInfo),
    /// Serialization and schema errors outside the checkpoint store.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SmcError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SmcError::Configuration(info)
            | SmcError::Numerical(info)
            | SmcError::Kernel(info)
            | SmcError::Storage(info)
            | SmcError::Serde(info) => info,
        }
    }

    /// Returns true when the payload carries the given stable code.
    pub fn has_code(&self, code: &str) -> bool {
        self.info().code == code
    }

    /// Shorthand for a configuration error.
    pub fn configuration(code: &str, message: impl Into<String>) -> Self {
        SmcError::Configuration(ErrorInfo::new(code, message))
    }

    /// Shorthand for a numerical degeneracy error.
    pub fn numerical(code: &str, message: impl Into<String>) -> Self {
        SmcError::Numerical(ErrorInfo::new(code, message))
    }

    /// Shorthand for a kernel failure.
    pub fn kernel(message: impl Into<String>) -> Self {
        SmcError::Kernel(ErrorInfo::new(codes::KERNEL_FAILURE, message))
    }

    /// Shorthand for a storage error.
    pub fn storage(code: &str, message: impl Into<String>) -> Self {
        SmcError::Storage(ErrorInfo::new(code, message))
    }

    /// Adds a context entry to the payload, keeping the variant.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            SmcError::Configuration(info) => {
                SmcError::Configuration(info.with_context(key, value))
            }
            SmcError::Numerical(info) => SmcError::Numerical(info.with_context(key, value)),
            SmcError::Kernel(info) => SmcError::Kernel(info.with_context(key, value)),
            SmcError::Storage(info) => SmcError::Storage(info.with_context(key, value)),
            SmcError::Serde(info) => SmcError::Serde(info.with_context(key, value)),
        }
    }
}
