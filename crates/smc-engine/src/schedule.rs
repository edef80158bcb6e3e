use smc_core::errors::{codes, ErrorInfo};
use smc_core::SmcError;

use crate::config::ScheduleConfig;

/// Tempering path from the prior (`phi = 0`) to the posterior (`phi = 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct TemperingSchedule {
    phis: Vec<f64>,
}

impl TemperingSchedule {
    /// Validates an explicit schedule: non-empty, starting at 0, within
    /// [0, 1] and non-decreasing.
    pub fn new(phis: Vec<f64>) -> Result<Self, SmcError> {
        let invalid = |message: &str| {
            SmcError::Configuration(
                ErrorInfo::new(codes::INVALID_SCHEDULE, message)
                    .with_context("positions", phis.len().to_string()),
            )
        };
        if phis.is_empty() {
            return Err(invalid("tempering schedule is empty"));
        }
        if phis.iter().any(|phi| !phi.is_finite() || *phi < 0.0 || *phi > 1.0) {
            return Err(invalid("tempering values must lie in [0, 1]"));
        }
        if phis[0] != 0.0 {
            return Err(invalid("tempering schedule must start at 0"));
        }
        if phis.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(invalid("tempering schedule must be non-decreasing"));
        }
        Ok(Self { phis })
    }

    /// Evenly spaced schedule of `num_time_steps` positions from 0 to 1.
    pub fn uniform(num_time_steps: usize) -> Result<Self, SmcError> {
        let phis = match num_time_steps {
            0 => Vec::new(),
            1 => vec![0.0],
            n => (0..n).map(|i| i as f64 / (n - 1) as f64).collect(),
        };
        Self::new(phis)
    }

    /// Builds the schedule described by the run configuration.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, SmcError> {
        match config {
            ScheduleConfig::Uniform { num_time_steps } => Self::uniform(*num_time_steps),
            ScheduleConfig::Manual { phis } => Self::new(phis.clone()),
        }
    }

    /// Number of tempering positions.
    pub fn len(&self) -> usize {
        self.phis.len()
    }

    /// Always false for a validated schedule.
    pub fn is_empty(&self) -> bool {
        self.phis.is_empty()
    }

    /// Tempering value at position `t`.
    pub fn phi(&self, t: usize) -> f64 {
        self.phis[t]
    }

    /// Increment `phi_t - phi_{t-1}`; zero at the initial position.
    pub fn delta_phi(&self, t: usize) -> f64 {
        if t == 0 {
            0.0
        } else {
            self.phis[t] - self.phis[t - 1]
        }
    }

    /// Schedule values in order.
    pub fn as_slice(&self) -> &[f64] {
        &self.phis
    }
}
