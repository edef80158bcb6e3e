use serde::{Deserialize, Serialize};

use crate::params::ParamMap;

/// One weighted hypothesis: a parameter vector, its (possibly unnormalised)
/// log weight and its log likelihood under the current model and data.
///
/// Particles are values. Reweighting or mutation produces a new particle and
/// leaves the original untouched, so ensembles retained in a
/// [`StepList`](crate::StepList) never alias each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    params: ParamMap,
    log_weight: f64,
    log_like: f64,
}

impl Particle {
    /// Creates a particle from its three components.
    pub fn new(params: ParamMap, log_weight: f64, log_like: f64) -> Self {
        Self {
            params,
            log_weight,
            log_like,
        }
    }

    /// Parameter values keyed by name.
    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Log weight, not necessarily normalised.
    pub fn log_weight(&self) -> f64 {
        self.log_weight
    }

    /// Log likelihood at [`Particle::params`].
    pub fn log_like(&self) -> f64 {
        self.log_like
    }

    /// Returns a copy carrying a different log weight.
    pub fn with_log_weight(&self, log_weight: f64) -> Self {
        Self {
            params: self.params.clone(),
            log_weight,
            log_like: self.log_like,
        }
    }

    /// Returns a copy at a new location with its new log likelihood. The
    /// weight is carried over unchanged.
    pub fn moved_to(&self, params: ParamMap, log_like: f64) -> Self {
        Self {
            params,
            log_weight: self.log_weight,
            log_like,
        }
    }
}
