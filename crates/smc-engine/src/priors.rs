use std::collections::BTreeMap;
use std::f64::consts::PI;

use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use smc_core::errors::{codes, ErrorInfo};
use smc_core::{ParamMap, RngHandle, SmcError};

/// Prior distribution declared for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Prior {
    /// Uniform on `[low, high)`.
    Uniform {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Gaussian with the given mean and standard deviation.
    Normal {
        /// Mean of the distribution.
        mean: f64,
        /// Standard deviation of the distribution.
        std_dev: f64,
    },
    /// Gaussian folded onto the positive half line. Suits noise levels.
    HalfNormal {
        /// Scale of the underlying Gaussian.
        std_dev: f64,
    },
}

impl Prior {
    fn validate(&self, name: &str) -> Result<(), SmcError> {
        let ok = match self {
            Prior::Uniform { low, high } => low.is_finite() && high.is_finite() && low < high,
            Prior::Normal { mean, std_dev } => mean.is_finite() && *std_dev > 0.0,
            Prior::HalfNormal { std_dev } => *std_dev > 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(SmcError::Configuration(
                ErrorInfo::new(codes::INVALID_PRIOR_SPEC, "malformed prior distribution")
                    .with_context("parameter", name)
                    .with_context("prior", format!("{self:?}")),
            ))
        }
    }

    /// Log density at `x`; `-inf` outside the support.
    pub fn log_density(&self, x: f64) -> f64 {
        match *self {
            Prior::Uniform { low, high } => {
                if x >= low && x < high {
                    -(high - low).ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
            Prior::Normal { mean, std_dev } => normal_log_density(x, mean, std_dev),
            Prior::HalfNormal { std_dev } => {
                if x >= 0.0 {
                    normal_log_density(x, 0.0, std_dev) + 2.0_f64.ln()
                } else {
                    f64::NEG_INFINITY
                }
            }
        }
    }

    /// Draws one value.
    pub fn sample(&self, rng: &mut RngHandle) -> Result<f64, SmcError> {
        match *self {
            Prior::Uniform { low, high } => {
                self.validate("uniform")?;
                Ok(Uniform::new(low, high).sample(rng))
            }
            Prior::Normal { mean, std_dev } => Ok(normal(mean, std_dev)?.sample(rng)),
            Prior::HalfNormal { std_dev } => Ok(normal(0.0, std_dev)?.sample(rng).abs()),
        }
    }
}

/// Log density of `N(mean, std_dev²)` at `x`.
pub fn normal_log_density(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    -0.5 * z * z - std_dev.ln() - 0.5 * (2.0 * PI).ln()
}

pub(crate) fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, SmcError> {
    Normal::new(mean, std_dev).map_err(|err| {
        SmcError::Configuration(
            ErrorInfo::new(codes::NON_POSITIVE_SCALE, err.to_string())
                .with_context("mean", mean.to_string())
                .with_context("std_dev", std_dev.to_string()),
        )
    })
}

/// Priors keyed by parameter name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorSet {
    priors: BTreeMap<String, Prior>,
}

impl PriorSet {
    /// Creates an empty prior set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the prior of one parameter.
    pub fn with(mut self, name: impl Into<String>, prior: Prior) -> Self {
        self.priors.insert(name.into(), prior);
        self
    }

    /// Prior of `name`, if declared.
    pub fn get(&self, name: &str) -> Option<&Prior> {
        self.priors.get(name)
    }

    /// Declared parameter names in coordinate order.
    pub fn names(&self) -> Vec<String> {
        self.priors.keys().cloned().collect()
    }

    /// Checks that every name in `sampled` has a well formed prior.
    pub fn validate(&self, sampled: &[String]) -> Result<(), SmcError> {
        for name in sampled {
            match self.priors.get(name) {
                Some(prior) => prior.validate(name)?,
                None => {
                    return Err(SmcError::Configuration(
                        ErrorInfo::new(
                            codes::INVALID_PRIOR_SPEC,
                            "parameter has no declared prior distribution",
                        )
                        .with_context("parameter", name.clone()),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Joint log density of the parameters present in `params`. Parameters
    /// without a prior contribute nothing.
    pub fn log_density(&self, params: &ParamMap) -> f64 {
        params
            .iter()
            .filter_map(|(name, value)| self.priors.get(name).map(|prior| prior.log_density(*value)))
            .sum()
    }

    /// Draws the named parameters independently from their priors.
    pub fn sample(&self, names: &[String], rng: &mut RngHandle) -> Result<ParamMap, SmcError> {
        self.validate(names)?;
        let mut params = ParamMap::new();
        for name in names {
            if let Some(prior) = self.priors.get(name) {
                params.insert(name.clone(), prior.sample(rng)?);
            }
        }
        Ok(params)
    }
}
