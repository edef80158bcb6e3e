//! Particle ensemble at one tempering position.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::covariance::Covariance;
use crate::errors::{codes, ErrorInfo, SmcError};
use crate::params::{param_names, to_vector, ParamMap};
use crate::particle::Particle;

/// Ensemble of particles sharing one tempering position.
///
/// Particle order carries no meaning but is preserved, since it is the order
/// in which the ensemble is partitioned across workers. Normalised weights,
/// effective sample size, mean and covariance are all derived on demand from
/// the stored log weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    particles: Vec<Particle>,
    /// Log of the unnormalised weight sum recorded at reweighting, kept
    /// across a resample that resets the weights themselves.
    #[serde(default)]
    log_evidence_increment: Option<f64>,
}

impl Step {
    /// Builds a step after checking that every particle carries the same
    /// parameter names.
    pub fn new(particles: Vec<Particle>) -> Result<Self, SmcError> {
        check_keys(&particles)?;
        Ok(Self {
            particles,
            log_evidence_increment: None,
        })
    }

    /// Particles in partition order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Consumes the step and returns its particles.
    pub fn into_particles(self) -> Vec<Particle> {
        self.particles
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True for an ensemble without particles.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Parameter names shared by every particle, in coordinate order.
    pub fn param_names(&self) -> Vec<String> {
        self.particles
            .first()
            .map(|particle| param_names(particle.params()))
            .unwrap_or_default()
    }

    /// Stored log weights in particle order.
    pub fn log_weights(&self) -> Vec<f64> {
        self.particles.iter().map(Particle::log_weight).collect()
    }

    /// Stored log likelihoods in particle order.
    pub fn log_likes(&self) -> Vec<f64> {
        self.particles.iter().map(Particle::log_like).collect()
    }

    /// Replaces the particle list wholesale, e.g. after mutation or
    /// resampling. The recorded evidence increment is kept.
    pub fn set_particles(&mut self, particles: Vec<Particle>) -> Result<(), SmcError> {
        check_keys(&particles)?;
        self.particles = particles;
        Ok(())
    }

    /// Records `ln Σ exp(log_weight)` observed at reweighting.
    pub fn record_log_evidence_increment(&mut self, log_weight_sum: f64) {
        self.log_evidence_increment = Some(log_weight_sum);
    }

    /// Normalised weights: subtract the maximum log weight, exponentiate and
    /// divide by the sum.
    pub fn normalized_weights(&self) -> Result<Vec<f64>, SmcError> {
        let log_weights = self.log_weights();
        let max = max_log_weight(&log_weights)?;
        let shifted: Vec<f64> = log_weights.iter().map(|lw| (lw - max).exp()).collect();
        let total: f64 = shifted.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(degenerate(self.len()));
        }
        Ok(shifted.into_iter().map(|w| w / total).collect())
    }

    /// Replaces every log weight by the log of its normalised weight. Used
    /// once, on the initial ensemble.
    pub fn normalize_log_weights(&mut self) -> Result<(), SmcError> {
        let weights = self.normalized_weights()?;
        self.particles = self
            .particles
            .iter()
            .zip(weights)
            .map(|(particle, weight)| particle.with_log_weight(weight.ln()))
            .collect();
        Ok(())
    }

    /// Effective sample size `1 / Σ w_i²` over normalised weights.
    pub fn ess(&self) -> Result<f64, SmcError> {
        let weights = self.normalized_weights()?;
        let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
        Ok(1.0 / sum_sq)
    }

    /// Log of the unnormalised weight sum. Prefers the value recorded at
    /// reweighting, which survives resampling; otherwise the log-sum-exp of
    /// the stored log weights.
    pub fn log_unnormalized_weight_sum(&self) -> f64 {
        match self.log_evidence_increment {
            Some(log_sum) => log_sum,
            None => log_sum_exp(&self.log_weights()),
        }
    }

    /// Sum of unnormalised weights, `exp` of
    /// [`Step::log_unnormalized_weight_sum`]. Underflows to zero for very
    /// small sums; use the log form for evidence.
    pub fn unnormalized_weight_sum(&self) -> f64 {
        self.log_unnormalized_weight_sum().exp()
    }

    /// Weighted mean of every parameter.
    pub fn mean(&self) -> Result<ParamMap, SmcError> {
        let names = self.param_names();
        let weights = self.normalized_weights()?;
        let mut mean: ParamMap = names.iter().map(|name| (name.clone(), 0.0)).collect();
        for (particle, weight) in self.particles.iter().zip(&weights) {
            for (name, value) in particle.params() {
                if let Some(slot) = mean.get_mut(name) {
                    *slot += weight * value;
                }
            }
        }
        Ok(mean)
    }

    /// Weighted covariance `Σ w (x - μ)(x - μ)ᵀ / (1 - Σ w²)`. When a single
    /// particle carries all the weight the unbiased correction is dropped.
    pub fn covariance(&self) -> Result<Covariance, SmcError> {
        let names = self.param_names();
        let dim = names.len();
        let weights = self.normalized_weights()?;
        let mean = to_vector(&self.mean()?, &names)?;
        let mut matrix = DMatrix::<f64>::zeros(dim, dim);
        for (particle, weight) in self.particles.iter().zip(&weights) {
            let x = to_vector(particle.params(), &names)?;
            for row in 0..dim {
                let dr = x[row] - mean[row];
                for col in 0..dim {
                    matrix[(row, col)] += weight * dr * (x[col] - mean[col]);
                }
            }
        }
        let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
        let correction = 1.0 - sum_sq;
        if correction > f64::EPSILON {
            matrix /= correction;
        }
        Covariance::new(names, matrix)
    }
}

/// `max + ln Σ exp(lw − max)`, ignoring NaN entries. `−∞` when every weight
/// is zero.
pub fn log_sum_exp(log_weights: &[f64]) -> f64 {
    let max = nan_free_max(log_weights);
    if !max.is_finite() {
        return max;
    }
    let total: f64 = log_weights
        .iter()
        .filter(|lw| !lw.is_nan())
        .map(|lw| (lw - max).exp())
        .sum();
    max + total.ln()
}

fn nan_free_max(log_weights: &[f64]) -> f64 {
    log_weights
        .iter()
        .copied()
        .filter(|lw| !lw.is_nan())
        .fold(f64::NEG_INFINITY, f64::max)
}

fn max_log_weight(log_weights: &[f64]) -> Result<f64, SmcError> {
    let max = nan_free_max(log_weights);
    if !max.is_finite() {
        return Err(degenerate(log_weights.len()));
    }
    Ok(max)
}

fn degenerate(particles: usize) -> SmcError {
    SmcError::Numerical(
        ErrorInfo::new(codes::DEGENERATE_WEIGHTS, "every particle weight is zero")
            .with_context("particles", particles.to_string()),
    )
}

fn check_keys(particles: &[Particle]) -> Result<(), SmcError> {
    let Some(first) = particles.first() else {
        return Ok(());
    };
    for (index, particle) in particles.iter().enumerate().skip(1) {
        let same = particle.params().len() == first.params().len()
            && particle
                .params()
                .keys()
                .zip(first.params().keys())
                .all(|(a, b)| a == b);
        if !same {
            return Err(SmcError::Configuration(
                ErrorInfo::new(
                    codes::MISMATCHED_PARAMETER_KEYS,
                    "particle parameter names differ within one step",
                )
                .with_context("particle", index.to_string())
                .with_context("expected", param_names(first.params()).join(","))
                .with_context("found", param_names(particle.params()).join(",")),
            ));
        }
    }
    Ok(())
}
