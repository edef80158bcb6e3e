use std::fmt;

use rand::distributions::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use smc_core::errors::{codes, ErrorInfo};
use smc_core::{log_sum_exp, Particle, RngHandle, SmcError, Step};

/// Outcome of the resample decision at one tempering position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResampleStatus {
    /// ESS fell to the threshold and the ensemble was redrawn.
    Resampled,
    /// ESS stayed above the threshold, or resampling is disabled.
    Unchanged,
}

impl ResampleStatus {
    /// Lower-case label used in logs and CSV output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResampleStatus::Resampled => "resampled",
            ResampleStatus::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for ResampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reweights an ensemble for one schedule increment and resamples it when
/// the effective sample size collapses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleUpdater {
    ess_threshold: Option<f64>,
}

impl ParticleUpdater {
    /// Updater resampling whenever `ess <= ess_threshold`. `None` never
    /// resamples.
    pub fn new(ess_threshold: Option<f64>) -> Self {
        Self { ess_threshold }
    }

    /// Configured threshold.
    pub fn ess_threshold(&self) -> Option<f64> {
        self.ess_threshold
    }

    /// Incremental importance reweighting: `log w' = log ŵ + Δphi · log L`
    /// with `ŵ` the normalised previous weights. The log-sum-exp of the new
    /// log weights is recorded on the returned step as its log evidence
    /// increment.
    pub fn update_log_weights(&self, step: &Step, delta_phi: f64) -> Result<Step, SmcError> {
        let weights = step.normalized_weights()?;
        let particles: Vec<Particle> = step
            .particles()
            .iter()
            .zip(weights)
            .map(|(particle, weight)| {
                let mut log_weight = weight.ln();
                if delta_phi != 0.0 {
                    log_weight += delta_phi * particle.log_like();
                }
                particle.with_log_weight(log_weight)
            })
            .collect();
        let log_weight_sum = log_sum_exp(
            &particles.iter().map(Particle::log_weight).collect::<Vec<_>>(),
        );
        let mut updated = Step::new(particles)?;
        updated.record_log_evidence_increment(log_weight_sum);
        // Surfaces collapsed weights at the position that caused them.
        updated.normalized_weights()?;
        Ok(updated)
    }

    /// Resamples when the ESS is at or below the threshold. Returns the
    /// (possibly unchanged) step, its ESS before resampling and the status.
    pub fn resample_if_needed(
        &self,
        step: &Step,
        rng: &mut RngHandle,
    ) -> Result<(Step, f64, ResampleStatus), SmcError> {
        let ess = step.ess()?;
        match self.ess_threshold {
            Some(threshold) if ess <= threshold => {
                Ok((resample(step, rng)?, ess, ResampleStatus::Resampled))
            }
            _ => Ok((step.clone(), ess, ResampleStatus::Unchanged)),
        }
    }
}

/// Multinomial resampling: `N` draws with replacement, probabilities given by
/// the normalised weights. Every drawn particle gets log weight `ln(1/N)`.
pub fn resample(step: &Step, rng: &mut RngHandle) -> Result<Step, SmcError> {
    let weights = step.normalized_weights()?;
    let index = WeightedIndex::new(&weights).map_err(|err| {
        SmcError::Numerical(
            ErrorInfo::new(codes::DEGENERATE_WEIGHTS, err.to_string())
                .with_context("particles", step.len().to_string()),
        )
    })?;
    let count = step.len();
    let uniform = (1.0 / count as f64).ln();
    let particles: Vec<Particle> = (0..count)
        .map(|_| step.particles()[index.sample(&mut *rng)].with_log_weight(uniform))
        .collect();
    let mut resampled = step.clone();
    resampled.set_particles(particles)?;
    Ok(resampled)
}
