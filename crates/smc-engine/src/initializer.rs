use std::sync::Arc;

use rand_distr::Distribution;
use smc_core::errors::{codes, ErrorInfo};
use smc_core::{Likelihood, ParamMap, Particle, RngHandle, SmcError, Step, NOISE_PARAM};

use crate::config::ProposalConfig;
use crate::priors::{self, PriorSet};

/// Draws the initial ensemble at `phi = 0`.
///
/// Without a proposal every particle is a prior draw and carries log weight
/// zero. With a proposal each coordinate is drawn from `N(center, scale²)`
/// and the particle is weighted by the importance ratio `p(θ) / q(θ)`.
#[derive(Debug)]
pub struct ParticleInitializer<L> {
    likelihood: Arc<L>,
    priors: Arc<PriorSet>,
    sampled: Vec<String>,
    measurement_std_dev: Option<f64>,
    proposal: Option<ProposalConfig>,
}

impl<L: Likelihood> ParticleInitializer<L> {
    /// Initializer for the model parameters `param_names`. When
    /// `measurement_std_dev` is `None` the noise level is sampled too and
    /// needs its own prior.
    pub fn new(
        likelihood: Arc<L>,
        priors: Arc<PriorSet>,
        param_names: &[String],
        measurement_std_dev: Option<f64>,
    ) -> Result<Self, SmcError> {
        let mut sampled: Vec<String> = param_names
            .iter()
            .filter(|name| name.as_str() != NOISE_PARAM)
            .cloned()
            .collect();
        if measurement_std_dev.is_none() {
            sampled.push(NOISE_PARAM.to_string());
        }
        sampled.sort();
        sampled.dedup();
        priors.validate(&sampled)?;
        Ok(Self {
            likelihood,
            priors,
            sampled,
            measurement_std_dev,
            proposal: None,
        })
    }

    /// Replaces the prior as initial sampling distribution. The proposal must
    /// cover exactly the sampled parameters.
    pub fn set_proposal_distribution(&mut self, proposal: ProposalConfig) -> Result<(), SmcError> {
        proposal.validate()?;
        if !proposal.center.keys().eq(self.sampled.iter()) {
            return Err(SmcError::Configuration(
                ErrorInfo::new(
                    codes::INVALID_PROPOSAL_SPEC,
                    "proposal does not cover the sampled parameters",
                )
                .with_context("expected", self.sampled.join(","))
                .with_context(
                    "found",
                    proposal.center.keys().cloned().collect::<Vec<_>>().join(","),
                ),
            ));
        }
        self.proposal = Some(proposal);
        Ok(())
    }

    /// Names of the sampled parameters in coordinate order.
    pub fn sampled_params(&self) -> &[String] {
        &self.sampled
    }

    /// Draws `num_particles` particles. Weights are left unnormalised.
    pub fn initialize_particles(
        &self,
        num_particles: usize,
        rng: &mut RngHandle,
    ) -> Result<Step, SmcError> {
        if num_particles == 0 {
            return Err(SmcError::configuration(
                codes::INVALID_PARTICLE_COUNT,
                "cannot initialize an empty ensemble",
            ));
        }
        let mut particles = Vec::with_capacity(num_particles);
        for _ in 0..num_particles {
            let (params, log_weight) = match &self.proposal {
                Some(proposal) => self.draw_from_proposal(proposal, rng)?,
                None => (self.priors.sample(&self.sampled, rng)?, 0.0),
            };
            let log_like = self.log_like(&params, log_weight)?;
            particles.push(Particle::new(params, log_weight, log_like));
        }
        Step::new(particles)
    }

    fn draw_from_proposal(
        &self,
        proposal: &ProposalConfig,
        rng: &mut RngHandle,
    ) -> Result<(ParamMap, f64), SmcError> {
        let mut params = ParamMap::new();
        let mut log_q = 0.0;
        for (name, center) in &proposal.center {
            let scale = proposal.scales.get(name).copied().unwrap_or(f64::NAN);
            let value = priors::normal(*center, scale)?.sample(rng);
            log_q += priors::normal_log_density(value, *center, scale);
            params.insert(name.clone(), value);
        }
        let log_p = self.priors.log_density(&params);
        Ok((params, log_p - log_q))
    }

    fn log_like(&self, params: &ParamMap, log_weight: f64) -> Result<f64, SmcError> {
        // Outside the prior support the particle carries no weight and the
        // model is never asked to evaluate it.
        if log_weight == f64::NEG_INFINITY {
            return Ok(f64::NEG_INFINITY);
        }
        let noise = match self.measurement_std_dev {
            Some(level) => level,
            None => params.get(NOISE_PARAM).copied().unwrap_or(f64::NAN),
        };
        self.likelihood.log_likelihood(params, noise)
    }
}
