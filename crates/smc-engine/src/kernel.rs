use std::sync::Arc;

use rand_distr::{Distribution, StandardNormal};
use smc_core::errors::{codes, ErrorInfo};
use smc_core::{
    from_vector, Covariance, Likelihood, MarkovKernel, ParamMap, RngHandle, SmcError, NOISE_PARAM,
};

use crate::priors::PriorSet;

/// Random-walk Metropolis kernel targeting the tempered posterior
/// `p(θ) L(θ)^phi`.
///
/// Proposals are `x + A z` with `z ~ N(0, I)` and `A Aᵀ` the supplied
/// covariance. The proposal is symmetric, so the acceptance ratio only
/// involves the tempered target.
#[derive(Debug)]
pub struct TemperedMetropolis<L> {
    likelihood: Arc<L>,
    priors: Arc<PriorSet>,
    chain: Option<ChainState>,
}

impl<L> Clone for TemperedMetropolis<L> {
    fn clone(&self) -> Self {
        Self {
            likelihood: Arc::clone(&self.likelihood),
            priors: Arc::clone(&self.priors),
            chain: self.chain.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct ChainState {
    names: Vec<String>,
    position: Vec<f64>,
    log_prior: f64,
    log_like: f64,
    fixed_noise: Option<f64>,
    accepted: usize,
    proposed: usize,
}

impl<L: Likelihood> TemperedMetropolis<L> {
    /// Kernel evaluating `likelihood` under `priors`.
    pub fn new(likelihood: Arc<L>, priors: Arc<PriorSet>) -> Self {
        Self {
            likelihood,
            priors,
            chain: None,
        }
    }

    fn evaluate(
        &self,
        params: &ParamMap,
        fixed_noise: Option<f64>,
    ) -> Result<(f64, f64), SmcError> {
        let log_prior = self.priors.log_density(params);
        if log_prior == f64::NEG_INFINITY {
            return Ok((log_prior, f64::NEG_INFINITY));
        }
        let noise = match fixed_noise {
            Some(level) => level,
            None => params.get(NOISE_PARAM).copied().ok_or_else(|| {
                SmcError::Kernel(
                    ErrorInfo::new(codes::KERNEL_FAILURE, "chain state carries no noise level")
                        .with_context("parameter", NOISE_PARAM),
                )
            })?,
        };
        let log_like = self.likelihood.log_likelihood(params, noise)?;
        Ok((log_prior, log_like))
    }

    fn chain(&self) -> Result<&ChainState, SmcError> {
        self.chain
            .as_ref()
            .ok_or_else(|| SmcError::kernel("kernel used before configure"))
    }
}

fn tempered(log_like: f64, phi: f64) -> f64 {
    if phi == 0.0 {
        0.0
    } else {
        phi * log_like
    }
}

impl<L: Likelihood> MarkovKernel for TemperedMetropolis<L> {
    fn configure(
        &mut self,
        initial: &ParamMap,
        fix_noise: bool,
        noise_level: f64,
    ) -> Result<(), SmcError> {
        let fixed_noise = fix_noise.then_some(noise_level);
        let (log_prior, log_like) = self.evaluate(initial, fixed_noise)?;
        self.chain = Some(ChainState {
            names: initial.keys().cloned().collect(),
            position: initial.values().copied().collect(),
            log_prior,
            log_like,
            fixed_noise,
            accepted: 0,
            proposed: 0,
        });
        Ok(())
    }

    fn run(
        &mut self,
        num_steps: usize,
        burn_in: usize,
        covariance: &Covariance,
        phi: f64,
        rng: &mut RngHandle,
    ) -> Result<(), SmcError> {
        let mut state = self.chain()?.clone();
        if covariance.names() != state.names.as_slice() {
            return Err(SmcError::Kernel(
                ErrorInfo::new(
                    codes::KERNEL_FAILURE,
                    "proposal covariance does not match chain parameters",
                )
                .with_context("chain", state.names.join(","))
                .with_context("covariance", covariance.names().join(",")),
            ));
        }
        let factor = covariance.factor()?;
        let dim = state.names.len();

        for iteration in 0..burn_in + num_steps {
            let standard: Vec<f64> = (0..dim)
                .map(|_| -> f64 { StandardNormal.sample(&mut *rng) })
                .collect();
            let step = factor.transform(&standard);
            let candidate: Vec<f64> = state
                .position
                .iter()
                .zip(&step)
                .map(|(x, dx)| x + dx)
                .collect();
            let candidate_params = from_vector(&state.names, &candidate);
            let (log_prior, log_like) = self.evaluate(&candidate_params, state.fixed_noise)?;

            let accepted = if log_prior == f64::NEG_INFINITY {
                false
            } else {
                let log_ratio = (log_prior + tempered(log_like, phi))
                    - (state.log_prior + tempered(state.log_like, phi));
                rng.next_unit().ln() < log_ratio
            };
            if iteration >= burn_in {
                state.proposed += 1;
                if accepted {
                    state.accepted += 1;
                }
            }
            if accepted {
                state.position = candidate;
                state.log_prior = log_prior;
                state.log_like = log_like;
            }
        }
        self.chain = Some(state);
        Ok(())
    }

    fn terminal_state(&self, param_names: &[String]) -> Result<ParamMap, SmcError> {
        let state = self.chain()?;
        let full = from_vector(&state.names, &state.position);
        param_names
            .iter()
            .map(|name| {
                full.get(name)
                    .map(|value| (name.clone(), *value))
                    .ok_or_else(|| {
                        SmcError::Kernel(
                            ErrorInfo::new(codes::KERNEL_FAILURE, "parameter not in chain state")
                                .with_context("parameter", name.clone()),
                        )
                    })
            })
            .collect()
    }

    fn terminal_log_likelihood(&self) -> f64 {
        self.chain
            .as_ref()
            .map(|state| state.log_like)
            .unwrap_or(f64::NEG_INFINITY)
    }

    fn acceptance_rate(&self) -> Option<f64> {
        let state = self.chain.as_ref()?;
        (state.proposed > 0).then(|| state.accepted as f64 / state.proposed as f64)
    }
}
