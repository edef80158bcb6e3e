#![deny(missing_docs)]
#![doc = "Particle ensemble data model and collaborator contracts for the SMC engine."]

pub mod covariance;
pub mod errors;
pub mod provenance;
pub mod rng;
pub mod step;

mod params;
mod particle;
mod step_list;

pub use covariance::{Covariance, CovarianceFactor};
pub use errors::{ErrorInfo, SmcError};
pub use params::{from_vector, param_names, to_vector, ParamMap, NOISE_PARAM};
pub use particle::Particle;
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_path_seed, derive_substream_seed, RngHandle};
pub use step::{log_sum_exp, Step};
pub use step_list::StepList;

/// Black-box model being calibrated: maps a parameter vector to simulated
/// observables. Must be deterministic in its parameters.
pub trait Model: Send + Sync {
    /// Evaluates the model at `params`.
    fn evaluate(&self, params: &ParamMap) -> Result<Vec<f64>, SmcError>;
}

impl<M: Model + ?Sized> Model for std::sync::Arc<M> {
    fn evaluate(&self, params: &ParamMap) -> Result<Vec<f64>, SmcError> {
        (**self).evaluate(params)
    }
}

/// Log likelihood of the data under the model at a parameter vector and a
/// measurement noise level.
pub trait Likelihood: Send + Sync {
    /// Returns `log L(params)`. Values outside the support are `-inf`, not
    /// errors.
    fn log_likelihood(&self, params: &ParamMap, std_dev: f64) -> Result<f64, SmcError>;
}

impl<L: Likelihood + ?Sized> Likelihood for std::sync::Arc<L> {
    fn log_likelihood(&self, params: &ParamMap, std_dev: f64) -> Result<f64, SmcError> {
        (**self).log_likelihood(params, std_dev)
    }
}

/// Markov-chain kernel used to diversify particles.
///
/// A kernel run at tempering value `phi` must leave the tempered target
/// `p(θ) L(θ)^phi` invariant. Each worker owns its own instance, configured
/// afresh for every particle it mutates.
pub trait MarkovKernel: Send {
    /// Starts a chain at `initial`. When `fix_noise` is set the likelihood is
    /// evaluated at `noise_level`, otherwise the noise level is read from the
    /// chain state.
    fn configure(
        &mut self,
        initial: &ParamMap,
        fix_noise: bool,
        noise_level: f64,
    ) -> Result<(), SmcError>;

    /// Advances the chain by `num_steps` transitions after `burn_in`
    /// discarded ones, proposing with `covariance` and weighting the
    /// likelihood by `phi`.
    fn run(
        &mut self,
        num_steps: usize,
        burn_in: usize,
        covariance: &Covariance,
        phi: f64,
        rng: &mut RngHandle,
    ) -> Result<(), SmcError>;

    /// Terminal chain state restricted to `param_names`.
    fn terminal_state(&self, param_names: &[String]) -> Result<ParamMap, SmcError>;

    /// Log likelihood at the terminal state.
    fn terminal_log_likelihood(&self) -> f64;

    /// Fraction of proposals accepted since the last `configure`, if tracked.
    fn acceptance_rate(&self) -> Option<f64> {
        None
    }
}
