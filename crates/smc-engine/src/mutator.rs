use smc_core::errors::{codes, ErrorInfo};
use smc_core::{Covariance, MarkovKernel, Particle, SmcError, Step, NOISE_PARAM};
use tracing::debug;

use crate::comm::{partition, Communicator};
use crate::context::RunContext;

/// Result of one mutation phase.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    /// Ensemble after mutation, particles in their original order.
    pub step: Step,
    /// Fraction of particles whose parameters changed.
    pub mutation_ratio: f64,
    /// Mean kernel acceptance rate over particles, when the kernel tracks it.
    pub acceptance_rate: Option<f64>,
}

/// Diversifies an ensemble with one short Markov chain per particle.
///
/// The proposal covariance is the ensemble's weighted covariance. Particles
/// are split into contiguous blocks, one per worker, and every worker runs
/// its own copy of the kernel.
#[derive(Debug, Clone)]
pub struct ParticleMutator<K> {
    kernel: K,
    num_mcmc_steps: usize,
    burn_in: usize,
    measurement_std_dev: Option<f64>,
}

impl<K> ParticleMutator<K>
where
    K: MarkovKernel + Clone + Sync,
{
    /// Mutator running `num_mcmc_steps` transitions (after `burn_in`) per
    /// particle.
    pub fn new(
        kernel: K,
        num_mcmc_steps: usize,
        burn_in: usize,
        measurement_std_dev: Option<f64>,
    ) -> Self {
        Self {
            kernel,
            num_mcmc_steps,
            burn_in,
            measurement_std_dev,
        }
    }

    /// Mutates every particle of `step` at the context's tempering value.
    pub fn mutate_particles<C: Communicator>(
        &self,
        comm: &C,
        step: &Step,
        ctx: &RunContext<'_>,
    ) -> Result<MutationOutcome, SmcError> {
        let covariance = step.covariance()?;
        let copies = comm.broadcast(&covariance);
        let indexed: Vec<(usize, Particle)> =
            step.particles().iter().cloned().enumerate().collect();
        let blocks = partition(indexed, comm.size());
        debug!(
            time_step = ctx.time_step(),
            blocks = blocks.len(),
            largest = blocks.first().map(Vec::len).unwrap_or(0),
            "scattering particles"
        );

        let gathered = comm.scatter_gather(blocks, |rank, block| {
            let mut worker = Worker::new(rank, self.kernel.clone());
            worker.mutate_block(block, &copies[rank], self, ctx)
        })?;

        let mut particles = Vec::with_capacity(step.len());
        let mut mutated = 0usize;
        let mut acceptance = Vec::new();
        for result in gathered.into_iter().flatten() {
            if result.mutated {
                mutated += 1;
            }
            acceptance.extend(result.acceptance_rate);
            particles.push(result.particle);
        }
        let mut new_step = step.clone();
        new_step.set_particles(particles)?;
        let mutation_ratio = if step.is_empty() {
            0.0
        } else {
            mutated as f64 / step.len() as f64
        };
        let acceptance_rate = (!acceptance.is_empty())
            .then(|| acceptance.iter().sum::<f64>() / acceptance.len() as f64);
        Ok(MutationOutcome {
            step: new_step,
            mutation_ratio,
            acceptance_rate,
        })
    }
}

/// Outcome for one particle, in partition order.
#[derive(Debug)]
struct MutatedParticle {
    particle: Particle,
    mutated: bool,
    acceptance_rate: Option<f64>,
}

/// Worker role: owns one kernel instance and the block it was handed.
#[derive(Debug)]
pub struct Worker<K> {
    rank: usize,
    kernel: K,
}

impl<K: MarkovKernel> Worker<K> {
    /// Worker `rank` driving `kernel`.
    pub fn new(rank: usize, kernel: K) -> Self {
        Self { rank, kernel }
    }

    /// Rank within the worker group.
    pub fn rank(&self) -> usize {
        self.rank
    }

    fn mutate_block<M>(
        &mut self,
        block: Vec<(usize, Particle)>,
        covariance: &Covariance,
        mutator: &ParticleMutator<M>,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<MutatedParticle>, SmcError> {
        block
            .into_iter()
            .map(|(index, particle)| self.mutate_one(index, particle, covariance, mutator, ctx))
            .collect()
    }

    fn mutate_one<M>(
        &mut self,
        index: usize,
        particle: Particle,
        covariance: &Covariance,
        mutator: &ParticleMutator<M>,
        ctx: &RunContext<'_>,
    ) -> Result<MutatedParticle, SmcError> {
        let noise_level = match mutator.measurement_std_dev {
            Some(level) => level,
            None => particle.params().get(NOISE_PARAM).copied().ok_or_else(|| {
                SmcError::Kernel(
                    ErrorInfo::new(codes::KERNEL_FAILURE, "particle carries no noise level")
                        .with_context("particle", index.to_string())
                        .with_context("worker", self.rank.to_string()),
                )
            })?,
        };
        let mut rng = ctx.mutation_rng(index);
        self.kernel.configure(
            particle.params(),
            mutator.measurement_std_dev.is_some(),
            noise_level,
        )?;
        self.kernel.run(
            mutator.num_mcmc_steps,
            mutator.burn_in,
            covariance,
            ctx.phi(),
            &mut rng,
        )?;
        let names: Vec<String> = particle.params().keys().cloned().collect();
        let params = self.kernel.terminal_state(&names)?;
        let acceptance_rate = self.kernel.acceptance_rate();
        if &params == particle.params() {
            return Ok(MutatedParticle {
                particle,
                mutated: false,
                acceptance_rate,
            });
        }
        let moved = particle.moved_to(params, self.kernel.terminal_log_likelihood());
        Ok(MutatedParticle {
            particle: moved,
            mutated: true,
            acceptance_rate,
        })
    }
}
