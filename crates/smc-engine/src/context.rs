use smc_core::RngHandle;

use crate::determinism;
use crate::schedule::TemperingSchedule;

/// Explicit per-position state handed to every sampling phase.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    schedule: &'a TemperingSchedule,
    time_step: usize,
    num_particles: usize,
    master_seed: u64,
}

impl<'a> RunContext<'a> {
    /// Context for tempering position `time_step` (0-based).
    pub fn new(
        schedule: &'a TemperingSchedule,
        time_step: usize,
        num_particles: usize,
        master_seed: u64,
    ) -> Self {
        Self {
            schedule,
            time_step,
            num_particles,
            master_seed,
        }
    }

    /// Current tempering position.
    pub fn time_step(&self) -> usize {
        self.time_step
    }

    /// Particles per ensemble.
    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    /// Schedule being walked.
    pub fn schedule(&self) -> &TemperingSchedule {
        self.schedule
    }

    /// Tempering value at the current position.
    pub fn phi(&self) -> f64 {
        self.schedule.phi(self.time_step)
    }

    /// Increment from the previous position.
    pub fn delta_phi(&self) -> f64 {
        self.schedule.delta_phi(self.time_step)
    }

    /// RNG for the resample decision at this position.
    pub fn resample_rng(&self) -> RngHandle {
        RngHandle::from_seed(determinism::resample_seed(self.master_seed, self.time_step))
    }

    /// RNG for the chain mutating global particle `particle_index`.
    pub fn mutation_rng(&self, particle_index: usize) -> RngHandle {
        RngHandle::from_seed(determinism::mutation_seed(
            self.master_seed,
            self.time_step,
            particle_index,
        ))
    }
}
