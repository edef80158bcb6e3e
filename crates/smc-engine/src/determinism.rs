use smc_core::rng::derive_path_seed;

const INIT_TAG: u64 = 0x1A17;
const RESAMPLE_TAG: u64 = 0x2E5A;
const MUTATE_TAG: u64 = 0x3C4A;

/// Seed for drawing the initial ensemble.
pub fn init_seed(master_seed: u64) -> u64 {
    derive_path_seed(master_seed, &[INIT_TAG])
}

/// Seed for the multinomial resample at tempering position `time_step`.
pub fn resample_seed(master_seed: u64, time_step: usize) -> u64 {
    derive_path_seed(master_seed, &[RESAMPLE_TAG, time_step as u64])
}

/// Seed for the chain that mutates global particle `particle_index` at
/// tempering position `time_step`. Independent of the worker that runs it.
pub fn mutation_seed(master_seed: u64, time_step: usize, particle_index: usize) -> u64 {
    derive_path_seed(
        master_seed,
        &[MUTATE_TAG, time_step as u64, particle_index as u64],
    )
}
