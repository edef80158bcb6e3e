use sha2::{Digest, Sha256};
use smc_core::{Particle, Step, StepList};

fn update_particle(hasher: &mut Sha256, particle: &Particle) {
    hasher.update((particle.params().len() as u64).to_le_bytes());
    for (name, value) in particle.params() {
        hasher.update((name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(value.to_bits().to_le_bytes());
    }
    hasher.update(particle.log_weight().to_bits().to_le_bytes());
    hasher.update(particle.log_like().to_bits().to_le_bytes());
}

fn update_step(hasher: &mut Sha256, step: &Step) {
    hasher.update((step.len() as u64).to_le_bytes());
    for particle in step.particles() {
        update_particle(hasher, particle);
    }
}

fn hex(hasher: Sha256) -> String {
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<String>()
}

/// Bit-exact hash of an ensemble: parameter names, values, weights and
/// likelihoods in particle order.
pub fn canonical_step_hash(step: &Step) -> String {
    let mut hasher = Sha256::new();
    update_step(&mut hasher, step);
    hex(hasher)
}

/// Bit-exact hash of a whole run history.
pub fn canonical_step_list_hash(steps: &StepList) -> String {
    let mut hasher = Sha256::new();
    hasher.update((steps.len() as u64).to_le_bytes());
    for step in steps {
        update_step(&mut hasher, step);
    }
    hex(hasher)
}
