//! Seeded randomness for every sampling phase.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Random source owned by one phase of one tempering position.
///
/// Every handle is seeded from the run's master seed through
/// [`derive_path_seed`], so a stream is named by what it drives (initial
/// draw, resample at `t`, chain of particle `i` at `t`) and not by the
/// thread that happens to consume it.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Handle seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Handle for the substream of `master_seed` named by `path`.
    pub fn for_path(master_seed: u64, path: &[u64]) -> Self {
        Self::from_seed(derive_path_seed(master_seed, path))
    }

    /// Uniform draw in `[0, 1)` with 53 bits of precision.
    pub fn next_unit(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// SipHash-1-3 of `(master_seed, substream)` under zero keys.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}

/// Folds [`derive_substream_seed`] over `path`, one level per component.
/// An empty path yields the master seed itself.
pub fn derive_path_seed(master_seed: u64, path: &[u64]) -> u64 {
    path.iter()
        .fold(master_seed, |seed, component| derive_substream_seed(seed, *component))
}
