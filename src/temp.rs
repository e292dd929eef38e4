//! Random suffixes for temporary file and directory names.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generator of nine-digit name suffixes for
/// [`FsExt::temp_file`](crate::FsExt::temp_file) and
/// [`FsExt::temp_dir`](crate::FsExt::temp_dir).
///
/// Each caller owns its generator; there is no process-wide state. The temp
/// helpers call [`reseed`](Self::reseed) after repeated name collisions.
///
/// # Example
///
/// ```rust
/// use swapfs::TempNames;
///
/// let mut a = TempNames::with_seed(7);
/// let mut b = TempNames::with_seed(7);
/// assert_eq!(a.next_suffix(), b.next_suffix());
/// assert_eq!(a.next_suffix().len(), 9);
/// ```
#[derive(Debug, Clone)]
pub struct TempNames {
    rng: StdRng,
}

impl TempNames {
    /// Generator seeded from the operating system's entropy source.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator, for reproducible names in tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Replace the generator state with fresh entropy.
    pub fn reseed(&mut self) {
        self.rng = StdRng::from_entropy();
    }

    /// The next suffix: nine decimal digits, zero-padded.
    pub fn next_suffix(&mut self) -> String {
        format!("{:09}", self.rng.gen_range(0..1_000_000_000u32))
    }
}

impl Default for TempNames {
    fn default() -> Self {
        Self::new()
    }
}
