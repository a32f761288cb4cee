//! Seedable, CSPRNG-backed shuffler.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};

/// Unbiased shuffler over a ChaCha-based generator.
///
/// Implements [`RngCore`], so it can be handed to anything that takes a
/// `rand::Rng`.
///
/// # Examples
///
/// ```
/// use u_derby::shuffle::SecureShuffle;
///
/// let mut a = SecureShuffle::from_seed(7);
/// let mut b = SecureShuffle::from_seed(7);
/// let cars = [1, 2, 3, 4, 5];
/// assert_eq!(a.shuffle(&cars), b.shuffle(&cars));
/// ```
#[derive(Debug, Clone)]
pub struct SecureShuffle {
    rng: StdRng,
    seed: Option<u64>,
}

impl SecureShuffle {
    /// Seeded when `seed` is `Some`, entropy-backed otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::from_seed(s),
            None => Self::from_entropy(),
        }
    }

    /// Seeds from the operating system entropy source.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            seed: None,
        }
    }

    /// Reproducible stream for a fixed seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Seed this shuffler was built from, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Returns a permuted copy of `items` (Fisher-Yates).
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut out = items.to_vec();
        self.shuffle_in_place(&mut out);
        out
    }

    pub fn shuffle_in_place<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Derives an independent child stream.
    ///
    /// Children of a seeded parent are themselves reproducible.
    pub fn fork(&mut self) -> SecureShuffle {
        Self::from_seed(self.rng.next_u64())
    }
}

impl RngCore for SecureShuffle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.rng.fill_bytes(dst)
    }
}
