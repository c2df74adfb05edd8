//! Deterministic Random Number Generator
//!
//! Xorshift128+ seeded through SplitMix64. The rules engine itself draws no
//! randomness; the RNG only feeds camera-shake jitter, which is still part of
//! the hashed run state, so it has to replay identically.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use super::fixed::Fixed;

/// Deterministic PRNG using Xorshift128+.
///
/// # Example
///
/// ```
/// use morph_runner::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random Fixed in range [0, max).
    #[inline]
    pub fn next_fixed(&mut self, max: Fixed) -> Fixed {
        if max <= 0 {
            return 0;
        }
        let raw = (self.next_u64() >> 32) as u32;
        ((raw as i64 * max as i64) >> 32) as Fixed
    }

    /// Generate a random Fixed in range [-magnitude, magnitude).
    #[inline]
    pub fn next_signed(&mut self, magnitude: Fixed) -> Fixed {
        if magnitude <= 0 {
            return 0;
        }
        let span = magnitude.saturating_mul(2);
        self.next_fixed(span) - magnitude
    }

    /// Get current state (for checkpointing).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive the seed for one attempt at a level.
///
/// Restarting a level gets a fresh attempt number and so a fresh seed,
/// while the whole session stays reproducible from `session_seed`.
pub fn derive_run_seed(session_seed: u64, level: u32, attempt: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"MORPH_RUNNER_SEED_V1");
    hasher.update(session_seed.to_le_bytes());
    hasher.update(level.to_le_bytes());
    hasher.update(attempt.to_le_bytes());
    let hash = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);
        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_signed_range() {
        let mut rng = DeterministicRng::new(9999);
        let magnitude = to_fixed(0.3);
        for _ in 0..1000 {
            let val = rng.next_signed(magnitude);
            assert!(val >= -magnitude && val < magnitude);
        }
        assert_eq!(rng.next_signed(0), 0);
    }

    #[test]
    fn test_derive_run_seed() {
        let seed1 = derive_run_seed(7, 1, 0);
        assert_eq!(seed1, derive_run_seed(7, 1, 0));
        assert_ne!(seed1, derive_run_seed(7, 1, 1));
        assert_ne!(seed1, derive_run_seed(7, 2, 0));
    }
}
