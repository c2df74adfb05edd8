//! Core deterministic primitives.
//!
//! Fixed-point positions, a seeded RNG and state hashing. Everything in
//! `game/` builds on these so that a run can be replayed and checked.

pub mod fixed;
pub mod rng;
pub mod hash;

pub use fixed::{Fixed, FIXED_ONE, FIXED_SCALE};
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
