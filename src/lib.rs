//! # Morph Runner
//!
//! Shape/color match engine for a three-lane runner. The player morphs
//! between shapes by collecting pickups, toggles color, and must meet each
//! gate with the shape and color it demands.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MORPH RUNNER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Rules engine (deterministic)              │
//! │  ├── shape.rs    - Shape stack and composite shapes          │
//! │  ├── matching.rs - Gate evaluation                           │
//! │  ├── effects.rs  - Cancellable timed effects                 │
//! │  ├── state.rs    - Run state                                 │
//! │  ├── tick.rs     - Per-frame simulation                      │
//! │  ├── session.rs  - Restart / next level / title              │
//! │  └── replay.rs   - Transcripts and replay                    │
//! │                                                              │
//! │  analytics/      - Best-effort reporting (non-deterministic) │
//! │  ├── record.rs   - Record types                              │
//! │  ├── store.rs    - In-memory analytics tree                  │
//! │  └── dispatch.rs - Recorder, transports, delivery task       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! `core/` and `game/` use fixed-point positions, integer ticks, BTreeMap
//! and a seeded RNG. Given the same level, seed, popup history and inputs,
//! a run ends in the same state hash every time.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod analytics;

// Re-export commonly used types
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_SCALE};
pub use core::rng::DeterministicRng;
pub use game::{GameConfig, GameError, GameSession, InputFrame, RunState};
pub use analytics::{AnalyticsRecorder, AnalyticsSink};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
