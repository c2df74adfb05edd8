//! Game Logic Module
//!
//! The rules engine. Deterministic and single-threaded; everything outside
//! the engine is reached through the traits in `services`.
//!
//! ## Module Structure
//!
//! - `config`: Tunables, JSON and environment overrides
//! - `shape`, `color`, `lane`: Player shape stack, color cycle, lanes
//! - `obstacle`, `matching`: Track entities and gate evaluation
//! - `health`, `effects`, `popup`: Health, timed effects, one-shot popups
//! - `services`: Collaborator traits
//! - `progression`, `level`: Level order and level data
//! - `input`, `events`: Per-tick input and output
//! - `state`, `tick`: Run state and the simulation loop
//! - `session`, `replay`: Process context and run verification

pub mod config;
pub mod error;
pub mod shape;
pub mod color;
pub mod lane;
pub mod obstacle;
pub mod matching;
pub mod health;
pub mod effects;
pub mod popup;
pub mod services;
pub mod progression;
pub mod level;
pub mod input;
pub mod events;
pub mod state;
pub mod tick;
pub mod session;
pub mod replay;

// Re-export key types
pub use config::GameConfig;
pub use error::GameError;
pub use shape::{CompositeShape, ShapeResolver, ShapeStack, ShapeSymbol, StackMode};
pub use color::{ColorState, PlayerColor};
pub use matching::{evaluate, MatchEvaluator, MatchOutcome};
pub use input::InputFrame;
pub use events::{GameEvent, GameEventData};
pub use level::LevelDefinition;
pub use state::{RunPhase, RunState};
pub use tick::{tick, TickResult};
pub use session::{GameSession, SessionPhase};
pub use replay::{replay_run, RunTranscript};
