//! Run Transcripts and Replay
//!
//! A run is fully determined by its level, seed, the popup latches it
//! started with and its inputs. The transcript stores exactly that, encoded
//! with bincode; replaying it with fresh collaborators must land on the same
//! state hash as the original run.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::analytics::NullAnalytics;
use crate::core::hash::{StateHash, StateHasher};
use crate::game::config::GameConfig;
use crate::game::error::GameError;
use crate::game::events::GameEvent;
use crate::game::input::{InputFrame, InputLog};
use crate::game::level::{spawn_level, LevelDefinition};
use crate::game::popup::{PopupKind, PopupLatches};
use crate::game::progression::LevelProgress;
use crate::game::services::Services;
use crate::game::state::RunState;
use crate::game::tick::tick;

/// Everything needed to reproduce one run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTranscript {
    /// Level played
    pub level: u32,
    /// Run seed
    pub seed: u64,
    /// Popup latches when the run started
    pub popups_at_start: PopupLatches,
    /// Inputs, one per tick
    pub inputs: InputLog,
}

impl RunTranscript {
    /// Empty transcript for a run about to start.
    pub fn new(level: u32, seed: u64, popups_at_start: PopupLatches) -> Self {
        Self { level, seed, popups_at_start, inputs: InputLog::new() }
    }

    /// Append the input for the next tick.
    pub fn record(&mut self, frame: InputFrame) {
        let step = self.inputs.step_count;
        self.inputs.record(step, frame);
    }

    /// Ticks recorded.
    pub fn tick_count(&self) -> u32 {
        self.inputs.step_count
    }

    /// Binary encoding.
    pub fn encode(&self) -> Result<Vec<u8>, GameError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from [`RunTranscript::encode`] output.
    pub fn decode(bytes: &[u8]) -> Result<Self, GameError> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// Digest of the transcript contents.
    pub fn digest(&self) -> StateHash {
        let mut hasher = StateHasher::for_transcript();
        hasher.update_u32(self.level);
        hasher.update_u64(self.seed);
        for kind in [PopupKind::ShapeMismatch, PopupKind::ColorMismatch, PopupKind::BothMismatch] {
            hasher.update_bool(self.popups_at_start.has_shown(kind));
        }
        hasher.update_u32(self.inputs.step_count);
        for entry in self.inputs.entries() {
            hasher.update_u32(entry.step);
            hasher.update_u8(entry.frame.flags);
        }
        hasher.finalize()
    }
}

/// Result of a replay.
#[derive(Debug)]
pub struct ReplayOutcome {
    /// Final run state
    pub state: RunState,
    /// Every event, in tick order
    pub events: Vec<GameEvent>,
    /// Popup latches after the run
    pub popups: PopupLatches,
}

/// Re-simulate a run from its transcript.
///
/// Analytics are discarded and progression is a throwaway copy, so a replay
/// has no side effects.
pub fn replay_run(
    definition: &LevelDefinition,
    config: &GameConfig,
    transcript: &RunTranscript,
) -> ReplayOutcome {
    if definition.number() != transcript.level {
        warn!(
            level = transcript.level,
            definition = %definition.name,
            "replaying transcript against a differently numbered level"
        );
    }

    let mut state = RunState::new(transcript.level, transcript.seed, config);
    spawn_level(&mut state, definition);

    let mut popups = transcript.popups_at_start.clone();
    let mut analytics = NullAnalytics;
    let mut progress = LevelProgress::starting_at(transcript.level, config.level_count);
    let mut events = Vec::new();

    for (_, frame) in transcript.inputs.replay_iter() {
        let mut services = Services::new(&mut popups, &mut analytics, &mut progress);
        let result = tick(&mut state, &mut services, frame);
        events.extend(result.events);
        if result.ended {
            break;
        }
    }

    info!(
        level = transcript.level,
        ticks = state.tick,
        hash = %hex::encode(state.compute_hash()),
        "replay finished"
    );

    ReplayOutcome { state, events, popups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::level::{CatalogEntry, Placement};
    use crate::game::color::PlayerColor;
    use crate::game::obstacle::RequiredShape;
    use crate::game::shape::CompositeShape;
    use crate::game::state::RunPhase;

    fn level() -> LevelDefinition {
        LevelDefinition {
            name: "Level1".into(),
            catalog: vec![
                CatalogEntry::Obstacle {
                    shape: RequiredShape::Shape(CompositeShape::Circle),
                    color: PlayerColor::Red,
                },
                CatalogEntry::Wall,
                CatalogEntry::Finish,
            ],
            placements: vec![
                Placement { lane_index: 1, obstacle_index: 0, spawn_y: 3.0 },
                Placement { lane_index: 0, obstacle_index: 1, spawn_y: 5.0 },
                Placement { lane_index: 1, obstacle_index: 2, spawn_y: 9.0 },
            ],
        }
    }

    fn transcript() -> RunTranscript {
        let mut t = RunTranscript::new(1, 42, PopupLatches::new());
        for step in 0..400u32 {
            let frame = match step {
                5 => InputFrame::color(),
                20 => InputFrame::left(),
                30 => InputFrame::right(),
                _ => InputFrame::new(),
            };
            t.record(frame);
        }
        t
    }

    #[test]
    fn test_encode_decode() {
        let t = transcript();
        let bytes = t.encode().unwrap();
        let decoded = RunTranscript::decode(&bytes).unwrap();
        assert_eq!(decoded, t);
        assert_eq!(decoded.digest(), t.digest());
    }

    #[test]
    fn test_decode_garbage_is_transcript_error() {
        assert!(matches!(RunTranscript::decode(&[0xFF, 0x01]), Err(GameError::Transcript(_))));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let config = GameConfig::default();
        let t = transcript();
        let a = replay_run(&level(), &config, &t);
        let b = replay_run(&level(), &config, &t);
        assert_eq!(a.state.compute_hash(), b.state.compute_hash());
        assert_eq!(a.events, b.events);
        assert_eq!(a.state.phase, RunPhase::LevelComplete);
    }

    #[test]
    fn test_different_inputs_diverge() {
        let config = GameConfig::default();
        let a = replay_run(&level(), &config, &transcript());

        let mut idle = RunTranscript::new(1, 42, PopupLatches::new());
        for _ in 0..400 {
            idle.record(InputFrame::new());
        }
        let b = replay_run(&level(), &config, &idle);
        assert_ne!(a.state.compute_hash(), b.state.compute_hash());
    }

    #[test]
    fn test_latched_popups_change_the_run() {
        let config = GameConfig::default();
        let mut idle = RunTranscript::new(1, 42, PopupLatches::new());
        for _ in 0..400 {
            idle.record(InputFrame::new());
        }
        let fresh = replay_run(&level(), &config, &idle);

        let mut latched = PopupLatches::new();
        latched.try_show(PopupKind::ColorMismatch);
        idle.popups_at_start = latched;
        let seen = replay_run(&level(), &config, &idle);

        assert_ne!(fresh.state.compute_hash(), seen.state.compute_hash());
    }
}
