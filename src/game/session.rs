//! Game Session
//!
//! The process-wide context: config, popup latches, level progress,
//! analytics and the run in progress. It is passed around explicitly and is
//! the only thing that survives between runs.
//!
//! ```text
//!   Title ──start_level──► Playing(run)
//!                            │
//!                            ├─ GameOver ─────restart─────► Playing(same level)
//!                            └─ LevelComplete ─restart────► Playing(same level)
//!                                             ─next───────► Playing(next level)
//!                                                         └► Title (after last)
//! ```

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::analytics::AnalyticsSink;
use crate::core::rng::derive_run_seed;
use crate::game::config::GameConfig;
use crate::game::error::GameError;
use crate::game::input::InputFrame;
use crate::game::level::{spawn_level, LevelDefinition, SpawnReport};
use crate::game::popup::PopupLatches;
use crate::game::progression::LevelProgress;
use crate::game::replay::RunTranscript;
use crate::game::services::{ProgressionSink, Services};
use crate::game::state::{RunPhase, RunState};
use crate::game::tick::{tick, TickResult};

/// Where the session is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionPhase {
    /// No run loaded
    #[default]
    Title,
    /// A run is loaded (possibly finished, waiting for restart or next)
    Playing,
}

/// Process-lifetime game context.
pub struct GameSession<A: AnalyticsSink> {
    config: GameConfig,
    levels: BTreeMap<u32, LevelDefinition>,
    popups: PopupLatches,
    progress: LevelProgress,
    analytics: A,
    session_seed: u64,
    attempt: u32,
    phase: SessionPhase,
    run: Option<RunState>,
    transcript: Option<RunTranscript>,
}

impl<A: AnalyticsSink> GameSession<A> {
    /// Session at the title screen.
    ///
    /// Levels are keyed by the number in their name; a later definition with
    /// the same number replaces an earlier one. Definitions outside
    /// `1..=level_count` are kept but cannot be started.
    pub fn new(
        config: GameConfig,
        levels: impl IntoIterator<Item = LevelDefinition>,
        analytics: A,
        session_seed: u64,
    ) -> Self {
        let mut by_number = BTreeMap::new();
        for level in levels {
            if let Some(old) = by_number.insert(level.number(), level) {
                warn!(name = %old.name, "duplicate level number, keeping the later definition");
            }
        }
        let progress = LevelProgress::new(config.level_count);
        for number in by_number.keys().filter(|n| **n == 0 || **n > progress.level_count()) {
            warn!(level = *number, level_count = progress.level_count(), "level outside the playable range");
        }

        Self {
            config,
            levels: by_number,
            popups: PopupLatches::new(),
            progress,
            analytics,
            session_seed,
            attempt: 0,
            phase: SessionPhase::Title,
            run: None,
            transcript: None,
        }
    }

    /// Load `level` and start running it.
    ///
    /// `level` must be within `1..=level_count` and have a definition.
    pub fn start_level(&mut self, level: u32) -> Result<SpawnReport, GameError> {
        let level_count = self.progress.level_count();
        if level == 0 || level > level_count {
            return Err(GameError::Configuration(format!(
                "level {level} is outside 1..={level_count}"
            )));
        }
        let definition = self.levels.get(&level).ok_or_else(|| {
            GameError::Configuration(format!("no level data for level {level}"))
        })?;

        self.progress.select(level);
        let seed = derive_run_seed(self.session_seed, level, self.attempt);
        self.attempt += 1;

        let mut run = RunState::new(level, seed, &self.config);
        let report = spawn_level(&mut run, definition);

        self.transcript = Some(RunTranscript::new(level, seed, self.popups.clone()));
        self.run = Some(run);
        self.phase = SessionPhase::Playing;
        Ok(report)
    }

    /// Advance one frame.
    ///
    /// While running, the input drives the simulation. Once the run has
    /// ended, only restart and next-level inputs do anything.
    pub fn step(&mut self, input: InputFrame) -> Result<TickResult, GameError> {
        let Some(run) = self.run.as_mut() else {
            return Ok(TickResult::default());
        };

        if run.is_running() {
            if let Some(transcript) = self.transcript.as_mut() {
                transcript.record(input);
            }
            let mut services = Services::new(&mut self.popups, &mut self.analytics, &mut self.progress);
            return Ok(tick(run, &mut services, input));
        }

        let finished = run.phase;
        if input.restart_pressed() {
            self.restart()?;
        } else if input.next_pressed() && finished == RunPhase::LevelComplete {
            self.next_level()?;
        }
        Ok(TickResult { ended: true, ..TickResult::default() })
    }

    /// Reload the current level.
    pub fn restart(&mut self) -> Result<SpawnReport, GameError> {
        let level = self.progress.current_level();
        info!(level, "restarting level");
        self.start_level(level)
    }

    /// Load the next level, or return to the title screen after the last.
    pub fn next_level(&mut self) -> Result<Option<SpawnReport>, GameError> {
        match self.progress.next_level() {
            Some(level) => self.start_level(level).map(Some),
            None => {
                self.to_title();
                Ok(None)
            }
        }
    }

    /// Drop the current run and show the title screen.
    pub fn to_title(&mut self) {
        self.run = None;
        self.transcript = None;
        self.phase = SessionPhase::Title;
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The loaded run.
    pub fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    /// Transcript of the loaded run so far.
    pub fn transcript(&self) -> Option<&RunTranscript> {
        self.transcript.as_ref()
    }

    /// Definition of `level`.
    pub fn level(&self, level: u32) -> Option<&LevelDefinition> {
        self.levels.get(&level)
    }

    /// Popup latches.
    pub fn popups(&self) -> &PopupLatches {
        &self.popups
    }

    /// Re-arm every popup.
    pub fn reset_popups(&mut self) {
        self.popups.reset();
    }

    /// Level progress.
    pub fn progress(&self) -> &LevelProgress {
        &self.progress
    }

    /// Config.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Analytics sink.
    pub fn analytics(&self) -> &A {
        &self.analytics
    }

    /// Tear down, returning the analytics sink.
    pub fn into_analytics(self) -> A {
        self.analytics
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::NullAnalytics;
    use crate::game::color::PlayerColor;
    use crate::game::level::{CatalogEntry, Placement};
    use crate::game::obstacle::RequiredShape;
    use crate::game::popup::PopupKind;
    use crate::game::replay::replay_run;
    use crate::game::shape::CompositeShape;
    use crate::game::events::GameEventData;
    use crate::game::matching::MatchOutcome;
    use crate::game::state::GameOverReason;

    fn level(number: u32, with_wall: bool) -> LevelDefinition {
        let mut placements = vec![
            Placement { lane_index: 1, obstacle_index: 0, spawn_y: 2.0 },
            Placement { lane_index: 1, obstacle_index: 2, spawn_y: 6.0 },
        ];
        if with_wall {
            placements.push(Placement { lane_index: 1, obstacle_index: 1, spawn_y: 4.0 });
        }
        LevelDefinition {
            name: format!("Level{number}"),
            catalog: vec![
                CatalogEntry::Obstacle {
                    shape: RequiredShape::Shape(CompositeShape::Triangle),
                    color: PlayerColor::Black,
                },
                CatalogEntry::Wall,
                CatalogEntry::Finish,
            ],
            placements,
        }
    }

    fn session() -> GameSession<NullAnalytics> {
        let config = GameConfig { level_count: 2, ..GameConfig::default() };
        GameSession::new(config, vec![level(1, false), level(2, true)], NullAnalytics, 5)
    }

    fn run_until_end(session: &mut GameSession<NullAnalytics>) -> Vec<TickResult> {
        let mut results = Vec::new();
        for _ in 0..2000 {
            let result = session.step(InputFrame::new()).unwrap();
            let ended = result.ended;
            results.push(result);
            if ended {
                return results;
            }
        }
        panic!("run did not end");
    }

    fn popups_shown(results: &[TickResult]) -> Vec<PopupKind> {
        results
            .iter()
            .flat_map(|r| &r.events)
            .filter_map(|e| match e.data {
                GameEventData::PopupShown { kind } => Some(kind),
                _ => None,
            })
            .collect()
    }

    fn outcomes(results: &[TickResult]) -> Vec<MatchOutcome> {
        results
            .iter()
            .flat_map(|r| &r.events)
            .filter_map(|e| match e.data {
                GameEventData::ObstacleResolved { outcome, .. } => Some(outcome),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_starts_at_title() {
        let mut session = session();
        assert_eq!(session.phase(), SessionPhase::Title);
        assert!(session.step(InputFrame::new()).unwrap().events.is_empty());
    }

    #[test]
    fn test_missing_level_is_config_error() {
        let mut session = session();
        assert!(matches!(session.start_level(3), Err(GameError::Configuration(_))));
    }

    #[test]
    fn test_level_beyond_level_count_rejected() {
        let config = GameConfig { level_count: 2, ..GameConfig::default() };
        let levels = vec![level(1, false), level(2, true), level(3, false)];
        let mut session = GameSession::new(config, levels, NullAnalytics, 5);

        assert!(matches!(session.start_level(3), Err(GameError::Configuration(_))));
        assert!(matches!(session.start_level(0), Err(GameError::Configuration(_))));
        assert_eq!(session.phase(), SessionPhase::Title);

        session.start_level(2).unwrap();
        session.restart().unwrap();
        assert_eq!(session.run().unwrap().level, 2);
        assert_eq!(session.transcript().unwrap().level, 2);
    }

    #[test]
    fn test_popup_shown_once_across_restart_and_next_level() {
        let mut session = session();
        session.start_level(1).unwrap();
        let first = run_until_end(&mut session);
        assert_eq!(outcomes(&first), vec![MatchOutcome::ShapeMismatch]);
        assert_eq!(popups_shown(&first), vec![PopupKind::ShapeMismatch]);
        assert!(first.iter().any(|r| r.paused));

        session.step(InputFrame::restart()).unwrap();
        let again = run_until_end(&mut session);
        assert_eq!(outcomes(&again), vec![MatchOutcome::ShapeMismatch]);
        assert!(popups_shown(&again).is_empty());
        assert!(again.iter().all(|r| !r.paused));
        assert_eq!(session.run().unwrap().phase, RunPhase::LevelComplete);

        session.step(InputFrame::next()).unwrap();
        assert_eq!(session.run().unwrap().level, 2);
        let next = run_until_end(&mut session);
        assert_eq!(
            outcomes(&next),
            vec![MatchOutcome::ShapeMismatch, MatchOutcome::WallCollision]
        );
        assert!(popups_shown(&next).is_empty());
        assert!(next.iter().all(|r| !r.paused));
    }

    #[test]
    fn test_popup_latches_survive_restart() {
        let mut session = session();
        session.start_level(1).unwrap();
        run_until_end(&mut session);
        assert_eq!(session.run().unwrap().phase, RunPhase::LevelComplete);
        assert!(session.popups().has_shown(PopupKind::ShapeMismatch));

        session.step(InputFrame::restart()).unwrap();
        let transcript = session.transcript().unwrap();
        assert!(transcript.popups_at_start.has_shown(PopupKind::ShapeMismatch));
        assert!(session.run().unwrap().is_running());
    }

    #[test]
    fn test_next_level_then_title() {
        let mut session = session();
        session.start_level(1).unwrap();
        run_until_end(&mut session);

        session.step(InputFrame::next()).unwrap();
        assert_eq!(session.run().unwrap().level, 2);

        // Level 2 has a wall in the way
        run_until_end(&mut session);
        assert_eq!(
            session.run().unwrap().phase,
            RunPhase::GameOver(GameOverReason::WallCollision)
        );

        // Next is ignored after a loss
        session.step(InputFrame::next()).unwrap();
        assert_eq!(session.run().unwrap().level, 2);
        assert!(!session.run().unwrap().is_running());

        session.step(InputFrame::restart()).unwrap();
        assert!(session.run().unwrap().is_running());

        // Dodge the wall, come back for the finish line
        session.step(InputFrame::left()).unwrap();
        for _ in 0..99 {
            session.step(InputFrame::new()).unwrap();
        }
        session.step(InputFrame::right()).unwrap();
        run_until_end(&mut session);
        assert_eq!(session.run().unwrap().phase, RunPhase::LevelComplete);
        assert!(session.progress().is_completed(2));

        // Past the last level
        session.step(InputFrame::next()).unwrap();
        assert_eq!(session.phase(), SessionPhase::Title);
        assert!(session.run().is_none());
    }

    #[test]
    fn test_restart_uses_fresh_seed() {
        let mut session = session();
        session.start_level(1).unwrap();
        let first = session.run().unwrap().rng_seed;
        session.restart().unwrap();
        assert_ne!(session.run().unwrap().rng_seed, first);
    }

    #[test]
    fn test_transcript_replays_to_same_hash() {
        let mut session = session();
        session.start_level(1).unwrap();
        session.step(InputFrame::color()).unwrap();
        run_until_end(&mut session);

        let run = session.run().unwrap();
        let transcript = session.transcript().unwrap();
        let replay = replay_run(session.level(1).unwrap(), session.config(), transcript);
        assert_eq!(replay.state.compute_hash(), run.compute_hash());
    }
}
