//! Run State
//!
//! Everything that changes during one attempt at one level. Uses BTreeMap
//! for entities so iteration and hashing are deterministic.

use std::collections::BTreeMap;

use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::core::fixed::{from_f32, Fixed};
use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::core::rng::DeterministicRng;
use crate::game::color::ColorState;
use crate::game::config::GameConfig;
use crate::game::effects::{StatusTone, TimedEffects};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::health::{HealthChange, HealthTracker};
use crate::game::lane::{LaneIndex, Lanes};
use crate::game::matching::PlayerSignature;
use crate::game::obstacle::{Entity, EntityKind};
use crate::game::progression::stack_mode_for;
use crate::game::services::HealthSink;
use crate::game::shape::ShapeResolver;

// =============================================================================
// RULES
// =============================================================================

/// Tunables resolved into ticks and fixed point once per run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRules {
    /// Forward distance per tick at normal speed
    pub speed_per_tick: Fixed,
    /// Health gained on a match
    pub match_reward: i32,
    /// Health lost on a mismatch
    pub mismatch_penalty: i32,
    /// Speed multiplier while slowed
    pub slowdown_factor: Fixed,
    /// Slowdown length
    pub slowdown_ticks: u32,
    /// Shake amplitude
    pub shake_magnitude: Fixed,
    /// Shake length
    pub shake_ticks: u32,
    /// Status text length
    pub status_ticks: u32,
    /// Popup length (unscaled)
    pub popup_ticks: u32,
    /// Contact distance along the track
    pub hit_half_extent: Fixed,
    /// Distance behind the player at which entities are dropped
    pub despawn_distance: Fixed,
}

impl RunRules {
    /// Resolve from a config.
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            speed_per_tick: config.speed_per_tick(),
            match_reward: config.match_reward,
            mismatch_penalty: config.mismatch_penalty,
            slowdown_factor: from_f32(config.slowdown_factor),
            slowdown_ticks: config.slowdown_ticks(),
            shake_magnitude: from_f32(config.shake_magnitude),
            shake_ticks: config.shake_ticks(),
            status_ticks: config.status_ticks(),
            popup_ticks: config.popup_ticks(),
            hit_half_extent: from_f32(config.hit_half_extent),
            despawn_distance: from_f32(config.despawn_distance),
        }
    }
}

impl Default for RunRules {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

// =============================================================================
// PHASE
// =============================================================================

/// Why a run was lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GameOverReason {
    /// Hit a wall
    WallCollision = 0,
    /// Health reached zero
    HealthDepleted = 1,
}

/// Current phase of the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Active gameplay
    #[default]
    Running,
    /// Lost
    GameOver(GameOverReason),
    /// Finish line reached
    LevelComplete,
}

impl RunPhase {
    /// Whether the run has ended.
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunPhase::Running)
    }

    fn tag(self) -> u8 {
        match self {
            RunPhase::Running => 0,
            RunPhase::GameOver(reason) => 1 + reason as u8,
            RunPhase::LevelComplete => 3,
        }
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// The runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current lane
    pub lane: LaneIndex,
    /// Distance travelled along the track
    pub y: Fixed,
    /// Color cycle
    pub color: ColorState,
    /// Shape stack and composite shape
    pub shape: ShapeResolver,
}

impl PlayerState {
    /// Shape and color as seen by a gate.
    #[inline]
    pub fn signature(&self) -> PlayerSignature {
        PlayerSignature::new(self.shape.current(), self.color.current())
    }

    /// Hash player state.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.lane as u32);
        hasher.update_fixed(self.y);
        hasher.update_u32(self.color.index() as u32);
        hasher.update_u8(self.shape.current() as u8);
        for symbol in self.shape.stack().as_slice() {
            hasher.update_u8(*symbol as u8);
        }
    }
}

/// Per-run counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Gates passed with the right shape and color
    pub matches: u32,
    /// Gates hit with the wrong shape or color
    pub mismatches: u32,
    /// Shape pickups collected
    pub pickups: u32,
}

// =============================================================================
// RUN STATE
// =============================================================================

/// Complete state of one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunState {
    /// Level being played (1-based)
    pub level: u32,

    /// Current phase
    pub phase: RunPhase,

    /// Frames simulated, paused ones included
    pub tick: u32,

    /// Scaled ticks simulated (survival time)
    pub elapsed_ticks: u32,

    /// RNG seed (for verification)
    pub rng_seed: u64,

    /// Deterministic RNG state
    pub rng: DeterministicRng,

    /// Resolved tunables
    pub rules: RunRules,

    /// Lane layout
    pub lanes: Lanes,

    /// The runner
    pub player: PlayerState,

    /// Health
    pub health: HealthTracker,

    /// Timed effects
    pub effects: TimedEffects,

    /// Track entities (BTreeMap for deterministic iteration)
    pub entities: BTreeMap<u32, Entity>,

    /// Next entity ID (monotonic counter)
    pub next_entity_id: u32,

    /// Counters
    pub stats: RunStats,

    /// Events generated this tick (cleared each tick)
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl RunState {
    /// Fresh run of `level`. Invalid config values fall back to usable ones.
    pub fn new(level: u32, rng_seed: u64, config: &GameConfig) -> Self {
        let config = config.sanitized();
        let lanes = config.build_lanes();
        let start_lane = lanes.clamp(config.start_lane);

        info!(level, rng_seed, "starting run");

        Self {
            level,
            phase: RunPhase::Running,
            tick: 0,
            elapsed_ticks: 0,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            rules: RunRules::from_config(&config),
            lanes,
            player: PlayerState {
                lane: start_lane,
                y: 0,
                color: ColorState::new(config.palette.clone()),
                shape: ShapeResolver::new(stack_mode_for(level, &config)),
            },
            health: HealthTracker::new(config.max_hp, config.hp_tick_interval_ticks()),
            effects: TimedEffects::new(),
            entities: BTreeMap::new(),
            next_entity_id: 0,
            stats: RunStats::default(),
            pending_events: Vec::new(),
        }
    }

    /// Place an entity on the track. Returns its id.
    pub fn spawn(&mut self, kind: EntityKind, lane: LaneIndex, y: Fixed) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        self.entities.insert(id, Entity::new(id, kind, lane, y));
        id
    }

    /// Whether the run is still being played.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    /// End the run: lock health and cancel every timed effect.
    ///
    /// Ignored if the run already ended.
    pub fn finish(&mut self, phase: RunPhase) {
        if self.phase.is_terminal() || !phase.is_terminal() {
            return;
        }
        self.phase = phase;
        self.health.lock();

        for cancelled in self.effects.cancel_all() {
            self.push_event(GameEvent::at(
                self.tick,
                GameEventData::EffectCancelled { kind: cancelled.kind, handle: cancelled.handle },
            ));
        }

        match phase {
            RunPhase::GameOver(reason) => {
                info!(level = self.level, ?reason, survival_ticks = self.elapsed_ticks, "game over");
                self.push_event(GameEvent::game_over(self.tick, reason, self.elapsed_ticks));
            }
            RunPhase::LevelComplete => {
                info!(
                    level = self.level,
                    health = self.health.current(),
                    finish_ticks = self.elapsed_ticks,
                    "level complete"
                );
                self.push_event(GameEvent::level_completed(
                    self.tick,
                    self.health.current(),
                    self.elapsed_ticks,
                ));
            }
            RunPhase::Running => {}
        }
    }

    /// Compute state hash for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |hasher| {
            hasher.update_u32(self.level);
            hasher.update_u8(self.phase.tag());
            hasher.update_u32(self.elapsed_ticks);
            let [s0, s1] = self.rng.state();
            hasher.update_u64(s0);
            hasher.update_u64(s1);

            self.player.hash_into(hasher);

            hasher.update_i32(self.health.current());
            hasher.update_bool(self.health.is_depleted());

            self.effects.hash_into(hasher);

            // Entities in id order (BTreeMap guarantees this)
            for (id, entity) in &self.entities {
                hasher.update_u32(*id);
                hasher.update_u8(entity.kind.tag());
                hasher.update_u32(entity.lane as u32);
                hasher.update_fixed(entity.y);
            }
            hasher.update_u32(self.next_entity_id);

            hasher.update_u32(self.stats.matches);
            hasher.update_u32(self.stats.mismatches);
            hasher.update_u32(self.stats.pickups);
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }

    fn record_health_change(&mut self, change: HealthChange) {
        if change.changed() {
            self.push_event(GameEvent::at(
                self.tick,
                GameEventData::HealthChanged { old: change.old, new: change.new },
            ));
        }
    }
}

impl HealthSink for RunState {
    fn add_health(&mut self, amount: i32) -> HealthChange {
        let change = self.health.add(amount);
        self.record_health_change(change);
        change
    }

    fn reduce_health(&mut self, amount: i32) -> HealthChange {
        let change = self.health.reduce(amount);
        self.record_health_change(change);
        change
    }

    fn health(&self) -> i32 {
        self.health.current()
    }

    fn show_status(&mut self, message: &str, tone: StatusTone, duration_ticks: u32) {
        debug!(message, ?tone, "status");
        self.effects.show_status(message, tone, duration_ticks);
    }
}

// =============================================================================
// TESTS
// =============================================================================
