//! Game Events
//!
//! Events generated during simulation for logging, replay and tests.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::game::color::PlayerColor;
use crate::game::effects::{EffectKind, TaskHandle};
use crate::game::lane::LaneIndex;
use crate::game::matching::MatchOutcome;
use crate::game::popup::PopupKind;
use crate::game::shape::{CompositeShape, ShapeSymbol};
use crate::game::state::GameOverReason;

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Run ending first
    Terminal = 0,
    /// Then collisions
    Collision = 1,
    /// Then health
    Health = 2,
    /// Then timed effects
    Effect = 3,
    /// Then player actions
    Player = 4,
    /// Lowest priority
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Player switched lanes
    LaneChanged {
        from: LaneIndex,
        to: LaneIndex,
    },

    /// Player toggled color
    ColorChanged {
        color: PlayerColor,
    },

    /// Player picked up a shape
    ShapeChanged {
        entity_id: u32,
        symbol: ShapeSymbol,
        shape: CompositeShape,
    },

    /// Player touched a gate
    ObstacleResolved {
        entity_id: u32,
        outcome: MatchOutcome,
        y: Fixed,
    },

    /// Health moved
    HealthChanged {
        old: i32,
        new: i32,
    },

    /// A one-shot popup was displayed
    PopupShown {
        kind: PopupKind,
    },

    /// Slowdown started (any running one was replaced)
    SlowdownStarted {
        handle: TaskHandle,
    },

    /// Camera shake started
    ShakeStarted {
        handle: TaskHandle,
    },

    /// A timed effect ran out
    EffectExpired {
        kind: EffectKind,
    },

    /// A timed effect was cut short
    EffectCancelled {
        kind: EffectKind,
        handle: TaskHandle,
    },

    /// Run lost
    GameOver {
        reason: GameOverReason,
        survival_ticks: u32,
    },

    /// Finish line reached
    LevelCompleted {
        health: i32,
        finish_ticks: u32,
    },

    /// A level placement was rejected
    SpawnSkipped {
        placement: usize,
        reason: String,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u32,

    /// Processing priority
    pub priority: EventPriority,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u32, priority: EventPriority, data: GameEventData) -> Self {
        Self { tick, priority, data }
    }

    /// Create an event with the default priority for its data.
    pub fn at(tick: u32, data: GameEventData) -> Self {
        let priority = match &data {
            GameEventData::GameOver { .. } | GameEventData::LevelCompleted { .. } => {
                EventPriority::Terminal
            }
            GameEventData::ObstacleResolved { .. } | GameEventData::ShapeChanged { .. } => {
                EventPriority::Collision
            }
            GameEventData::HealthChanged { .. } => EventPriority::Health,
            GameEventData::PopupShown { .. }
            | GameEventData::SlowdownStarted { .. }
            | GameEventData::ShakeStarted { .. }
            | GameEventData::EffectExpired { .. }
            | GameEventData::EffectCancelled { .. } => EventPriority::Effect,
            GameEventData::LaneChanged { .. } | GameEventData::ColorChanged { .. } => {
                EventPriority::Player
            }
            GameEventData::SpawnSkipped { .. } => EventPriority::Other,
        };
        Self::new(tick, priority, data)
    }

    /// Create game over event.
    pub fn game_over(tick: u32, reason: GameOverReason, survival_ticks: u32) -> Self {
        Self::at(tick, GameEventData::GameOver { reason, survival_ticks })
    }

    /// Create level completed event.
    pub fn level_completed(tick: u32, health: i32, finish_ticks: u32) -> Self {
        Self::at(tick, GameEventData::LevelCompleted { health, finish_ticks })
    }

    /// Create obstacle resolved event.
    pub fn obstacle_resolved(tick: u32, entity_id: u32, outcome: MatchOutcome, y: Fixed) -> Self {
        Self::at(tick, GameEventData::ObstacleResolved { entity_id, outcome, y })
    }

    /// Ordering key: tick, then priority.
    #[inline]
    pub fn sort_key(&self) -> (u32, EventPriority) {
        (self.tick, self.priority)
    }
}

/// Stable sort by (tick, priority); events with equal keys keep the order
/// they were generated in.
pub fn sort_events(events: &mut [GameEvent]) {
    events.sort_by_key(GameEvent::sort_key);
}
