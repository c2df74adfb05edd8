//! Simulation Tick
//!
//! One call per rendered frame. Everything a run does happens here, in a
//! fixed order, so a recorded input sequence always reproduces the same run.

use tracing::debug;

use crate::core::fixed::{fixed_mul, to_float, Fixed};
use crate::game::effects::StatusTone;
use crate::game::events::{sort_events, GameEvent, GameEventData};
use crate::game::input::InputFrame;
use crate::game::matching::{CollisionEvent, Gate, MatchEvaluator, MatchOutcome};
use crate::game::obstacle::{Entity, EntityKind};
use crate::game::progression::level_name;
use crate::game::services::{HealthSink, Services};
use crate::game::state::{GameOverReason, RunPhase, RunState};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick, ordered by priority
    pub events: Vec<GameEvent>,
    /// Whether the scaled clock was frozen by a popup
    pub paused: bool,
    /// Whether the run is over (ended this tick or earlier)
    pub ended: bool,
}

/// Run one simulation tick.
///
/// Order:
///
/// 0. Advance the frame counter
/// 1. Advance unscaled effects (popup auto-hide, shake)
/// 2. Apply inputs (allowed while a popup is up)
/// 3. Stop here if a popup is pausing the game
/// 4. Advance the scaled clock and scaled effects (slowdown, status)
/// 5. Move forward at normal speed times the slowdown multiplier
/// 6. Passive health drain
/// 7. Collisions in the player's lane over the distance swept this tick,
///    in the order they are reached
/// 8. Despawn entities left behind
///
/// Terminal phases make this a no-op that reports `ended`.
pub fn tick(state: &mut RunState, services: &mut Services<'_>, input: InputFrame) -> TickResult {
    let mut result = TickResult::default();

    if state.phase.is_terminal() {
        result.ended = true;
        return result;
    }

    // 0. Advance tick counter
    state.tick += 1;

    // 1. Unscaled effects
    for kind in state.effects.advance_unscaled(&mut state.rng) {
        state.push_event(GameEvent::at(state.tick, GameEventData::EffectExpired { kind }));
    }

    // 2. Inputs
    apply_input(state, input);

    // 3. Paused under a popup
    if state.effects.is_paused() {
        result.paused = true;
        result.events = collect_events(state);
        return result;
    }

    // 4. Scaled clock
    state.elapsed_ticks += 1;
    for kind in state.effects.advance_scaled() {
        state.push_event(GameEvent::at(state.tick, GameEventData::EffectExpired { kind }));
    }

    // 5. Forward movement
    let from_y = state.player.y;
    let step = fixed_mul(state.rules.speed_per_tick, state.effects.speed_multiplier());
    state.player.y = state.player.y.saturating_add(step);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        tick = state.tick,
        y = state.player.y,
        lane = state.player.lane,
        health = state.health.current(),
        "tick"
    );

    // 6. Passive drain
    if let Some(change) = state.health.tick_passive() {
        if change.changed() {
            state.push_event(GameEvent::at(
                state.tick,
                GameEventData::HealthChanged { old: change.old, new: change.new },
            ));
        }
        if change.depleted {
            end_with_death(state, services, GameOverReason::HealthDepleted);
        }
    }

    // 7. Collisions
    process_collisions(state, services, from_y);

    // 8. Despawn
    despawn_passed(state);

    result.ended = state.phase.is_terminal();
    result.events = collect_events(state);
    result
}

fn collect_events(state: &mut RunState) -> Vec<GameEvent> {
    let mut events = state.take_events();
    sort_events(&mut events);
    events
}

/// Apply lane and color input.
fn apply_input(state: &mut RunState, input: InputFrame) {
    let from = state.player.lane;
    let moved = match input.lane_step() {
        -1 => state.lanes.move_left(&mut state.player.lane),
        1 => state.lanes.move_right(&mut state.player.lane),
        _ => false,
    };
    if moved {
        state.push_event(GameEvent::at(
            state.tick,
            GameEventData::LaneChanged { from, to: state.player.lane },
        ));
    }

    if input.color_pressed() {
        let color = state.player.color.toggle();
        state.push_event(GameEvent::at(state.tick, GameEventData::ColorChanged { color }));
    }
}

/// Entities in the player's lane touched while moving from `from_y` to the
/// current position, in track order.
///
/// Anything within `hit_half_extent` of the swept segment counts, so a step
/// longer than the contact window cannot pass through an entity.
fn contacts(state: &RunState, from_y: Fixed) -> Vec<u32> {
    let lane = state.player.lane;
    let reach = state.rules.hit_half_extent;
    let (near, far) = if from_y <= state.player.y {
        (from_y, state.player.y)
    } else {
        (state.player.y, from_y)
    };
    let low = near.saturating_sub(reach);
    let high = far.saturating_add(reach);

    let mut hits: Vec<(Fixed, u32)> = state
        .entities
        .values()
        .filter(|e| e.lane == lane && (low..=high).contains(&e.y))
        .map(|e| (e.y, e.id))
        .collect();
    hits.sort_unstable();
    hits.into_iter().map(|(_, id)| id).collect()
}

fn process_collisions(state: &mut RunState, services: &mut Services<'_>, from_y: Fixed) {
    for id in contacts(state, from_y) {
        if state.phase.is_terminal() {
            break;
        }
        // Consumed on contact, whatever the outcome
        let Some(entity) = state.entities.remove(&id) else {
            continue;
        };

        match entity.kind {
            EntityKind::Obstacle(_) | EntityKind::Wall => resolve_gate(state, services, &entity),
            EntityKind::ShapePickup(symbol) => {
                let shape = state.player.shape.push(symbol);
                state.stats.pickups += 1;
                state.push_event(GameEvent::at(
                    state.tick,
                    GameEventData::ShapeChanged { entity_id: entity.id, symbol, shape },
                ));
            }
            EntityKind::FinishLine => {
                let level = level_name(state.level);
                services.analytics.record_level_completion(&level, state.health.current());
                services.progression.complete_level();
                state.finish(RunPhase::LevelComplete);
            }
        }
    }
}

/// Dispatch a gate collision through a fresh evaluator and apply the outcome.
fn resolve_gate(state: &mut RunState, services: &mut Services<'_>, entity: &Entity) {
    let Some(gate) = Gate::from_kind(&entity.kind) else {
        return;
    };
    let event = CollisionEvent {
        entity_id: entity.id,
        y: entity.y,
        player: state.player.signature(),
        gate,
    };
    let outcome = MatchEvaluator::begin().resolve(&event);
    state.push_event(GameEvent::obstacle_resolved(state.tick, entity.id, outcome, entity.y));

    let level = level_name(state.level);
    match outcome {
        MatchOutcome::WallCollision => {
            end_with_death(state, services, GameOverReason::WallCollision);
        }
        MatchOutcome::Match => {
            state.stats.matches += 1;
            services.analytics.record_match(&level);
            let reward = state.rules.match_reward;
            state.add_health(reward);
            state.show_status(&format!("Match +{reward}"), StatusTone::Positive, state.rules.status_ticks);
        }
        MatchOutcome::ShapeMismatch | MatchOutcome::ColorMismatch | MatchOutcome::BothMismatch => {
            state.stats.mismatches += 1;
            services.analytics.record_mismatch(&level, to_float(entity.y));

            let penalty = state.rules.mismatch_penalty;
            let change = state.reduce_health(penalty);
            if change.depleted {
                end_with_death(state, services, GameOverReason::HealthDepleted);
                return;
            }

            state.show_status(
                &format!("Wrong Match! -{penalty}"),
                StatusTone::Negative,
                state.rules.status_ticks,
            );
            start_mismatch_effects(state);

            if let Some(kind) = outcome.popup_kind() {
                if services.popups.show_for(kind) {
                    state.effects.show_popup(kind, state.rules.popup_ticks);
                    state.push_event(GameEvent::at(state.tick, GameEventData::PopupShown { kind }));
                }
            }
        }
    }
}

/// Slowdown and camera shake, each replacing any running instance.
fn start_mismatch_effects(state: &mut RunState) {
    let rules = state.rules;

    let (handle, replaced) = state.effects.start_slowdown(rules.slowdown_factor, rules.slowdown_ticks);
    if let Some(old) = replaced {
        state.push_event(GameEvent::at(
            state.tick,
            GameEventData::EffectCancelled { kind: old.kind, handle: old.handle },
        ));
    }
    state.push_event(GameEvent::at(state.tick, GameEventData::SlowdownStarted { handle }));

    let (handle, replaced) = state.effects.start_shake(rules.shake_magnitude, rules.shake_ticks);
    if let Some(old) = replaced {
        state.push_event(GameEvent::at(
            state.tick,
            GameEventData::EffectCancelled { kind: old.kind, handle: old.handle },
        ));
    }
    state.push_event(GameEvent::at(state.tick, GameEventData::ShakeStarted { handle }));
}

fn end_with_death(state: &mut RunState, services: &mut Services<'_>, reason: GameOverReason) {
    if state.phase.is_terminal() {
        return;
    }
    services.analytics.record_death(&level_name(state.level));
    state.finish(RunPhase::GameOver(reason));
}

/// Drop entities far enough behind the player.
fn despawn_passed(state: &mut RunState) {
    let cutoff = state.player.y.saturating_sub(state.rules.despawn_distance);
    let before = state.entities.len();
    state.entities.retain(|_, e| e.y >= cutoff);
    let removed = before - state.entities.len();
    if removed > 0 {
        debug!(removed, "despawned passed entities");
    }
}

// =============================================================================
// TESTS
// =============================================================================
