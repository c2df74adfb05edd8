//! Match Evaluation
//!
//! Decides what happens when the player touches a gate. The decision is a
//! pure function of the player's shape and color and the gate's
//! requirement; the side effects (health, slowdown, popups, analytics) are
//! applied by the tick loop through the collaborator services.
//!
//! ```text
//!   Running ──wall────────────────────────────► Resolved(WallCollision)
//!      │
//!      ├──wildcard or shape+color equal───────► Resolved(Match)
//!      │
//!      └──otherwise──► shape ok, color wrong ─► Resolved(ColorMismatch)
//!                      shape wrong, color ok ─► Resolved(ShapeMismatch)
//!                      both wrong ────────────► Resolved(BothMismatch)
//! ```

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::Fixed;
use crate::game::color::PlayerColor;
use crate::game::obstacle::{EntityKind, ObstacleRequirement, RequiredShape};
use crate::game::popup::PopupKind;
use crate::game::shape::CompositeShape;

/// Result of a gate collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MatchOutcome {
    /// Shape and color accepted
    Match = 0,
    /// Color right, shape wrong
    ShapeMismatch = 1,
    /// Shape right, color wrong
    ColorMismatch = 2,
    /// Both wrong
    BothMismatch = 3,
    /// Ran into a wall; ends the run
    WallCollision = 4,
}

impl MatchOutcome {
    /// Whether this outcome costs health and triggers the mismatch effects.
    #[inline]
    pub fn is_mismatch(self) -> bool {
        matches!(
            self,
            MatchOutcome::ShapeMismatch | MatchOutcome::ColorMismatch | MatchOutcome::BothMismatch
        )
    }

    /// Whether this outcome ends the run outright.
    #[inline]
    pub fn is_fatal(self) -> bool {
        self == MatchOutcome::WallCollision
    }

    /// Explanatory popup for a mismatch. A double mismatch shows only the
    /// combined popup.
    pub fn popup_kind(self) -> Option<PopupKind> {
        match self {
            MatchOutcome::ShapeMismatch => Some(PopupKind::ShapeMismatch),
            MatchOutcome::ColorMismatch => Some(PopupKind::ColorMismatch),
            MatchOutcome::BothMismatch => Some(PopupKind::BothMismatch),
            MatchOutcome::Match | MatchOutcome::WallCollision => None,
        }
    }
}

/// The player's shape and color at the moment of a collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSignature {
    /// Composite shape
    pub shape: CompositeShape,
    /// Color
    pub color: PlayerColor,
}

impl PlayerSignature {
    /// Create a signature.
    pub fn new(shape: CompositeShape, color: PlayerColor) -> Self {
        Self { shape, color }
    }
}

/// What the player hit, as far as the evaluator cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    /// Impassable wall
    Wall,
    /// Shape/color gate
    Requirement(ObstacleRequirement),
}

impl Gate {
    /// Gate for an entity kind, if collisions with it are evaluated.
    pub fn from_kind(kind: &EntityKind) -> Option<Gate> {
        match kind {
            EntityKind::Wall => Some(Gate::Wall),
            EntityKind::Obstacle(req) => Some(Gate::Requirement(*req)),
            EntityKind::ShapePickup(_) | EntityKind::FinishLine => None,
        }
    }
}

/// Evaluate a collision. Same inputs always give the same outcome.
pub fn evaluate(player: PlayerSignature, gate: Gate) -> MatchOutcome {
    let req = match gate {
        Gate::Wall => return MatchOutcome::WallCollision,
        Gate::Requirement(req) => req,
    };

    let (shape_ok, color_ok) = match req.shape {
        RequiredShape::ShapeShifter => return MatchOutcome::Match,
        RequiredShape::Shape(shape) => (shape == player.shape, req.color == player.color),
    };

    match (shape_ok, color_ok) {
        (true, true) => MatchOutcome::Match,
        (false, true) => MatchOutcome::ShapeMismatch,
        (true, false) => MatchOutcome::ColorMismatch,
        (false, false) => MatchOutcome::BothMismatch,
    }
}

/// Payload of a player/gate collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionEvent {
    /// Entity that was hit
    pub entity_id: u32,
    /// Where along the track it was hit
    pub y: Fixed,
    /// Player state at the moment of contact
    pub player: PlayerSignature,
    /// What was hit
    pub gate: Gate,
}

/// Evaluator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluatorState {
    /// Collision received, not yet decided
    Running,
    /// Decided
    Resolved(MatchOutcome),
}

/// One-shot state machine, created per collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchEvaluator {
    state: EvaluatorState,
}

impl MatchEvaluator {
    /// Start evaluating a new collision.
    pub fn begin() -> Self {
        Self { state: EvaluatorState::Running }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> EvaluatorState {
        self.state
    }

    /// Resolve the collision. Once resolved, the stored outcome is returned
    /// for any further call.
    pub fn resolve(&mut self, event: &CollisionEvent) -> MatchOutcome {
        match self.state {
            EvaluatorState::Resolved(outcome) => outcome,
            EvaluatorState::Running => {
                let outcome = evaluate(event.player, event.gate);
                debug!(
                    entity = event.entity_id,
                    player_shape = ?event.player.shape,
                    player_color = ?event.player.color,
                    ?outcome,
                    "collision resolved"
                );
                self.state = EvaluatorState::Resolved(outcome);
                outcome
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gate(shape: CompositeShape, color: PlayerColor) -> Gate {
        Gate::Requirement(ObstacleRequirement::new(shape, color))
    }

    #[test]
    fn test_exact_match() {
        let player = PlayerSignature::new(CompositeShape::CT, PlayerColor::Red);
        assert_eq!(evaluate(player, gate(CompositeShape::CT, PlayerColor::Red)), MatchOutcome::Match);
    }

    #[test]
    fn test_shape_mismatch() {
        let player = PlayerSignature::new(CompositeShape::Circle, PlayerColor::Black);
        let outcome = evaluate(player, gate(CompositeShape::Triangle, PlayerColor::Black));
        assert_eq!(outcome, MatchOutcome::ShapeMismatch);
        assert_eq!(outcome.popup_kind(), Some(PopupKind::ShapeMismatch));
    }

    #[test]
    fn test_color_mismatch() {
        let player = PlayerSignature::new(CompositeShape::Square, PlayerColor::Black);
        assert_eq!(
            evaluate(player, gate(CompositeShape::Square, PlayerColor::Red)),
            MatchOutcome::ColorMismatch
        );
    }

    #[test]
    fn test_both_mismatch_uses_combined_popup() {
        let player = PlayerSignature::new(CompositeShape::Square, PlayerColor::Black);
        let outcome = evaluate(player, gate(CompositeShape::TT, PlayerColor::Red));
        assert_eq!(outcome, MatchOutcome::BothMismatch);
        assert_eq!(outcome.popup_kind(), Some(PopupKind::BothMismatch));
    }

    #[test]
    fn test_wall_short_circuits() {
        let player = PlayerSignature::new(CompositeShape::Circle, PlayerColor::Black);
        let outcome = evaluate(player, Gate::Wall);
        assert_eq!(outcome, MatchOutcome::WallCollision);
        assert!(outcome.is_fatal());
        assert!(!outcome.is_mismatch());
        assert_eq!(outcome.popup_kind(), None);
    }

    #[test]
    fn test_evaluator_resolves_once() {
        let event = CollisionEvent {
            entity_id: 7,
            y: 0,
            player: PlayerSignature::new(CompositeShape::Circle, PlayerColor::Black),
            gate: gate(CompositeShape::Triangle, PlayerColor::Black),
        };

        let mut evaluator = MatchEvaluator::begin();
        assert_eq!(evaluator.state(), EvaluatorState::Running);
        assert_eq!(evaluator.resolve(&event), MatchOutcome::ShapeMismatch);
        assert_eq!(evaluator.state(), EvaluatorState::Resolved(MatchOutcome::ShapeMismatch));

        // A different payload does not re-open a resolved evaluator
        let wall = CollisionEvent { gate: Gate::Wall, ..event };
        assert_eq!(evaluator.resolve(&wall), MatchOutcome::ShapeMismatch);
    }

    #[test]
    fn test_gate_from_kind() {
        assert_eq!(Gate::from_kind(&EntityKind::Wall), Some(Gate::Wall));
        assert_eq!(Gate::from_kind(&EntityKind::FinishLine), None);
    }

    fn shape() -> impl Strategy<Value = CompositeShape> {
        (0usize..12).prop_map(|i| CompositeShape::ALL[i])
    }

    fn color() -> impl Strategy<Value = PlayerColor> {
        prop_oneof![Just(PlayerColor::Black), Just(PlayerColor::Red)]
    }

    proptest! {
        #[test]
        fn prop_wildcard_always_matches(s in shape(), pc in color(), gc in color()) {
            let player = PlayerSignature::new(s, pc);
            let gate = Gate::Requirement(ObstacleRequirement::shape_shifter(gc));
            prop_assert_eq!(evaluate(player, gate), MatchOutcome::Match);
        }

        #[test]
        fn prop_evaluation_is_pure(
            ps in shape(), pc in color(), gs in shape(), gc in color(), wall in any::<bool>()
        ) {
            let player = PlayerSignature::new(ps, pc);
            let g = if wall { Gate::Wall } else { gate(gs, gc) };
            let first = evaluate(player, g);
            prop_assert_eq!(first, evaluate(player, g));

            let expected = if wall {
                MatchOutcome::WallCollision
            } else {
                match (ps == gs, pc == gc) {
                    (true, true) => MatchOutcome::Match,
                    (false, true) => MatchOutcome::ShapeMismatch,
                    (true, false) => MatchOutcome::ColorMismatch,
                    (false, false) => MatchOutcome::BothMismatch,
                }
            };
            prop_assert_eq!(first, expected);
        }
    }
}
