//! Track Entities
//!
//! Everything the player can run into: shape/color gates, walls, shape
//! pickups and the finish line. Requirements are fixed when the entity is
//! spawned; the entity is consumed by the first collision with the player.

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::game::color::PlayerColor;
use crate::game::lane::LaneIndex;
use crate::game::shape::{CompositeShape, ShapeSymbol};

/// Key that marks a gate as accepting any shape.
pub const SHAPE_SHIFTER_KEY: &str = "ShapeShifter";

/// Shape a gate demands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequiredShape {
    /// A specific composite shape.
    Shape(CompositeShape),
    /// Wildcard: any shape and color passes.
    ShapeShifter,
}

impl RequiredShape {
    /// Whether this is the wildcard.
    #[inline]
    pub fn is_wildcard(self) -> bool {
        matches!(self, RequiredShape::ShapeShifter)
    }

    /// Key form ("CT", "ShapeShifter").
    pub fn key(self) -> &'static str {
        match self {
            RequiredShape::Shape(shape) => shape.key(),
            RequiredShape::ShapeShifter => SHAPE_SHIFTER_KEY,
        }
    }
}

impl From<String> for RequiredShape {
    fn from(key: String) -> Self {
        if key == SHAPE_SHIFTER_KEY {
            RequiredShape::ShapeShifter
        } else {
            RequiredShape::Shape(CompositeShape::from_key_or_default(&key))
        }
    }
}

impl From<RequiredShape> for String {
    fn from(shape: RequiredShape) -> Self {
        shape.key().to_string()
    }
}

impl From<CompositeShape> for RequiredShape {
    fn from(shape: CompositeShape) -> Self {
        RequiredShape::Shape(shape)
    }
}

/// What a gate demands of the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObstacleRequirement {
    /// Required shape (or wildcard)
    pub shape: RequiredShape,
    /// Required color
    pub color: PlayerColor,
}

impl ObstacleRequirement {
    /// Gate requiring a specific shape and color.
    pub fn new(shape: CompositeShape, color: PlayerColor) -> Self {
        Self { shape: RequiredShape::Shape(shape), color }
    }

    /// Wildcard gate.
    pub fn shape_shifter(color: PlayerColor) -> Self {
        Self { shape: RequiredShape::ShapeShifter, color }
    }
}

/// Kind of track entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// Shape/color gate.
    Obstacle(ObstacleRequirement),
    /// Impassable wall; touching it ends the run.
    Wall,
    /// Adds a symbol to the player's shape.
    ShapePickup(ShapeSymbol),
    /// Completes the level.
    FinishLine,
}

impl EntityKind {
    /// Stable tag for hashing.
    pub fn tag(&self) -> u8 {
        match self {
            EntityKind::Obstacle(_) => 0,
            EntityKind::Wall => 1,
            EntityKind::ShapePickup(_) => 2,
            EntityKind::FinishLine => 3,
        }
    }

    /// Whether collisions with this entity go through the match evaluator.
    #[inline]
    pub fn is_gate(&self) -> bool {
        matches!(self, EntityKind::Obstacle(_) | EntityKind::Wall)
    }
}

/// A spawned entity on the track.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique id within the run (monotonic)
    pub id: u32,
    /// What it is
    pub kind: EntityKind,
    /// Lane it occupies
    pub lane: LaneIndex,
    /// Distance along the track
    pub y: Fixed,
}

impl Entity {
    /// Create an entity.
    pub fn new(id: u32, kind: EntityKind, lane: LaneIndex, y: Fixed) -> Self {
        Self { id, kind, lane, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_shape_from_key() {
        assert_eq!(RequiredShape::from("CT".to_string()), RequiredShape::Shape(CompositeShape::CT));
        assert_eq!(RequiredShape::from("ShapeShifter".to_string()), RequiredShape::ShapeShifter);
        // Unknown keys fall back to Circle
        assert_eq!(RequiredShape::from("XX".to_string()), RequiredShape::Shape(CompositeShape::Circle));
    }

    #[test]
    fn test_requirement_json() {
        let req: ObstacleRequirement =
            serde_json::from_str(r#"{"shape":"TS","color":"Red"}"#).unwrap();
        assert_eq!(req, ObstacleRequirement::new(CompositeShape::TS, PlayerColor::Red));

        let json = serde_json::to_string(&ObstacleRequirement::shape_shifter(PlayerColor::Black)).unwrap();
        assert_eq!(json, r#"{"shape":"ShapeShifter","color":"Black"}"#);
    }

    #[test]
    fn test_gate_kinds() {
        assert!(EntityKind::Wall.is_gate());
        assert!(EntityKind::Obstacle(ObstacleRequirement::shape_shifter(PlayerColor::Red)).is_gate());
        assert!(!EntityKind::FinishLine.is_gate());
        assert!(!EntityKind::ShapePickup(ShapeSymbol::Square).is_gate());
    }
}
