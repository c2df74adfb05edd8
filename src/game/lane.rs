//! Lane Bookkeeping
//!
//! The player sits in exactly one of a fixed row of lanes and moves one lane
//! per input edge. Moving past either end is a no-op.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{from_f32, Fixed};
use crate::game::error::GameError;

/// Index into [`Lanes`].
pub type LaneIndex = usize;

/// Horizontal lane positions, left to right.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lanes {
    positions: Vec<Fixed>,
}

impl Lanes {
    /// Build lanes from configured x positions.
    pub fn from_positions(positions: &[f32]) -> Result<Self, GameError> {
        if positions.is_empty() {
            return Err(GameError::Configuration("no lanes configured".into()));
        }
        Ok(Self {
            positions: positions.iter().map(|x| from_f32(*x)).collect(),
        })
    }

    /// Number of lanes.
    #[inline]
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    /// Whether `lane` exists.
    #[inline]
    pub fn contains(&self, lane: i64) -> bool {
        lane >= 0 && (lane as u64) < self.positions.len() as u64
    }

    /// Validate a lane index coming from level data.
    pub fn check(&self, lane: i64) -> Result<LaneIndex, GameError> {
        if self.contains(lane) {
            Ok(lane as LaneIndex)
        } else {
            Err(GameError::OutOfRangeIndex {
                what: "lane",
                index: lane,
                len: self.count(),
            })
        }
    }

    /// X position of a lane.
    #[inline]
    pub fn x_of(&self, lane: LaneIndex) -> Fixed {
        self.positions.get(lane).copied().unwrap_or(0)
    }

    /// Lane index to the left, if any.
    #[inline]
    pub fn left_of(&self, lane: LaneIndex) -> Option<LaneIndex> {
        lane.checked_sub(1)
    }

    /// Lane index to the right, if any.
    #[inline]
    pub fn right_of(&self, lane: LaneIndex) -> Option<LaneIndex> {
        let next = lane + 1;
        (next < self.count()).then_some(next)
    }

    /// Step one lane left. Returns whether the lane changed.
    pub fn move_left(&self, lane: &mut LaneIndex) -> bool {
        match self.left_of(*lane) {
            Some(next) => {
                *lane = next;
                true
            }
            None => false,
        }
    }

    /// Step one lane right. Returns whether the lane changed.
    pub fn move_right(&self, lane: &mut LaneIndex) -> bool {
        match self.right_of(*lane) {
            Some(next) => {
                *lane = next;
                true
            }
            None => false,
        }
    }

    /// Clamp a lane index into range.
    #[inline]
    pub fn clamp(&self, lane: LaneIndex) -> LaneIndex {
        lane.min(self.count().saturating_sub(1))
    }
}

impl Default for Lanes {
    fn default() -> Self {
        Self {
            positions: vec![from_f32(-2.0), 0, from_f32(2.0)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::to_fixed;

    #[test]
    fn test_default_lanes() {
        let lanes = Lanes::default();
        assert_eq!(lanes.count(), 3);
        assert_eq!(lanes.x_of(0), to_fixed(-2.0));
        assert_eq!(lanes.x_of(1), 0);
        assert_eq!(lanes.x_of(2), to_fixed(2.0));
    }

    #[test]
    fn test_moves_stop_at_edges() {
        let lanes = Lanes::default();
        assert_eq!(lanes.left_of(1), Some(0));
        assert_eq!(lanes.left_of(0), None);
        assert_eq!(lanes.right_of(1), Some(2));
        assert_eq!(lanes.right_of(2), None);
    }

    #[test]
    fn test_move_reports_change() {
        let lanes = Lanes::default();
        let mut lane = 1;
        assert!(lanes.move_left(&mut lane));
        assert_eq!(lane, 0);
        assert!(!lanes.move_left(&mut lane));
        assert_eq!(lane, 0);

        lane = 2;
        assert!(!lanes.move_right(&mut lane));
        assert_eq!(lane, 2);
    }

    #[test]
    fn test_check_rejects_out_of_range() {
        let lanes = Lanes::default();
        assert_eq!(lanes.check(2).unwrap(), 2);
        assert!(matches!(
            lanes.check(3),
            Err(GameError::OutOfRangeIndex { what: "lane", index: 3, len: 3 })
        ));
        assert!(lanes.check(-1).is_err());
    }

    #[test]
    fn test_empty_lanes_is_config_error() {
        assert!(matches!(Lanes::from_positions(&[]), Err(GameError::Configuration(_))));
    }

    #[test]
    fn test_clamp() {
        let lanes = Lanes::from_positions(&[0.0, 1.0]).unwrap();
        assert_eq!(lanes.clamp(5), 1);
        assert_eq!(lanes.clamp(0), 0);
    }
}
