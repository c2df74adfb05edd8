//! Level Data
//!
//! A level is a catalog of entity types plus a list of placements that
//! reference the catalog by index. Placements use the level file
//! format:
//!
//! ```json
//! [ { "laneIndex": 1, "obstacleIndex": 0, "spawnY": 12.5 }, ... ]
//! ```
//!
//! optionally wrapped as `{ "Items": [...] }`. Indices are checked before
//! anything is spawned; a bad placement is skipped and reported, never
//! fatal.

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::core::fixed::from_f32;
use crate::game::color::PlayerColor;
use crate::game::error::GameError;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::obstacle::{EntityKind, ObstacleRequirement, RequiredShape};
use crate::game::progression::extract_level_number;
use crate::game::shape::ShapeSymbol;
use crate::game::state::RunState;

// =============================================================================
// FILE FORMAT
// =============================================================================

/// One catalog entry as written in level files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogEntry {
    /// Shape/color gate
    Obstacle {
        /// Required shape key ("CT", "ShapeShifter", ...)
        shape: RequiredShape,
        /// Required color
        color: PlayerColor,
    },
    /// Impassable wall
    Wall,
    /// Shape pickup
    Pickup {
        /// 0 = Circle, 1 = Triangle, 2 = Square
        #[serde(rename = "shapeIndex")]
        shape_index: i64,
    },
    /// Finish line
    Finish,
}

impl CatalogEntry {
    /// Entity kind this entry spawns.
    pub fn to_kind(&self) -> Result<EntityKind, GameError> {
        Ok(match *self {
            CatalogEntry::Obstacle { shape, color } => {
                EntityKind::Obstacle(ObstacleRequirement { shape, color })
            }
            CatalogEntry::Wall => EntityKind::Wall,
            CatalogEntry::Pickup { shape_index } => {
                EntityKind::ShapePickup(ShapeSymbol::from_index(shape_index)?)
            }
            CatalogEntry::Finish => EntityKind::FinishLine,
        })
    }
}

/// One spawn instruction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Lane to spawn in
    pub lane_index: i64,
    /// Index into the level catalog
    pub obstacle_index: i64,
    /// Distance along the track
    pub spawn_y: f32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlacementFile {
    Wrapped {
        #[serde(rename = "Items")]
        items: Vec<Placement>,
    },
    List(Vec<Placement>),
}

impl From<PlacementFile> for Vec<Placement> {
    fn from(file: PlacementFile) -> Self {
        match file {
            PlacementFile::Wrapped { items } => items,
            PlacementFile::List(items) => items,
        }
    }
}

/// Parse a placement list in either the bare or the wrapped form.
pub fn parse_placements(json: &str) -> Result<Vec<Placement>, GameError> {
    let file: PlacementFile = serde_json::from_str(json)?;
    Ok(file.into())
}

fn deserialize_placements<'de, D>(deserializer: D) -> Result<Vec<Placement>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    PlacementFile::deserialize(deserializer).map(Into::into)
}

// =============================================================================
// LEVEL DEFINITION
// =============================================================================

/// A complete level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    /// Scene name, e.g. "Level2"
    pub name: String,
    /// Entity types referenced by placements
    pub catalog: Vec<CatalogEntry>,
    /// Spawn list
    #[serde(deserialize_with = "deserialize_placements")]
    pub placements: Vec<Placement>,
}

impl LevelDefinition {
    /// Parse a level file.
    pub fn from_json_str(json: &str) -> Result<Self, GameError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Level number taken from the name.
    pub fn number(&self) -> u32 {
        extract_level_number(&self.name)
    }
}

// =============================================================================
// SPAWNING
// =============================================================================

/// A placement that was not spawned.
#[derive(Debug)]
pub struct SkippedPlacement {
    /// Position in the placement list
    pub index: usize,
    /// Why
    pub error: GameError,
}

/// Outcome of spawning a level.
#[derive(Debug, Default)]
pub struct SpawnReport {
    /// Entity ids created, in placement order
    pub spawned: Vec<u32>,
    /// Placements rejected
    pub skipped: Vec<SkippedPlacement>,
}

impl SpawnReport {
    /// Whether every placement was spawned.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

fn check_index(what: &'static str, index: i64, len: usize) -> Result<usize, GameError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or(GameError::OutOfRangeIndex { what, index, len })
}

fn resolve_placement(
    state: &RunState,
    catalog: &[CatalogEntry],
    placement: &Placement,
) -> Result<(EntityKind, usize), GameError> {
    let entry = check_index("obstacle", placement.obstacle_index, catalog.len())?;
    let lane = state.lanes.check(placement.lane_index)?;
    let kind = catalog[entry].to_kind()?;
    Ok((kind, lane))
}

/// Spawn every valid placement of `definition` into `state`.
pub fn spawn_level(state: &mut RunState, definition: &LevelDefinition) -> SpawnReport {
    let mut report = SpawnReport::default();

    for (index, placement) in definition.placements.iter().enumerate() {
        match resolve_placement(state, &definition.catalog, placement) {
            Ok((kind, lane)) => {
                let id = state.spawn(kind, lane, from_f32(placement.spawn_y));
                report.spawned.push(id);
            }
            Err(error) => {
                warn!(level = %definition.name, index, ?placement, %error, "invalid spawn data, skipping");
                state.push_event(GameEvent::at(
                    state.tick,
                    GameEventData::SpawnSkipped { placement: index, reason: error.to_string() },
                ));
                report.skipped.push(SkippedPlacement { index, error });
            }
        }
    }

    info!(
        level = %definition.name,
        spawned = report.spawned.len(),
        skipped = report.skipped.len(),
        "level spawned"
    );
    report
}
