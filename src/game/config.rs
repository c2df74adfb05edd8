//! Game Configuration
//!
//! Tunables for a run. Time values are stored in seconds, as designers write
//! them, and converted to whole ticks at [`crate::TICK_RATE`].

use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::core::fixed::{from_f32, per_tick, Fixed};
use crate::game::color::PlayerColor;
use crate::game::error::GameError;
use crate::game::lane::Lanes;
use crate::TICK_RATE;

/// Convert seconds to ticks, rounding, never less than one tick.
pub fn secs_to_ticks(secs: f32) -> u32 {
    let ticks = (secs.max(0.0) * TICK_RATE as f32).round() as u32;
    ticks.max(1)
}

/// Configuration for a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Lane x positions, left to right
    pub lanes: Vec<f32>,
    /// Lane the player starts in
    pub start_lane: usize,
    /// Color cycle
    pub palette: Vec<PlayerColor>,
    /// Starting and maximum health
    pub max_hp: i32,
    /// Seconds per point of passive drain
    pub hp_tick_interval_secs: f32,
    /// Health gained on a match
    pub match_reward: i32,
    /// Health lost on a mismatch
    pub mismatch_penalty: i32,
    /// Forward speed in units per second
    pub normal_speed: f32,
    /// Speed multiplier during a slowdown
    pub slowdown_factor: f32,
    /// Slowdown duration
    pub slowdown_secs: f32,
    /// Camera shake duration
    pub shake_secs: f32,
    /// Camera shake amplitude
    pub shake_magnitude: f32,
    /// How long status text stays up
    pub status_secs: f32,
    /// How long a popup stays up (real time)
    pub popup_secs: f32,
    /// Max distance along the track that counts as contact
    pub hit_half_extent: f32,
    /// Entities this far behind the player are removed
    pub despawn_distance: f32,
    /// Levels that use two-symbol shape stacking
    pub stacking_levels: Vec<u32>,
    /// Number of playable levels
    pub level_count: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            lanes: vec![-2.0, 0.0, 2.0],
            start_lane: 1,
            palette: vec![PlayerColor::Black, PlayerColor::Red],
            max_hp: 100,
            hp_tick_interval_secs: 0.85,
            match_reward: 10,
            mismatch_penalty: 20,
            normal_speed: 3.0,
            slowdown_factor: 0.4,
            slowdown_secs: 1.5,
            shake_secs: 0.2,
            shake_magnitude: 0.3,
            status_secs: 1.0,
            popup_secs: 1.5,
            hit_half_extent: 0.5,
            despawn_distance: 8.0,
            stacking_levels: vec![3, 4],
            level_count: 4,
        }
    }
}

impl GameConfig {
    /// Parse from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, GameError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden from `MORPH_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_parse::<i32>("MORPH_MAX_HP") {
            config.max_hp = v;
        }
        if let Some(v) = env_parse::<f32>("MORPH_NORMAL_SPEED") {
            config.normal_speed = v;
        }
        if let Some(v) = env_parse::<f32>("MORPH_HP_TICK_INTERVAL") {
            config.hp_tick_interval_secs = v;
        }
        if let Ok(raw) = std::env::var("MORPH_STACKING_LEVELS") {
            match parse_level_list(&raw) {
                Some(levels) => config.stacking_levels = levels,
                None => warn!(value = %raw, "ignoring invalid MORPH_STACKING_LEVELS"),
            }
        }
        if let Some(v) = env_parse::<u32>("MORPH_LEVEL_COUNT") {
            config.level_count = v;
        }

        config
    }

    /// Check for values a run cannot use as given.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.lanes.is_empty() {
            return Err(GameError::Configuration("no lanes configured".into()));
        }
        if self.start_lane >= self.lanes.len() {
            return Err(GameError::OutOfRangeIndex {
                what: "start lane",
                index: self.start_lane as i64,
                len: self.lanes.len(),
            });
        }
        if self.palette.is_empty() {
            return Err(GameError::Configuration("empty color palette".into()));
        }
        if self.max_hp <= 0 {
            return Err(GameError::Configuration(format!("max_hp must be positive, got {}", self.max_hp)));
        }
        if self.slowdown_factor.is_nan() || self.slowdown_factor < 0.0 {
            return Err(GameError::Configuration("slowdown_factor must be non-negative".into()));
        }
        if !is_finite_non_negative(self.normal_speed) {
            return Err(GameError::Configuration(format!(
                "normal_speed must be finite and non-negative, got {}",
                self.normal_speed
            )));
        }
        if !is_finite_non_negative(self.hit_half_extent) {
            return Err(GameError::Configuration(format!(
                "hit_half_extent must be finite and non-negative, got {}",
                self.hit_half_extent
            )));
        }
        if self.level_count == 0 {
            return Err(GameError::Configuration("level_count must be at least 1".into()));
        }
        Ok(())
    }

    /// Copy with every invalid value replaced by a usable fallback.
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        if let Err(e) = self.validate() {
            warn!(error = %e, "invalid game config, applying fallbacks");
        }

        if config.lanes.is_empty() {
            config.lanes = GameConfig::default().lanes;
        }
        if config.start_lane >= config.lanes.len() {
            config.start_lane = config.lanes.len() - 1;
        }
        if config.palette.is_empty() {
            config.palette = vec![PlayerColor::Black];
        }
        if config.max_hp <= 0 {
            config.max_hp = GameConfig::default().max_hp;
        }
        if config.slowdown_factor.is_nan() || config.slowdown_factor < 0.0 {
            config.slowdown_factor = GameConfig::default().slowdown_factor;
        }
        if !is_finite_non_negative(config.normal_speed) {
            config.normal_speed = GameConfig::default().normal_speed;
        }
        if !is_finite_non_negative(config.hit_half_extent) {
            config.hit_half_extent = GameConfig::default().hit_half_extent;
        }
        config.level_count = config.level_count.max(1);
        config
    }

    /// Lane layout. Falls back to the default layout if none is configured.
    pub fn build_lanes(&self) -> Lanes {
        Lanes::from_positions(&self.lanes).unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default lanes");
            Lanes::default()
        })
    }

    /// Whether `level` plays with two-symbol stacking.
    pub fn is_stacking_level(&self, level: u32) -> bool {
        self.stacking_levels.contains(&level)
    }

    /// Forward distance per tick at normal speed.
    pub fn speed_per_tick(&self) -> Fixed {
        per_tick(from_f32(self.normal_speed), TICK_RATE)
    }

    /// Passive drain interval.
    pub fn hp_tick_interval_ticks(&self) -> u32 {
        secs_to_ticks(self.hp_tick_interval_secs)
    }

    /// Slowdown duration.
    pub fn slowdown_ticks(&self) -> u32 {
        secs_to_ticks(self.slowdown_secs)
    }

    /// Shake duration.
    pub fn shake_ticks(&self) -> u32 {
        secs_to_ticks(self.shake_secs)
    }

    /// Status text duration.
    pub fn status_ticks(&self) -> u32 {
        secs_to_ticks(self.status_secs)
    }

    /// Popup duration.
    pub fn popup_ticks(&self) -> u32 {
        secs_to_ticks(self.popup_secs)
    }
}

fn is_finite_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

fn parse_level_list(raw: &str) -> Option<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}
