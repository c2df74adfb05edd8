//! Level progression and naming.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::game::config::GameConfig;
use crate::game::services::ProgressionSink;
use crate::game::shape::StackMode;

/// Scene-style name of a level ("Level3").
pub fn level_name(level: u32) -> String {
    format!("Level{level}")
}

/// First run of digits in `name`, e.g. "Level12" gives 12.
///
/// Names without digits map to level 1 with a warning.
pub fn extract_level_number(name: &str) -> u32 {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    match digits.parse() {
        Ok(level) => level,
        Err(_) => {
            warn!(name, "level name has no number, assuming level 1");
            1
        }
    }
}

/// Shape stacking used on `level`.
pub fn stack_mode_for(level: u32, config: &GameConfig) -> StackMode {
    if config.is_stacking_level(level) {
        StackMode::Stacked
    } else {
        StackMode::Single
    }
}

/// Which level is being played and which have been finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    current: u32,
    completed: BTreeSet<u32>,
    level_count: u32,
}

impl LevelProgress {
    /// Start at level 1 of `level_count`.
    pub fn new(level_count: u32) -> Self {
        Self::starting_at(1, level_count)
    }

    /// Start at `level`, clamped into `1..=level_count`.
    pub fn starting_at(level: u32, level_count: u32) -> Self {
        let level_count = level_count.max(1);
        Self {
            current: level.clamp(1, level_count),
            completed: BTreeSet::new(),
            level_count,
        }
    }

    /// Number of levels.
    #[inline]
    pub fn level_count(&self) -> u32 {
        self.level_count
    }

    /// Whether `level` has been completed at least once.
    pub fn is_completed(&self, level: u32) -> bool {
        self.completed.contains(&level)
    }

    /// Completed levels in order.
    pub fn completed(&self) -> impl Iterator<Item = u32> + '_ {
        self.completed.iter().copied()
    }

    /// Advance to the following level. `None` means the last level was
    /// played and the game returns to the title screen.
    pub fn next_level(&mut self) -> Option<u32> {
        if self.current >= self.level_count {
            info!(level = self.current, "last level finished, returning to title");
            return None;
        }
        self.current += 1;
        info!(level = self.current, "advancing to next level");
        Some(self.current)
    }

    /// Jump to a level (title screen selection).
    pub fn select(&mut self, level: u32) {
        self.current = level.clamp(1, self.level_count);
    }
}

impl ProgressionSink for LevelProgress {
    fn complete_level(&mut self) {
        if self.completed.insert(self.current) {
            info!(level = self.current, "level completed for the first time");
        }
    }

    fn current_level(&self) -> u32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names() {
        assert_eq!(level_name(3), "Level3");
        assert_eq!(extract_level_number("Level3"), 3);
        assert_eq!(extract_level_number("Level12_hard"), 12);
        assert_eq!(extract_level_number("Title"), 1);
    }

    #[test]
    fn test_stack_mode() {
        let config = GameConfig::default();
        assert_eq!(stack_mode_for(1, &config), StackMode::Single);
        assert_eq!(stack_mode_for(2, &config), StackMode::Single);
        assert_eq!(stack_mode_for(3, &config), StackMode::Stacked);
        assert_eq!(stack_mode_for(4, &config), StackMode::Stacked);
    }

    #[test]
    fn test_progress_through_levels() {
        let mut progress = LevelProgress::new(2);
        assert_eq!(progress.current_level(), 1);

        progress.complete_level();
        assert!(progress.is_completed(1));
        assert_eq!(progress.next_level(), Some(2));

        progress.complete_level();
        assert_eq!(progress.next_level(), None);
        assert_eq!(progress.current_level(), 2);
        assert_eq!(progress.completed().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_select_clamps() {
        let mut progress = LevelProgress::new(4);
        progress.select(9);
        assert_eq!(progress.current_level(), 4);
        progress.select(0);
        assert_eq!(progress.current_level(), 1);
    }
}
