//! Analytics records and where they land in the store.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// What happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    /// Gate passed
    Match,
    /// Gate failed at track position `y`
    Mismatch {
        /// Track position
        y: f32,
    },
    /// Run lost
    Death,
    /// Level finished, with the session counters at that point
    LevelCompleted {
        /// Health left at the finish line
        health: i32,
        /// Matches since the last completion
        matches: u32,
        /// Mismatches since the last completion
        mismatches: u32,
        /// matches x 10 - mismatches x 20
        score: i64,
    },
}

/// One analytics record, ready for delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    /// Anonymous player id
    pub user_id: Uuid,
    /// Level name ("Level1")
    pub level: String,
    /// When it was recorded
    pub timestamp: DateTime<Utc>,
    /// Payload
    pub event: AnalyticsEvent,
}

impl AnalyticsRecord {
    /// Record stamped with the current time.
    pub fn new(user_id: Uuid, level: impl Into<String>, event: AnalyticsEvent) -> Self {
        Self {
            user_id,
            level: level.into(),
            timestamp: Utc::now(),
            event,
        }
    }

    /// Root of this user's data.
    pub fn user_root(&self) -> String {
        format!("users/{}", self.user_id)
    }

    /// Primary store location of this record.
    pub fn path(&self) -> String {
        let root = self.user_root();
        let level = &self.level;
        match self.event {
            AnalyticsEvent::Match => format!("{root}/match_stats/{level}/obstacle_match_count"),
            AnalyticsEvent::Mismatch { .. } => {
                format!("{root}/match_stats/{level}/obstacle_mismatch_count")
            }
            AnalyticsEvent::Death => format!("{root}/{level}_death_times"),
            AnalyticsEvent::LevelCompleted { .. } => {
                format!("{root}/completion_stats/{level}/completion_count")
            }
        }
    }
}
