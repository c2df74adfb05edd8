//! In-memory analytics tree.
//!
//! Mirrors the layout of the realtime database the game reported to:
//! slash-separated paths into nested JSON objects, counters updated by
//! get-then-increment, mismatch positions appended to a list.

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::analytics::record::{AnalyticsEvent, AnalyticsRecord};

/// JSON tree keyed by slash-separated paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalyticsStore {
    root: Value,
}

impl Default for AnalyticsStore {
    fn default() -> Self {
        Self { root: Value::Object(Map::new()) }
    }
}

/// Round to two decimals, the precision positions and health are logged at.
fn two_decimals(value: f32) -> Value {
    let rounded = (f64::from(value) * 100.0).round() / 100.0;
    serde_json::Number::from_f64(rounded)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

impl AnalyticsStore {
    /// Empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at `path`, if present.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(&self.root, |node, key| node.get(key))
    }

    /// Integer at `path`; missing or non-numeric reads as zero.
    pub fn counter(&self, path: &str) -> i64 {
        self.get(path).and_then(Value::as_i64).unwrap_or(0)
    }

    fn entry_mut(&mut self, path: &str) -> &mut Value {
        let mut node = &mut self.root;
        for key in path.split('/').filter(|s| !s.is_empty()) {
            // Scalars on the way are replaced, as the database does
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = &mut node[key];
        }
        node
    }

    /// Overwrite `path`.
    pub fn set(&mut self, path: &str, value: Value) {
        *self.entry_mut(path) = value;
    }

    /// Read the counter at `path`, add one and write it back.
    pub fn increment(&mut self, path: &str) -> i64 {
        let updated = self.counter(path) + 1;
        self.set(path, Value::from(updated));
        updated
    }

    /// Append to the list at `path`, creating it if needed.
    pub fn append(&mut self, path: &str, value: Value) {
        match self.entry_mut(path) {
            Value::Array(items) => items.push(value),
            other => *other = Value::Array(vec![value]),
        }
    }

    /// Apply one record.
    pub fn apply(&mut self, record: &AnalyticsRecord) {
        let root = record.user_root();
        let level = &record.level;

        match record.event {
            AnalyticsEvent::Match | AnalyticsEvent::Death => {
                self.increment(&record.path());
            }
            AnalyticsEvent::Mismatch { y } => {
                self.increment(&record.path());
                self.append(
                    &format!("{root}/match_stats/{level}/obstacle_mismatch_positions"),
                    two_decimals(y),
                );
            }
            AnalyticsEvent::LevelCompleted { health, matches, mismatches, score } => {
                self.increment(&record.path());
                let stats = format!("{root}/completion_stats/{level}");
                self.set(&format!("{stats}/obstacle_match_count"), Value::from(matches));
                self.set(&format!("{stats}/obstacle_mismatch_count"), Value::from(mismatches));
                self.set(&format!("{stats}/score"), Value::from(score));
                self.set(&format!("{stats}/health_remaining_values"), two_decimals(health as f32));
            }
        }
        debug!(path = %record.path(), "analytics record applied");
    }

    /// Whole tree as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.root)
    }

    /// Whole tree.
    pub fn root(&self) -> &Value {
        &self.root
    }
}
