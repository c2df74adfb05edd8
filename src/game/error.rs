//! Game error taxonomy.
//!
//! None of these abort a run. Each call site decides how to degrade:
//! skip the spawn, fall back to a default shape, or disable a feature, and
//! log a warning.

use thiserror::Error;

/// Errors raised while building or driving a run.
#[derive(Debug, Error)]
pub enum GameError {
    /// A required setting or resource is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Level data referenced a lane, obstacle type or shape that does not exist.
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRangeIndex {
        /// Which table was indexed.
        what: &'static str,
        /// The offending index.
        index: i64,
        /// Size of the table.
        len: usize,
    },

    /// A shape key that is not one of the twelve composite shapes.
    #[error("unknown composite shape key {0:?}")]
    UnknownCompositeKey(String),

    /// Level or config JSON failed to parse.
    #[error("invalid level data: {0}")]
    LevelData(#[from] serde_json::Error),

    /// A replay transcript failed to encode or decode.
    #[error("transcript error: {0}")]
    Transcript(#[from] bincode::Error),
}
