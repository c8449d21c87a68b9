//! Error types for tokenlint-core

use thiserror::Error;

/// Main error type for the tokenlint-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// A source file could not be read during an index build.
    ///
    /// This aborts the whole build; no partial index is persisted.
    #[error("unreadable source file {path}: {message}")]
    UnreadableSource { path: String, message: String },

    /// Migration plan file is malformed or internally inconsistent
    #[error("invalid migration plan: {0}")]
    InvalidPlan(String),

    /// Checkpoint was written for a different plan revision
    #[error("checkpoint plan hash mismatch: checkpoint has {recorded}, plan is {actual}; refusing to resume against a changed plan")]
    CheckpointMismatch { recorded: String, actual: String },

    /// A caller required a feature below the index's schema version
    #[error("{feature} requires index schema v{required}, index is v{current}; run `build` to upgrade")]
    SchemaVersion {
        feature: &'static str,
        required: i32,
        current: i32,
    },

    /// Index file does not exist yet
    #[error("no index found at {0}; run `build` first")]
    IndexMissing(String),
}

/// Result type alias for tokenlint-core
pub type Result<T> = std::result::Result<T, Error>;
