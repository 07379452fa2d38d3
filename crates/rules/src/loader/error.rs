//! Error types and load result structures for the rule loader.

use std::path::PathBuf;

/// Errors that can occur while loading a single rule file.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse/deserialization error.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rule validation error (missing fields, bad interval, etc.).
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Rule was successfully loaded.
    Loaded { name: String },
    /// File was skipped (dotfile, non-JSON, etc.).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}
