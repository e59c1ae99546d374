//! Error types shared across the harvester crates.

use thiserror::Error;

/// Configuration and input validation errors.
///
/// Raised before any network activity; the run does not start.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Config(String),

    /// Both an explicit start timestamp and sequence were given
    #[error("Cannot specify both timestamp and sequence number")]
    ConflictingStartCursors,

    /// No harvesting endpoint or index host is known for the target
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
