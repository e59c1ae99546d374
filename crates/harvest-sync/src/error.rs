//! Error types for the update cycle.

use harvest_storage::StorageError;
use thiserror::Error;

/// Errors that abort one target's update cycle.
///
/// None of these advance the target's checkpoint; the next cycle repeats
/// the same work.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Harvester fetch, continuation or single-record fetch failed
    #[error("Harvest error: {0}")]
    Harvest(String),

    /// Messenger unreachable or rejected a request
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Indexer refused the flush request
    #[error("Flush request for {target} was not accepted")]
    FlushRejected { target: String },

    /// Indexer reported the flush as failed
    #[error("Flush for {target} failed")]
    FlushFailed { target: String },

    /// Checkpoint could not be loaded
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Shutdown requested while waiting
    #[error("Cancelled")]
    Cancelled,
}

impl SyncError {
    /// Whether this error came from the cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SyncError::Cancelled)
    }
}
