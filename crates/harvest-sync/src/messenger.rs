//! Messenger collaborator interface.

use std::collections::BTreeSet;

use async_trait::async_trait;

use harvest_types::{FlushStatus, SnapshotRequest, UpdateRecord};

use crate::error::SyncError;

/// Channel to the remote indexer: dispatch, queue depth, flush and snapshot.
///
/// Implementations report failures as `SyncError::Dispatch`.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Submit records to the indexer on `index_host`.
    ///
    /// Returns the ids the indexer needs re-sent with full content.
    async fn enqueue(
        &self,
        records: &[UpdateRecord],
        index_host: &str,
    ) -> Result<BTreeSet<String>, SyncError>;

    /// Number of records waiting in the indexer's queue.
    async fn queue_depth(&self, index_host: &str) -> Result<usize, SyncError>;

    /// Ask the indexer to flush `target`. Returns whether it accepted.
    async fn request_flush(&self, target: &str, index_host: &str) -> Result<bool, SyncError>;

    /// Current state of a requested flush.
    async fn flush_status(&self, target: &str, index_host: &str)
        -> Result<FlushStatus, SyncError>;

    /// Ask the indexer to snapshot the indexes matching the request pattern.
    async fn request_snapshot(
        &self,
        index_host: &str,
        request: &SnapshotRequest,
    ) -> Result<(), SyncError>;

    /// Whether the snapshot identified by `request` has finished.
    async fn snapshot_finished(
        &self,
        index_host: &str,
        request: &SnapshotRequest,
    ) -> Result<bool, SyncError>;
}
