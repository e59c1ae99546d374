//! Dispatcher: gated submission of batches plus partial-record resolution.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use harvest_types::{Target, UpdateRecord};

use crate::error::SyncError;
use crate::fetcher::BatchFetcher;
use crate::gate::BackpressureGate;
use crate::messenger::Messenger;

/// Counters for records handed to the indexer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Records accepted by the indexer, re-sent partials included
    pub records: usize,
    /// Records the indexer asked to have re-sent with full content
    pub partials: usize,
}

impl DispatchStats {
    /// Merge another result into this one.
    pub fn merge(&mut self, other: &DispatchStats) {
        self.records += other.records;
        self.partials += other.partials;
    }

    /// Whether anything was dispatched.
    pub fn has_updates(&self) -> bool {
        self.records > 0
    }
}

/// Submits batches to the indexer, never while it is saturated.
pub struct Dispatcher<'a> {
    messenger: &'a dyn Messenger,
    gate: &'a BackpressureGate,
    cancel: &'a CancellationToken,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        messenger: &'a dyn Messenger,
        gate: &'a BackpressureGate,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            messenger,
            gate,
            cancel,
        }
    }

    /// Await capacity, then submit `records`.
    ///
    /// Returns the ids the indexer wants re-sent with full content.
    pub async fn send(
        &self,
        records: &[UpdateRecord],
        target: &Target,
    ) -> Result<BTreeSet<String>, SyncError> {
        self.gate
            .await_capacity(self.messenger, &target.index_host, self.cancel)
            .await?;

        for record in records {
            debug!(target = %target.name, "Sending {}", record);
        }
        self.messenger.enqueue(records, &target.index_host).await
    }

    /// Send one harvested batch and resolve any partial records it produces.
    ///
    /// Partials are fetched one by one and sent together in a second
    /// submission. Partials reported by that second submission are logged
    /// only.
    pub async fn dispatch(
        &self,
        fetcher: &BatchFetcher<'_>,
        records: &[UpdateRecord],
        target: &Target,
    ) -> Result<DispatchStats, SyncError> {
        let mut stats = DispatchStats::default();
        if records.is_empty() {
            return Ok(stats);
        }

        let partials = self.send(records, target).await?;
        stats.records = records.len();
        if partials.is_empty() {
            return Ok(stats);
        }

        info!(
            target = %target.name,
            count = partials.len(),
            "Indexer requested full content for partial records"
        );
        stats.partials = partials.len();

        let mut full = Vec::with_capacity(partials.len());
        for id in &partials {
            let fetched = fetcher.fetch_single(id).await?;
            if fetched.is_empty() {
                warn!(target = %target.name, record_id = %id, "Partial record not found upstream");
            }
            full.extend(fetched);
        }
        if full.is_empty() {
            return Ok(stats);
        }

        let unresolved = self.send(&full, target).await?;
        stats.records += full.len();
        if !unresolved.is_empty() {
            warn!(
                target = %target.name,
                ids = ?unresolved,
                "Indexer still reports partial records after re-send"
            );
        }
        Ok(stats)
    }
}
