//! Harvester collaborator interface.

use async_trait::async_trait;

use harvest_types::{Cursor, HarvestMode, HarvestPage, Target, UpdateRecord};

use crate::error::SyncError;

/// Client for the upstream incremental-harvesting endpoint.
///
/// Implementations report failures as `SyncError::Harvest`.
#[async_trait]
pub trait Harvester: Send + Sync {
    /// Fetch the first page of changes at `cursor`.
    ///
    /// With `HarvestMode::Unknown` the call doubles as a capability probe:
    /// the page's `supports_sequence` tells which mode the source speaks.
    async fn fetch(
        &self,
        target: &Target,
        cursor: &Cursor,
        mode: HarvestMode,
        batch_size: usize,
    ) -> Result<HarvestPage, SyncError>;

    /// Continue a paginated response.
    async fn fetch_more(
        &self,
        target: &Target,
        resumption_token: &str,
        batch_size: usize,
    ) -> Result<HarvestPage, SyncError>;

    /// Fetch one record with full content.
    async fn fetch_one(&self, target: &Target, record_id: &str)
        -> Result<Vec<UpdateRecord>, SyncError>;

    /// Name for logging.
    fn name(&self) -> &str;
}
