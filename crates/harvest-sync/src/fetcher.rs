//! Harvest batch fetcher.
//!
//! Wraps the `Harvester` for one target's cycle: tracks the continuation
//! token and folds the cursor values reported by each page.

use tracing::{debug, trace};

use harvest_types::{Cursor, HarvestMode, ResponseCursor, Target, UpdateRecord};

use crate::error::SyncError;
use crate::harvester::Harvester;

/// Pagination state for one logical harvest response.
pub struct BatchFetcher<'a> {
    harvester: &'a dyn Harvester,
    target: &'a Target,
    batch_size: usize,
    resumption_token: Option<String>,
    cursor: ResponseCursor,
    supports_sequence: bool,
    pages: usize,
}

impl<'a> BatchFetcher<'a> {
    /// Create a fetcher for `target`.
    pub fn new(harvester: &'a dyn Harvester, target: &'a Target, batch_size: usize) -> Self {
        Self {
            harvester,
            target,
            batch_size,
            resumption_token: None,
            cursor: ResponseCursor::default(),
            supports_sequence: false,
            pages: 0,
        }
    }

    /// Fetch the first page at `cursor`.
    pub async fn fetch_next(
        &mut self,
        cursor: &Cursor,
        mode: HarvestMode,
    ) -> Result<Vec<UpdateRecord>, SyncError> {
        debug!(
            target = %self.target.name,
            harvester = self.harvester.name(),
            cursor = %cursor,
            mode = %mode,
            batch_size = self.batch_size,
            "Fetching changes"
        );
        let page = self
            .harvester
            .fetch(self.target, cursor, mode, self.batch_size)
            .await?;

        self.cursor = page.cursor.clone();
        self.supports_sequence = page.supports_sequence;
        self.resumption_token = page.resumption_token;
        self.pages = 1;
        Ok(page.records)
    }

    /// Fetch the next page of the current response.
    ///
    /// Returns no records when the response is exhausted.
    pub async fn fetch_more(&mut self) -> Result<Vec<UpdateRecord>, SyncError> {
        let Some(token) = self.resumption_token.take() else {
            return Ok(Vec::new());
        };
        trace!(target = %self.target.name, page = self.pages + 1, "Fetching continuation");

        let page = self
            .harvester
            .fetch_more(self.target, &token, self.batch_size)
            .await?;

        self.cursor.merge(&page.cursor);
        self.supports_sequence |= page.supports_sequence;
        self.resumption_token = page.resumption_token;
        self.pages += 1;
        Ok(page.records)
    }

    /// Fetch one record individually, with full content.
    pub async fn fetch_single(&self, record_id: &str) -> Result<Vec<UpdateRecord>, SyncError> {
        self.harvester.fetch_one(self.target, record_id).await
    }

    /// Whether more pages remain in the current response.
    pub fn has_more(&self) -> bool {
        self.resumption_token.is_some()
    }

    /// Cursor values as of the last page fetched.
    pub fn response_cursor(&self) -> &ResponseCursor {
        &self.cursor
    }

    /// Whether the source reported sequence support.
    pub fn supports_sequence(&self) -> bool {
        self.supports_sequence
    }

    /// Number of pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }
}
