//! Scripted collaborators for testing.
//!
//! Both mocks record every call and answer from queues filled by the test.
//! An exhausted queue falls back to a benign default: an empty page, queue
//! depth 0, no partials, flush success, snapshot finished.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use harvest_types::{
    Cursor, FlushStatus, HarvestMode, HarvestPage, SnapshotRequest, Target, UpdateRecord,
};

use crate::error::SyncError;
use crate::harvester::Harvester;
use crate::messenger::Messenger;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A call received by [`MockHarvester`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvesterCall {
    Fetch {
        target: String,
        cursor: Cursor,
        mode: HarvestMode,
        batch_size: usize,
    },
    FetchMore {
        target: String,
        token: String,
    },
    FetchOne {
        target: String,
        record_id: String,
    },
}

/// Harvester answering from per-target page queues.
///
/// `fetch` and `fetch_more` consume the same queue, so a paginated
/// response is scripted as consecutive pages.
#[derive(Default)]
pub struct MockHarvester {
    pages: Mutex<HashMap<String, VecDeque<Result<HarvestPage, String>>>>,
    singles: Mutex<HashMap<(String, String), Vec<UpdateRecord>>>,
    failing_singles: Mutex<HashSet<(String, String)>>,
    calls: Mutex<Vec<HarvesterCall>>,
}

impl MockHarvester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page for `target`.
    pub fn push_page(&self, target: &str, page: HarvestPage) {
        lock(&self.pages)
            .entry(target.to_string())
            .or_default()
            .push_back(Ok(page));
    }

    /// Queue a fetch failure for `target`.
    pub fn push_error(&self, target: &str, message: &str) {
        lock(&self.pages)
            .entry(target.to_string())
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// Register the full record returned by `fetch_one`.
    pub fn push_single(&self, target: &str, record: UpdateRecord) {
        lock(&self.singles)
            .entry((target.to_string(), record.record_id.clone()))
            .or_default()
            .push(record);
    }

    /// Make `fetch_one` fail for `record_id`.
    pub fn fail_single(&self, target: &str, record_id: &str) {
        lock(&self.failing_singles).insert((target.to_string(), record_id.to_string()));
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<HarvesterCall> {
        lock(&self.calls).clone()
    }

    /// `fetch` calls received so far.
    pub fn fetches(&self) -> Vec<HarvesterCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, HarvesterCall::Fetch { .. }))
            .collect()
    }

    fn next_page(&self, target: &str) -> Result<HarvestPage, SyncError> {
        let next = lock(&self.pages)
            .get_mut(target)
            .and_then(|queue| queue.pop_front());
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(SyncError::Harvest(message)),
            None => Ok(HarvestPage::default()),
        }
    }
}

#[async_trait]
impl Harvester for MockHarvester {
    async fn fetch(
        &self,
        target: &Target,
        cursor: &Cursor,
        mode: HarvestMode,
        batch_size: usize,
    ) -> Result<HarvestPage, SyncError> {
        lock(&self.calls).push(HarvesterCall::Fetch {
            target: target.name.clone(),
            cursor: cursor.clone(),
            mode,
            batch_size,
        });
        self.next_page(&target.name)
    }

    async fn fetch_more(
        &self,
        target: &Target,
        resumption_token: &str,
        _batch_size: usize,
    ) -> Result<HarvestPage, SyncError> {
        lock(&self.calls).push(HarvesterCall::FetchMore {
            target: target.name.clone(),
            token: resumption_token.to_string(),
        });
        self.next_page(&target.name)
    }

    async fn fetch_one(
        &self,
        target: &Target,
        record_id: &str,
    ) -> Result<Vec<UpdateRecord>, SyncError> {
        lock(&self.calls).push(HarvesterCall::FetchOne {
            target: target.name.clone(),
            record_id: record_id.to_string(),
        });
        let key = (target.name.clone(), record_id.to_string());
        if lock(&self.failing_singles).contains(&key) {
            return Err(SyncError::Harvest(format!("record {} unavailable", record_id)));
        }
        Ok(lock(&self.singles).get(&key).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A call received by [`MockMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessengerCall {
    Enqueue {
        host: String,
        record_ids: Vec<String>,
        /// Depth most recently reported to the caller before this call
        depth_seen: Option<usize>,
    },
    QueueDepth {
        host: String,
    },
    RequestFlush {
        target: String,
        host: String,
    },
    FlushStatus {
        target: String,
        host: String,
    },
    RequestSnapshot {
        host: String,
        request: SnapshotRequest,
    },
    SnapshotFinished {
        host: String,
        request: SnapshotRequest,
    },
}

/// Messenger answering from scripted queues.
pub struct MockMessenger {
    depths: Mutex<VecDeque<usize>>,
    last_depth: Mutex<Option<usize>>,
    partials: Mutex<VecDeque<BTreeSet<String>>>,
    enqueue_errors: Mutex<VecDeque<String>>,
    queue_depth_error: Mutex<Option<String>>,
    flush_accepted: Mutex<bool>,
    flush_statuses: Mutex<VecDeque<FlushStatus>>,
    snapshot_finished: Mutex<VecDeque<bool>>,
    calls: Mutex<Vec<MessengerCall>>,
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self {
            depths: Mutex::new(VecDeque::new()),
            last_depth: Mutex::new(None),
            partials: Mutex::new(VecDeque::new()),
            enqueue_errors: Mutex::new(VecDeque::new()),
            queue_depth_error: Mutex::new(None),
            flush_accepted: Mutex::new(true),
            flush_statuses: Mutex::new(VecDeque::new()),
            snapshot_finished: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue depths returned by successive `queue_depth` calls.
    pub fn push_depths(&self, depths: impl IntoIterator<Item = usize>) {
        lock(&self.depths).extend(depths);
    }

    /// Partial ids returned by the next `enqueue` call.
    pub fn push_partials<S: Into<String>>(&self, ids: impl IntoIterator<Item = S>) {
        lock(&self.partials).push_back(ids.into_iter().map(Into::into).collect());
    }

    /// Make the next `enqueue` call fail.
    pub fn push_enqueue_error(&self, message: &str) {
        lock(&self.enqueue_errors).push_back(message.to_string());
    }

    /// Make every `queue_depth` call fail.
    pub fn fail_queue_depth(&self, message: &str) {
        *lock(&self.queue_depth_error) = Some(message.to_string());
    }

    pub fn set_flush_accepted(&self, accepted: bool) {
        *lock(&self.flush_accepted) = accepted;
    }

    /// Statuses returned by successive `flush_status` calls.
    pub fn push_flush_statuses(&self, statuses: impl IntoIterator<Item = FlushStatus>) {
        lock(&self.flush_statuses).extend(statuses);
    }

    /// Answers returned by successive `snapshot_finished` calls.
    pub fn push_snapshot_finished(&self, answers: impl IntoIterator<Item = bool>) {
        lock(&self.snapshot_finished).extend(answers);
    }

    /// All calls received so far.
    pub fn calls(&self) -> Vec<MessengerCall> {
        lock(&self.calls).clone()
    }

    /// Record ids of each `enqueue` call, in order.
    pub fn enqueued_ids(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MessengerCall::Enqueue { record_ids, .. } => Some(record_ids),
                _ => None,
            })
            .collect()
    }

    /// Depth last reported before each `enqueue` call.
    pub fn depths_at_dispatch(&self) -> Vec<Option<usize>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MessengerCall::Enqueue { depth_seen, .. } => Some(depth_seen),
                _ => None,
            })
            .collect()
    }

    /// Number of `queue_depth` calls.
    pub fn depth_queries(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MessengerCall::QueueDepth { .. }))
            .count()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn enqueue(
        &self,
        records: &[UpdateRecord],
        index_host: &str,
    ) -> Result<BTreeSet<String>, SyncError> {
        lock(&self.calls).push(MessengerCall::Enqueue {
            host: index_host.to_string(),
            record_ids: records.iter().map(|r| r.record_id.clone()).collect(),
            depth_seen: *lock(&self.last_depth),
        });
        if let Some(message) = lock(&self.enqueue_errors).pop_front() {
            return Err(SyncError::Dispatch(message));
        }
        Ok(lock(&self.partials).pop_front().unwrap_or_default())
    }

    async fn queue_depth(&self, index_host: &str) -> Result<usize, SyncError> {
        lock(&self.calls).push(MessengerCall::QueueDepth {
            host: index_host.to_string(),
        });
        if let Some(message) = lock(&self.queue_depth_error).clone() {
            return Err(SyncError::Dispatch(message));
        }
        let depth = lock(&self.depths).pop_front().unwrap_or(0);
        *lock(&self.last_depth) = Some(depth);
        Ok(depth)
    }

    async fn request_flush(&self, target: &str, index_host: &str) -> Result<bool, SyncError> {
        lock(&self.calls).push(MessengerCall::RequestFlush {
            target: target.to_string(),
            host: index_host.to_string(),
        });
        Ok(*lock(&self.flush_accepted))
    }

    async fn flush_status(
        &self,
        target: &str,
        index_host: &str,
    ) -> Result<FlushStatus, SyncError> {
        lock(&self.calls).push(MessengerCall::FlushStatus {
            target: target.to_string(),
            host: index_host.to_string(),
        });
        Ok(lock(&self.flush_statuses)
            .pop_front()
            .unwrap_or(FlushStatus::Success))
    }

    async fn request_snapshot(
        &self,
        index_host: &str,
        request: &SnapshotRequest,
    ) -> Result<(), SyncError> {
        lock(&self.calls).push(MessengerCall::RequestSnapshot {
            host: index_host.to_string(),
            request: request.clone(),
        });
        Ok(())
    }

    async fn snapshot_finished(
        &self,
        index_host: &str,
        request: &SnapshotRequest,
    ) -> Result<bool, SyncError> {
        lock(&self.calls).push(MessengerCall::SnapshotFinished {
            host: index_host.to_string(),
            request: request.clone(),
        });
        Ok(lock(&self.snapshot_finished).pop_front().unwrap_or(true))
    }
}
