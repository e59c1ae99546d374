//! HTTP messenger for the remote indexer's control endpoint.
//!
//! Index hosts are addressed as `http://{host}:{port}`; a host that already
//! carries a scheme or port is used as given.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use harvest_sync::{Messenger, SyncError};
use harvest_types::{FlushStatus, MessengerSettings, SnapshotRequest, UpdateRecord};

use crate::error::{check_status, parse_json, ClientError};

/// Configuration for [`HttpMessenger`].
#[derive(Debug, Clone)]
pub struct HttpMessengerConfig {
    /// Control port on each index host
    pub port: u16,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for HttpMessengerConfig {
    fn default() -> Self {
        Self {
            port: 8321,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpMessengerConfig {
    pub fn from_settings(settings: &MessengerSettings) -> Self {
        Self {
            port: settings.port,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct EnqueueRequest<'a> {
    records: &'a [UpdateRecord],
}

#[derive(Deserialize)]
struct EnqueueResponse {
    #[serde(default)]
    partial_ids: BTreeSet<String>,
}

#[derive(Deserialize)]
struct QueueResponse {
    depth: usize,
}

#[derive(Deserialize)]
struct FlushRequestResponse {
    accepted: bool,
}

#[derive(Deserialize)]
struct FlushStatusResponse {
    status: FlushStatus,
}

#[derive(Deserialize)]
struct SnapshotStatusResponse {
    finished: bool,
}

/// [`Messenger`] over HTTP.
pub struct HttpMessenger {
    client: Client,
    config: HttpMessengerConfig,
}

impl HttpMessenger {
    pub fn new(config: HttpMessengerConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Base URL for an index host.
    pub fn base_url(&self, index_host: &str) -> Result<Url, ClientError> {
        let raw = if index_host.contains("://") {
            index_host.to_string()
        } else if index_host.contains(':') {
            format!("http://{}", index_host)
        } else {
            format!("http://{}:{}", index_host, self.config.port)
        };
        Url::parse(&raw).map_err(|e| ClientError::InvalidEndpoint(format!("{}: {}", raw, e)))
    }

    fn endpoint(&self, index_host: &str, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url(index_host)?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidEndpoint(index_host.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn enqueue_inner(
        &self,
        records: &[UpdateRecord],
        index_host: &str,
    ) -> Result<BTreeSet<String>, ClientError> {
        let url = self.endpoint(index_host, &["enqueue"])?;
        let response = self
            .client
            .post(url)
            .json(&EnqueueRequest { records })
            .send()
            .await?;
        let body: EnqueueResponse = parse_json(check_status(response).await?).await?;
        Ok(body.partial_ids)
    }

    async fn queue_depth_inner(&self, index_host: &str) -> Result<usize, ClientError> {
        let url = self.endpoint(index_host, &["queue"])?;
        let response = self.client.get(url).send().await?;
        let body: QueueResponse = parse_json(check_status(response).await?).await?;
        Ok(body.depth)
    }

    async fn request_flush_inner(&self, target: &str, index_host: &str) -> Result<bool, ClientError> {
        let url = self.endpoint(index_host, &["flush", target])?;
        let response = self.client.post(url).send().await?;
        let body: FlushRequestResponse = parse_json(check_status(response).await?).await?;
        Ok(body.accepted)
    }

    async fn flush_status_inner(
        &self,
        target: &str,
        index_host: &str,
    ) -> Result<FlushStatus, ClientError> {
        let url = self.endpoint(index_host, &["flush", target])?;
        let response = self.client.get(url).send().await?;
        let body: FlushStatusResponse = parse_json(check_status(response).await?).await?;
        Ok(body.status)
    }

    async fn request_snapshot_inner(
        &self,
        index_host: &str,
        request: &SnapshotRequest,
    ) -> Result<(), ClientError> {
        let url = self.endpoint(index_host, &["snapshot"])?;
        let response = self.client.post(url).json(request).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn snapshot_finished_inner(
        &self,
        index_host: &str,
        request: &SnapshotRequest,
    ) -> Result<bool, ClientError> {
        let mut url = self.endpoint(index_host, &["snapshot"])?;
        url.query_pairs_mut()
            .append_pair("optimize", if request.optimize { "true" } else { "false" })
            .append_pair("pattern", &request.pattern);
        let response = self.client.get(url).send().await?;
        let body: SnapshotStatusResponse = parse_json(check_status(response).await?).await?;
        Ok(body.finished)
    }
}

#[async_trait]
impl Messenger for HttpMessenger {
    async fn enqueue(
        &self,
        records: &[UpdateRecord],
        index_host: &str,
    ) -> Result<BTreeSet<String>, SyncError> {
        debug!(host = %index_host, count = records.len(), "Enqueueing records");
        self.enqueue_inner(records, index_host)
            .await
            .map_err(ClientError::into_dispatch)
    }

    async fn queue_depth(&self, index_host: &str) -> Result<usize, SyncError> {
        let depth = self
            .queue_depth_inner(index_host)
            .await
            .map_err(ClientError::into_dispatch)?;
        trace!(host = %index_host, depth = depth, "Queue depth");
        Ok(depth)
    }

    async fn request_flush(&self, target: &str, index_host: &str) -> Result<bool, SyncError> {
        self.request_flush_inner(target, index_host)
            .await
            .map_err(ClientError::into_dispatch)
    }

    async fn flush_status(
        &self,
        target: &str,
        index_host: &str,
    ) -> Result<FlushStatus, SyncError> {
        self.flush_status_inner(target, index_host)
            .await
            .map_err(ClientError::into_dispatch)
    }

    async fn request_snapshot(
        &self,
        index_host: &str,
        request: &SnapshotRequest,
    ) -> Result<(), SyncError> {
        self.request_snapshot_inner(index_host, request)
            .await
            .map_err(ClientError::into_dispatch)
    }

    async fn snapshot_finished(
        &self,
        index_host: &str,
        request: &SnapshotRequest,
    ) -> Result<bool, SyncError> {
        self.snapshot_finished_inner(index_host, request)
            .await
            .map_err(ClientError::into_dispatch)
    }
}
