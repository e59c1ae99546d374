//! Completion handshake: flush acknowledgment, then optional snapshot.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use harvest_types::{FlushStatus, SnapshotRequest, Target};

use crate::error::SyncError;
use crate::messenger::Messenger;
use crate::poll::{pause, poll_until};

/// Which handshake phases completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandshakeOutcome {
    pub flushed: bool,
    pub snapshotted: bool,
}

/// Two-phase wait run after a target's records are dispatched.
#[derive(Debug, Clone)]
pub struct CompletionHandshake {
    wait_for_flush: bool,
    request_snapshot: bool,
    poll_interval: Duration,
    snapshot_pattern: String,
}

impl CompletionHandshake {
    pub fn new(
        wait_for_flush: bool,
        request_snapshot: bool,
        poll_interval: Duration,
        snapshot_pattern: impl Into<String>,
    ) -> Self {
        Self {
            wait_for_flush,
            request_snapshot,
            poll_interval,
            snapshot_pattern: snapshot_pattern.into(),
        }
    }

    /// Run the enabled phases for `target`.
    ///
    /// The snapshot phase only runs after a successful flush.
    pub async fn complete(
        &self,
        messenger: &dyn Messenger,
        target: &Target,
        cancel: &CancellationToken,
    ) -> Result<HandshakeOutcome, SyncError> {
        let mut outcome = HandshakeOutcome::default();
        if !self.wait_for_flush {
            return Ok(outcome);
        }

        self.flush(messenger, target, cancel).await?;
        outcome.flushed = true;

        if self.request_snapshot {
            self.snapshot(messenger, target, cancel).await?;
            outcome.snapshotted = true;
        }
        Ok(outcome)
    }

    async fn flush(
        &self,
        messenger: &dyn Messenger,
        target: &Target,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let name = target.name.as_str();
        let host = target.index_host.as_str();

        if !messenger.request_flush(name, host).await? {
            return Err(SyncError::FlushRejected {
                target: name.to_string(),
            });
        }
        debug!(target = %name, "Flush accepted, waiting for completion");

        // First status check comes one interval after the request
        pause(self.poll_interval, cancel).await?;
        poll_until(self.poll_interval, cancel, || async move {
            match messenger.flush_status(name, host).await? {
                FlushStatus::Pending => Ok(ControlFlow::Continue(())),
                FlushStatus::Success => Ok(ControlFlow::Break(())),
                FlushStatus::Failure => Err(SyncError::FlushFailed {
                    target: name.to_string(),
                }),
            }
        })
        .await?;

        info!(target = %name, "Flush complete");
        Ok(())
    }

    async fn snapshot(
        &self,
        messenger: &dyn Messenger,
        target: &Target,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let host = target.index_host.as_str();
        let request =
            SnapshotRequest::for_target(&target.name, !target.skip_optimize, &self.snapshot_pattern);

        info!(
            target = %target.name,
            optimize = request.optimize,
            pattern = %request.pattern,
            "Requesting snapshot"
        );
        messenger.request_snapshot(host, &request).await?;

        let request = &request;
        poll_until(self.poll_interval, cancel, || async move {
            if messenger.snapshot_finished(host, request).await? {
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        })
        .await?;

        info!(target = %target.name, "Snapshot complete");
        Ok(())
    }
}
