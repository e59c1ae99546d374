//! Backpressure gate.
//!
//! Dispatch is only issued after the indexer reports a queue depth below
//! the configured maximum. While saturated the gate re-polls at a fixed
//! interval, with no attempt limit.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::SyncError;
use crate::messenger::Messenger;
use crate::poll::poll_until;

/// Queue-depth flow control for one indexer host at a time.
#[derive(Debug, Clone)]
pub struct BackpressureGate {
    max_queue_depth: usize,
    interval: Duration,
}

impl BackpressureGate {
    /// Create a gate that blocks while depth >= `max_queue_depth`.
    pub fn new(max_queue_depth: usize, interval: Duration) -> Self {
        Self {
            max_queue_depth,
            interval,
        }
    }

    /// Threshold at which dispatch blocks.
    pub fn max_queue_depth(&self) -> usize {
        self.max_queue_depth
    }

    /// Wait until `index_host` has capacity. Returns the depth that let it through.
    pub async fn await_capacity(
        &self,
        messenger: &dyn Messenger,
        index_host: &str,
        cancel: &CancellationToken,
    ) -> Result<usize, SyncError> {
        let max = self.max_queue_depth;
        let interval = self.interval;
        poll_until(interval, cancel, || async move {
            let depth = messenger.queue_depth(index_host).await?;
            if depth < max {
                Ok(ControlFlow::Break(depth))
            } else {
                info!(
                    host = %index_host,
                    depth = depth,
                    max = max,
                    wait_ms = interval.as_millis() as u64,
                    "Indexer overloaded, waiting"
                );
                Ok(ControlFlow::Continue(()))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockMessenger;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_open_gate_does_not_wait() {
        let messenger = MockMessenger::new();
        messenger.push_depths([499]);
        let gate = BackpressureGate::new(500, Duration::from_secs(5));
        let start = Instant::now();

        let depth = gate
            .await_capacity(&messenger, "idx1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(depth, 499);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_depth_equal_to_max_blocks() {
        let messenger = MockMessenger::new();
        messenger.push_depths([500, 500, 12]);
        let gate = BackpressureGate::new(500, Duration::from_secs(5));
        let start = Instant::now();

        let depth = gate
            .await_capacity(&messenger, "idx1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(depth, 12);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(messenger.depth_queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_depth_failure_aborts() {
        let messenger = MockMessenger::new();
        messenger.fail_queue_depth("connection reset");
        let gate = BackpressureGate::new(500, Duration::from_secs(5));

        let result = gate
            .await_capacity(&messenger, "idx1", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SyncError::Dispatch(_))));
    }
}
