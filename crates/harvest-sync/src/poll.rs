//! Fixed-interval polling with cancellation.
//!
//! Every wait in the update cycle goes through here so that a shutdown
//! request interrupts it promptly.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::SyncError;

/// Sleep for `duration` unless cancelled first.
pub async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), SyncError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Run `probe` until it breaks, sleeping `interval` between attempts.
///
/// The first attempt runs immediately. There is no attempt limit; the loop
/// ends on `Break`, on an error from `probe`, or on cancellation.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    cancel: &CancellationToken,
    mut probe: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ControlFlow<T>, SyncError>>,
{
    loop {
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        if let ControlFlow::Break(value) = probe().await? {
            return Ok(value);
        }
        pause(interval, cancel).await?;
    }
}
