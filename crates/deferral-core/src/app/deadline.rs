//! Deadline helpers shared by the scheduler and the runner.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::{DeferError, OverflowId};
use crate::ports::OverflowStore;

/// Runs `fut` unless `deadline` passes first.
pub(crate) async fn within<T, F>(deadline: Instant, stage: &'static str, fut: F) -> Result<T, DeferError>
where
    F: Future<Output = Result<T, DeferError>>,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(DeferError::DeadlineExceeded(stage)),
    }
}

/// Deletes an overflow record under its own short timeout.
///
/// Independent of the caller's deadline, which may already have passed.
/// Failures are logged; the record is then left for the sweeper.
pub(crate) async fn discard_overflow(
    store: &Arc<dyn OverflowStore>,
    handle: OverflowId,
    timeout: Duration,
) {
    match tokio::time::timeout(timeout, store.delete(handle)).await {
        Ok(Ok(())) => tracing::debug!(%handle, "overflow record deleted"),
        Ok(Err(error)) => {
            tracing::warn!(%handle, %error, "could not delete overflow record; left for sweep")
        }
        Err(_) => tracing::warn!(
            %handle,
            timeout_ms = timeout.as_millis() as u64,
            "timed out deleting overflow record; left for sweep"
        ),
    }
}

/// Owns a freshly written overflow record until its fate is settled.
///
/// Dropped while still armed (the caller abandoned the future between
/// `put` and the end of the indirection enqueue), it spawns the timed delete.
pub(crate) struct OverflowGuard {
    store: Arc<dyn OverflowStore>,
    handle: OverflowId,
    timeout: Duration,
    armed: bool,
}

impl OverflowGuard {
    pub(crate) fn new(store: Arc<dyn OverflowStore>, handle: OverflowId, timeout: Duration) -> Self {
        Self {
            store,
            handle,
            timeout,
            armed: true,
        }
    }

    /// A task now references the record; keep it.
    pub(crate) fn disarm(mut self) {
        self.armed = false;
    }

    /// Deletes the record in place. Stays armed until the delete returns.
    pub(crate) async fn discard(mut self) {
        discard_overflow(&self.store, self.handle, self.timeout).await;
        self.armed = false;
    }
}

impl Drop for OverflowGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let handle = self.handle;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                tracing::warn!(%handle, "defer abandoned after overflow put; deleting record");
                let store = self.store.clone();
                let timeout = self.timeout;
                runtime.spawn(async move { discard_overflow(&store, handle, timeout).await });
            }
            Err(_) => {
                tracing::warn!(%handle, "defer abandoned outside a runtime; record left for sweep")
            }
        }
    }
}
