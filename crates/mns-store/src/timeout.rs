use std::future::Future;
use std::time::Duration;

use crate::error::{StoreError, StoreResult};

/// Deadline for key, certificate and record writes.
pub const DEFAULT_PUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a store operation under its own deadline.
///
/// An expired deadline becomes [`StoreError::Timeout`]; the operation is not
/// retried.
pub async fn with_timeout<T, F>(op: &'static str, limit: Duration, fut: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(op, ?limit, "store operation timed out");
            Err(StoreError::Timeout { op, after: limit })
        }
    }
}
