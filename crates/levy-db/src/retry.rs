//! Single-retry helper for store and cache I/O.

use std::future::Future;

use tracing::warn;

use crate::error::DbResult;

/// Runs `op`, and runs it once more if the first attempt failed with a
/// transient error. The second error, if any, is returned as is.
pub async fn retry_once<T, F, Fut>(operation: &str, mut op: F) -> DbResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = DbResult<T>>,
{
    match op().await {
        Err(err) if err.is_transient() => {
            warn!(operation, error = %err, "Transient failure, retrying once");
            op().await
        }
        result => result,
    }
}
