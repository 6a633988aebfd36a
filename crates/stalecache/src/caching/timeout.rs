use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;

use super::{CacheEntry, CacheError};

/// Runs a backend `operation`, giving up on it after `timeout`.
///
/// A zero `timeout` simply awaits the operation. Otherwise the operation is spawned
/// onto the runtime and reports into a result slot that this function stops listening
/// to once the timeout elapses. The abandoned operation keeps running to completion,
/// so its side effects still happen; only its outcome is dropped.
pub async fn with_timeout<F, T>(operation: F, timeout: Duration) -> CacheEntry<T>
where
    F: Future<Output = CacheEntry<T>> + Send + 'static,
    T: Send + 'static,
{
    if timeout.is_zero() {
        return operation.await;
    }

    let (sender, receiver) = oneshot::channel();
    tokio::spawn(async move {
        let result = operation.await;
        if let Err(Err(err)) = sender.send(result) {
            tracing::debug!(
                error = &err as &dyn std::error::Error,
                "Discarding the result of an abandoned operation"
            );
        }
    });

    match tokio::time::timeout(timeout, receiver).await {
        Ok(Ok(result)) => result,
        // the sender is only dropped without sending if the operation panicked
        Ok(Err(_)) => Err(CacheError::InternalError),
        Err(_elapsed) => {
            metric!(counter("caches.timeout") += 1);
            Err(CacheError::Timeout(timeout))
        }
    }
}
