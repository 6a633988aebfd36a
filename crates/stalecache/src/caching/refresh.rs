//! Coordination of stale-while-revalidate refreshes.
//!
//! [`Refresher::get_or_else`] decides per read whether a cached value can be served
//! as is, served while a refresh runs in the background, or whether the caller has to
//! wait for a freshly generated value. Refreshes for the same key are deduplicated via
//! the [`PendingRefreshes`] registry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;

use crate::backend::Backend;
use crate::utils::defer::defer;
use crate::utils::lock::mutex_lock;

use super::envelope::Envelope;
use super::timeout::with_timeout;
use super::{CacheEntry, CacheError, CacheOptions};

/// The shared outcome of a single in-flight regeneration.
type RefreshHandle = Shared<BoxFuture<'static, CacheEntry<Value>>>;

/// The registry of currently running refreshes, keyed by (namespaced) cache key.
///
/// An entry exists exactly while the generator for that key is running. It is inserted
/// together with spawning the refresh, under the same lock, and removed by the refresh
/// task itself as soon as the generator settles.
#[derive(Clone, Default)]
pub struct PendingRefreshes {
    inner: Arc<Mutex<HashMap<String, RefreshHandle>>>,
}

impl std::fmt::Debug for PendingRefreshes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRefreshes")
            .field("running", &self.len())
            .finish()
    }
}

impl PendingRefreshes {
    /// Whether a refresh for `key` is currently running.
    pub fn contains(&self, key: &str) -> bool {
        mutex_lock(&self.inner, "pending_refreshes.contains").contains_key(key)
    }

    /// The number of currently running refreshes.
    pub fn len(&self) -> usize {
        mutex_lock(&self.inner, "pending_refreshes.len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, key: &str) {
        mutex_lock(&self.inner, "pending_refreshes.remove").remove(key);
    }
}

/// What a read of the backend yielded, from the point of view of a refresh.
#[derive(Debug)]
enum Lookup {
    /// A value within its freshness window.
    Fresh(Value),
    /// A value past its freshness window, usable as a fallback.
    Stale(Value),
    /// Nothing usable, either because there was no entry or the read failed.
    Missing,
}

/// Decides between serving, refreshing and regenerating cached values.
#[derive(Clone, Debug)]
pub struct Refresher {
    cache_name: Arc<str>,
    pending: PendingRefreshes,
}

impl Refresher {
    pub fn new(cache_name: Arc<str>) -> Self {
        Self {
            cache_name,
            pending: PendingRefreshes::default(),
        }
    }

    /// The registry of refreshes started by this refresher.
    pub fn pending(&self) -> &PendingRefreshes {
        &self.pending
    }

    /// Returns the value cached under `key`, refreshing it via `generate` if needed.
    ///
    /// - A fresh value is returned right away.
    /// - A stale value is returned right away as well, while a refresh is started in
    ///   the background, unless one is already running for this key.
    /// - Without a usable value, this waits on the running refresh for this key, or
    ///   starts one, and returns its outcome.
    ///
    /// A failing backend read counts as a miss. Failing to write the refreshed value
    /// back is logged, but does not fail any caller.
    pub async fn get_or_else<F, Fut>(
        &self,
        backend: Arc<dyn Backend>,
        key: String,
        generate: F,
        options: CacheOptions,
    ) -> CacheEntry<Value>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CacheEntry<Value>> + Send + 'static,
    {
        let name = &*self.cache_name;
        metric!(counter("caches.access") += 1, "cache" => name);

        let fallback = match self.lookup(&backend, &key, &options).await {
            Lookup::Fresh(value) => {
                metric!(counter("caches.hit") += 1, "cache" => name);
                return Ok(value);
            }
            Lookup::Stale(value) => {
                metric!(counter("caches.stale") += 1, "cache" => name);
                Some(value)
            }
            Lookup::Missing => {
                metric!(counter("caches.miss") += 1, "cache" => name);
                None
            }
        };

        let refresh = self.refresh(backend, key, generate, options);

        match fallback {
            Some(value) => Ok(value),
            None => refresh.await,
        }
    }

    async fn lookup(&self, backend: &Arc<dyn Backend>, key: &str, options: &CacheOptions) -> Lookup {
        let read = {
            let backend = Arc::clone(backend);
            let key = key.to_owned();
            with_timeout(async move { backend.get(&key).await }, options.timeout).await
        };

        match read {
            Ok(Some(envelope)) if envelope.is_stale(Utc::now()) => {
                tracing::trace!(key, "Serving stale value while refreshing");
                Lookup::Stale(envelope.into_value())
            }
            Ok(Some(envelope)) => Lookup::Fresh(envelope.into_value()),
            Ok(None) => Lookup::Missing,
            Err(err) => {
                metric!(
                    counter("caches.read_error") += 1,
                    "cache" => &*self.cache_name,
                    "error" => err.kind(),
                );
                tracing::warn!(
                    error = &err as &dyn std::error::Error,
                    key,
                    "Failed to read cached value, treating it as missing"
                );
                Lookup::Missing
            }
        }
    }

    /// Returns the running refresh for `key`, or spawns a new one.
    ///
    /// The spawned task runs independently of the returned handle, so dropping the
    /// handle does not stop the refresh from writing its result back.
    fn refresh<F, Fut>(
        &self,
        backend: Arc<dyn Backend>,
        key: String,
        generate: F,
        options: CacheOptions,
    ) -> RefreshHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = CacheEntry<Value>> + Send + 'static,
    {
        let name = Arc::clone(&self.cache_name);

        // The lock is held until the new handle is registered. The task can only remove
        // its own entry after that, even when a worker thread picks it up right away.
        let mut pending = mutex_lock(&self.pending.inner, "pending_refreshes.insert");
        if let Some(running) = pending.get(&key) {
            metric!(counter("caches.refresh.join") += 1, "cache" => &*name);
            tracing::trace!(key = %key, "Joining running refresh");
            return running.clone();
        }

        metric!(counter("caches.refresh.start") += 1, "cache" => &*name);
        tracing::trace!(key = %key, "Spawning deduplicated refresh");

        let done_token = {
            let key = key.clone();
            let registry = self.pending.clone();
            defer(move || registry.remove(&key))
        };

        let task_key = key.clone();
        let task = async move {
            let key = task_key;
            let start = Instant::now();
            let generated = generate().await;

            // unregister before anyone waiting on this refresh is woken up
            done_token.run();
            metric!(timer("caches.refresh.duration") = start.elapsed(), "cache" => &*name);

            let value = match generated {
                Ok(value) => value,
                Err(err) => {
                    metric!(counter("caches.refresh.error") += 1, "cache" => &*name);
                    tracing::debug!(
                        error = &err as &dyn std::error::Error,
                        key = %key,
                        "Failed to generate value"
                    );
                    return Err(err);
                }
            };

            let envelope = Envelope::wrap(value.clone(), options.fresh_for);
            let write = {
                let key = key.clone();
                async move { backend.set(&key, envelope, &options).await }
            };
            if let Err(err) = with_timeout(write, options.timeout).await {
                metric!(
                    counter("caches.refresh.write_error") += 1,
                    "cache" => &*name,
                    "error" => err.kind(),
                );
                tracing::warn!(
                    error = &err as &dyn std::error::Error,
                    key = %key,
                    "Failed to store refreshed value"
                );
            }

            Ok(value)
        };

        let handle = tokio::spawn(task);
        let refresh = async move {
            handle.await.unwrap_or_else(|join_error| {
                tracing::error!(
                    error = &join_error as &dyn std::error::Error,
                    "Refresh task failed"
                );
                Err(CacheError::InternalError)
            })
        }
        .boxed()
        .shared();

        pending.insert(key, refresh.clone());
        refresh
    }
}
