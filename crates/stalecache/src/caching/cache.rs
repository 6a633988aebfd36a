use std::future::Future;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{Backend, BackendConfig};
use crate::utils::lock::{rw_read, rw_write};

use super::envelope::{Envelope, extract_value};
use super::refresh::{PendingRefreshes, Refresher};
use super::timeout::with_timeout;
use super::{CacheEntry, CacheOptions, CallOptions};

/// Everything needed to construct a [`Cache`].
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    pub name: String,
    pub defaults: CacheOptions,
    pub backend: BackendConfig,
}

/// A stale-while-revalidate cache in front of a [`Backend`].
///
/// All keys are namespaced with the cache name, so multiple caches can share one
/// backend. Values are stored as JSON, and the typed accessors convert from and into
/// it. A cache miss reads as `null`, use `Option<T>` or [`Value`] where a miss is
/// expected.
#[derive(Debug)]
pub struct Cache {
    name: Arc<str>,
    prefix: String,
    defaults: RwLock<CacheOptions>,
    backend: RwLock<Arc<dyn Backend>>,
    refresher: Refresher,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        let backend = config.backend.create(&config.name);
        Self::with_backend(config.name, config.defaults, backend)
    }

    /// Creates a cache using an already constructed backend.
    pub fn with_backend(
        name: impl Into<String>,
        defaults: CacheOptions,
        backend: Arc<dyn Backend>,
    ) -> Self {
        let name: String = name.into();
        let prefix = format!("{name}:");
        let name: Arc<str> = name.into();
        Self {
            refresher: Refresher::new(Arc::clone(&name)),
            name,
            prefix,
            defaults: RwLock::new(defaults),
            backend: RwLock::new(backend),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backend currently in use.
    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&rw_read(&self.backend, "cache.backend"))
    }

    /// The refreshes currently running for this cache.
    pub fn pending_refreshes(&self) -> &PendingRefreshes {
        self.refresher.pending()
    }

    /// Replaces the backend, ending the previous one.
    ///
    /// The new backend is in use as soon as this is called. An error returned here comes
    /// from ending the previous backend, the replacement still happened.
    pub async fn set_backend(&self, backend: Arc<dyn Backend>) -> CacheEntry {
        let previous = std::mem::replace(
            &mut *rw_write(&self.backend, "cache.set_backend"),
            backend,
        );
        previous.end().await
    }

    /// Ends the current backend.
    pub async fn end(&self) -> CacheEntry {
        self.backend().end().await
    }

    /// The defaults merged into every operation.
    pub fn defaults(&self) -> CacheOptions {
        *rw_read(&self.defaults, "cache.defaults")
    }

    /// Updates the defaults with `overrides`, returning the new defaults.
    pub fn set_defaults(&self, overrides: &CallOptions) -> CacheOptions {
        let mut defaults = rw_write(&self.defaults, "cache.set_defaults");
        *defaults = defaults.merge(overrides);
        *defaults
    }

    /// Resolves the options for a single call, leaving the defaults untouched.
    pub fn prepare_options(&self, overrides: &CallOptions) -> CacheOptions {
        self.defaults().merge(overrides)
    }

    fn apply_prefix(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Reads the raw envelope stored under `key`.
    pub async fn get_wrapped(&self, key: &str) -> CacheEntry<Option<Envelope>> {
        let key = self.apply_prefix(key);
        let backend = self.backend();
        let timeout = self.defaults().timeout;
        with_timeout(async move { backend.get(&key).await }, timeout).await
    }

    /// Reads the value stored under `key`, regardless of its freshness.
    ///
    /// Backend failures and timeouts are returned as errors.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheEntry<T> {
        let envelope = self.get_wrapped(key).await?;
        Ok(serde_json::from_value(extract_value(envelope))?)
    }

    /// Returns the value cached under `key`, calling `generate` to refresh it when it is
    /// missing or stale.
    ///
    /// Stale values are returned immediately while the refresh runs in the background.
    /// Only when there is no usable value does this wait for `generate`, and only then
    /// are its errors returned. At most one refresh per key runs at a time; concurrent
    /// calls share it, and their own `generate` is never called.
    pub async fn get_or_else<T, F, Fut>(
        &self,
        key: &str,
        generate: F,
        options: &CallOptions,
    ) -> CacheEntry<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let options = self.prepare_options(options);
        let generate = move || async move { generate_value(generate).await };

        let value = self
            .refresher
            .get_or_else(self.backend(), self.apply_prefix(key), generate, options)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Like [`get_or_else`](Self::get_or_else), using a plain `value` in place of a
    /// generator.
    pub async fn get_or_else_value<T>(
        &self,
        key: &str,
        value: T,
        options: &CallOptions,
    ) -> CacheEntry<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.get_or_else(key, move || async move { Ok(value) }, options)
            .await
    }

    /// Stores `value` under `key`, regardless of what is currently cached.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: &CallOptions,
    ) -> CacheEntry {
        let value = serde_json::to_value(value)?;
        self.write(key, value, options).await
    }

    /// Stores the value returned by `generate` under `key`.
    ///
    /// The configured timeout only bounds the backend write, not the generator.
    pub async fn set_with<T, F, Fut>(
        &self,
        key: &str,
        generate: F,
        options: &CallOptions,
    ) -> CacheEntry
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let value = generate_value(generate).await?;
        self.write(key, value, options).await
    }

    async fn write(&self, key: &str, value: Value, options: &CallOptions) -> CacheEntry {
        let options = self.prepare_options(options);
        let key = self.apply_prefix(key);
        let backend = self.backend();
        let envelope = Envelope::wrap(value, options.fresh_for);
        with_timeout(
            async move { backend.set(&key, envelope, &options).await },
            options.timeout,
        )
        .await
    }

    /// Removes the value stored under `key`.
    ///
    /// A refresh already running for `key` is not affected and may store its result
    /// afterwards.
    pub async fn unset(&self, key: &str) -> CacheEntry {
        let key = self.apply_prefix(key);
        let backend = self.backend();
        let timeout = self.defaults().timeout;
        with_timeout(async move { backend.unset(&key).await }, timeout).await
    }
}

/// Runs a value generator and converts its result into a storable [`Value`].
async fn generate_value<T, F, Fut>(generate: F) -> CacheEntry<Value>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let value = generate().await.map_err(super::CacheError::generator)?;
    Ok(serde_json::to_value(value)?)
}
