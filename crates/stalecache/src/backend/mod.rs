//! Storage backends the cache can be put in front of.
//!
//! A backend only needs to be able to get, set and delete [`Envelope`]s by key. It is
//! free to serialize envelopes however it likes, and it is responsible for removing
//! entries once their `expire` option runs out. Timeouts, staleness and regeneration
//! are all handled by the [`caching`](crate::caching) layer on top.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::caching::{CacheEntry, CacheOptions, Envelope};

mod memory;
mod noop;

pub use memory::{MemoryBackend, MemoryBackendConfig};
pub use noop::NoopBackend;

/// A key-value store for cache [`Envelope`]s.
///
/// All operations are asynchronous and may fail with any [`CacheError`](crate::CacheError),
/// usually [`CacheError::Backend`](crate::CacheError::Backend).
pub trait Backend: fmt::Debug + Send + Sync + 'static {
    /// The backend type, used for logs and metrics.
    fn name(&self) -> &str;

    /// Loads the envelope stored under `key`, or `None` if there is none.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheEntry<Option<Envelope>>>;

    /// Stores `envelope` under `key`, honoring `options.expire`.
    fn set<'a>(
        &'a self,
        key: &'a str,
        envelope: Envelope,
        options: &'a CacheOptions,
    ) -> BoxFuture<'a, CacheEntry>;

    /// Removes whatever is stored under `key`.
    fn unset<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheEntry>;

    /// Releases any resources held by the backend.
    fn end(&self) -> BoxFuture<'_, CacheEntry> {
        Box::pin(async { Ok(()) })
    }
}

/// Selects and configures a [`Backend`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// A backend that stores nothing.
    #[default]
    Noop,
    /// An in-process backend.
    Memory(MemoryBackendConfig),
}

impl BackendConfig {
    /// Creates a fresh backend instance for this configuration.
    pub fn create(&self, cache_name: &str) -> Arc<dyn Backend> {
        match self {
            Self::Noop => Arc::new(NoopBackend),
            Self::Memory(config) => Arc::new(MemoryBackend::new(cache_name, config)),
        }
    }
}
