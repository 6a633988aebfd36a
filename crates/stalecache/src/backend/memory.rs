use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::Deserialize;

use crate::caching::{CacheEntry, CacheOptions, Envelope};

use super::Backend;

/// Configuration for the [`MemoryBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryBackendConfig {
    /// Maximum number of entries kept before the least recently used ones are evicted.
    pub capacity: u64,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

/// An item saved in the in-memory moka cache.
#[derive(Clone, Debug)]
struct StoredItem {
    /// When to evict this item, `None` keeps it until it is evicted for capacity.
    deadline: Option<Instant>,
    envelope: Envelope,
}

/// A struct implementing [`moka::Expiry`] that uses the [`StoredItem`] deadline as the
/// explicit expiration time.
struct ItemExpiration;

/// Returns the duration between the `current_time` and the item `deadline`.
///
/// An already elapsed deadline results in `Some(ZERO)`.
fn time_to_deadline(current_time: Instant, deadline: Option<Instant>) -> Option<Duration> {
    deadline.map(|deadline| {
        deadline
            .checked_duration_since(current_time)
            .unwrap_or_default()
    })
}

impl moka::Expiry<String, StoredItem> for ItemExpiration {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &StoredItem,
        current_time: Instant,
    ) -> Option<Duration> {
        time_to_deadline(current_time, value.deadline)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredItem,
        current_time: Instant,
        _current_duration: Option<Duration>,
    ) -> Option<Duration> {
        time_to_deadline(current_time, value.deadline)
    }
}

/// A backend that keeps envelopes in process memory.
///
/// Entries are removed once their `expire` option runs out, or when the configured
/// capacity is exceeded.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    items: moka::future::Cache<String, StoredItem>,
}

impl MemoryBackend {
    pub fn new(cache_name: &str, config: &MemoryBackendConfig) -> Self {
        let items = moka::future::Cache::builder()
            .max_capacity(config.capacity)
            .name(cache_name)
            .expire_after(ItemExpiration)
            .build();
        Self { items }
    }

    /// The approximate number of entries currently stored.
    pub fn entry_count(&self) -> u64 {
        self.items.entry_count()
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheEntry<Option<Envelope>>> {
        Box::pin(async move { Ok(self.items.get(key).await.map(|item| item.envelope)) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        envelope: Envelope,
        options: &'a CacheOptions,
    ) -> BoxFuture<'a, CacheEntry> {
        Box::pin(async move {
            let deadline = (!options.expire.is_zero())
                .then(|| Instant::now().checked_add(options.expire))
                .flatten();
            let item = StoredItem { deadline, envelope };
            self.items.insert(key.to_owned(), item).await;
            Ok(())
        })
    }

    fn unset<'a>(&'a self, key: &'a str) -> BoxFuture<'a, CacheEntry> {
        Box::pin(async move {
            self.items.invalidate(key).await;
            Ok(())
        })
    }

    fn end(&self) -> BoxFuture<'_, CacheEntry> {
        Box::pin(async move {
            self.items.invalidate_all();
            Ok(())
        })
    }
}
