use std::sync::Arc;
use std::time::Duration;

use stalecache::backend::{MemoryBackend, MemoryBackendConfig};
use stalecache::{Backend, Cache, CacheOptions};
use stalecache_test as test;

pub use test::{FailingBackend, Generator, SlowBackend, delay};

/// Setup tests and create a cache backed by a fresh in-memory backend.
///
/// The `update_defaults` closure can modify the default options of the cache.
pub fn setup_memory_cache(update_defaults: impl FnOnce(&mut CacheOptions)) -> Cache {
    let backend = MemoryBackend::new("test", &MemoryBackendConfig::default());
    setup_cache(Arc::new(backend), update_defaults)
}

/// Setup tests and create a cache whose backend answers after `delay`.
pub fn setup_slow_cache(delay: Duration, timeout: Duration) -> (Cache, Arc<SlowBackend>) {
    let backend = Arc::new(SlowBackend::new(delay));
    let cache = setup_cache(backend.clone(), |defaults| defaults.timeout = timeout);
    (cache, backend)
}

/// Setup tests and create a cache on top of `backend`.
pub fn setup_cache(
    backend: Arc<dyn Backend>,
    update_defaults: impl FnOnce(&mut CacheOptions),
) -> Cache {
    test::setup();

    let mut defaults = CacheOptions::default();
    update_defaults(&mut defaults);
    Cache::with_backend("test", defaults, backend)
}
