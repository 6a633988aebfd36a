use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::utils::lock::mutex_lock;

use super::{Cache, CacheConfig};

/// The name of the cache returned by [`CacheRegistry::default_cache`].
pub const DEFAULT_CACHE_NAME: &str = "default";

/// A collection of named caches, created lazily from a [`Config`].
///
/// Asking for the same name twice returns the same [`Cache`] instance, including its
/// backend and its running refreshes.
#[derive(Debug)]
pub struct CacheRegistry {
    config: Config,
    caches: Mutex<BTreeMap<String, Arc<Cache>>>,
}

impl CacheRegistry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: config.clone(),
            caches: Default::default(),
        }
    }

    /// Returns the cache called `name`, creating it if it does not exist yet.
    ///
    /// New caches use the global defaults and backend of the configuration, with any
    /// settings from the matching `caches.<name>` section applied on top.
    pub fn cache(&self, name: &str) -> Arc<Cache> {
        let mut caches = mutex_lock(&self.caches, "registry.cache");
        if let Some(cache) = caches.get(name) {
            return Arc::clone(cache);
        }

        let cache = Arc::new(Cache::new(self.cache_config(name)));
        tracing::debug!(
            cache = name,
            backend = cache.backend().name(),
            "Created named cache"
        );
        caches.insert(name.to_owned(), Arc::clone(&cache));
        cache
    }

    /// Returns the cache called [`DEFAULT_CACHE_NAME`].
    pub fn default_cache(&self) -> Arc<Cache> {
        self.cache(DEFAULT_CACHE_NAME)
    }

    /// The names of all caches created so far, in sorted order.
    pub fn known_caches(&self) -> Vec<String> {
        mutex_lock(&self.caches, "registry.known_caches")
            .keys()
            .cloned()
            .collect()
    }

    /// Forgets the cache called `name`, returning it if it existed.
    ///
    /// Holders of the returned `Arc` can keep using it, but later calls to
    /// [`cache`](Self::cache) create a new instance.
    pub fn drop_cache(&self, name: &str) -> Option<Arc<Cache>> {
        mutex_lock(&self.caches, "registry.drop_cache").remove(name)
    }

    /// Forgets all caches.
    pub fn drop_all(&self) {
        mutex_lock(&self.caches, "registry.drop_all").clear();
    }

    fn cache_config(&self, name: &str) -> CacheConfig {
        let mut defaults = self.config.defaults;
        let mut backend = self.config.backend.clone();
        if let Some(named) = self.config.caches.get(name) {
            defaults = defaults.merge(&named.defaults);
            if let Some(named_backend) = &named.backend {
                backend = named_backend.clone();
            }
        }

        CacheConfig {
            name: name.to_owned(),
            defaults,
            backend,
        }
    }
}
