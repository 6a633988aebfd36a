use futures::future::BoxFuture;

use crate::caching::{CacheEntry, CacheOptions, Envelope};

use super::Backend;

/// A backend that never stores anything.
///
/// Every read is a miss, so a cache using it regenerates values on every
/// [`get_or_else`](crate::Cache::get_or_else).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopBackend;

impl Backend for NoopBackend {
    fn name(&self) -> &str {
        "noop"
    }

    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, CacheEntry<Option<Envelope>>> {
        Box::pin(async { Ok(None) })
    }

    fn set<'a>(
        &'a self,
        _key: &'a str,
        _envelope: Envelope,
        _options: &'a CacheOptions,
    ) -> BoxFuture<'a, CacheEntry> {
        Box::pin(async { Ok(()) })
    }

    fn unset<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, CacheEntry> {
        Box::pin(async { Ok(()) })
    }
}
