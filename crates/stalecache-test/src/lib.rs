//! Helpers for testing caches and backends.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all console output
//!    is captured by the test runner.
//!
//!  - Timing based tests use real time. Keep the delays of [`SlowBackend`] and [`Generator`]
//!    well apart from the timeouts under test, so that scheduling jitter does not matter.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;

use stalecache::{Backend, CacheEntry, CacheError, CacheOptions, Envelope};

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from the `stalecache` crate and mutes all
///    other logs.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("stalecache=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// A backend that answers every operation after a fixed delay.
///
/// Reads always return the string `"get result"`, writes are counted but not stored.
#[derive(Debug)]
pub struct SlowBackend {
    delay: Duration,
    writes: AtomicUsize,
}

impl SlowBackend {
    /// The value returned by every read.
    pub const GET_RESULT: &'static str = "get result";

    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            writes: AtomicUsize::new(0),
        }
    }

    /// The number of writes that completed, including ones the caller stopped waiting for.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl Backend for SlowBackend {
    fn name(&self) -> &str {
        "slow"
    }

    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, CacheEntry<Option<Envelope>>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            let value = Value::from(Self::GET_RESULT);
            Ok(Some(Envelope::wrap(value, Duration::ZERO)))
        })
    }

    fn set<'a>(
        &'a self,
        _key: &'a str,
        _envelope: Envelope,
        _options: &'a CacheOptions,
    ) -> BoxFuture<'a, CacheEntry> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn unset<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, CacheEntry> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            Ok(())
        })
    }
}

/// A backend whose reads and/or writes fail with a [`CacheError::Backend`].
///
/// Operations that do not fail behave like an empty backend that drops all writes.
#[derive(Debug, Default)]
pub struct FailingBackend {
    fail_reads: bool,
    fail_writes: bool,
}

impl FailingBackend {
    /// The message of every read error.
    pub const READ_ERROR: &'static str = "read failed";
    /// The message of every write error.
    pub const WRITE_ERROR: &'static str = "write failed";

    /// A backend where only reads fail.
    pub fn reads() -> Self {
        Self {
            fail_reads: true,
            fail_writes: false,
        }
    }

    /// A backend where only writes fail.
    pub fn writes() -> Self {
        Self {
            fail_reads: false,
            fail_writes: true,
        }
    }

    /// A backend where everything fails.
    pub fn all() -> Self {
        Self {
            fail_reads: true,
            fail_writes: true,
        }
    }
}

impl Backend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn get<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, CacheEntry<Option<Envelope>>> {
        let result = match self.fail_reads {
            true => Err(CacheError::backend(Self::READ_ERROR)),
            false => Ok(None),
        };
        futures::future::ready(result).boxed()
    }

    fn set<'a>(
        &'a self,
        _key: &'a str,
        _envelope: Envelope,
        _options: &'a CacheOptions,
    ) -> BoxFuture<'a, CacheEntry> {
        let result = match self.fail_writes {
            true => Err(CacheError::backend(Self::WRITE_ERROR)),
            false => Ok(()),
        };
        futures::future::ready(result).boxed()
    }

    fn unset<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, CacheEntry> {
        let result = match self.fail_writes {
            true => Err(CacheError::backend(Self::WRITE_ERROR)),
            false => Ok(()),
        };
        futures::future::ready(result).boxed()
    }
}

/// A value generator type as accepted by `Cache::get_or_else` and `Cache::set_with`.
pub type GenerateFn = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<Value>> + Send>;

/// Creates value generators and counts how often they were called.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    calls: Arc<AtomicUsize>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of generators created by this instance that have been called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A generator resolving to `value` after `delay`.
    pub fn value(&self, delay: Duration, value: impl Into<Value>) -> GenerateFn {
        self.generator(delay, Ok(value.into()))
    }

    /// A generator failing with `message` after `delay`.
    pub fn failing(&self, delay: Duration, message: &'static str) -> GenerateFn {
        self.generator(delay, Err(message))
    }

    fn generator(&self, delay: Duration, result: Result<Value, &'static str>) -> GenerateFn {
        let calls = Arc::clone(&self.calls);
        Box::new(move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                result.map_err(|message| anyhow::anyhow!(message))
            }
            .boxed()
        })
    }
}

/// Sleeps for the given number of milliseconds.
pub async fn delay(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}
