use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fully resolved options for a single cache operation.
///
/// Every duration uses zero to mean "disabled".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheOptions {
    /// How long a written value stays fresh. Zero means it never becomes stale.
    #[serde(with = "humantime_serde")]
    pub fresh_for: Duration,
    /// After how long the backend should drop the value. Zero means never.
    #[serde(with = "humantime_serde")]
    pub expire: Duration,
    /// Maximum time to wait for a backend read or write. Zero means no timeout.
    ///
    /// Value generators are never bound by this timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl CacheOptions {
    /// Applies per-call overrides on top of these options.
    pub fn merge(mut self, overrides: &CallOptions) -> Self {
        if let Some(fresh_for) = overrides.fresh_for {
            self.fresh_for = fresh_for;
        }
        if let Some(expire) = overrides.expire {
            self.expire = expire;
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        self
    }
}

/// Per-call overrides for a cache's default [`CacheOptions`].
///
/// Fields left as `None` fall back to the defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CallOptions {
    #[serde(with = "humantime_serde")]
    pub fresh_for: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub expire: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_for(mut self, fresh_for: Duration) -> Self {
        self.fresh_for = Some(fresh_for);
        self
    }

    pub fn expire(mut self, expire: Duration) -> Self {
        self.expire = Some(expire);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<CacheOptions> for CallOptions {
    fn from(options: CacheOptions) -> Self {
        Self {
            fresh_for: Some(options.fresh_for),
            expire: Some(options.expire),
            timeout: Some(options.timeout),
        }
    }
}
