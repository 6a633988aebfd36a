//! # Caching infrastructure
//!
//! A [`Cache`] sits in front of a [`Backend`](crate::backend::Backend) and serves values
//! following a stale-while-revalidate strategy: values are stored together with a
//! freshness deadline, and a value past that deadline is still served while a new one
//! is being generated in the background.
//!
//! ## Reading values
//!
//! [`Cache::get`] only ever looks at the backend. [`Cache::get_or_else`] additionally
//! takes a generator, and goes through the following steps:
//!
//! - The backend is read, bounded by the configured `timeout`. A failing or timed out
//!   read is treated like a miss.
//! - A fresh value is returned as is.
//! - A stale value is returned as well, but a refresh is started in the background,
//!   unless one is already running for the same key.
//! - Without any value, the caller waits on the running refresh for that key, or starts
//!   one if there is none.
//!
//! A refresh runs the generator exactly once and writes its result back to the backend.
//! Refreshes are spawned onto the runtime, so they run to completion even if the caller
//! that started them has long returned a stale value. Errors of a refresh are only ever
//! seen by callers without a fallback value; failing to write back is logged and
//! otherwise ignored.
//!
//! ## Value envelope
//!
//! Values are stored as an [`Envelope`], a JSON object with the freshness deadline in
//! milliseconds since the epoch under `b` (`0` meaning "always fresh") and the value
//! itself under `d`. The `expire` option is passed to the backend, which is responsible
//! for actually evicting values.
//!
//! ## Timeouts
//!
//! The `timeout` option bounds backend operations only, never a generator. Operations
//! that time out are not cancelled, see [`with_timeout`].
//!
//! ### Metrics
//!
//! All metrics except `caches.timeout` are tagged with a `cache` field corresponding to
//! the cache name:
//!
//! - `caches.access`: All accesses via `get_or_else`.
//! - `caches.hit`: Accesses served with a fresh value.
//! - `caches.stale`: Accesses served with a stale value.
//! - `caches.miss`: Accesses without a usable value.
//! - `caches.read_error`: Backend reads that failed or timed out.
//! - `caches.refresh.start` / `caches.refresh.join`: Refreshes started, and accesses that
//!   attached to an already running refresh.
//! - `caches.refresh.error` / `caches.refresh.write_error`: Failing generators and
//!   failing write-backs.
//! - `caches.refresh.duration`: A timer for the generator.
//! - `caches.timeout`: Backend operations that timed out.

mod cache;
mod cache_error;
mod envelope;
mod options;
mod refresh;
mod registry;
mod timeout;


pub use cache::{Cache, CacheConfig};
pub use cache_error::{CacheEntry, CacheError};
pub use envelope::{Envelope, extract_value};
pub use options::{CacheOptions, CallOptions};
pub use refresh::{PendingRefreshes, Refresher};
pub use registry::{CacheRegistry, DEFAULT_CACHE_NAME};
pub use timeout::with_timeout;
