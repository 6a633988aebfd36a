//! A stale-while-revalidate cache in front of pluggable key-value backends.
//!
//! The entry point is [`Cache`](caching::Cache), usually obtained from a
//! [`CacheRegistry`](caching::CacheRegistry) built from a [`Config`](config::Config).
//! See the [`caching`] module for how reads, refreshes and backend writes interact.

#[macro_use]
pub mod metrics;

pub mod backend;
pub mod caching;
pub mod config;
pub mod logging;
pub mod utils;

pub use backend::{Backend, BackendConfig};
pub use caching::{
    Cache, CacheEntry, CacheError, CacheOptions, CacheRegistry, CallOptions, Envelope,
};
