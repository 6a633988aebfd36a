use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// An error that happens while reading, generating or writing a cached value.
///
/// The enum is `Clone` so that the outcome of a single regeneration can be handed to
/// every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// A backend operation did not finish within the configured timeout.
    ///
    /// The operation itself was not cancelled, its outcome was discarded.
    #[error("operation timed out")]
    Timeout(Duration),
    /// The storage backend failed.
    ///
    /// The attached string contains the backend's own description of the failure.
    #[error("{0}")]
    Backend(String),
    /// The value generator failed.
    #[error("{0}")]
    Generator(Arc<anyhow::Error>),
    /// A value could not be converted from or into its stored representation.
    #[error("malformed: {0}")]
    Malformed(String),
    /// An unexpected error, such as a panicking backend operation or generator.
    #[error("internal error")]
    InternalError,
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl CacheError {
    /// Creates a [`Backend`](Self::Backend) error from anything printable.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }

    /// Wraps the failure of a value generator.
    pub fn generator(err: impl Into<anyhow::Error>) -> Self {
        Self::Generator(Arc::new(err.into()))
    }

    /// Whether this is a [`Timeout`](Self::Timeout).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// A short name used to tag metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Backend(_) => "backend",
            Self::Generator(_) => "generator",
            Self::Malformed(_) => "malformed",
            Self::InternalError => "internal",
        }
    }
}

/// The outcome of a cache operation, containing either `Ok(T)` or the [`CacheError`]
/// that prevented it.
pub type CacheEntry<T = ()> = Result<T, CacheError>;
