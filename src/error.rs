//! Error Types
//!
//! Every fallible operation in FlashCache reports a [`CacheError`].
//! A lookup miss is not an error: `get` returns `None` and leaves nothing
//! behind for the caller to clean up.

use thiserror::Error;

/// Errors that can occur while building or using a cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The key is already live in the cache; nothing was written.
    #[error("key already present in cache")]
    DuplicateKey,

    /// The configuration cannot produce a working cache.
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// The background reaper could not be started.
    #[error("failed to start reaper: {0}")]
    ReaperSpawn(#[from] std::io::Error),

    /// A sweep panicked. The cache still serves reads and writes but
    /// no longer expires keys.
    #[error("reaper stopped after a sweep fault: {0}")]
    ReaperFault(String),
}

impl CacheError {
    /// Returns true if this error means the key was already present.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CacheError::DuplicateKey)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
