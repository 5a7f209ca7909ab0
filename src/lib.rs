//! # FlashCache - An Embeddable In-Memory Cache with TTL Expiry
//!
//! FlashCache is a keyed cache meant to live inside a larger process. It
//! holds frequently used values, expires them a fixed time after insertion,
//! and keeps lock contention bounded under concurrent access.
//!
//! ## Features
//!
//! - **Sharded Storage**: independent `Mutex`-guarded shards reduce contention
//! - **Bucketed Expiry**: keys are grouped per sweep window; no per-key timers
//! - **Background Reaper**: a dedicated thread retires expired buckets on a
//!   drift-corrected schedule
//! - **Bounded Caches**: single-threaded FIFO, LRU and LFU caches for when a
//!   size bound matters more than time
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            ExpiringCache                                │
//! │                                                                         │
//! │   put ──┐                    get ──┐                                    │
//! │         ▼                          ▼                                    │
//! │  ┌──────────────────────────────────────────────┐                       │
//! │  │              ShardedStore                    │ ◄─── batch_erase ──┐  │
//! │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │                    │  │
//! │  │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │                    │  │
//! │  │  │Mutex   │ │Mutex   │ │Mutex   │ │shards  │ │                    │  │
//! │  │  └────────┘ └────────┘ └────────┘ └────────┘ │                    │  │
//! │  └──────────────────────┬───────────────────────┘                    │  │
//! │                         │ on insert                                  │  │
//! │                         ▼                                            │  │
//! │  ┌──────────────────────────────────────────────┐   pop(ttl)  ┌──────┴┐ │
//! │  │              ExpiryQueue                     │ ◄────────── │Reaper │ │
//! │  │  [t=10] [t=11] [t=12]   current              │             │thread │ │
//! │  └──────────────────────────────────────────────┘             └───────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use flashcache::{CacheConfig, ExpiringCache};
//!
//! // ttl = 60s, no capacity hint, sweep every second, 16 shards
//! let cache = ExpiringCache::new(CacheConfig::new(60, 0, 1, 16)).unwrap();
//!
//! assert!(cache.put("session:42", "token"));
//! assert_eq!(cache.get(&"session:42"), Some("token"));
//!
//! // Live keys are never overwritten
//! assert!(!cache.put("session:42", "other"));
//! ```
//!
//! ## Module Overview
//!
//! - [`cache`]: The [`ExpiringCache`] facade
//! - [`storage`]: Sharded store, expiry queue and background reaper
//! - [`bounded`]: Size-bounded FIFO, LRU and LFU caches
//! - [`config`]: Cache configuration and builder
//! - [`clock`]: Whole-second time sources
//! - [`error`]: Error types
//!
//! ## Design Highlights
//!
//! ### Insertion-Time TTL
//!
//! A key's lifetime starts at `put` and is never extended by reads. Keys share
//! the whole-second stamp of the bucket they land in, and a bucket is stamped
//! when the previous sweep opens it. A key inserted at `T` is removed
//! somewhere in `[T + ttl - sweep_interval - 1s, T + ttl + sweep_interval]`.
//!
//! ### One Queue Entry per Live Key
//!
//! `put` inserts into the store only if the key is absent, and enqueues the
//! key only after that insert succeeded. The store and queue locks are never
//! held together.
//!
//! ### Reaper Faults
//!
//! A panic during a sweep stops the reaper and is logged. Reads and writes
//! keep working, [`ExpiringCache::reaper_state`] reports `Faulted`, and
//! [`ExpiringCache::shutdown`] returns the fault.

pub mod bounded;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use bounded::{BoundedCache, FifoCache, LfuCache, LruCache};
pub use cache::ExpiringCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheBuilder, CacheConfig};
pub use error::{CacheError, Result};
pub use storage::{ExpiryQueue, ReaperState, ShardedStore};

/// Version of FlashCache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
