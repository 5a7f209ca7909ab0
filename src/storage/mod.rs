//! Storage Module
//!
//! This module provides the building blocks of the expiring cache:
//! a sharded key-value store, a time-bucketed expiry queue, and the
//! background reaper that reconciles the two.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ShardedStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...N     │           │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲ batch_erase(expired)
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │          Reaper           │
//!              │  (Dedicated Thread)       │
//!              └─────────────┬─────────────┘
//!                            │ pop(ttl)
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExpiryQueue                             │
//! │   [t=10: k1 k2] [t=11: k3] [t=12: k4 k5]   current: k6      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: independent shard locks reduce contention
//! - **Insert-If-Absent**: `put` never overwrites a live key
//! - **Bucketed Expiry**: no per-key timers; whole buckets retire together
//! - **Batched Erase**: one lock acquisition per shard per sweep
//!
//! ## Example
//!
//! ```
//! use flashcache::clock::{Clock, ManualClock};
//! use flashcache::storage::{ExpiryQueue, ShardedStore};
//! use std::sync::Arc;
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let store = ShardedStore::new(4).unwrap();
//! let queue = ExpiryQueue::new(clock.clone() as Arc<dyn Clock>);
//!
//! store.put("session", "token123").unwrap();
//! queue.put("session");
//!
//! clock.advance(60);
//! let expired = queue.pop(60);
//! store.batch_erase(&expired);
//! assert_eq!(store.get(&"session"), None);
//! ```

pub mod expiry;
pub mod queue;
pub mod shard;

// Re-export commonly used types
pub use expiry::{Reap, Reaper, ReaperState, SweepStats};
pub use queue::ExpiryQueue;
pub use shard::ShardedStore;
