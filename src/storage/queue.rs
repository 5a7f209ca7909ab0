//! Time-Bucketed Expiry Queue
//!
//! Instead of arming a timer per key, keys are appended to a *current*
//! bucket. Each sweep seals that bucket onto the tail of a FIFO and then
//! retires every bucket at the head whose age has reached the TTL.
//!
//! ```text
//!            seal on pop()                              append on put()
//!   head ◄──────────────────────────────────────────   ┌──────────────┐
//!   ┌────────┐ ┌────────┐ ┌────────┐                   │   current    │
//!   │ t = 10 │ │ t = 11 │ │ t = 12 │  ◄── sealed ───── │   t = 13     │
//!   │ k1 k2  │ │ k3     │ │ k4 k5  │                   │   k6 k7      │
//!   └────────┘ └────────┘ └────────┘                   └──────────────┘
//!    drained while  t + ttl <= now
//! ```
//!
//! Buckets are sealed in time order, so the sealed FIFO is already sorted
//! and a front scan finds every expired bucket. The current bucket is stamped
//! when the previous sweep opened it, so an item appended late in a window
//! is older on paper than in fact. It is retired between
//! `ttl - sweep_interval - 1s` and `ttl + sweep_interval` after insertion.
//!
//! The queue never deduplicates. Callers guarantee at most one outstanding
//! entry per live key.

use crate::clock::Clock;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Items inserted during one sweep window.
#[derive(Debug)]
struct Bucket<T> {
    timestamp_s: u64,
    items: Vec<T>,
}

impl<T> Bucket<T> {
    fn new(timestamp_s: u64) -> Self {
        Self {
            timestamp_s,
            items: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct QueueInner<T> {
    current: Bucket<T>,
    /// Oldest first.
    sealed: VecDeque<Bucket<T>>,
}

/// A single-lock queue grouping items into whole-second buckets.
pub struct ExpiryQueue<T> {
    inner: Mutex<QueueInner<T>>,
    clock: Arc<dyn Clock>,
}

impl<T> std::fmt::Debug for ExpiryQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiryQueue")
            .field("buckets", &self.bucket_count())
            .finish()
    }
}

impl<T> ExpiryQueue<T> {
    /// Creates an empty queue whose first bucket is stamped with the
    /// clock's current time.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_s();
        Self {
            inner: Mutex::new(QueueInner {
                current: Bucket::new(now),
                sealed: VecDeque::new(),
            }),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item to the current bucket.
    pub fn put(&self, item: T) {
        self.lock().current.items.push(item);
    }

    /// Seals the current bucket and drains every expired bucket.
    ///
    /// A bucket is expired once `timestamp + ttl_s <= now`. Items come back
    /// in insertion order. An empty current bucket is not sealed; it is only
    /// re-stamped so that its age is measured from this sweep.
    pub fn pop(&self, ttl_s: u64) -> Vec<T> {
        let now = self.clock.now_s();
        let mut inner = self.lock();

        if inner.current.items.is_empty() {
            inner.current.timestamp_s = now;
        } else {
            let sealed = std::mem::replace(&mut inner.current, Bucket::new(now));
            inner.sealed.push_back(sealed);
        }

        let mut expired = Vec::new();
        while let Some(front) = inner.sealed.front() {
            if front.timestamp_s.saturating_add(ttl_s) > now {
                break;
            }
            if let Some(bucket) = inner.sealed.pop_front() {
                expired.extend(bucket.items);
            }
        }

        expired
    }

    /// Total number of queued items across all buckets.
    ///
    /// Walks every bucket under the queue lock. Diagnostic use only.
    pub fn size(&self) -> usize {
        let inner = self.lock();
        inner.current.items.len() + inner.sealed.iter().map(|b| b.items.len()).sum::<usize>()
    }

    /// Number of sealed buckets waiting to expire.
    pub fn bucket_count(&self) -> usize {
        self.lock().sealed.len()
    }
}
