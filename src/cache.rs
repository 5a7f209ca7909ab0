//! Expiring Cache
//!
//! [`ExpiringCache`] ties the pieces of the [`storage`](crate::storage)
//! module together:
//!
//! ```text
//!   put(k, v) ──► ShardedStore::put ──ok──► ExpiryQueue::put
//!   get(k)    ──► ShardedStore::get
//!
//!   Reaper, every sweep interval:
//!       ExpiryQueue::pop(ttl) ──► ShardedStore::batch_erase_if
//! ```
//!
//! ## Semantics
//!
//! - TTL is measured from insertion. Reads never extend a key's lifetime.
//! - `put` never overwrites a live key. To replace a value, `remove` it and
//!   `put` again.
//! - Keys are stamped per bucket, not per key. A bucket carries the time of
//!   the sweep that opened it, truncated to whole seconds. A key inserted at
//!   time `T` is therefore retired somewhere in
//!   `[T + ttl - sweep_interval - 1s, T + ttl + sweep_interval]`.
//!
//! ## Generation Stamps
//!
//! `remove` leaves the key's queue entry behind. Every `put` takes a fresh
//! stamp that is stored with the value and carried by the queue entry, and
//! the reaper only erases a key whose stored stamp matches. A stale entry
//! therefore can't retire a value that was re-inserted after a `remove`.
//!
//! ## Capacity
//!
//! The capacity hint only pre-sizes the shard maps. The cache is unbounded;
//! memory is reclaimed by expiry alone.

use crate::clock::{Clock, SystemClock};
use crate::config::{CacheBuilder, CacheConfig};
use crate::error::{CacheError, Result};
use crate::storage::{ExpiryQueue, Reap, Reaper, ReaperState, ShardedStore, SweepStats};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// A stored value plus the stamp of the `put` that created it.
#[derive(Debug, Clone)]
struct Slot<V> {
    value: V,
    stamp: u64,
}

/// Everything the reaper thread needs to share with the handle.
struct CacheCore<K, V> {
    ttl_s: u64,
    store: ShardedStore<K, Slot<V>>,
    queue: ExpiryQueue<(K, u64)>,
    next_stamp: AtomicU64,
}

impl<K, V> Reap for CacheCore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn reap(&self) -> SweepStats {
        let expired = self.queue.pop(self.ttl_s);
        let removed = self.store.batch_erase_if(
            &expired,
            |(key, _)| key,
            |(_, stamp), slot| slot.stamp == *stamp,
        );

        SweepStats {
            popped: expired.len(),
            removed,
        }
    }
}

/// A concurrent key-value cache whose entries expire a fixed time after
/// insertion.
///
/// The cache owns a background reaper thread. Dropping the cache stops the
/// reaper and waits for it to exit.
///
/// # Example
///
/// ```
/// use flashcache::{CacheConfig, ExpiringCache};
///
/// // ttl = 2s, capacity hint = 0, sweep every 1s, 8 shards
/// let cache = ExpiringCache::new(CacheConfig::new(2, 0, 1, 8)).unwrap();
///
/// assert!(cache.put(1, "Hello"));
/// assert!(!cache.put(1, "Hello")); // duplicate
/// assert_eq!(cache.get(&1), Some("Hello"));
/// assert_eq!(cache.get(&3), None);
/// assert_eq!(cache.size(), 1);
/// ```
pub struct ExpiringCache<K, V> {
    // Declared first so the reaper is joined before the core is released
    reaper: Reaper,
    core: Arc<CacheCore<K, V>>,
    config: CacheConfig,
}

impl<K, V> std::fmt::Debug for ExpiringCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("config", &self.config)
            .field("reaper", &self.reaper.state())
            .finish()
    }
}

impl<K, V> ExpiringCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache on the system clock and starts its reaper.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache that stamps buckets with `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let core = Arc::new(CacheCore {
            ttl_s: config.ttl_secs(),
            store: ShardedStore::with_capacity(config.shard_count, config.capacity_hint)?,
            queue: ExpiryQueue::new(clock),
            next_stamp: AtomicU64::new(0),
        });
        let reaper = Reaper::start(Arc::clone(&core), config.sweep_interval)?;

        info!(
            ttl_s = config.ttl_secs(),
            sweep_ms = config.sweep_interval.as_millis() as u64,
            shards = config.shard_count,
            "Expiring cache initialized"
        );

        Ok(Self {
            reaper,
            core,
            config,
        })
    }

    /// Returns a builder with default settings.
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    /// Inserts `value` under `key` if the key is not already live.
    ///
    /// Returns `true` if the value was inserted, `false` if the key was
    /// already present (the existing value is kept).
    pub fn put(&self, key: K, value: V) -> bool {
        self.try_put(key, value).is_ok()
    }

    /// Like [`put`](Self::put), but reports a duplicate as
    /// [`CacheError::DuplicateKey`].
    pub fn try_put(&self, key: K, value: V) -> Result<()> {
        let stamp = self.core.next_stamp.fetch_add(1, Ordering::Relaxed);
        // Cloned up front so nothing can fail between the two steps
        let queued = key.clone();

        self.core.store.put(key, Slot { value, stamp })?;
        self.core.queue.put((queued, stamp));
        Ok(())
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.core.store.get_with(key, |slot| slot.value.clone())
    }

    /// Checks if a key is live.
    pub fn contains(&self, key: &K) -> bool {
        self.core.store.contains(key)
    }

    /// Removes a key ahead of its expiry.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was removed, `false` if it wasn't present.
    pub fn remove(&self, key: &K) -> bool {
        self.core.store.erase(key)
    }

    /// Runs one sweep on the calling thread and returns the number of keys
    /// removed. The reaper runs the same sweep on its own schedule.
    pub fn purge_expired(&self) -> usize {
        self.core.reap().removed
    }

    /// Approximate number of live keys. Diagnostic use only.
    pub fn size(&self) -> usize {
        self.core.store.size()
    }

    /// Returns true if no key is live.
    pub fn is_empty(&self) -> bool {
        self.core.store.is_empty()
    }

    /// Number of entries waiting in the expiry queue.
    ///
    /// Walks every bucket under the queue lock and races with concurrent
    /// puts. Keep it off hot paths.
    pub fn debug_queue_size(&self) -> usize {
        self.core.queue.size()
    }

    /// Lifecycle state of the background reaper.
    pub fn reaper_state(&self) -> ReaperState {
        self.reaper.state()
    }

    /// Stops the reaper and waits for it to exit.
    ///
    /// The cache stays usable afterwards but no longer expires keys
    /// on its own; [`purge_expired`](Self::purge_expired) still works.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ReaperFault`] if a sweep panicked earlier.
    pub fn shutdown(&mut self) -> Result<()> {
        self.reaper.stop()
    }

    /// Time-to-live of every key.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Interval between reaper sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.config.sweep_interval
    }

    /// Number of store shards.
    pub fn shard_count(&self) -> usize {
        self.core.store.shard_count()
    }

    /// The advisory capacity hint the cache was built with.
    pub fn capacity_hint(&self) -> usize {
        self.config.capacity_hint
    }

    /// The configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl<K, V> ExpiringCache<K, V> {
    /// Returns the reaper's fault as an error, if it has one.
    pub fn reaper_fault(&self) -> Option<CacheError> {
        self.reaper.fault().map(CacheError::ReaperFault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::thread;

    /// A cache whose reaper effectively never fires, driven by hand.
    fn manual_cache(ttl_s: u64) -> (Arc<ManualClock>, ExpiringCache<u32, String>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let config = CacheConfig::new(ttl_s, 0, 3600, 4);
        let cache = ExpiringCache::with_clock(config, clock.clone()).unwrap();
        (clock, cache)
    }

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        condition()
    }

    #[test]
    fn test_get_never_inserted() {
        let (_clock, cache) = manual_cache(2);
        assert_eq!(cache.get(&7), None);
        assert!(!cache.contains(&7));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_then_get() {
        let (_clock, cache) = manual_cache(2);

        assert!(cache.put(1, "Hello".to_string()));
        assert_eq!(cache.get(&1), Some("Hello".to_string()));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.debug_queue_size(), 1);
    }

    #[test]
    fn test_duplicate_put_keeps_first_value() {
        let (_clock, cache) = manual_cache(2);

        assert!(cache.put(1, "v1".to_string()));
        assert!(!cache.put(1, "v2".to_string()));
        assert!(matches!(
            cache.try_put(1, "v3".to_string()),
            Err(CacheError::DuplicateKey)
        ));

        assert_eq!(cache.get(&1), Some("v1".to_string()));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.debug_queue_size(), 1);
    }

    #[test]
    fn test_size_counts_distinct_puts() {
        let (_clock, cache) = manual_cache(60);
        for i in 0..500 {
            assert!(cache.put(i, format!("value-{}", i)));
        }
        assert_eq!(cache.size(), 500);
        assert_eq!(cache.debug_queue_size(), 500);
    }

    #[test]
    fn test_expiry_window_with_manual_clock() {
        let (clock, cache) = manual_cache(2);
        cache.put(1, "Hello".to_string());

        // T + 1: still reachable
        clock.advance(1);
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.get(&1), Some("Hello".to_string()));

        // T + ttl: retired
        clock.advance(1);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.debug_queue_size(), 0);
    }

    #[test]
    fn test_key_inserted_mid_window_shares_bucket_stamp() {
        let (clock, cache) = manual_cache(2);

        // This sweep opens a bucket stamped 1000
        assert_eq!(cache.purge_expired(), 0);

        // Inserted at 1001, but lands in the bucket stamped 1000
        clock.advance(1);
        assert!(cache.put(1, "late".to_string()));

        // Retired at 1002, one second before 1001 + ttl
        clock.advance(1);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_unbounded_capacity_hint() {
        let cache: ExpiringCache<u32, u32> =
            ExpiringCache::new(CacheConfig::new(2, usize::MAX, 1, 16)).unwrap();

        assert!(cache.put(1, 1));
        assert_eq!(cache.get(&1), Some(1));
        assert_eq!(cache.capacity_hint(), usize::MAX);
    }

    #[test]
    fn test_get_does_not_extend_lifetime() {
        let (clock, cache) = manual_cache(2);
        cache.put(1, "Hello".to_string());

        for _ in 0..2 {
            clock.advance(1);
            assert!(cache.get(&1).is_some());
            cache.purge_expired();
        }
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_put_after_expiry_succeeds() {
        let (clock, cache) = manual_cache(1);
        cache.put(1, "old".to_string());

        clock.advance(1);
        cache.purge_expired();
        assert_eq!(cache.get(&1), None);

        assert!(cache.put(1, "new".to_string()));
        assert_eq!(cache.get(&1), Some("new".to_string()));
    }

    #[test]
    fn test_remove_then_reinsert_outlives_stale_entry() {
        let (clock, cache) = manual_cache(2);
        cache.put(1, "first".to_string());

        clock.advance(1);
        cache.purge_expired();

        // Replace the value; the first queue entry is still pending
        assert!(cache.remove(&1));
        assert!(!cache.remove(&1));
        assert!(cache.put(1, "second".to_string()));
        assert_eq!(cache.debug_queue_size(), 2);

        // The stale entry expires without touching the new value
        clock.advance(1);
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.get(&1), Some("second".to_string()));
        assert_eq!(cache.debug_queue_size(), 1);

        // The fresh entry expires on its own schedule
        clock.advance(1);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn test_capacity_hint_is_advisory() {
        let clock = Arc::new(ManualClock::new(0));
        let config = CacheConfig::new(60, 4, 3600, 2);
        let cache: ExpiringCache<u32, u32> = ExpiringCache::with_clock(config, clock).unwrap();

        for i in 0..100 {
            assert!(cache.put(i, i));
        }
        assert_eq!(cache.size(), 100);
        assert_eq!(cache.capacity_hint(), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result: Result<ExpiringCache<u32, u32>> =
            ExpiringCache::new(CacheConfig::new(2, 0, 1, 0));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_accessors() {
        let (_clock, cache) = manual_cache(2);
        assert_eq!(cache.ttl(), Duration::from_secs(2));
        assert_eq!(cache.sweep_interval(), Duration::from_secs(3600));
        assert_eq!(cache.shard_count(), 4);
        assert_eq!(cache.config().shard_count, 4);
        assert_eq!(cache.reaper_state(), ReaperState::Running);
        assert!(cache.reaper_fault().is_none());
    }

    #[test]
    fn test_reaper_expires_in_background() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: ExpiringCache<u32, u32> = CacheBuilder::new()
            .ttl(Duration::from_secs(1))
            .sweep_interval(Duration::from_millis(20))
            .build_with_clock(clock.clone())
            .unwrap();

        assert!(cache.put(1, 100));
        clock.advance(5);

        assert!(wait_until(Duration::from_secs(5), || cache.get(&1).is_none()));
        assert!(wait_until(Duration::from_secs(5), || cache.debug_queue_size() == 0));
    }

    #[test]
    fn test_shutdown_keeps_cache_usable() {
        let (clock, mut cache) = manual_cache(1);

        assert!(cache.shutdown().is_ok());
        assert_eq!(cache.reaper_state(), ReaperState::Stopped);

        assert!(cache.put(1, "still works".to_string()));
        assert_eq!(cache.get(&1), Some("still works".to_string()));

        // Manual sweeps still expire keys
        clock.advance(1);
        assert_eq!(cache.purge_expired(), 1);
    }

    #[test]
    fn test_concurrent_disjoint_puts() {
        let clock = Arc::new(ManualClock::new(0));
        let config = CacheConfig::new(60, 0, 3600, 8);
        let cache: Arc<ExpiringCache<u64, u64>> =
            Arc::new(ExpiringCache::with_clock(config, clock).unwrap());

        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    (0..1_000u64)
                        .filter(|i| cache.put(t * 1_000_000 + i, *i))
                        .count()
                })
            })
            .collect();

        let inserted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(inserted, 8_000);
        assert_eq!(cache.size(), 8_000);
        assert_eq!(cache.debug_queue_size(), 8_000);
    }

    #[test]
    fn test_concurrent_duplicate_puts_enqueue_once() {
        let clock = Arc::new(ManualClock::new(0));
        let config = CacheConfig::new(60, 0, 3600, 4);
        let cache: Arc<ExpiringCache<&'static str, usize>> =
            Arc::new(ExpiringCache::with_clock(config, clock).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.put("shared", t))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(cache.debug_queue_size(), 1);
    }

    mod fault {
        use super::*;
        use std::hash::Hasher;
        use std::sync::atomic::AtomicBool;

        static ARMED: AtomicBool = AtomicBool::new(false);

        /// Hashing key 13 panics once armed.
        #[derive(Debug, Clone, PartialEq, Eq)]
        struct Fragile(u32);

        impl Hash for Fragile {
            fn hash<H: Hasher>(&self, state: &mut H) {
                if self.0 == 13 && ARMED.load(Ordering::SeqCst) {
                    panic!("fragile key hashed");
                }
                self.0.hash(state);
            }
        }

        #[test]
        fn test_sweep_fault_disables_expiry_only() {
            let clock = Arc::new(ManualClock::new(0));
            let mut cache: ExpiringCache<Fragile, u32> = CacheBuilder::new()
                .ttl(Duration::from_secs(1))
                .sweep_interval(Duration::from_millis(20))
                .build_with_clock(clock.clone())
                .unwrap();

            assert!(cache.put(Fragile(13), 13));
            assert!(cache.put(Fragile(1), 1));

            ARMED.store(true, Ordering::SeqCst);
            clock.advance(5);

            assert!(wait_until(Duration::from_secs(5), || {
                cache.reaper_state() == ReaperState::Faulted
            }));

            // Reads and writes keep working
            assert_eq!(cache.get(&Fragile(1)), Some(1));
            assert!(cache.put(Fragile(2), 2));
            assert!(cache.reaper_fault().is_some());

            match cache.shutdown() {
                Err(CacheError::ReaperFault(message)) => {
                    assert_eq!(message, "fragile key hashed")
                }
                other => panic!("expected a reaper fault, got {:?}", other),
            }
        }
    }

    /// The end-to-end scenario on the real clock: ttl = 2s, sweep = 1s.
    #[test]
    fn test_end_to_end_real_time() {
        let cache: ExpiringCache<u32, String> =
            ExpiringCache::new(CacheConfig::new(2, 0, 1, 4)).unwrap();

        assert!(cache.put(1, "Hello".to_string()));
        assert!(!cache.put(1, "Hello".to_string()));
        assert!(cache.put(2, "World".to_string()));
        assert_eq!(cache.size(), 2);
        assert_eq!(cache.debug_queue_size(), 2);

        let mut output = cache.get(&1);
        assert_eq!(output.as_deref(), Some("Hello"));
        output = cache.get(&2).or(output);
        assert_eq!(output.as_deref(), Some("World"));
        // A miss leaves the caller's previous value alone
        output = cache.get(&3).or(output);
        assert_eq!(output.as_deref(), Some("World"));
        assert_eq!(cache.size(), 2);

        thread::sleep(Duration::from_secs(3));

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.debug_queue_size(), 0);
    }
}
