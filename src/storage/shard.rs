//! Sharded Concurrent Key-Value Store
//!
//! This module implements the table that holds every live cache entry.
//! It is a fixed array of `Mutex<HashMap>` shards; a key always lands in the
//! same shard, chosen by hashing it with a hasher fixed at construction.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, each shard has its own,
//!    so contention on any lock is roughly `1 / shard_count` of the total.
//! 2. **Insert-If-Absent**: `put` never overwrites. The check and the insert
//!    happen under one lock acquisition via the map's entry API.
//! 3. **Batched Erase**: `batch_erase` groups keys by shard first and then
//!    takes each affected lock once, so a large expired batch costs at most
//!    `shard_count` lock acquisitions.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ShardedStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ Mutex   │ │ Mutex   │ │ Mutex   │ │ Mutex   │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every critical section is a single map operation, so a poisoned lock
//! still guards a consistent map and is recovered rather than propagated.

use crate::error::{CacheError, Result};
use std::collections::hash_map::{Entry, RandomState};
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Upper bound on the entries pre-allocated per shard from a capacity hint.
const MAX_PRESIZE_PER_SHARD: usize = 1 << 16;

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug)]
struct Shard<K, V> {
    data: Mutex<HashMap<K, V>>,
}

impl<K, V> Shard<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A hash-sharded concurrent table with insert-if-absent semantics.
///
/// # Example
///
/// ```
/// use flashcache::storage::ShardedStore;
///
/// let store = ShardedStore::new(4).unwrap();
///
/// assert!(store.put("name", "Ariz").is_ok());
/// assert!(store.put("name", "Other").is_err()); // never overwrites
/// assert_eq!(store.get(&"name"), Some("Ariz"));
///
/// store.batch_erase(&["name", "missing"]);
/// assert_eq!(store.size(), 0);
/// ```
pub struct ShardedStore<K, V> {
    shards: Box<[Shard<K, V>]>,
    hasher: RandomState,
}

impl<K, V> std::fmt::Debug for ShardedStore<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedStore")
            .field("shards", &self.shards.len())
            .finish()
    }
}

impl<K: Hash + Eq, V> ShardedStore<K, V> {
    /// Creates a store with `shard_count` empty shards.
    pub fn new(shard_count: usize) -> Result<Self> {
        Self::with_capacity(shard_count, 0)
    }

    /// Creates a store and spreads `capacity_hint` evenly across the shards
    /// as initial map capacity.
    ///
    /// The hint is advisory. Each shard pre-allocates at most
    /// `MAX_PRESIZE_PER_SHARD` entries, so `usize::MAX` means "unknown".
    pub fn with_capacity(shard_count: usize, capacity_hint: usize) -> Result<Self> {
        if shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard count must be non-zero".to_string(),
            ));
        }

        let per_shard = capacity_hint.div_ceil(shard_count).min(MAX_PRESIZE_PER_SHARD);
        let shards = (0..shard_count)
            .map(|_| Shard::with_capacity(per_shard))
            .collect();

        Ok(Self {
            shards,
            hasher: RandomState::new(),
        })
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) % self.shards.len() as u64) as usize
    }

    #[inline]
    fn get_shard(&self, key: &K) -> &Shard<K, V> {
        &self.shards[self.shard_index(key)]
    }

    /// Inserts `value` under `key` if the key is absent.
    ///
    /// Returns [`CacheError::DuplicateKey`] and leaves the existing value
    /// untouched if the key is already present.
    pub fn put(&self, key: K, value: V) -> Result<()> {
        let mut data = self.get_shard(&key).lock();

        match data.entry(key) {
            Entry::Occupied(_) => Err(CacheError::DuplicateKey),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get_with(key, V::clone)
    }

    /// Applies `f` to the value stored under `key` while its shard is locked.
    pub fn get_with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        let data = self.get_shard(key).lock();
        data.get(key).map(f)
    }

    /// Checks if a key is present.
    pub fn contains(&self, key: &K) -> bool {
        self.get_shard(key).lock().contains_key(key)
    }

    /// Removes a key.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key was removed, `false` if it wasn't present.
    pub fn erase(&self, key: &K) -> bool {
        self.get_shard(key).lock().remove(key).is_some()
    }

    /// Removes every key in `keys`, locking each affected shard once.
    ///
    /// Absent keys are skipped. Returns the number of keys removed.
    pub fn batch_erase(&self, keys: &[K]) -> usize {
        self.batch_erase_if(keys, |key| key, |_, _| true)
    }

    /// Like [`batch_erase`](Self::batch_erase), but each item is only
    /// removed when `predicate(item, stored_value)` holds.
    pub fn batch_erase_if<T, F, P>(&self, items: &[T], key_of: F, predicate: P) -> usize
    where
        F: Fn(&T) -> &K,
        P: Fn(&T, &V) -> bool,
    {
        if items.is_empty() {
            return 0;
        }

        let mut grouped: Vec<Vec<&T>> = (0..self.shards.len()).map(|_| Vec::new()).collect();
        for item in items {
            grouped[self.shard_index(key_of(item))].push(item);
        }

        let mut removed = 0;
        for (shard, group) in self.shards.iter().zip(&grouped) {
            if group.is_empty() {
                continue;
            }

            let mut data = shard.lock();
            for &item in group {
                let key = key_of(item);
                if data.get(key).is_some_and(|value| predicate(item, value)) {
                    data.remove(key);
                    removed += 1;
                }
            }
        }

        removed
    }

    /// Returns the number of stored keys.
    ///
    /// Shards are locked one after another, so the result is not an atomic
    /// snapshot under concurrent writes. Diagnostic use only.
    pub fn size(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    /// Returns true if no shard holds a key.
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Per-shard key counts, in shard order.
    pub fn shard_sizes(&self) -> Vec<usize> {
        self.shards.iter().map(|shard| shard.lock().len()).collect()
    }
}
