//! Least-recently-used cache.

use super::slab::SlabList;
use super::BoundedCache;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// A bounded cache evicting the least recently used entry.
///
/// Both `get` and `put` of an existing key mark it most recently used.
///
/// # Example
///
/// ```
/// use flashcache::bounded::{BoundedCache, LruCache};
/// use std::num::NonZeroUsize;
///
/// let mut cache = LruCache::new(NonZeroUsize::new(2).unwrap());
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.get(&"a"); // "a" becomes most recently used
/// cache.put("c", 3); // "b" evicted
///
/// assert!(cache.get(&"b").is_none());
/// assert_eq!(cache.most_recent(), Some(&"c"));
/// ```
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: NonZeroUsize,
    index: HashMap<K, usize>,
    entries: SlabList<K, V>,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            index: HashMap::with_capacity(capacity.get()),
            entries: SlabList::with_capacity(capacity.get()),
        }
    }

    /// The most recently used key.
    pub fn most_recent(&self) -> Option<&K> {
        self.entries.front().map(|idx| self.entries.key(idx))
    }

    /// Looks up `key` without promoting it.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| self.entries.value(idx))
    }
}

impl<K: Hash + Eq + Clone, V> BoundedCache<K, V> for LruCache<K, V> {
    fn put(&mut self, key: K, value: V) -> bool {
        if let Some(&idx) = self.index.get(&key) {
            *self.entries.value_mut(idx) = value;
            self.entries.move_to_front(idx);
            return false;
        }

        if self.entries.len() >= self.capacity.get() {
            if let Some((evicted, _)) = self.entries.pop_back() {
                self.index.remove(&evicted);
            }
        }

        let idx = self.entries.push_front(key.clone(), value);
        self.index.insert(key, idx);
        true
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.entries.move_to_front(idx);
        Some(self.entries.value(idx))
    }

    fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
