//! Insertion-ordered cache.
//!
//! Meant for callers that act on the cached value and just need memory to
//! stay bounded: reads don't reorder anything, and re-putting a key replaces
//! its value and counts as a fresh insertion.

use super::slab::SlabList;
use super::BoundedCache;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// A bounded cache evicting the oldest insertion first.
///
/// # Example
///
/// ```
/// use flashcache::bounded::{BoundedCache, FifoCache};
/// use std::num::NonZeroUsize;
///
/// let mut cache = FifoCache::new(NonZeroUsize::new(2).unwrap());
/// cache.put(1, "one");
/// cache.put(2, "two");
/// cache.get(&1); // no promotion
/// cache.put(3, "three");
///
/// assert_eq!(cache.get(&1), None);
/// assert_eq!(cache.get(&2), Some(&"two"));
/// ```
#[derive(Debug)]
pub struct FifoCache<K, V> {
    capacity: NonZeroUsize,
    index: HashMap<K, usize>,
    entries: SlabList<K, V>,
}

impl<K: Hash + Eq + Clone, V> FifoCache<K, V> {
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            index: HashMap::with_capacity(capacity.get()),
            entries: SlabList::with_capacity(capacity.get()),
        }
    }

    /// Looks up `key`. Same as [`get`](BoundedCache::get), without `&mut`.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| self.entries.value(idx))
    }
}

impl<K: Hash + Eq + Clone, V> BoundedCache<K, V> for FifoCache<K, V> {
    fn put(&mut self, key: K, value: V) -> bool {
        let is_new = match self.index.remove(&key) {
            Some(idx) => {
                self.entries.remove(idx);
                false
            }
            None => true,
        };

        let idx = self.entries.push_front(key.clone(), value);
        self.index.insert(key, idx);

        if self.entries.len() > self.capacity.get() {
            if let Some((evicted, _)) = self.entries.pop_back() {
                self.index.remove(&evicted);
            }
        }

        is_new
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        self.peek(key)
    }

    fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
