//! Least-frequently-used cache.
//!
//! Entries are ordered by `(use count, logical time of last use)`. The
//! logical clock ticks on every insert and every hit, so no two entries
//! share an ordering key and ties on count go to the older entry.

use super::BoundedCache;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::num::NonZeroUsize;

#[derive(Debug)]
struct LfuEntry<V> {
    value: V,
    count: u64,
    tick: u64,
}

/// A bounded cache evicting the least frequently used entry.
///
/// # Example
///
/// ```
/// use flashcache::bounded::{BoundedCache, LfuCache};
/// use std::num::NonZeroUsize;
///
/// let mut cache = LfuCache::new(NonZeroUsize::new(2).unwrap());
/// cache.put("rare", 1);
/// cache.put("popular", 2);
///
/// for _ in 0..10 {
///     cache.get(&"popular");
/// }
///
/// cache.put("new", 3); // "rare" evicted
/// assert!(cache.get(&"popular").is_some());
/// assert!(cache.get(&"rare").is_none());
/// ```
#[derive(Debug)]
pub struct LfuCache<K, V> {
    capacity: NonZeroUsize,
    entries: HashMap<K, LfuEntry<V>>,
    order: BTreeMap<(u64, u64), K>,
    time: u64,
}

impl<K: Hash + Eq + Clone, V> LfuCache<K, V> {
    /// Creates an empty cache holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity.get()),
            order: BTreeMap::new(),
            time: 0,
        }
    }

    /// How many times `key` has been hit since insertion.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.count)
    }

    fn next_tick(&mut self) -> u64 {
        self.time += 1;
        self.time
    }
}

impl<K: Hash + Eq + Clone, V> BoundedCache<K, V> for LfuCache<K, V> {
    fn put(&mut self, key: K, value: V) -> bool {
        // Replacing a value leaves its rank alone
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            return false;
        }

        if self.entries.len() >= self.capacity.get() {
            if let Some((_, evicted)) = self.order.pop_first() {
                self.entries.remove(&evicted);
            }
        }

        let tick = self.next_tick();
        self.order.insert((0, tick), key.clone());
        self.entries.insert(
            key,
            LfuEntry {
                value,
                count: 0,
                tick,
            },
        );
        true
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;

        if let Some(ordered_key) = self.order.remove(&(entry.count, entry.tick)) {
            entry.count += 1;
            entry.tick = tick;
            self.order.insert((entry.count, entry.tick), ordered_key);
        }

        Some(&entry.value)
    }

    fn capacity(&self) -> usize {
        self.capacity.get()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(capacity: usize) -> LfuCache<&'static str, u32> {
        LfuCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_evicts_least_frequent() {
        let mut lfu = cache(2);
        lfu.put("a", 1);
        lfu.put("b", 2);

        lfu.get(&"a");
        lfu.put("c", 3);

        assert_eq!(lfu.get(&"b"), None);
        assert_eq!(lfu.get(&"a"), Some(&1));
        assert_eq!(lfu.get(&"c"), Some(&3));
    }

    #[test]
    fn test_ties_evict_oldest() {
        let mut lfu = cache(2);
        lfu.put("a", 1);
        lfu.put("b", 2);
        lfu.put("c", 3);

        assert_eq!(lfu.len(), 2);
        assert!(lfu.get(&"a").is_none());
    }

    #[test]
    fn test_ties_on_count_use_last_access() {
        let mut lfu = cache(2);
        lfu.put("a", 1);
        lfu.put("b", 2);

        // Both hit once, "a" more recently
        lfu.get(&"b");
        lfu.get(&"a");
        lfu.put("c", 3);

        assert!(lfu.get(&"b").is_none());
        assert!(lfu.get(&"a").is_some());
    }

    #[test]
    fn test_put_existing_keeps_frequency() {
        let mut lfu = cache(2);
        lfu.put("a", 1);
        lfu.get(&"a");
        lfu.get(&"a");

        assert!(!lfu.put("a", 10));
        assert_eq!(lfu.frequency(&"a"), Some(2));
        assert_eq!(lfu.get(&"a"), Some(&10));
        assert_eq!(lfu.len(), 1);
    }

    #[test]
    fn test_frequency_tracking() {
        let mut lfu = cache(4);
        lfu.put("a", 1);
        assert_eq!(lfu.frequency(&"a"), Some(0));

        for _ in 0..3 {
            lfu.get(&"a");
        }
        assert_eq!(lfu.frequency(&"a"), Some(3));
        assert_eq!(lfu.frequency(&"missing"), None);
    }

    #[test]
    fn test_miss_does_not_insert() {
        let mut lfu = cache(2);
        assert_eq!(lfu.get(&"missing"), None);
        assert!(lfu.is_empty());
    }
}
