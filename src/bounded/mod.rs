//! Size-Bounded Caches
//!
//! Single-threaded caches that hold at most `capacity` entries and evict
//! one entry per overflowing insert. They share the [`BoundedCache`]
//! contract and differ only in which entry goes first:
//!
//! | Cache         | Evicts                                   | `get` promotes |
//! |---------------|------------------------------------------|----------------|
//! | [`FifoCache`] | oldest insertion                         | no             |
//! | [`LruCache`]  | least recently used                      | yes            |
//! | [`LfuCache`]  | least frequently used, oldest on ties    | yes (count)    |
//!
//! None of them lock. Wrap one in a `Mutex` to share it between threads.

pub mod fifo;
pub mod lfu;
pub mod lru;
mod slab;

pub use fifo::FifoCache;
pub use lfu::LfuCache;
pub use lru::LruCache;

/// The put/get/capacity contract shared by the bounded caches.
pub trait BoundedCache<K, V> {
    /// Inserts or updates `key`.
    ///
    /// Returns `true` if the key was new, `false` if an existing entry was
    /// updated. Inserting a new key into a full cache evicts one entry.
    fn put(&mut self, key: K, value: V) -> bool;

    /// Looks up `key`, applying the cache's promotion policy.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Maximum number of entries.
    fn capacity(&self) -> usize;

    /// Current number of entries.
    fn len(&self) -> usize;

    /// Returns true if the cache holds nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
