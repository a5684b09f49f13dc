//! # Bounded-capacity store
//!
//! Cache and RSN Table share one eviction discipline (Design Note, spec §9):
//! a bounded-capacity key-value container with LRU replacement. [`BoundedStore`]
//! is that container; [`Cache`] specializes it to `V = ()` (presence-only),
//! and [`crate::rsn::RsnTable`] specializes it to `V = RsnEntry`.

use crate::ids::ContentId;
use lru::LruCache;
use std::num::NonZeroUsize;

/// A bounded-capacity, LRU-ordered key-value store.
///
/// A configured capacity of `0` is silently raised to `1` with a logged
/// warning (spec §7, capacity coercion).
#[derive(Debug, Clone)]
pub struct BoundedStore<K: std::hash::Hash + Eq, V> {
    inner: LruCache<K, V>,
}

impl<K: std::hash::Hash + Eq, V> BoundedStore<K, V> {
    /// Create a new store with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let coerced = if capacity == 0 {
            log::warn!("bounded store configured with capacity 0, raising to 1");
            1
        } else {
            capacity
        };
        Self { inner: LruCache::new(NonZeroUsize::new(coerced).expect("coerced to >= 1")) }
    }

    /// Presence check. Does **not** update recency.
    pub fn has(&self, k: &K) -> bool {
        self.inner.contains(k)
    }

    /// Look up a value without affecting recency (used by read-only views).
    pub fn peek(&self, k: &K) -> Option<&V> {
        self.inner.peek(k)
    }

    /// Look up a value, refreshing recency on hit.
    pub fn get(&mut self, k: &K) -> Option<&V> {
        self.inner.get(k)
    }

    /// Look up a value mutably, refreshing recency on hit.
    pub fn get_mut(&mut self, k: &K) -> Option<&mut V> {
        self.inner.get_mut(k)
    }

    /// Insert `k -> v`. If `k` was already present, its value is replaced and
    /// recency is refreshed, with no eviction. Otherwise, if the store was at
    /// capacity, the least-recently-used entry is evicted and returned.
    pub fn put(&mut self, k: K, v: V) -> Option<(K, V)> {
        self.inner.push(k, v)
    }

    /// Remove an entry, returning its value if it was present.
    pub fn remove(&mut self, k: &K) -> Option<V> {
        self.inner.pop(k)
    }

    /// Snapshot of all keys currently stored, most-recently-used first.
    pub fn dump(&self) -> impl Iterator<Item = &K> {
        self.inner.iter().map(|(k, _)| k)
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Configured capacity (after coercion).
    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }
}

/// Per-node content cache: bounded presence set over [`ContentId`], LRU by
/// default (spec §4.1).
#[derive(Debug, Clone)]
pub struct Cache {
    store: BoundedStore<ContentId, ()>,
}

impl Cache {
    /// Create a cache with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self { store: BoundedStore::new(capacity) }
    }

    /// Presence check, no recency update, no telemetry (used by `has_content`
    /// warmup peeks and by the read-only `View`).
    pub fn has(&self, k: ContentId) -> bool {
        self.store.has(&k)
    }

    /// Presence check with recency update. Caller is responsible for emitting
    /// hit/miss telemetry.
    pub fn get(&mut self, k: ContentId) -> bool {
        self.store.get(&k).is_some()
    }

    /// Insert `k`; returns the evicted id, if any. Inserting an
    /// already-present item refreshes recency only.
    pub fn put(&mut self, k: ContentId) -> Option<ContentId> {
        self.store.put(k, ()).map(|(evicted, _)| evicted)
    }

    /// Remove `k`, returning whether it was present.
    pub fn remove(&mut self, k: ContentId) -> bool {
        self.store.remove(&k).is_some()
    }

    /// Snapshot of cached content ids, for diagnostics/tests.
    pub fn dump(&self) -> impl Iterator<Item = ContentId> + '_ {
        self.store.dump().copied()
    }

    /// Number of items currently cached.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Configured capacity (after zero-coercion).
    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_refreshes_recency_without_eviction() {
        let mut c = Cache::new(2);
        assert_eq!(c.put(ContentId(1)), None);
        assert_eq!(c.put(ContentId(2)), None);
        // touching 1 again should not evict anything, and moves 1 to MRU
        assert_eq!(c.put(ContentId(1)), None);
        // now inserting 3 should evict 2 (the LRU one)
        assert_eq!(c.put(ContentId(3)), Some(ContentId(2)));
        assert!(c.has(ContentId(1)));
        assert!(c.has(ContentId(3)));
        assert!(!c.has(ContentId(2)));
    }

    #[test]
    fn has_does_not_affect_eviction_order() {
        let mut c = Cache::new(2);
        c.put(ContentId(1));
        c.put(ContentId(2));
        // has() must not count as a use
        assert!(c.has(ContentId(1)));
        assert_eq!(c.put(ContentId(3)), Some(ContentId(1)));
    }

    #[test]
    fn get_refreshes_recency() {
        let mut c = Cache::new(2);
        c.put(ContentId(1));
        c.put(ContentId(2));
        assert!(c.get(ContentId(1)));
        assert_eq!(c.put(ContentId(3)), Some(ContentId(2)));
    }

    #[test]
    fn zero_capacity_is_coerced_to_one() {
        let mut c = Cache::new(0);
        assert_eq!(c.capacity(), 1);
        assert_eq!(c.put(ContentId(1)), None);
        assert_eq!(c.put(ContentId(2)), Some(ContentId(1)));
    }

    #[test]
    fn remove_and_dump() {
        let mut c = Cache::new(4);
        c.put(ContentId(1));
        c.put(ContentId(2));
        assert!(c.remove(ContentId(1)));
        assert!(!c.remove(ContentId(1)));
        let dumped: Vec<_> = c.dump().collect();
        assert_eq!(dumped, vec![ContentId(2)]);
    }
}
