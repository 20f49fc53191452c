//! Reversible block tracking for witness dissemination.
//!
//! Holds the hashes of blocks between the LIB and the tail. Hashes leave the
//! cache when their block becomes irreversible; the remaining set is what a
//! proposer broadcasts as a witness message.

use lru::LruCache;
use parking_lot::Mutex;
use pod_types::Hash;
use std::num::NonZeroUsize;

/// Bound on the number of reversible hashes kept.
pub const REVERSIBLE_CACHE_SIZE: usize = 128;

/// Bounded LRU of reversible block hashes.
#[derive(Debug)]
pub struct ReversibleCache {
    inner: Mutex<LruCache<Hash, ()>>,
}

impl ReversibleCache {
    pub fn new() -> Self {
        Self::with_capacity(REVERSIBLE_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Track a batch of reversible hashes.
    pub fn extend(&self, hashes: &[Hash]) {
        let mut cache = self.inner.lock();
        for hash in hashes {
            cache.put(*hash, ());
        }
    }

    /// Drop a hash once its block is irreversible.
    pub fn remove(&self, hash: &Hash) {
        self.inner.lock().pop(hash);
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.inner.lock().contains(hash)
    }

    /// Current hashes in accumulation order (oldest first).
    pub fn snapshot(&self) -> Vec<Hash> {
        let cache = self.inner.lock();
        let mut hashes: Vec<Hash> = cache.iter().map(|(hash, _)| *hash).collect();
        hashes.reverse();
        hashes
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for ReversibleCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(i: u8) -> Hash {
        let mut h = [0u8; 32];
        h[0] = i;
        h
    }

    #[test]
    fn test_extend_and_remove() {
        let cache = ReversibleCache::new();
        cache.extend(&[hash(1), hash(2)]);
        assert!(cache.contains(&hash(1)));
        cache.remove(&hash(1));
        assert!(!cache.contains(&hash(1)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_snapshot_keeps_accumulation_order() {
        let cache = ReversibleCache::new();
        cache.extend(&[hash(1), hash(2), hash(3)]);
        assert_eq!(cache.snapshot(), vec![hash(1), hash(2), hash(3)]);
    }

    #[test]
    fn test_bounded_eviction() {
        let cache = ReversibleCache::with_capacity(2);
        cache.extend(&[hash(1), hash(2), hash(3)]);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&hash(1)));
    }
}
