//! Inbound witness collation.
//!
//! Peers broadcast the reversible blocks they observe; the pool counts
//! distinct peers per block hash so finality signals can be read off without
//! unbounded growth.

use lru::LruCache;
use parking_lot::Mutex;
use pod_types::Hash;
use std::collections::HashSet;
use std::num::NonZeroUsize;

/// Bound on the number of block hashes tracked.
pub const WITNESS_POOL_SIZE: usize = 128;

/// Bounded pool of witness claims: block hash to the set of peers that
/// reported it.
#[derive(Debug)]
pub struct WitnessPool {
    inner: Mutex<LruCache<Hash, HashSet<String>>>,
}

impl WitnessPool {
    pub fn new() -> Self {
        Self::with_capacity(WITNESS_POOL_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Record one peer's claims. Returns how many of them were new for that
    /// peer.
    pub fn record(&self, peer: &str, hashes: &[Hash]) -> usize {
        let mut cache = self.inner.lock();
        let mut fresh = 0;
        for hash in hashes {
            let peers = cache.get_or_insert_mut(*hash, HashSet::new);
            if peers.insert(peer.to_string()) {
                fresh += 1;
            }
        }
        fresh
    }

    /// Number of distinct peers that reported a hash.
    pub fn claims(&self, hash: &Hash) -> usize {
        self.inner.lock().get(hash).map_or(0, HashSet::len)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for WitnessPool {
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
    fn test_distinct_peers_counted_once() {
        let pool = WitnessPool::new();
        assert_eq!(pool.record("peer-a", &[hash(1), hash(2)]), 2);
        assert_eq!(pool.record("peer-a", &[hash(1)]), 0);
        assert_eq!(pool.record("peer-b", &[hash(1)]), 1);
        assert_eq!(pool.claims(&hash(1)), 2);
        assert_eq!(pool.claims(&hash(2)), 1);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = WitnessPool::with_capacity(2);
        pool.record("peer-a", &[hash(1), hash(2), hash(3)]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.claims(&hash(1)), 0);
    }
}
