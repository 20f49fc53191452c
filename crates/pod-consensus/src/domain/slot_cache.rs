//! Slot occupancy cache for double-mint detection.
//!
//! Maps a slot timestamp to the first block verified at that slot. A second,
//! different block arriving for an occupied slot is double-mint evidence.

use lru::LruCache;
use parking_lot::Mutex;
use pod_types::{Block, EvilKind};
use std::num::NonZeroUsize;

/// Bound on the number of slots kept.
pub const SLOT_CACHE_SIZE: usize = 128;

/// Bounded slot timestamp to block mapping with LRU eviction.
///
/// Safe to share between the engine loop and the chain's verification
/// threads.
#[derive(Debug)]
pub struct SlotCache {
    inner: Mutex<LruCache<i64, Block>>,
}

impl SlotCache {
    pub fn new() -> Self {
        Self::with_capacity(SLOT_CACHE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    /// The conflicting block already resident for this block's slot, if any.
    ///
    /// Returns `None` both for an empty slot and for the same block seen
    /// again.
    pub fn conflict_for(&self, block: &Block) -> Option<Block> {
        let mut cache = self.inner.lock();
        match cache.get(&block.timestamp) {
            Some(resident) if resident.hash != block.hash => Some(resident.clone()),
            _ => None,
        }
    }

    /// Record a verified block as the occupant of its slot.
    pub fn record(&self, block: &Block) {
        self.inner.lock().put(block.timestamp, block.clone());
    }

    /// The block resident at a slot timestamp.
    pub fn get(&self, timestamp: i64) -> Option<Block> {
        self.inner.lock().get(&timestamp).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for SlotCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify a double-mint offense from the two conflicting blocks.
///
/// The same miner signing two blocks for one slot is a double spend attempt;
/// different miners mean someone minted outside their schedule.
pub fn classify_conflict(resident: &Block, incoming: &Block) -> EvilKind {
    if resident.miner == incoming.miner {
        EvilKind::DoubleSpend
    } else {
        EvilKind::NotMiner
    }
}
