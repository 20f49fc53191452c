//! Irreversibility scan.
//!
//! A block becomes irreversible once `CONSENSUS_SIZE` distinct proposers of a
//! single dynasty have built on top of it. The scan walks parents from the
//! tail toward the current LIB, resetting the proposer set at every dynasty
//! boundary; the caller drives the (chain-backed) parent iteration and feeds
//! each block into [`ProposerTally::observe`].

use crate::domain::timing;
use pod_types::{Address, Block};
use std::collections::HashSet;

/// Outcome of observing one block during the backward scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LibVerdict {
    /// The block just observed is irreversible, supported by `confirmed`
    /// distinct proposers of its dynasty.
    Finalized { confirmed: usize },
    /// Too few blocks remain above the LIB for the proposer set to reach the
    /// consensus size; the scan is pointless from here on.
    Pruned,
    /// Keep walking.
    Continue,
}

/// Distinct-proposer accumulator for the backward scan.
#[derive(Debug)]
pub struct ProposerTally {
    miners: HashSet<Address>,
    dynasty: i64,
    consensus_size: usize,
}

impl ProposerTally {
    pub fn new(consensus_size: usize) -> Self {
        Self {
            miners: HashSet::new(),
            dynasty: -1,
            consensus_size,
        }
    }

    /// Observe the next block on the walk from tail to LIB.
    ///
    /// `lib_height` is the height of the current LIB, used for the fast
    /// prune: when fewer blocks remain above the LIB than proposers are still
    /// missing, the scan cannot succeed.
    pub fn observe(&mut self, block: &Block, lib_height: u64) -> LibVerdict {
        let block_dynasty = timing::serial(block.timestamp);
        if block_dynasty != self.dynasty {
            self.miners.clear();
            self.dynasty = block_dynasty;
        }

        let above_lib = block.height.saturating_sub(lib_height) as usize;
        if above_lib < self.consensus_size - self.miners.len() {
            return LibVerdict::Pruned;
        }

        self.miners.insert(block.consensus_root.proposer);
        if self.miners.len() >= self.consensus_size {
            return LibVerdict::Finalized {
                confirmed: self.miners.len(),
            };
        }
        LibVerdict::Continue
    }

    /// Distinct proposers seen in the current dynasty so far.
    pub fn supported(&self) -> usize {
        self.miners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_types::{ConsensusRoot, Hash};

    fn proposer(i: usize) -> Address {
        let mut payload = [0u8; 20];
        payload[0] = (i % 256) as u8;
        payload[1] = (i / 256) as u8;
        Address::from_account_payload(payload)
    }

    fn block(height: u64, timestamp: i64, p: Address) -> Block {
        let mut hash: Hash = [0; 32];
        hash[..8].copy_from_slice(&height.to_be_bytes());
        Block {
            chain_id: 1,
            height,
            timestamp,
            hash,
            parent_hash: [0; 32],
            coinbase: p,
            miner: p,
            consensus_root: ConsensusRoot {
                proposer: p,
                timestamp,
            },
            random_seed: None,
            random_proof: None,
            signature: None,
            transactions: vec![],
        }
    }

    #[test]
    fn test_finalizes_at_consensus_size_distinct_proposers() {
        let mut tally = ProposerTally::new(3);
        // Tail at height 10 walking down; three distinct proposers in one
        // dynasty.
        assert_eq!(tally.observe(&block(10, 45, proposer(0)), 0), LibVerdict::Continue);
        assert_eq!(tally.observe(&block(9, 30, proposer(1)), 0), LibVerdict::Continue);
        assert_eq!(
            tally.observe(&block(8, 15, proposer(2)), 0),
            LibVerdict::Finalized { confirmed: 3 }
        );
    }

    #[test]
    fn test_repeated_proposer_does_not_advance() {
        let mut tally = ProposerTally::new(3);
        tally.observe(&block(10, 45, proposer(0)), 0);
        assert_eq!(tally.observe(&block(9, 30, proposer(0)), 0), LibVerdict::Continue);
        assert_eq!(tally.supported(), 1);
    }

    #[test]
    fn test_dynasty_boundary_resets_the_set() {
        let mut tally = ProposerTally::new(3);
        let dynasty_secs = pod_types::constants::DYNASTY_INTERVAL_MS / 1000;
        // Two proposers in dynasty 1.
        tally.observe(&block(10, dynasty_secs + 30, proposer(0)), 0);
        tally.observe(&block(9, dynasty_secs + 15, proposer(1)), 0);
        assert_eq!(tally.supported(), 2);
        // Crossing into dynasty 0 starts over.
        tally.observe(&block(8, 45, proposer(2)), 0);
        assert_eq!(tally.supported(), 1);
    }

    #[test]
    fn test_prunes_when_not_enough_blocks_remain() {
        let mut tally = ProposerTally::new(85);
        // Only 10 blocks above the LIB: 85 distinct proposers can never fit.
        assert_eq!(tally.observe(&block(10, 150, proposer(0)), 0), LibVerdict::Pruned);
    }

    #[test]
    fn test_full_scan_with_85_proposers() {
        let mut tally = ProposerTally::new(85);
        let mut verdict = LibVerdict::Continue;
        // Heights 100 down to 16, distinct proposer each, same dynasty.
        for i in 0..85u64 {
            let height = 100 - i;
            verdict = tally.observe(&block(height, 15 * (height as i64), proposer(i as usize)), 0);
        }
        assert_eq!(verdict, LibVerdict::Finalized { confirmed: 85 });
    }

    #[test]
    fn test_84_distinct_proposers_do_not_finalize() {
        let mut tally = ProposerTally::new(85);
        for i in 0..84u64 {
            let height = 100 - i;
            let verdict =
                tally.observe(&block(height, 15 * (height as i64), proposer(i as usize)), 0);
            assert_eq!(verdict, LibVerdict::Continue);
        }
        // The 85th block repeats a proposer, then the walk keeps going.
        let verdict = tally.observe(&block(16, 15 * 16, proposer(0)), 0);
        assert_eq!(verdict, LibVerdict::Continue);
        assert_eq!(tally.supported(), 84);
    }
}
