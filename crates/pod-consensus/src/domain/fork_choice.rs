//! Fork choice over detached chain tails.
//!
//! Canonical order is `(height, hash)` lexicographic: more work wins, and the
//! hash tie-break makes every node pick the same tail for equal heights.

use pod_types::Block;

/// Total order on blocks: `(height, hash)` lexicographic.
pub fn less(a: &Block, b: &Block) -> bool {
    if a.height != b.height {
        return a.height < b.height;
    }
    a.hash < b.hash
}

/// Pick the canonical tail among the current tail and the detached tails.
///
/// Returns the maximum under [`less`]; the current tail when no detached tail
/// beats it.
pub fn select_tail<'a>(tail: &'a Block, detached: &'a [Block]) -> &'a Block {
    let mut best = tail;
    for candidate in detached {
        if less(best, candidate) {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use pod_types::{Address, ConsensusRoot, Hash};

    fn block(height: u64, first_hash_byte: u8) -> Block {
        let mut hash: Hash = [0; 32];
        hash[0] = first_hash_byte;
        let addr = Address::from_account_payload([0; 20]);
        Block {
            chain_id: 1,
            height,
            timestamp: 0,
            hash,
            parent_hash: [0; 32],
            coinbase: addr,
            miner: addr,
            consensus_root: ConsensusRoot {
                proposer: addr,
                timestamp: 0,
            },
            random_seed: None,
            random_proof: None,
            signature: None,
            transactions: vec![],
        }
    }

    #[test]
    fn test_less_orders_by_height_then_hash() {
        assert!(less(&block(99, 0xFF), &block(100, 0x00)));
        assert!(less(&block(100, 0xAA), &block(100, 0xAB)));
        assert!(!less(&block(100, 0xAB), &block(100, 0xAA)));
        assert!(!less(&block(100, 0xAA), &block(100, 0xAA)));
    }

    #[test]
    fn test_higher_detached_tail_wins() {
        let tail = block(100, 0xAA);
        let detached = vec![block(100, 0xAB), block(101, 0x01), block(99, 0xFF)];
        let best = select_tail(&tail, &detached);
        assert_eq!(best.height, 101);
        assert_eq!(best.hash[0], 0x01);
    }

    #[test]
    fn test_current_tail_kept_when_best() {
        let tail = block(101, 0xFF);
        let detached = vec![block(100, 0xAB), block(101, 0x01)];
        assert_eq!(select_tail(&tail, &detached).hash, tail.hash);
    }

    #[test]
    fn test_selection_is_idempotent_and_monotone() {
        let tail = block(100, 0xAA);
        let detached = vec![block(100, 0xAB), block(101, 0x01)];
        let first = select_tail(&tail, &detached).clone();
        let second = select_tail(&first, &detached).clone();
        assert_eq!(first, second);
        assert!(!less(&first, &tail));
    }
}
