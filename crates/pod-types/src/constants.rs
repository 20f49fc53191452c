//! Protocol constants.

use crate::address::Address;
use sha3::{Digest, Keccak256};
use std::sync::OnceLock;
use std::time::Duration;

/// Milliseconds in one second.
pub const SECOND_MS: i64 = 1000;

/// Width of one mint slot in milliseconds.
pub const BLOCK_INTERVAL_MS: i64 = 15_000;

/// Width of one dynasty window in milliseconds.
pub const DYNASTY_INTERVAL_MS: i64 = 3_600_000;

/// Minimum slack left in the current slot for a mint attempt to start.
pub const MIN_MINT_DURATION_MS: i64 = 2_200;

/// Upper bound on the time spent packing one block.
pub const MAX_MINT_DURATION_MS: i64 = 5_200;

/// Number of distinct proposers within one dynasty required to make a block
/// irreversible.
pub const CONSENSUS_SIZE: usize = 85;

/// How long an unlocked miner key stays usable after `enable_mining`.
pub const DEFAULT_MAX_UNLOCK_DURATION: Duration = Duration::MAX;

/// Payload type tag of governance transactions.
pub const TX_PAYLOAD_POD_TYPE: &str = "pod";

/// Gas price attached to governance transactions.
pub const TRANSACTION_MAX_GAS_PRICE: u128 = 1_000_000_000_000;

/// Gas limit attached to governance transactions.
pub const TRANSACTION_MAX_GAS: u128 = 50_000_000_000;

/// Well-known address of the governance contract.
///
/// Derived from a fixed tag so every node agrees on it without configuration.
pub fn pod_contract() -> Address {
    static ADDR: OnceLock<Address> = OnceLock::new();
    *ADDR.get_or_init(|| {
        let digest = Keccak256::digest(b"pod.governance.v1");
        let mut payload = [0u8; 20];
        payload.copy_from_slice(&digest[..20]);
        Address::from_contract_payload(payload)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_divides_dynasty() {
        assert_eq!(DYNASTY_INTERVAL_MS % BLOCK_INTERVAL_MS, 0);
    }

    #[test]
    fn test_pod_contract_is_stable_contract_address() {
        let a = pod_contract();
        let b = pod_contract();
        assert_eq!(a, b);
        assert!(a.is_contract());
    }
}
