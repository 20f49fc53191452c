//! Core chain entities.

use crate::address::Address;
use crate::constants::SECOND_MS;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha3::{Digest, Keccak256};
use std::fmt;

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// Event topic published when the last irreversible block advances.
pub const TOPIC_LIB_BLOCK: &str = "chain.latestIrreversibleBlock";

/// Signature scheme tags carried next to signatures on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    #[serde(rename = "secp256k1")]
    Secp256k1,
}

impl SignatureAlgorithm {
    /// Numeric tag used by the remote sign RPC.
    pub fn as_u32(self) -> u32 {
        match self {
            SignatureAlgorithm::Secp256k1 => 1,
        }
    }
}

/// A signature plus the algorithm it was produced with.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureData {
    pub alg: SignatureAlgorithm,
    #[serde_as(as = "Bytes")]
    pub data: Vec<u8>,
}

/// Consensus commitment sealed into a block: who minted it and for which slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusRoot {
    pub proposer: Address,
    /// Slot timestamp in seconds; always equals the block timestamp.
    pub timestamp: i64,
}

/// The consensus state derived from a tail's world state for an upcoming slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsensusState {
    pub proposer: Address,
    /// Timestamp in seconds of the slot this state is valid for.
    pub timestamp: i64,
}

/// A block as the consensus engine sees it.
///
/// Blocks are immutable once sealed; `(height, hash)` gives the total order
/// used by fork choice.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub chain_id: u32,
    pub height: u64,
    /// Unix timestamp in seconds, aligned to a slot boundary.
    pub timestamp: i64,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub hash: Hash,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub parent_hash: Hash,
    pub coinbase: Address,
    pub miner: Address,
    pub consensus_root: ConsensusRoot,
    #[serde_as(as = "Option<Bytes>")]
    pub random_seed: Option<Vec<u8>>,
    #[serde_as(as = "Option<Bytes>")]
    pub random_proof: Option<Vec<u8>>,
    pub signature: Option<SignatureData>,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Block timestamp in milliseconds.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp * SECOND_MS
    }

    /// Whether a VRF seed and proof are attached.
    pub fn has_random_seed(&self) -> bool {
        matches!(&self.random_seed, Some(seed) if !seed.is_empty())
            && matches!(&self.random_proof, Some(proof) if !proof.is_empty())
    }

    /// Attach the VRF seed and proof.
    pub fn set_random_seed(&mut self, seed: Vec<u8>, proof: Vec<u8>) {
        self.random_seed = Some(seed);
        self.random_proof = Some(proof);
    }

    /// Attach the miner signature.
    pub fn set_signature(&mut self, alg: SignatureAlgorithm, data: Vec<u8>) {
        self.signature = Some(SignatureData { alg, data });
    }

    /// Whether this block is the chain genesis.
    pub fn is_genesis(&self) -> bool {
        self.height <= 1 || self.parent_hash == self.hash
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{height: {}, hash: {}, parent: {}, ts: {}, miner: {}}}",
            self.height,
            hex::encode(&self.hash[..8]),
            hex::encode(&self.parent_hash[..8]),
            self.timestamp,
            self.miner,
        )
    }
}

/// A transaction as built and signed by the consensus engine.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub chain_id: u32,
    pub from: Address,
    pub to: Address,
    pub value: u128,
    pub nonce: u64,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub payload_type: String,
    #[serde_as(as = "Bytes")]
    pub payload: Vec<u8>,
    pub gas_price: u128,
    pub gas_limit: u128,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub hash: Hash,
    pub signature: Option<SignatureData>,
}

impl Transaction {
    /// Build an unhashed, unsigned transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain_id: u32,
        from: Address,
        to: Address,
        value: u128,
        nonce: u64,
        payload_type: impl Into<String>,
        payload: Vec<u8>,
        gas_price: u128,
        gas_limit: u128,
    ) -> Self {
        Self {
            chain_id,
            from,
            to,
            value,
            nonce,
            timestamp: 0,
            payload_type: payload_type.into(),
            payload,
            gas_price,
            gas_limit,
            hash: [0u8; 32],
            signature: None,
        }
    }

    /// Keccak-256 over the canonical field encoding. Every field that takes
    /// part in consensus is length-prefixed so no two field layouts collide.
    pub fn compute_hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(self.chain_id.to_be_bytes());
        hasher.update(self.from.as_bytes());
        hasher.update(self.to.as_bytes());
        hasher.update(self.value.to_be_bytes());
        hasher.update(self.nonce.to_be_bytes());
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update((self.payload_type.len() as u64).to_be_bytes());
        hasher.update(self.payload_type.as_bytes());
        hasher.update((self.payload.len() as u64).to_be_bytes());
        hasher.update(&self.payload);
        hasher.update(self.gas_price.to_be_bytes());
        hasher.update(self.gas_limit.to_be_bytes());
        hasher.finalize().into()
    }

    /// Attach a signature.
    pub fn set_signature(&mut self, alg: SignatureAlgorithm, data: Vec<u8>) {
        self.signature = Some(SignatureData { alg, data });
    }
}

/// An event published through the chain's event emitter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub data: String,
}

/// A message received from or sent to the peer-to-peer network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetMessage {
    pub message_type: String,
    /// Identifier of the peer the message came from.
    pub from: String,
    pub data: Vec<u8>,
}

/// Per-proposer mint statistics for one dynasty, reported on-chain when the
/// next dynasty cannot be derived from the governance contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinerStats {
    pub miner: Address,
    /// Blocks actually minted in the dynasty.
    pub minted: u64,
    /// Slots the miner was scheduled for.
    pub expected: u64,
}
