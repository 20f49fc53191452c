//! Driven ports: the external collaborators the engine depends on.
//!
//! The chain store, pools, account manager, network service and remote sign
//! service all live outside this crate; the engine only sees these traits.

use crate::error::PodResult;
use async_trait::async_trait;
use pod_types::{
    Address, Block, ConsensusState, Event, Hash, MinerStats, NetMessage, SignatureAlgorithm,
    Transaction,
};
use std::time::Duration;
use tokio::sync::mpsc;

/// Priority class of a network message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageWeight {
    /// Control-plane chatter, never prioritized.
    Zero,
    /// Freshly minted blocks.
    NewBlock,
}

/// The chain store with its block and transaction pools.
#[async_trait]
pub trait Chain: Send + Sync {
    fn chain_id(&self) -> u32;

    async fn tail_block(&self) -> Block;

    /// The last irreversible block.
    async fn lib(&self) -> Block;

    /// Tails of forks not on the canonical branch.
    async fn detached_tail_blocks(&self) -> Vec<Block>;

    async fn set_tail_block(&self, block: &Block) -> PodResult<()>;

    async fn block_by_hash(&self, hash: &Hash) -> Option<Block>;

    /// Persist the LIB pointer. Failure leaves the pointer unchanged.
    async fn store_lib_hash(&self, block: &Block) -> PodResult<()>;

    /// Move the in-memory LIB pointer after a successful persist.
    async fn set_lib(&self, block: &Block);

    async fn emit_event(&self, event: Event);

    /// Account nonce at the canonical tail.
    async fn account_nonce(&self, address: &Address) -> PodResult<u64>;

    /// Consensus state of the slot `elapsed_secs` after the tail.
    async fn next_consensus_state(
        &self,
        tail: &Block,
        elapsed_secs: i64,
    ) -> PodResult<ConsensusState>;

    /// Dynasty members for `serial` as materialized by the governance
    /// contract in the tail's world state, if the contract knows them.
    async fn dynasty_from_contract(&self, serial: i64) -> PodResult<Option<Vec<Address>>>;

    /// Miners registered with the governance contract.
    async fn participants(&self) -> PodResult<Vec<Address>>;

    /// Per-proposer mint statistics of one dynasty.
    async fn statistical_last_blocks(&self, serial: i64) -> PodResult<Vec<MinerStats>>;

    /// VRF signer input for a block at `height` on top of `parent_hash`:
    /// `(ancestor_hash, parent_seed)`.
    async fn get_vrf_input(&self, parent_hash: &Hash, height: u64) -> PodResult<(Vec<u8>, Vec<u8>)>;

    /// Create an unsealed block on top of `tail`.
    async fn new_block(&self, coinbase: &Address, tail: &Block) -> PodResult<Block>;

    /// Pack pool transactions into the block until `deadline_ms`.
    async fn collect_transactions(&self, block: &mut Block, deadline_ms: i64);

    /// Compute the state root and block hash.
    async fn seal_block(&self, block: &mut Block) -> PodResult<()>;

    /// Hand the minted block to the block pool, which appends and publishes.
    async fn push_and_broadcast_block(&self, block: &Block) -> PodResult<()>;

    /// Hand a governance transaction to the transaction pool.
    async fn push_and_broadcast_transaction(&self, tx: &Transaction) -> PodResult<()>;

    /// Return a failed block's transactions to the pool.
    async fn return_transactions(&self, block: &Block);
}

/// Key storage and local signing.
#[async_trait]
pub trait AccountManager: Send + Sync {
    async fn unlock(&self, address: &Address, passphrase: &[u8], ttl: Duration) -> PodResult<()>;

    async fn lock(&self, address: &Address) -> PodResult<()>;

    async fn sign_block(&self, address: &Address, block: &mut Block) -> PodResult<()>;

    async fn sign_transaction(&self, address: &Address, tx: &mut Transaction) -> PodResult<()>;

    /// Produce `(vrf_seed, vrf_proof)` for a new block.
    async fn generate_random_seed(
        &self,
        address: &Address,
        ancestor_hash: &[u8],
        parent_seed: &[u8],
    ) -> PodResult<(Vec<u8>, Vec<u8>)>;

    /// Recover the signer address of a sealed hash.
    fn recover_signer(
        &self,
        alg: SignatureAlgorithm,
        hash: &Hash,
        signature: &[u8],
    ) -> PodResult<Address>;
}

/// Peer-to-peer message plumbing.
#[async_trait]
pub trait NetworkService: Send + Sync {
    /// Subscribe to a message type; matching messages arrive on `sender`.
    async fn register(
        &self,
        message_type: &str,
        weight: MessageWeight,
        sender: mpsc::Sender<NetMessage>,
    );

    async fn deregister(&self, message_type: &str);

    async fn broadcast(&self, message_type: &str, data: Vec<u8>, weight: MessageWeight);
}

/// The remote sign service, when signing is not done by the local keychain.
#[async_trait]
pub trait RemoteSigner: Send + Sync {
    async fn sign_hash(
        &self,
        address: &Address,
        hash: &Hash,
        alg: SignatureAlgorithm,
    ) -> PodResult<Vec<u8>>;

    async fn generate_random_seed(
        &self,
        address: &Address,
        parent_seed: &[u8],
        ancestor_hash: &[u8],
    ) -> PodResult<(Vec<u8>, Vec<u8>)>;
}

/// Wall clock abstraction so tests can pin time.
pub trait TimeSource: Send + Sync {
    /// Current unix time in seconds.
    fn now_secs(&self) -> i64;

    /// Current unix time in milliseconds.
    fn now_ms(&self) -> i64;
}

/// Default time source backed by the system clock.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn now_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64
    }
}
