//! Driving port: the API the chain and the node shell invoke on the engine.

use crate::error::PodResult;
use crate::state::MiningState;
use async_trait::async_trait;
use pod_types::{Block, Hash};

/// Consensus operations invoked by the chain on block arrival and by node
/// administration commands.
#[async_trait]
pub trait ConsensusEngine: Send + Sync {
    /// Validate an incoming block: slot alignment, scheduled proposer,
    /// signature, VRF seed. On success the block occupies its slot.
    async fn verify_block(&self, block: &Block) -> PodResult<()>;

    /// Whether a different block already occupies this block's slot. A
    /// conflict is classified and reported on-chain when this node is the
    /// slot's proposer.
    async fn check_double_mint(&self, block: &Block) -> bool;

    /// Re-select the canonical tail among the detached tails.
    async fn fork_choice(&self) -> PodResult<()>;

    /// Advance the LIB pointer; `reversible_blocks` are the hashes between
    /// the current LIB and the tail.
    async fn update_lib(&self, reversible_blocks: Vec<Hash>);

    /// Unlock the miner key and leave the Disabled state.
    async fn enable_mining(&self, passphrase: &str) -> PodResult<()>;

    /// Lock the miner key and stop minting.
    async fn disable_mining(&self) -> PodResult<()>;

    fn suspend_mining(&self);

    fn resume_mining(&self);

    fn enabled(&self) -> bool;

    fn pending(&self) -> bool;

    fn mining_state(&self) -> MiningState;
}
