//! Error types for the consensus engine.

/// Errors surfaced by the consensus engine.
///
/// Verification errors propagate to the chain, which rejects the block. Mint
/// errors end the current tick; the next tick retries.
#[derive(Debug, thiserror::Error)]
pub enum PodError {
    #[error("invalid block timestamp")]
    InvalidBlockTimestamp,

    #[error("invalid block interval")]
    InvalidBlockInterval,

    #[error("invalid block proposer")]
    InvalidBlockProposer,

    #[error("invalid block random")]
    InvalidBlockRandom,

    #[error("local clock is behind, found a block minted in the next slot")]
    BlockMintedInNextSlot,

    #[error("waiting for the block minted in the last slot")]
    WaitingBlockInLastSlot,

    #[error("failed to generate the next consensus state")]
    GenerateNextConsensusState,

    #[error("failed to append the new block to the chain")]
    AppendNewBlockFailed,

    #[error("cannot mint block, mining is disabled")]
    CannotMintWhenDisable,

    #[error("cannot mint block, mining is pending")]
    CannotMintWhenPending,

    #[error("cannot send heartbeat, mining is disabled")]
    NoHeartbeatWhenDisable,

    #[error("the miner has not signed up with the governance contract")]
    MinerNotSignUp,

    #[error("miner address is not configured")]
    MinerNotConfigured,

    #[error("coinbase address is not configured")]
    CoinbaseNotConfigured,

    #[error("no dynasty found for serial {0}")]
    DynastyNotFound(i64),

    #[error("chain error: {0}")]
    Chain(String),

    #[error("account error: {0}")]
    Account(String),

    #[error("remote sign error: {0}")]
    RemoteSign(String),

    #[error(transparent)]
    Type(#[from] pod_types::TypeError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used across the engine.
pub type PodResult<T> = Result<T, PodError>;
