//! # Proof-of-Devotion Consensus Engine
//!
//! Decides when this node mints a block, which fork is canonical, when a
//! block becomes irreversible, and how double-mint offenses are detected and
//! reported on-chain.
//!
//! ## Architecture
//!
//! Hexagonal: the engine core in [`service::PodEngine`] drives pure logic
//! from [`domain`] through the [`ports`] traits; concrete collaborators live
//! behind [`adapters`].
//!
//! ```text
//! chain ──VerifyBlock / CheckDoubleMint / ForkChoice / UpdateLIB──▶ PodEngine
//!                                                                     │
//!                 1s tick: heartbeat ▸ mint ◀───────── control loop ──┘
//!                                      │
//!                  block pool ◀── seal/sign ──▶ keychain | remote signer
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | One block per slot key | `domain::slot_cache` |
//! | LIB never moves backward | `service` LIB walk + persisted pointer |
//! | New tail ≥ old tail under `(height, hash)` | `domain::fork_choice` |
//! | Resident dynasties never change | `domain::dynasty::DynastyRegistry` |
//! | At most one mint per slot while active | `domain::timing::check_deadline` |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pod_consensus::{PodConfig, PodEngine};
//!
//! let engine = Arc::new(PodEngine::new(chain, network, accounts, config)?);
//! engine.start().await;          // spawn the tick loop
//! engine.enable_mining("...").await?;
//! engine.resume_mining();
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod signer;
pub mod state;

pub use adapters::{FixedTimeSource, GrpcRemoteSigner, MemoryChain, MemoryKeychain, MemoryNetwork};
pub use config::PodConfig;
pub use error::{PodError, PodResult};
pub use events::{WitnessMessage, MESSAGE_TYPE_WITNESS};
pub use ports::{
    AccountManager, Chain, ConsensusEngine, MessageWeight, NetworkService, RemoteSigner,
    SystemTimeSource, TimeSource,
};
pub use service::PodEngine;
pub use signer::Signer;
pub use state::{MiningGate, MiningState};
