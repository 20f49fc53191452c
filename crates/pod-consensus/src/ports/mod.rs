//! Ports of the engine: driving API and driven collaborators.

pub mod inbound;
pub mod outbound;

pub use inbound::ConsensusEngine;
pub use outbound::{
    AccountManager, Chain, MessageWeight, NetworkService, RemoteSigner, SystemTimeSource,
    TimeSource,
};
