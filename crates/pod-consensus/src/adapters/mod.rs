//! Adapters implementing the outbound ports.

pub mod grpc_signer;
pub mod memory;

pub use grpc_signer::GrpcRemoteSigner;
pub use memory::{FixedTimeSource, MemoryChain, MemoryKeychain, MemoryNetwork};
