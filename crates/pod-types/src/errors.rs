//! Error types for entity parsing and encoding.

/// Errors raised while parsing or encoding shared entities.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidAddressLength { expected: usize, got: usize },

    #[error("invalid address prefix")]
    InvalidAddressPrefix,

    #[error("invalid address checksum")]
    InvalidAddressChecksum,

    #[error("invalid base58 encoding: {0}")]
    InvalidBase58(#[from] bs58::decode::Error),

    #[error("invalid hash length: expected 32 bytes, got {0}")]
    InvalidHashLength(usize),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
