//! Fixed-width account identifier with a base58 human-readable form.
//!
//! Layout: 1 padding byte, 1 type byte, 20 payload bytes, 4 checksum bytes.
//! The checksum is the first four bytes of the Keccak-256 digest over the
//! leading 22 bytes, so a mistyped base58 string fails to parse instead of
//! resolving to a different account.

use crate::errors::TypeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// Total byte length of an address.
pub const ADDRESS_LEN: usize = 26;
/// Length of the account payload inside an address.
pub const ADDRESS_PAYLOAD_LEN: usize = 20;
/// Leading padding byte shared by every address.
pub const ADDRESS_PADDING: u8 = 0x19;
/// Type byte of an externally owned account.
pub const ACCOUNT_TYPE: u8 = 0x57;
/// Type byte of a contract account.
pub const CONTRACT_TYPE: u8 = 0x58;

const CHECKSUM_LEN: usize = 4;

/// An account identifier on the chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Build an account address from its 20-byte payload.
    pub fn from_account_payload(payload: [u8; ADDRESS_PAYLOAD_LEN]) -> Self {
        Self::assemble(ACCOUNT_TYPE, payload)
    }

    /// Build a contract address from its 20-byte payload.
    pub fn from_contract_payload(payload: [u8; ADDRESS_PAYLOAD_LEN]) -> Self {
        Self::assemble(CONTRACT_TYPE, payload)
    }

    fn assemble(kind: u8, payload: [u8; ADDRESS_PAYLOAD_LEN]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[0] = ADDRESS_PADDING;
        bytes[1] = kind;
        bytes[2..2 + ADDRESS_PAYLOAD_LEN].copy_from_slice(&payload);
        let checksum = Self::checksum(&bytes[..ADDRESS_LEN - CHECKSUM_LEN]);
        bytes[ADDRESS_LEN - CHECKSUM_LEN..].copy_from_slice(&checksum);
        Self(bytes)
    }

    /// Parse an address from its canonical byte form, validating prefix and
    /// checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != ADDRESS_LEN {
            return Err(TypeError::InvalidAddressLength {
                expected: ADDRESS_LEN,
                got: bytes.len(),
            });
        }
        if bytes[0] != ADDRESS_PADDING || (bytes[1] != ACCOUNT_TYPE && bytes[1] != CONTRACT_TYPE) {
            return Err(TypeError::InvalidAddressPrefix);
        }
        let checksum = Self::checksum(&bytes[..ADDRESS_LEN - CHECKSUM_LEN]);
        if checksum != bytes[ADDRESS_LEN - CHECKSUM_LEN..] {
            return Err(TypeError::InvalidAddressChecksum);
        }
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Parse an address from its base58 string form.
    pub fn from_base58(s: &str) -> Result<Self, TypeError> {
        let bytes = bs58::decode(s).into_vec()?;
        Self::from_bytes(&bytes)
    }

    /// Canonical byte form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base58 human-readable form.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    /// Whether this address identifies a contract account.
    pub fn is_contract(&self) -> bool {
        self.0[1] == CONTRACT_TYPE
    }

    fn checksum(head: &[u8]) -> [u8; CHECKSUM_LEN] {
        let digest = Keccak256::digest(head);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&digest[..CHECKSUM_LEN]);
        checksum
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_base58())
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_base58(&s).map_err(serde::de::Error::custom)
    }
}
