//! Governance transaction payloads.

use crate::errors::TypeError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Actions understood by the governance contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodAction {
    /// Report protocol-level misbehavior.
    Report,
    /// Periodic liveness signal from a registered miner.
    Heartbeat,
    /// Per-proposer statistics driving the next dynasty election.
    State,
}

/// Classification of a double-mint offense.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvilKind {
    /// The scheduled proposer minted two different blocks in one slot.
    DoubleSpend,
    /// A block in the slot was minted by someone other than the scheduled
    /// proposer.
    NotMiner,
}

/// Misbehavior evidence embedded in a `Report` governance transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Slot timestamp in seconds the offense happened at.
    pub timestamp: i64,
    /// Base58 form of the offending miner.
    pub miner: String,
    pub evil: EvilKind,
}

impl Report {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TypeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Envelope of every governance transaction payload.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodPayload {
    /// Dynasty serial the payload belongs to.
    pub serial: i64,
    pub action: PodAction,
    #[serde_as(as = "Bytes")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl PodPayload {
    pub fn new(serial: i64, action: PodAction, data: Vec<u8>) -> Self {
        Self { serial, action, data }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TypeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
