//! Network messages produced and consumed by the engine.

use crate::error::PodResult;
use pod_types::Hash;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Message type of witness broadcasts.
pub const MESSAGE_TYPE_WITNESS: &str = "witness";

/// Witness payload: the reversible block hashes a proposer has accumulated,
/// in accumulation order.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessMessage {
    #[serde_as(as = "Vec<serde_with::hex::Hex>")]
    pub hashes: Vec<Hash>,
}

impl WitnessMessage {
    pub fn new(hashes: Vec<Hash>) -> Self {
        Self { hashes }
    }

    pub fn to_bytes(&self) -> PodResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> PodResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
