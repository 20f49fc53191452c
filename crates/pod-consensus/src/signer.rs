//! Signing capability.
//!
//! Block and transaction signing plus VRF seeding are either served by the
//! local keychain or by a remote sign service; the producer and the
//! governance driver only see this capability.

use crate::error::PodResult;
use crate::ports::outbound::{AccountManager, RemoteSigner};
use pod_types::{Address, Block, SignatureAlgorithm, Transaction};
use std::sync::Arc;

/// Where signatures come from.
#[derive(Clone)]
pub enum Signer {
    /// The node's own keychain.
    Local(Arc<dyn AccountManager>),
    /// A remote sign service, dialed per call.
    Remote(Arc<dyn RemoteSigner>),
}

impl Signer {
    /// Sign a sealed block for `miner`.
    pub async fn sign_block(&self, miner: &Address, block: &mut Block) -> PodResult<()> {
        match self {
            Signer::Local(accounts) => accounts.sign_block(miner, block).await,
            Signer::Remote(remote) => {
                let alg = SignatureAlgorithm::Secp256k1;
                let signature = remote.sign_hash(miner, &block.hash, alg).await?;
                block.set_signature(alg, signature);
                Ok(())
            }
        }
    }

    /// Sign a hashed transaction for `miner`.
    pub async fn sign_transaction(&self, miner: &Address, tx: &mut Transaction) -> PodResult<()> {
        match self {
            Signer::Local(accounts) => accounts.sign_transaction(miner, tx).await,
            Signer::Remote(remote) => {
                let alg = SignatureAlgorithm::Secp256k1;
                let signature = remote.sign_hash(miner, &tx.hash, alg).await?;
                tx.set_signature(alg, signature);
                Ok(())
            }
        }
    }

    /// Produce `(vrf_seed, vrf_proof)` for a new block.
    pub async fn generate_random_seed(
        &self,
        miner: &Address,
        ancestor_hash: &[u8],
        parent_seed: &[u8],
    ) -> PodResult<(Vec<u8>, Vec<u8>)> {
        match self {
            Signer::Local(accounts) => {
                accounts
                    .generate_random_seed(miner, ancestor_hash, parent_seed)
                    .await
            }
            Signer::Remote(remote) => {
                remote
                    .generate_random_seed(miner, parent_seed, ancestor_hash)
                    .await
            }
        }
    }

    /// Whether signatures come from the remote service.
    pub fn is_remote(&self) -> bool {
        matches!(self, Signer::Remote(_))
    }
}
