//! In-memory collaborators.
//!
//! A chain store, keychain, network service and pinned clock that live
//! entirely in memory. They back the engine's test suites and double as a
//! reference for what the real adapters must provide.

use crate::domain::dynasty;
use crate::domain::timing;
use crate::error::{PodError, PodResult};
use crate::ports::outbound::{
    AccountManager, Chain, MessageWeight, NetworkService, TimeSource,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use pod_types::constants::{BLOCK_INTERVAL_MS, DYNASTY_INTERVAL_MS, SECOND_MS};
use pod_types::{
    Address, Block, ConsensusRoot, ConsensusState, Event, Hash, MinerStats, NetMessage,
    SignatureAlgorithm, Transaction,
};
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

fn keccak(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[derive(Debug, Default)]
struct ChainInner {
    blocks: HashMap<Hash, Block>,
    tail: Hash,
    lib: Hash,
    detached: Vec<Hash>,
    nonces: HashMap<Address, u64>,
    events: Vec<Event>,
    pushed_txs: Vec<Transaction>,
    returned_blocks: Vec<Hash>,
    last_collect_deadline: Option<i64>,
    fail_lib_store: bool,
}

/// In-memory chain store with block and transaction pools.
pub struct MemoryChain {
    chain_id: u32,
    inner: RwLock<ChainInner>,
    contract_rosters: RwLock<HashMap<i64, Vec<Address>>>,
    participants: RwLock<Vec<Address>>,
}

impl MemoryChain {
    /// Create a chain holding only its genesis block.
    pub fn new(chain_id: u32) -> Self {
        let zero = Address::from_account_payload([0; 20]);
        let hash = keccak(&[b"genesis", &chain_id.to_be_bytes()]);
        let genesis = Block {
            chain_id,
            height: 1,
            timestamp: 0,
            hash,
            parent_hash: hash,
            coinbase: zero,
            miner: zero,
            consensus_root: ConsensusRoot {
                proposer: zero,
                timestamp: 0,
            },
            random_seed: None,
            random_proof: None,
            signature: None,
            transactions: vec![],
        };
        let mut inner = ChainInner {
            tail: hash,
            lib: hash,
            ..ChainInner::default()
        };
        inner.blocks.insert(hash, genesis);
        Self {
            chain_id,
            inner: RwLock::new(inner),
            contract_rosters: RwLock::new(HashMap::new()),
            participants: RwLock::new(Vec::new()),
        }
    }

    pub fn genesis(&self) -> Block {
        let inner = self.inner.read();
        let mut block = None;
        for candidate in inner.blocks.values() {
            if candidate.is_genesis() {
                block = Some(candidate.clone());
                break;
            }
        }
        block.unwrap_or_else(|| panic!("memory chain lost its genesis"))
    }

    /// Materialize a dynasty roster in the governance contract state.
    pub fn set_dynasty(&self, serial: i64, members: Vec<Address>) {
        self.contract_rosters.write().insert(serial, members);
    }

    pub fn set_participants(&self, members: Vec<Address>) {
        *self.participants.write() = members;
    }

    /// Insert a block for parent lookups without touching the tail.
    pub fn insert_block(&self, block: Block) {
        self.inner.write().blocks.insert(block.hash, block);
    }

    /// Insert a block and make it the canonical tail.
    pub fn append_canonical(&self, block: Block) {
        let mut inner = self.inner.write();
        inner.tail = block.hash;
        inner.blocks.insert(block.hash, block);
    }

    /// Insert a block and register it as a detached tail.
    pub fn add_detached(&self, block: Block) {
        let mut inner = self.inner.write();
        inner.detached.push(block.hash);
        inner.blocks.insert(block.hash, block);
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.inner.write().nonces.insert(address, nonce);
    }

    /// Make the next `store_lib_hash` call fail.
    pub fn set_fail_lib_store(&self, fail: bool) {
        self.inner.write().fail_lib_store = fail;
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.read().events.clone()
    }

    pub fn pushed_transactions(&self) -> Vec<Transaction> {
        self.inner.read().pushed_txs.clone()
    }

    pub fn returned_blocks(&self) -> Vec<Hash> {
        self.inner.read().returned_blocks.clone()
    }

    pub fn last_collect_deadline(&self) -> Option<i64> {
        self.inner.read().last_collect_deadline
    }
}

#[async_trait]
impl Chain for MemoryChain {
    fn chain_id(&self) -> u32 {
        self.chain_id
    }

    async fn tail_block(&self) -> Block {
        let inner = self.inner.read();
        inner.blocks[&inner.tail].clone()
    }

    async fn lib(&self) -> Block {
        let inner = self.inner.read();
        inner.blocks[&inner.lib].clone()
    }

    async fn detached_tail_blocks(&self) -> Vec<Block> {
        let inner = self.inner.read();
        inner
            .detached
            .iter()
            .filter_map(|hash| inner.blocks.get(hash).cloned())
            .collect()
    }

    async fn set_tail_block(&self, block: &Block) -> PodResult<()> {
        let mut inner = self.inner.write();
        inner.blocks.insert(block.hash, block.clone());
        inner.tail = block.hash;
        Ok(())
    }

    async fn block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.inner.read().blocks.get(hash).cloned()
    }

    async fn store_lib_hash(&self, _block: &Block) -> PodResult<()> {
        if self.inner.read().fail_lib_store {
            return Err(PodError::Chain("lib storage unavailable".to_string()));
        }
        Ok(())
    }

    async fn set_lib(&self, block: &Block) {
        let mut inner = self.inner.write();
        inner.blocks.insert(block.hash, block.clone());
        inner.lib = block.hash;
    }

    async fn emit_event(&self, event: Event) {
        self.inner.write().events.push(event);
    }

    async fn account_nonce(&self, address: &Address) -> PodResult<u64> {
        Ok(self.inner.read().nonces.get(address).copied().unwrap_or(0))
    }

    async fn next_consensus_state(
        &self,
        tail: &Block,
        elapsed_secs: i64,
    ) -> PodResult<ConsensusState> {
        let timestamp = tail.timestamp + elapsed_secs;
        let serial = timing::serial(timestamp);
        let rosters = self.contract_rosters.read();
        let members = rosters
            .get(&serial)
            .ok_or(PodError::DynastyNotFound(serial))?;
        let proposer = dynasty::find_proposer(timestamp, members)?;
        Ok(ConsensusState {
            proposer,
            timestamp,
        })
    }

    async fn dynasty_from_contract(&self, serial: i64) -> PodResult<Option<Vec<Address>>> {
        Ok(self.contract_rosters.read().get(&serial).cloned())
    }

    async fn participants(&self) -> PodResult<Vec<Address>> {
        Ok(self.participants.read().clone())
    }

    async fn statistical_last_blocks(&self, serial: i64) -> PodResult<Vec<MinerStats>> {
        let rosters = self.contract_rosters.read();
        let Some(members) = rosters.get(&serial) else {
            return Ok(Vec::new());
        };
        let slots_per_dynasty = (DYNASTY_INTERVAL_MS / BLOCK_INTERVAL_MS) as u64;
        let expected = slots_per_dynasty / members.len().max(1) as u64;

        let inner = self.inner.read();
        let mut minted: HashMap<Address, u64> = HashMap::new();
        for block in inner.blocks.values() {
            if timing::serial(block.timestamp) == serial && !block.is_genesis() {
                *minted.entry(block.consensus_root.proposer).or_insert(0) += 1;
            }
        }
        Ok(members
            .iter()
            .map(|miner| MinerStats {
                miner: *miner,
                minted: minted.get(miner).copied().unwrap_or(0),
                expected,
            })
            .collect())
    }

    async fn get_vrf_input(
        &self,
        parent_hash: &Hash,
        _height: u64,
    ) -> PodResult<(Vec<u8>, Vec<u8>)> {
        let inner = self.inner.read();
        let parent = inner
            .blocks
            .get(parent_hash)
            .ok_or_else(|| PodError::Chain("parent block not found".to_string()))?;
        let parent_seed = parent
            .random_seed
            .clone()
            .unwrap_or_else(|| vec![0u8; 32]);
        Ok((parent.hash.to_vec(), parent_seed))
    }

    async fn new_block(&self, coinbase: &Address, tail: &Block) -> PodResult<Block> {
        Ok(Block {
            chain_id: self.chain_id,
            height: tail.height + 1,
            timestamp: 0,
            hash: [0; 32],
            parent_hash: tail.hash,
            coinbase: *coinbase,
            miner: *coinbase,
            consensus_root: ConsensusRoot {
                proposer: *coinbase,
                timestamp: 0,
            },
            random_seed: None,
            random_proof: None,
            signature: None,
            transactions: vec![],
        })
    }

    async fn collect_transactions(&self, _block: &mut Block, deadline_ms: i64) {
        self.inner.write().last_collect_deadline = Some(deadline_ms);
    }

    async fn seal_block(&self, block: &mut Block) -> PodResult<()> {
        block.hash = keccak(&[
            &block.height.to_be_bytes(),
            &block.parent_hash,
            &block.timestamp.to_be_bytes(),
            block.consensus_root.proposer.as_bytes(),
            block.random_seed.as_deref().unwrap_or(&[]),
        ]);
        Ok(())
    }

    async fn push_and_broadcast_block(&self, block: &Block) -> PodResult<()> {
        let mut inner = self.inner.write();
        inner.blocks.insert(block.hash, block.clone());
        if block.parent_hash == inner.tail {
            inner.tail = block.hash;
        }
        Ok(())
    }

    async fn push_and_broadcast_transaction(&self, tx: &Transaction) -> PodResult<()> {
        self.inner.write().pushed_txs.push(tx.clone());
        Ok(())
    }

    async fn return_transactions(&self, block: &Block) {
        self.inner.write().returned_blocks.push(block.hash);
    }
}

/// In-memory keychain with recoverable mock signatures.
///
/// A signature is the signer's address bytes followed by the Keccak-256 of
/// the signed hash, so `recover_signer` can both validate and invert it.
#[derive(Default)]
pub struct MemoryKeychain {
    unlocked: RwLock<HashSet<Address>>,
}

impl MemoryKeychain {
    pub fn new() -> Self {
        Self::default()
    }

    fn signature_for(address: &Address, hash: &Hash) -> Vec<u8> {
        let mut signature = address.as_bytes().to_vec();
        signature.extend_from_slice(&keccak(&[hash]));
        signature
    }

    fn require_unlocked(&self, address: &Address) -> PodResult<()> {
        if self.unlocked.read().contains(address) {
            Ok(())
        } else {
            Err(PodError::Account(format!("account {address} is locked")))
        }
    }
}

#[async_trait]
impl AccountManager for MemoryKeychain {
    async fn unlock(
        &self,
        address: &Address,
        _passphrase: &[u8],
        _ttl: Duration,
    ) -> PodResult<()> {
        self.unlocked.write().insert(*address);
        Ok(())
    }

    async fn lock(&self, address: &Address) -> PodResult<()> {
        if self.unlocked.write().remove(address) {
            Ok(())
        } else {
            Err(PodError::Account(format!(
                "account {address} is not unlocked"
            )))
        }
    }

    async fn sign_block(&self, address: &Address, block: &mut Block) -> PodResult<()> {
        self.require_unlocked(address)?;
        let signature = Self::signature_for(address, &block.hash);
        block.set_signature(SignatureAlgorithm::Secp256k1, signature);
        Ok(())
    }

    async fn sign_transaction(&self, address: &Address, tx: &mut Transaction) -> PodResult<()> {
        self.require_unlocked(address)?;
        let signature = Self::signature_for(address, &tx.hash);
        tx.set_signature(SignatureAlgorithm::Secp256k1, signature);
        Ok(())
    }

    async fn generate_random_seed(
        &self,
        address: &Address,
        ancestor_hash: &[u8],
        parent_seed: &[u8],
    ) -> PodResult<(Vec<u8>, Vec<u8>)> {
        let seed = keccak(&[address.as_bytes(), ancestor_hash, parent_seed]);
        let proof = keccak(&[&seed]);
        Ok((seed.to_vec(), proof.to_vec()))
    }

    fn recover_signer(
        &self,
        _alg: SignatureAlgorithm,
        hash: &Hash,
        signature: &[u8],
    ) -> PodResult<Address> {
        let address_len = pod_types::address::ADDRESS_LEN;
        if signature.len() != address_len + 32 {
            return Err(PodError::Account("malformed signature".to_string()));
        }
        if signature[address_len..] != keccak(&[hash]) {
            return Err(PodError::Account("signature does not match hash".to_string()));
        }
        Ok(Address::from_bytes(&signature[..address_len])?)
    }
}

/// In-memory network service recording broadcasts and routing subscriptions.
#[derive(Default)]
pub struct MemoryNetwork {
    subscribers: RwLock<HashMap<String, mpsc::Sender<NetMessage>>>,
    broadcasts: RwLock<Vec<(String, Vec<u8>)>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a message as if it arrived from a peer. Returns false when no
    /// subscriber is registered for its type.
    pub fn deliver(&self, message: NetMessage) -> bool {
        let subscribers = self.subscribers.read();
        match subscribers.get(&message.message_type) {
            Some(sender) => sender.try_send(message).is_ok(),
            None => false,
        }
    }

    pub fn broadcasts(&self) -> Vec<(String, Vec<u8>)> {
        self.broadcasts.read().clone()
    }

    pub fn has_subscriber(&self, message_type: &str) -> bool {
        self.subscribers.read().contains_key(message_type)
    }
}

#[async_trait]
impl NetworkService for MemoryNetwork {
    async fn register(
        &self,
        message_type: &str,
        _weight: MessageWeight,
        sender: mpsc::Sender<NetMessage>,
    ) {
        self.subscribers
            .write()
            .insert(message_type.to_string(), sender);
    }

    async fn deregister(&self, message_type: &str) {
        self.subscribers.write().remove(message_type);
    }

    async fn broadcast(&self, message_type: &str, data: Vec<u8>, _weight: MessageWeight) {
        self.broadcasts
            .write()
            .push((message_type.to_string(), data));
    }
}

/// Clock pinned to a settable instant.
pub struct FixedTimeSource {
    now_ms: AtomicI64,
}

impl FixedTimeSource {
    pub fn at_secs(secs: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(secs * SECOND_MS),
        }
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTimeSource {
    fn now_secs(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst) / SECOND_MS
    }

    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
