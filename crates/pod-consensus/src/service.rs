//! The Proof-of-Devotion engine.
//!
//! One long-lived loop drives the node: every second it runs a heartbeat step
//! and a mint step against the chain tail. The chain invokes the engine back
//! synchronously for block verification, double-mint detection, fork choice
//! and LIB advancement, so the caches it touches are shared-state safe.
//!
//! ## Mint pipeline
//!
//! deadline check → proposer check → state trigger → block assembly →
//! VRF seed → seal → sign → slot-boundary wait → push-and-broadcast.
//!
//! Mint failures end the tick; the next tick retries. A failed push hands the
//! packed transactions back to the pool off the hot path.

use crate::adapters::GrpcRemoteSigner;
use crate::config::PodConfig;
use crate::domain::{
    classify_conflict, finality::LibVerdict, fork_choice, timing, DynastyRegistry, DynastyRoster,
    ProposerTally, ReversibleCache, SlotCache, WitnessPool,
};
use crate::error::{PodError, PodResult};
use crate::events::{WitnessMessage, MESSAGE_TYPE_WITNESS};
use crate::metrics;
use crate::ports::inbound::ConsensusEngine;
use crate::ports::outbound::{
    AccountManager, Chain, MessageWeight, NetworkService, RemoteSigner, SystemTimeSource,
    TimeSource,
};
use crate::signer::Signer;
use crate::state::{MiningGate, MiningState};
use async_trait::async_trait;
use parking_lot::Mutex;
use pod_types::constants::{
    pod_contract, BLOCK_INTERVAL_MS, CONSENSUS_SIZE, DEFAULT_MAX_UNLOCK_DURATION,
    DYNASTY_INTERVAL_MS, SECOND_MS, TRANSACTION_MAX_GAS, TRANSACTION_MAX_GAS_PRICE,
    TX_PAYLOAD_POD_TYPE,
};
use pod_types::{
    Address, Block, ConsensusState, Event, Hash, NetMessage, PodAction, Report, Transaction,
    TOPIC_LIB_BLOCK,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the inbound network message channel.
const MESSAGE_CHANNEL_CAPACITY: usize = 128;

/// Proof-of-Devotion consensus engine.
pub struct PodEngine {
    chain: Arc<dyn Chain>,
    network: Arc<dyn NetworkService>,
    accounts: Arc<dyn AccountManager>,
    signer: Signer,
    time: Arc<dyn TimeSource>,
    config: PodConfig,

    coinbase: Option<Address>,
    miner: Option<Address>,

    dynasty: DynastyRegistry,
    slot: SlotCache,
    reversible: ReversibleCache,
    witnesses: WitnessPool,
    gate: MiningGate,

    shutdown: watch::Sender<bool>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PodEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodEngine").finish_non_exhaustive()
    }
}

impl PodEngine {
    /// Wire up an engine. When `start_mine` is set the coinbase and miner
    /// addresses must parse; signing goes through the remote sign service
    /// when one is configured, the local keychain otherwise.
    pub fn new(
        chain: Arc<dyn Chain>,
        network: Arc<dyn NetworkService>,
        accounts: Arc<dyn AccountManager>,
        config: PodConfig,
    ) -> PodResult<Self> {
        let (coinbase, miner) = if config.start_mine {
            let coinbase = parse_address(config.coinbase.as_deref(), "coinbase")?;
            let miner = parse_address(config.miner.as_deref(), "miner")?;
            (Some(coinbase), Some(miner))
        } else {
            (None, None)
        };

        let signer = if config.enable_remote_sign_server {
            let endpoint = config
                .remote_sign_server
                .clone()
                .ok_or_else(|| PodError::RemoteSign("remote sign server not configured".into()))?;
            Signer::Remote(Arc::new(GrpcRemoteSigner::new(endpoint)))
        } else {
            Signer::Local(Arc::clone(&accounts))
        };

        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            chain,
            network,
            accounts,
            signer,
            time: Arc::new(SystemTimeSource),
            config,
            coinbase,
            miner,
            dynasty: DynastyRegistry::new(),
            slot: SlotCache::new(),
            reversible: ReversibleCache::new(),
            witnesses: WitnessPool::new(),
            gate: MiningGate::new(),
            shutdown,
            loop_handle: Mutex::new(None),
        })
    }

    /// Replace the wall clock, for tests.
    pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    /// Replace the remote signer built from the config, for tests.
    pub fn with_remote_signer(mut self, remote: Arc<dyn RemoteSigner>) -> Self {
        self.signer = Signer::Remote(remote);
        self
    }

    /// Register the witness subscriber and spawn the control loop.
    pub async fn start(self: Arc<Self>) {
        info!("[pod] starting mining service");
        let (sender, receiver) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        self.network
            .register(MESSAGE_TYPE_WITNESS, MessageWeight::Zero, sender)
            .await;
        let handle = tokio::spawn(Arc::clone(&self).block_loop(receiver));
        *self.loop_handle.lock() = Some(handle);
    }

    /// Deregister, disable mining and drain the loop.
    pub async fn stop(&self) {
        info!("[pod] stopping mining service");
        self.network.deregister(MESSAGE_TYPE_WITNESS).await;
        if let Err(err) = self.disable_mining().await {
            debug!(%err, "[pod] disable mining on shutdown");
        }
        let _ = self.shutdown.send(true);
        let handle = self.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    async fn block_loop(self: Arc<Self>, mut messages: mpsc::Receiver<NetMessage>) {
        info!("[pod] mining loop started");
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    metrics::record_slot_cache_size(self.slot.len());
                    let now = self.time.now_secs();
                    if let Err(err) = self.heartbeat(now).await {
                        debug!(%err, now, "[pod] heartbeat skipped");
                    }
                    if let Err(err) = self.mint_block(now).await {
                        debug!(%err, now, "[pod] mint skipped");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("[pod] mining loop stopped");
                        return;
                    }
                }
                Some(message) = messages.recv() => {
                    self.dispatch_message(message).await;
                }
            }
        }
    }

    async fn dispatch_message(&self, message: NetMessage) {
        match message.message_type.as_str() {
            MESSAGE_TYPE_WITNESS => self.on_witness_received(message).await,
            other => {
                warn!(message_type = other, "[pod] received unknown message");
            }
        }
    }

    async fn on_witness_received(&self, message: NetMessage) {
        match WitnessMessage::from_bytes(&message.data) {
            Ok(witness) => {
                let fresh = self.witnesses.record(&message.from, &witness.hashes);
                debug!(
                    peer = %message.from,
                    claims = witness.hashes.len(),
                    fresh,
                    "[pod] recorded witness claims"
                );
            }
            Err(err) => {
                warn!(peer = %message.from, %err, "[pod] dropped malformed witness");
            }
        }
    }

    // ---------------------------------------------------------------------
    // Mining gate
    // ---------------------------------------------------------------------

    fn miner(&self) -> PodResult<Address> {
        self.miner.ok_or(PodError::MinerNotConfigured)
    }

    fn coinbase(&self) -> PodResult<Address> {
        self.coinbase.ok_or(PodError::CoinbaseNotConfigured)
    }

    // ---------------------------------------------------------------------
    // Dynasty access
    // ---------------------------------------------------------------------

    /// Dynasty serial a second-resolution timestamp belongs to.
    pub fn serial(&self, timestamp: i64) -> i64 {
        timing::serial(timestamp)
    }

    /// Number of slots in one dynasty window.
    pub fn number_of_blocks_in_dynasty(&self) -> u64 {
        (DYNASTY_INTERVAL_MS / BLOCK_INTERVAL_MS) as u64
    }

    /// The roster active at `timestamp`, loaded from the governance contract
    /// when not yet resident.
    async fn get_dynasty(&self, timestamp: i64) -> PodResult<DynastyRoster> {
        let serial = timing::serial(timestamp);
        if let Some(roster) = self.dynasty.get(serial) {
            return Ok(roster);
        }
        self.load_dynasty_from_contract(serial).await?;
        self.dynasty
            .get(serial)
            .ok_or(PodError::DynastyNotFound(serial))
    }

    /// Materialize the roster for `serial` from the contract world state.
    /// Idempotent; a resident roster is never replaced.
    async fn load_dynasty_from_contract(&self, serial: i64) -> PodResult<()> {
        if self.dynasty.contains(serial) {
            return Ok(());
        }
        if let Some(members) = self.chain.dynasty_from_contract(serial).await? {
            if !members.is_empty() {
                self.dynasty.insert(serial, DynastyRoster::new(members));
            }
        }
        Ok(())
    }

    /// The scheduled proposer for the slot at `timestamp`.
    pub async fn find_proposer(&self, timestamp: i64) -> PodResult<Address> {
        let roster = self.get_dynasty(timestamp).await?;
        roster.proposer_at(timestamp)
    }

    async fn is_proposer(&self, timestamp: i64, miner: &Address) -> bool {
        match self.find_proposer(timestamp).await {
            Ok(proposer) => proposer == *miner,
            Err(err) => {
                debug!(%err, timestamp, "[pod] failed to resolve proposer");
                false
            }
        }
    }

    // ---------------------------------------------------------------------
    // Block production
    // ---------------------------------------------------------------------

    /// Attempt to mint the block for the upcoming slot. `now` is the current
    /// unix time in seconds.
    pub async fn mint_block(&self, now: i64) -> PodResult<()> {
        metrics::record_packing_ms(0);
        metrics::record_waiting_ms(0);

        if !self.gate.is_enabled() {
            return Err(PodError::CannotMintWhenDisable);
        }
        if self.gate.is_pending() {
            return Err(PodError::CannotMintWhenPending);
        }
        let miner = self.miner()?;
        let now_ms = now * SECOND_MS;
        let tail = self.chain.tail_block().await;

        let deadline_ms = timing::check_deadline(tail.timestamp_ms(), now_ms).map_err(|err| {
            debug!(tail = %tail, now_ms, %err, "[pod] deadline check");
            err
        })?;

        let consensus_state = self.check_proposer(&tail, now_ms).await?;

        info!(
            tail = %tail,
            start = now_ms,
            deadline = deadline_ms,
            proposer = %consensus_state.proposer,
            miner = %miner,
            "[pod] my turn to mint"
        );
        metrics::record_packing_ms(deadline_ms - now_ms);

        if let Err(err) = self.trigger_state(now).await {
            error!(timestamp = now, serial = timing::serial(now), %err, "[pod] failed to trigger state");
        }

        let block = self.new_block(&tail, consensus_state, deadline_ms).await?;

        // Publish exactly on the slot boundary.
        let slot_ms = timing::next_slot(now_ms);
        let current_ms = self.time.now_ms();
        if slot_ms > current_ms {
            tokio::time::sleep(Duration::from_millis((slot_ms - current_ms) as u64)).await;
            metrics::record_waiting_ms(slot_ms - current_ms);
        }

        info!(
            tail = %tail,
            block = %block,
            start = now_ms,
            deadline = deadline_ms,
            slot = slot_ms,
            "[pod] minted new block"
        );
        metrics::record_mint_block();

        if let Err(err) = self.push_and_broadcast(&tail, &block).await {
            self.return_transactions_later(&block);
            return Err(err);
        }
        Ok(())
    }

    /// The consensus state for the upcoming slot; fails unless the local
    /// miner is its scheduled proposer.
    async fn check_proposer(&self, tail: &Block, now_ms: i64) -> PodResult<ConsensusState> {
        let slot_ms = timing::next_slot(now_ms);
        let elapsed_secs = (slot_ms - tail.timestamp_ms()) / SECOND_MS;
        let consensus_state = self
            .chain
            .next_consensus_state(tail, elapsed_secs)
            .await
            .map_err(|err| {
                debug!(tail = %tail, elapsed_secs, %err, "[pod] failed to generate next consensus state");
                PodError::GenerateNextConsensusState
            })?;
        let miner = self.miner()?;
        if consensus_state.proposer != miner {
            debug!(
                tail = %tail,
                now_ms,
                slot = slot_ms,
                expected = %consensus_state.proposer,
                actual = %miner,
                "[pod] not my turn, waiting"
            );
            return Err(PodError::InvalidBlockProposer);
        }
        Ok(consensus_state)
    }

    async fn new_block(
        &self,
        tail: &Block,
        consensus_state: ConsensusState,
        deadline_ms: i64,
    ) -> PodResult<Block> {
        let miner = self.miner()?;
        let coinbase = self.coinbase()?;
        let mut block = self
            .chain
            .new_block(&coinbase, tail)
            .await
            .map_err(|err| {
                error!(tail = %tail, %coinbase, %err, "[pod] failed to create new block");
                err
            })?;

        if self.config.random_available_at(block.height) {
            if let Err(err) = self.generate_random_seed(&mut block).await {
                error!(block = %block, %err, "[pod] failed to generate random seed");
                return Err(err);
            }
        }

        block.consensus_root.proposer = consensus_state.proposer;
        block.consensus_root.timestamp = consensus_state.timestamp;
        block.timestamp = consensus_state.timestamp;
        block.miner = miner;
        self.chain.collect_transactions(&mut block, deadline_ms).await;

        if let Err(err) = self.chain.seal_block(&mut block).await {
            error!(block = %block, %err, "[pod] failed to seal new block");
            self.return_transactions_later(&block);
            return Err(err);
        }

        if let Err(err) = self.signer.sign_block(&miner, &mut block).await {
            error!(miner = %miner, block = %block, %err, "[pod] failed to sign new block");
            self.return_transactions_later(&block);
            return Err(err);
        }

        debug!(block = %block, txs = block.transactions.len(), "[pod] packed txs");
        Ok(block)
    }

    async fn generate_random_seed(&self, block: &mut Block) -> PodResult<()> {
        let miner = self.miner()?;
        let (ancestor_hash, parent_seed) = self
            .chain
            .get_vrf_input(&block.parent_hash, block.height)
            .await?;
        let (vrf_seed, vrf_proof) = self
            .signer
            .generate_random_seed(&miner, &ancestor_hash, &parent_seed)
            .await?;
        block.set_random_seed(vrf_seed, vrf_proof);
        Ok(())
    }

    async fn push_and_broadcast(&self, tail: &Block, block: &Block) -> PodResult<()> {
        self.chain
            .push_and_broadcast_block(block)
            .await
            .map_err(|err| {
                error!(tail = %tail, block = %block, %err, "[pod] failed to push new block into pool");
                err
            })?;

        if self.chain.tail_block().await.hash != block.hash {
            return Err(PodError::AppendNewBlockFailed);
        }

        info!(tail = %tail, block = %block, "[pod] broadcasted new block");
        Ok(())
    }

    /// Hand the block's transactions back to the pool off the hot path.
    fn return_transactions_later(&self, block: &Block) {
        let chain = Arc::clone(&self.chain);
        let block = block.clone();
        tokio::spawn(async move {
            chain.return_transactions(&block).await;
        });
    }

    // ---------------------------------------------------------------------
    // Governance driver
    // ---------------------------------------------------------------------

    /// Send the miner liveness heartbeat. Runs on the first enabled tick and
    /// at dynasty midpoints afterwards.
    pub async fn heartbeat(&self, now: i64) -> PodResult<()> {
        if !self.gate.is_enabled() {
            return Err(PodError::NoHeartbeatWhenDisable);
        }
        let tail = self.chain.tail_block().await;
        if !self.config.node_update_at(tail.height) {
            return Ok(());
        }

        if self.gate.beat_launched() {
            let now_ms = now * SECOND_MS;
            if (now_ms + DYNASTY_INTERVAL_MS / 2) % DYNASTY_INTERVAL_MS != 0 {
                return Ok(());
            }
        }
        self.gate.mark_beat_launched();

        let miner = self.miner()?;
        let participants = self.chain.participants().await?;

        let result = if participants.contains(&miner) {
            self.send_transaction(now, PodAction::Heartbeat, Vec::new())
                .await
        } else {
            Err(PodError::MinerNotSignUp)
        };

        match &result {
            Ok(()) => info!(miner = %miner, timestamp = now, "[pod] sent miner heartbeat"),
            Err(err) => error!(miner = %miner, timestamp = now, %err, "[pod] failed to send heartbeat"),
        }
        result
    }

    /// Drive the governance contract state machine: make sure the next
    /// dynasty exists, reporting last-dynasty statistics when the contract
    /// cannot yet derive it.
    pub async fn trigger_state(&self, now: i64) -> PodResult<()> {
        if !self.gate.is_enabled() {
            return Ok(());
        }
        let tail = self.chain.tail_block().await;
        if !self.config.node_update_at(tail.height) {
            return Ok(());
        }
        debug!(timestamp = now, "[pod] trigger state");

        let serial = timing::serial(now);
        if !self.dynasty.contains(serial + 1) {
            self.load_dynasty_from_contract(serial + 1).await?;
        }
        if !self.dynasty.contains(serial + 1) {
            let stats = self.chain.statistical_last_blocks(serial).await?;
            let data = serde_json::to_vec(&stats)?;
            self.send_transaction(now, PodAction::State, data).await?;
        }
        Ok(())
    }

    /// Build, sign and publish a governance transaction.
    async fn send_transaction(
        &self,
        timestamp: i64,
        action: PodAction,
        data: Vec<u8>,
    ) -> PodResult<()> {
        let miner = self.miner()?;
        let payload = pod_types::PodPayload::new(timing::serial(timestamp), action, data);
        let payload_bytes = payload.to_bytes()?;

        let nonce = self.chain.account_nonce(&miner).await? + 1;
        let mut tx = Transaction::new(
            self.chain.chain_id(),
            miner,
            pod_contract(),
            0,
            nonce,
            TX_PAYLOAD_POD_TYPE,
            payload_bytes,
            TRANSACTION_MAX_GAS_PRICE,
            TRANSACTION_MAX_GAS,
        );
        tx.timestamp = timestamp;
        tx.hash = tx.compute_hash();
        self.signer.sign_transaction(&miner, &mut tx).await?;
        self.chain.push_and_broadcast_transaction(&tx).await
    }

    // ---------------------------------------------------------------------
    // Finality
    // ---------------------------------------------------------------------

    async fn set_lib(&self, block: &Block, confirmed: usize) {
        if let Err(err) = self.chain.store_lib_hash(block).await {
            debug!(block = %block, %err, "[pod] failed to store latest irreversible block");
            return;
        }
        info!(
            lib_new = %block,
            supported = confirmed,
            limit = CONSENSUS_SIZE,
            "[pod] updated latest irreversible block"
        );
        self.chain.set_lib(block).await;
        self.reversible.remove(&block.hash);

        let lib = self.chain.lib().await;
        self.chain
            .emit_event(Event {
                topic: TOPIC_LIB_BLOCK.to_string(),
                data: lib.to_string(),
            })
            .await;
    }

    async fn broadcast_witness(&self) -> PodResult<()> {
        let hashes = self.reversible.snapshot();
        if hashes.is_empty() {
            return Ok(());
        }
        let message = WitnessMessage::new(hashes);
        let data = message.to_bytes()?;
        self.network
            .broadcast(MESSAGE_TYPE_WITNESS, data, MessageWeight::Zero)
            .await;
        Ok(())
    }

    /// Number of distinct peers that witnessed a reversible block.
    pub fn witness_claims(&self, hash: &Hash) -> usize {
        self.witnesses.claims(hash)
    }
}

fn parse_address(source: Option<&str>, role: &str) -> PodResult<Address> {
    let value = source.ok_or_else(|| match role {
        "coinbase" => PodError::CoinbaseNotConfigured,
        _ => PodError::MinerNotConfigured,
    })?;
    Address::from_base58(value).map_err(|err| {
        error!(address = value, role, %err, "[pod] failed to parse address");
        PodError::from(err)
    })
}

#[async_trait]
impl ConsensusEngine for PodEngine {
    async fn verify_block(&self, block: &Block) -> PodResult<()> {
        if block.timestamp != block.consensus_root.timestamp {
            return Err(PodError::InvalidBlockTimestamp);
        }
        let ts_ms = block.timestamp_ms();
        if ts_ms <= 0 || ts_ms % BLOCK_INTERVAL_MS != 0 {
            return Err(PodError::InvalidBlockInterval);
        }

        let roster = self.get_dynasty(block.timestamp).await.map_err(|err| {
            error!(block = %block, %err, "[pod] failed to retrieve dynasty");
            err
        })?;
        let proposer = roster.proposer_at(block.timestamp).map_err(|err| {
            debug!(block = %block, %err, "[pod] failed to find proposer");
            err
        })?;

        let signature = block
            .signature
            .as_ref()
            .ok_or(PodError::InvalidBlockProposer)?;
        let signer = self
            .accounts
            .recover_signer(signature.alg, &block.hash, &signature.data)
            .map_err(|err| {
                debug!(block = %block, %err, "[pod] failed to recover block signer");
                err
            })?;
        if signer != proposer {
            debug!(
                block = %block,
                signer = %signer,
                proposer = %proposer,
                "[pod] block signer is not the scheduled proposer"
            );
            return Err(PodError::InvalidBlockProposer);
        }

        if self.config.random_available_at(block.height) && !block.has_random_seed() {
            debug!(block = %block, "[pod] no random seed in block header");
            return Err(PodError::InvalidBlockRandom);
        }

        self.slot.record(block);
        Ok(())
    }

    async fn check_double_mint(&self, block: &Block) -> bool {
        let Some(resident) = self.slot.conflict_for(block) else {
            return false;
        };

        self.report_evil(&resident, block).await;
        warn!(
            cur_block = %block,
            pre_block = %resident,
            "[pod] found someone minted multiple blocks at the same time"
        );
        true
    }

    async fn fork_choice(&self) -> PodResult<()> {
        let tail = self.chain.tail_block().await;
        let detached = self.chain.detached_tail_blocks().await;
        let new_tail = fork_choice::select_tail(&tail, &detached).clone();

        if new_tail.hash == tail.hash {
            debug!(tail = %tail, "[pod] current tail is best, no need to change");
            return Ok(());
        }

        self.chain.set_tail_block(&new_tail).await.map_err(|err| {
            debug!(new_tail = %new_tail, old_tail = %tail, %err, "[pod] failed to set new tail");
            err
        })?;
        info!(new_tail = %new_tail, old_tail = %tail, "[pod] changed to new tail");
        Ok(())
    }

    async fn update_lib(&self, reversible_blocks: Vec<Hash>) {
        let tail = self.chain.tail_block().await;
        self.reversible.extend(&reversible_blocks);

        if self.gate.is_enabled() && self.config.node_update_at(tail.height) {
            if let Ok(miner) = self.miner() {
                if self.is_proposer(tail.timestamp, &miner).await {
                    if let Err(err) = self.broadcast_witness().await {
                        error!(%err, "[pod] failed to broadcast witness");
                    }
                }
            }
        }

        let lib = self.chain.lib().await;
        let mut cur = tail.clone();
        let mut tally = ProposerTally::new(CONSENSUS_SIZE);

        while cur.hash != lib.hash {
            match tally.observe(&cur, lib.height) {
                LibVerdict::Pruned => return,
                LibVerdict::Finalized { confirmed } => {
                    self.set_lib(&cur, confirmed).await;
                    return;
                }
                LibVerdict::Continue => {}
            }

            let parent = self.chain.block_by_hash(&cur.parent_hash).await;
            match parent {
                Some(parent) if !parent.is_genesis() => cur = parent,
                _ => {
                    debug!(tail = %tail, cur = %cur, "[pod] failed to find latest irreversible block");
                    return;
                }
            }
        }

        debug!(
            lib = %lib,
            tail = %tail,
            supported = tally.supported(),
            limit = CONSENSUS_SIZE,
            "[pod] not enough supported miners to advance lib"
        );
    }

    async fn enable_mining(&self, passphrase: &str) -> PodResult<()> {
        let miner = self.miner()?;
        if !self.signer.is_remote() {
            self.accounts
                .unlock(&miner, passphrase.as_bytes(), DEFAULT_MAX_UNLOCK_DURATION)
                .await?;
        }
        self.gate.enable();
        info!("[pod] enabled mining");
        Ok(())
    }

    async fn disable_mining(&self) -> PodResult<()> {
        let miner = self.miner()?;
        if !self.signer.is_remote() {
            self.accounts.lock(&miner).await?;
        }
        self.gate.disable();
        info!("[pod] disabled mining");
        Ok(())
    }

    fn suspend_mining(&self) {
        self.gate.suspend();
        info!("[pod] suspended mining");
    }

    fn resume_mining(&self) {
        self.gate.resume();
        info!("[pod] resumed mining");
    }

    fn enabled(&self) -> bool {
        self.gate.is_enabled()
    }

    fn pending(&self) -> bool {
        self.gate.is_pending()
    }

    fn mining_state(&self) -> MiningState {
        self.gate.state()
    }
}

impl PodEngine {
    /// Classify a slot conflict and submit the on-chain report. Only the
    /// slot's scheduled proposer reports, and only while mining is enabled
    /// past the activation height.
    async fn report_evil(&self, resident: &Block, block: &Block) {
        let tail = self.chain.tail_block().await;
        if !self.gate.is_enabled() || !self.config.node_update_at(tail.height) {
            return;
        }
        let Ok(miner) = self.miner() else {
            return;
        };

        if !self.is_proposer(block.timestamp, &miner).await {
            info!(
                timestamp = block.timestamp,
                serial = timing::serial(block.timestamp),
                miner = %miner,
                cur_block = %block,
                pre_block = %resident,
                "[pod] not the dynasty proposer, skipping report"
            );
            return;
        }

        let evil = classify_conflict(resident, block);
        let report = Report {
            timestamp: block.timestamp,
            miner: block.miner.to_base58(),
            evil,
        };
        let result = match report.to_bytes() {
            Ok(bytes) => {
                self.send_transaction(block.timestamp, PodAction::Report, bytes)
                    .await
            }
            Err(err) => Err(PodError::from(err)),
        };
        match result {
            Ok(()) => info!(
                cur_block = %block,
                pre_block = %resident,
                ?evil,
                "[pod] reported double mint"
            ),
            Err(err) => error!(
                cur_block = %block,
                pre_block = %resident,
                %err,
                "[pod] failed to report double mint"
            ),
        }
    }
}
