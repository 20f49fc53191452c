//! End-to-end engine tests on the in-memory chain, keychain and network.

use async_trait::async_trait;
use pod_consensus::{
    AccountManager, Chain, ConsensusEngine, FixedTimeSource, MemoryChain, MemoryKeychain,
    MemoryNetwork, PodConfig, PodEngine, PodError, PodResult, RemoteSigner, WitnessMessage,
    MESSAGE_TYPE_WITNESS,
};
use pod_types::{
    constants, Address, Block, ConsensusRoot, EvilKind, Hash, MinerStats, NetMessage, PodAction,
    PodPayload, Report, SignatureAlgorithm, TOPIC_LIB_BLOCK,
};
use std::sync::Arc;

fn addr(i: usize) -> Address {
    let mut payload = [0u8; 20];
    payload[0] = (i % 256) as u8;
    payload[1] = (i / 256) as u8;
    Address::from_account_payload(payload)
}

fn roster(n: usize) -> Vec<Address> {
    (1..=n).map(addr).collect()
}

struct Node {
    engine: Arc<PodEngine>,
    chain: Arc<MemoryChain>,
    network: Arc<MemoryNetwork>,
}

/// A node whose miner identity is `miner`, with the serial-0 dynasty set to
/// `members` and the clock pinned far past every slot used in tests.
async fn node(miner: Address, members: Vec<Address>) -> Node {
    let chain = Arc::new(MemoryChain::new(100));
    chain.set_dynasty(0, members);
    let network = Arc::new(MemoryNetwork::new());
    let accounts = Arc::new(MemoryKeychain::new());
    let config = PodConfig {
        start_mine: true,
        coinbase: Some(miner.to_base58()),
        miner: Some(miner.to_base58()),
        ..PodConfig::default()
    };
    let engine = PodEngine::new(chain.clone(), network.clone(), accounts, config)
        .unwrap()
        .with_time_source(Arc::new(FixedTimeSource::at_secs(10_000_000)));
    Node {
        engine: Arc::new(engine),
        chain,
        network,
    }
}

fn craft_block(height: u64, timestamp: i64, proposer: Address, parent_hash: Hash) -> Block {
    let mut hash: Hash = [0; 32];
    hash[..8].copy_from_slice(&height.to_be_bytes());
    hash[8..16].copy_from_slice(&timestamp.to_be_bytes());
    hash[16..].copy_from_slice(&proposer.as_bytes()[2..18]);
    Block {
        chain_id: 100,
        height,
        timestamp,
        hash,
        parent_hash,
        coinbase: proposer,
        miner: proposer,
        consensus_root: ConsensusRoot {
            proposer,
            timestamp,
        },
        random_seed: Some(vec![1; 32]),
        random_proof: Some(vec![2; 32]),
        signature: None,
        transactions: vec![],
    }
}

fn decode_payload(tx: &pod_types::Transaction) -> PodPayload {
    assert_eq!(tx.payload_type, constants::TX_PAYLOAD_POD_TYPE);
    assert_eq!(tx.to, constants::pod_contract());
    PodPayload::from_bytes(&tx.payload).unwrap()
}

// -------------------------------------------------------------------------
// Block production and verification
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_minted_block_verifies_on_another_node() {
    let members = roster(3);
    // The 30s slot has offset 2 into the dynasty window, so member index 2
    // is its proposer.
    let proposer = members[2];

    let minter = node(proposer, members.clone()).await;
    minter.engine.enable_mining("passphrase").await.unwrap();
    minter.engine.resume_mining();

    // Genesis tail, 2s left in the 30s slot: minting may start.
    minter.engine.mint_block(28).await.unwrap();

    let minted = minter.chain.tail_block().await;
    assert_eq!(minted.height, 2);
    assert_eq!(minted.timestamp, 30);
    assert_eq!(minted.consensus_root.proposer, proposer);
    assert!(minted.has_random_seed());
    assert!(minted.signature.is_some());
    // Packing was bounded by the slot boundary.
    assert_eq!(minter.chain.last_collect_deadline(), Some(30_000));

    // A different node with the same dynasty state accepts the block.
    let verifier = node(members[0], members).await;
    verifier.engine.verify_block(&minted).await.unwrap();
    // The verified block now occupies its slot.
    assert!(!verifier.engine.check_double_mint(&minted).await);
}

#[tokio::test]
async fn test_mint_respects_slot_timing() {
    let members = roster(3);
    let node = node(members[0], members.clone()).await;
    node.engine.enable_mining("passphrase").await.unwrap();
    node.engine.resume_mining();

    // 10s left in the 30s slot and the 15s block has not arrived yet.
    let err = node.engine.mint_block(20).await.unwrap_err();
    assert!(matches!(err, PodError::WaitingBlockInLastSlot));

    // A tail from the future means the local clock is behind.
    let genesis = node.chain.genesis();
    node.chain
        .append_canonical(craft_block(2, 45, members[0], genesis.hash));
    let err = node.engine.mint_block(30).await.unwrap_err();
    assert!(matches!(err, PodError::BlockMintedInNextSlot));
}

#[tokio::test]
async fn test_mint_rejected_when_not_the_proposer() {
    let members = roster(3);
    // Slot 30s belongs to member 2, not member 0.
    let node = node(members[0], members).await;
    node.engine.enable_mining("passphrase").await.unwrap();
    node.engine.resume_mining();

    let err = node.engine.mint_block(28).await.unwrap_err();
    assert!(matches!(err, PodError::InvalidBlockProposer));
}

#[tokio::test]
async fn test_verify_rejects_bad_blocks() {
    let members = roster(3);
    let verifier = node(members[0], members.clone()).await;
    let genesis = verifier.chain.genesis();

    // Timestamp disagreeing with the consensus root.
    let mut block = craft_block(2, 30, members[2], genesis.hash);
    block.consensus_root.timestamp = 15;
    let err = verifier.engine.verify_block(&block).await.unwrap_err();
    assert!(matches!(err, PodError::InvalidBlockTimestamp));

    // Timestamp off the slot grid.
    let block = craft_block(2, 31, members[2], genesis.hash);
    let err = verifier.engine.verify_block(&block).await.unwrap_err();
    assert!(matches!(err, PodError::InvalidBlockInterval));

    // Signed by someone who is not the scheduled proposer.
    let keychain = MemoryKeychain::new();
    let outsider = addr(9);
    let mut block = craft_block(2, 30, members[2], genesis.hash);
    keychain
        .unlock(&outsider, b"x", std::time::Duration::from_secs(60))
        .await
        .unwrap();
    keychain.sign_block(&outsider, &mut block).await.unwrap();
    let err = verifier.engine.verify_block(&block).await.unwrap_err();
    assert!(matches!(err, PodError::InvalidBlockProposer));

    // Proposer-signed but missing the random seed.
    let scheduled = members[2];
    let mut block = craft_block(2, 30, scheduled, genesis.hash);
    block.random_seed = None;
    block.random_proof = None;
    keychain
        .unlock(&scheduled, b"x", std::time::Duration::from_secs(60))
        .await
        .unwrap();
    keychain.sign_block(&scheduled, &mut block).await.unwrap();
    let err = verifier.engine.verify_block(&block).await.unwrap_err();
    assert!(matches!(err, PodError::InvalidBlockRandom));
}

// -------------------------------------------------------------------------
// Double-mint detection
// -------------------------------------------------------------------------

async fn occupy_slot(node: &Node, block: &Block) {
    let keychain = MemoryKeychain::new();
    let mut signed = block.clone();
    keychain
        .unlock(&block.miner, b"x", std::time::Duration::from_secs(60))
        .await
        .unwrap();
    keychain.sign_block(&block.miner, &mut signed).await.unwrap();
    node.engine.verify_block(&signed).await.unwrap();
}

#[tokio::test]
async fn test_double_mint_by_proposer_reports_double_spend() {
    let members = roster(3);
    // The watcher is the proposer of the contested 30s slot, so it reports.
    let watcher = node(members[2], members.clone()).await;
    watcher.engine.enable_mining("passphrase").await.unwrap();

    let genesis = watcher.chain.genesis();
    let first = craft_block(2, 30, members[2], genesis.hash);
    occupy_slot(&watcher, &first).await;

    let mut second = craft_block(2, 30, members[2], genesis.hash);
    second.hash[31] ^= 0xFF;
    assert!(watcher.engine.check_double_mint(&second).await);

    let txs = watcher.chain.pushed_transactions();
    assert_eq!(txs.len(), 1);
    let payload = decode_payload(&txs[0]);
    assert_eq!(payload.action, PodAction::Report);
    assert_eq!(payload.serial, 0);
    let report = Report::from_bytes(&payload.data).unwrap();
    assert_eq!(report.timestamp, 30);
    assert_eq!(report.miner, members[2].to_base58());
    assert_eq!(report.evil, EvilKind::DoubleSpend);
}

#[tokio::test]
async fn test_double_mint_by_outsider_reports_not_miner() {
    let members = roster(3);
    let watcher = node(members[2], members.clone()).await;
    watcher.engine.enable_mining("passphrase").await.unwrap();

    let genesis = watcher.chain.genesis();
    let first = craft_block(2, 30, members[2], genesis.hash);
    occupy_slot(&watcher, &first).await;

    // A different miner squeezed a block into the occupied slot.
    let second = craft_block(2, 30, members[0], genesis.hash);
    assert!(watcher.engine.check_double_mint(&second).await);

    let txs = watcher.chain.pushed_transactions();
    assert_eq!(txs.len(), 1);
    let report = Report::from_bytes(&decode_payload(&txs[0]).data).unwrap();
    assert_eq!(report.miner, members[0].to_base58());
    assert_eq!(report.evil, EvilKind::NotMiner);
}

#[tokio::test]
async fn test_double_mint_not_reported_by_bystander() {
    let members = roster(3);
    // Member 0 is not the proposer of the 30s slot.
    let bystander = node(members[0], members.clone()).await;
    bystander.engine.enable_mining("passphrase").await.unwrap();

    let genesis = bystander.chain.genesis();
    let first = craft_block(2, 30, members[2], genesis.hash);
    occupy_slot(&bystander, &first).await;

    let mut second = craft_block(2, 30, members[2], genesis.hash);
    second.hash[31] ^= 0xFF;
    // The conflict is still flagged, but no report is submitted.
    assert!(bystander.engine.check_double_mint(&second).await);
    assert!(bystander.chain.pushed_transactions().is_empty());
}

// -------------------------------------------------------------------------
// Fork choice
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_fork_choice_picks_highest_then_largest_hash() {
    let members = roster(3);
    let node = node(members[0], members.clone()).await;

    let genesis = node.chain.genesis();
    let mut tail = craft_block(100, 15, members[0], genesis.hash);
    tail.hash = [0; 32];
    tail.hash[0] = 0xAA;
    node.chain.append_canonical(tail.clone());

    let mut same_height = craft_block(100, 15, members[1], genesis.hash);
    same_height.hash = [0; 32];
    same_height.hash[0] = 0xAB;
    let mut higher = craft_block(101, 30, members[2], genesis.hash);
    higher.hash = [0; 32];
    higher.hash[0] = 0x01;
    let mut lower = craft_block(99, 45, members[0], genesis.hash);
    lower.hash = [0; 32];
    lower.hash[0] = 0xFF;
    node.chain.add_detached(same_height);
    node.chain.add_detached(higher.clone());
    node.chain.add_detached(lower);

    node.engine.fork_choice().await.unwrap();
    assert_eq!(node.chain.tail_block().await.hash, higher.hash);

    // Applying fork choice again is a no-op.
    node.engine.fork_choice().await.unwrap();
    assert_eq!(node.chain.tail_block().await.hash, higher.hash);
}

// -------------------------------------------------------------------------
// LIB finalization
// -------------------------------------------------------------------------

/// Build a canonical chain of `len` blocks above genesis, one slot apart,
/// with proposers drawn from `proposers` in round-robin order.
async fn grow_chain(chain: &MemoryChain, len: u64, proposers: &[Address]) -> Vec<Block> {
    let mut parent = chain.genesis();
    let mut blocks = Vec::new();
    for i in 0..len {
        let height = parent.height + 1;
        let timestamp = 15 * (i as i64 + 1);
        let proposer = proposers[i as usize % proposers.len()];
        let block = craft_block(height, timestamp, proposer, parent.hash);
        chain.append_canonical(block.clone());
        parent = block.clone();
        blocks.push(block);
    }
    blocks
}

#[tokio::test]
async fn test_update_lib_advances_with_enough_distinct_proposers() {
    let members = roster(100);
    let node = node(members[0], members.clone()).await;

    // 100 blocks, each with a distinct proposer, all in dynasty 0.
    let blocks = grow_chain(&node.chain, 100, &members).await;
    let reversible: Vec<Hash> = blocks.iter().map(|b| b.hash).collect();

    node.engine.update_lib(reversible).await;

    // Walking down from height 101, the 85th distinct proposer appears at
    // height 17.
    let lib = node.chain.lib().await;
    assert_eq!(lib.height, 17);

    let events = node.chain.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].topic, TOPIC_LIB_BLOCK);
    assert!(events[0].data.contains("height: 17"));
}

#[tokio::test]
async fn test_update_lib_stalls_below_consensus_size() {
    // 84 distinct proposers cycling over 100 blocks: the walk never collects
    // 85 within one dynasty.
    let members = roster(84);
    let node = node(members[0], members.clone()).await;
    let genesis = node.chain.genesis();

    grow_chain(&node.chain, 100, &members).await;
    node.engine.update_lib(Vec::new()).await;

    assert_eq!(node.chain.lib().await.hash, genesis.hash);
    assert!(node.chain.events().is_empty());
}

#[tokio::test]
async fn test_update_lib_keeps_pointer_on_persist_failure() {
    let members = roster(100);
    let node = node(members[0], members.clone()).await;
    let genesis = node.chain.genesis();

    grow_chain(&node.chain, 100, &members).await;
    node.chain.set_fail_lib_store(true);
    node.engine.update_lib(Vec::new()).await;

    // Persistence failed: the pointer did not move and no event fired.
    assert_eq!(node.chain.lib().await.hash, genesis.hash);
    assert!(node.chain.events().is_empty());

    // The next advance succeeds.
    node.chain.set_fail_lib_store(false);
    node.engine.update_lib(Vec::new()).await;
    assert_eq!(node.chain.lib().await.height, 17);
}

#[tokio::test]
async fn test_update_lib_never_moves_backward() {
    let members = roster(100);
    let node = node(members[0], members.clone()).await;

    grow_chain(&node.chain, 100, &members).await;
    node.engine.update_lib(Vec::new()).await;
    let first = node.chain.lib().await;
    assert_eq!(first.height, 17);

    node.engine.update_lib(Vec::new()).await;
    assert_eq!(node.chain.lib().await.height, first.height);
}

#[tokio::test]
async fn test_proposer_broadcasts_witness_on_update_lib() {
    let members = roster(3);
    // Genesis tail sits at timestamp 0, whose slot belongs to member 0.
    let node = node(members[0], members.clone()).await;
    node.engine.enable_mining("passphrase").await.unwrap();

    let hashes: Vec<Hash> = vec![[0xA1; 32], [0xA2; 32]];
    node.engine.update_lib(hashes.clone()).await;

    let broadcasts = node.network.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].0, MESSAGE_TYPE_WITNESS);
    let witness = WitnessMessage::from_bytes(&broadcasts[0].1).unwrap();
    assert_eq!(witness.hashes, hashes);
}

#[tokio::test]
async fn test_non_proposer_stays_silent_on_update_lib() {
    let members = roster(3);
    // Member 1 does not own the genesis slot.
    let node = node(members[1], members.clone()).await;
    node.engine.enable_mining("passphrase").await.unwrap();

    node.engine.update_lib(vec![[0xA1; 32]]).await;
    assert!(node.network.broadcasts().is_empty());
}

// -------------------------------------------------------------------------
// Governance driver
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_heartbeat_fires_once_then_at_midpoints() {
    let members = roster(3);
    let node = node(members[0], members.clone()).await;
    node.chain.set_participants(members.clone());
    node.engine.enable_mining("passphrase").await.unwrap();

    // First heartbeat after enable always fires.
    node.engine.heartbeat(12_345).await.unwrap();
    let txs = node.chain.pushed_transactions();
    assert_eq!(txs.len(), 1);
    let payload = decode_payload(&txs[0]);
    assert_eq!(payload.action, PodAction::Heartbeat);
    assert!(payload.data.is_empty());

    // Off the dynasty midpoint: silently skipped.
    node.engine.heartbeat(12_346).await.unwrap();
    assert_eq!(node.chain.pushed_transactions().len(), 1);

    // At the midpoint (1800s into the 3600s dynasty) it fires again.
    node.engine.heartbeat(1_800).await.unwrap();
    assert_eq!(node.chain.pushed_transactions().len(), 2);
}

#[tokio::test]
async fn test_heartbeat_requires_enable_and_signup() {
    let members = roster(3);
    let node = node(members[0], members.clone()).await;

    let err = node.engine.heartbeat(10).await.unwrap_err();
    assert!(matches!(err, PodError::NoHeartbeatWhenDisable));

    // Enabled but not registered with the contract.
    node.engine.enable_mining("passphrase").await.unwrap();
    let err = node.engine.heartbeat(10).await.unwrap_err();
    assert!(matches!(err, PodError::MinerNotSignUp));
    assert!(node.chain.pushed_transactions().is_empty());
}

#[tokio::test]
async fn test_governance_nonce_comes_from_tail_account() {
    let members = roster(3);
    let node = node(members[0], members.clone()).await;
    node.chain.set_participants(members.clone());
    node.chain.set_nonce(members[0], 7);
    node.engine.enable_mining("passphrase").await.unwrap();

    node.engine.heartbeat(10).await.unwrap();
    let txs = node.chain.pushed_transactions();
    assert_eq!(txs[0].nonce, 8);
    assert_eq!(txs[0].from, members[0]);
    assert_eq!(txs[0].value, 0);
    assert_eq!(txs[0].gas_price, constants::TRANSACTION_MAX_GAS_PRICE);
    assert_eq!(txs[0].gas_limit, constants::TRANSACTION_MAX_GAS);
    assert_eq!(txs[0].hash, txs[0].compute_hash());
    assert!(txs[0].signature.is_some());
}

#[tokio::test]
async fn test_trigger_state_loads_next_dynasty_from_contract() {
    let members = roster(3);
    let node = node(members[0], members.clone()).await;
    node.chain.set_dynasty(1, members.clone());
    node.engine.enable_mining("passphrase").await.unwrap();

    node.engine.trigger_state(100).await.unwrap();

    // The contract had the roster: no statistics transaction was needed, and
    // blocks of dynasty 1 now verify against the loaded roster.
    assert!(node.chain.pushed_transactions().is_empty());
    let dynasty1_slot = 3_600 + 15;
    let proposer = node.engine.find_proposer(dynasty1_slot).await.unwrap();
    assert_eq!(proposer, members[1]);
}

#[tokio::test]
async fn test_trigger_state_reports_statistics_when_contract_lags() {
    let members = roster(3);
    let node = node(members[0], members.clone()).await;
    node.engine.enable_mining("passphrase").await.unwrap();

    // No dynasty 1 in the contract: the node submits last-dynasty stats.
    node.engine.trigger_state(100).await.unwrap();

    let txs = node.chain.pushed_transactions();
    assert_eq!(txs.len(), 1);
    let payload = decode_payload(&txs[0]);
    assert_eq!(payload.action, PodAction::State);
    assert_eq!(payload.serial, 0);
    let stats: Vec<MinerStats> = serde_json::from_slice(&payload.data).unwrap();
    assert_eq!(stats.len(), members.len());
}

#[tokio::test]
async fn test_trigger_state_noop_when_disabled() {
    let members = roster(3);
    let node = node(members[0], members).await;
    node.engine.trigger_state(100).await.unwrap();
    assert!(node.chain.pushed_transactions().is_empty());
}

// -------------------------------------------------------------------------
// Remote signing
// -------------------------------------------------------------------------

/// Remote signer whose seed generation works but whose signing endpoint is
/// down.
struct HalfBrokenSigner;

#[async_trait]
impl RemoteSigner for HalfBrokenSigner {
    async fn sign_hash(
        &self,
        _address: &Address,
        _hash: &Hash,
        _alg: SignatureAlgorithm,
    ) -> PodResult<Vec<u8>> {
        Err(PodError::RemoteSign("connection refused".to_string()))
    }

    async fn generate_random_seed(
        &self,
        _address: &Address,
        parent_seed: &[u8],
        _ancestor_hash: &[u8],
    ) -> PodResult<(Vec<u8>, Vec<u8>)> {
        Ok((parent_seed.to_vec(), vec![7; 32]))
    }
}

#[tokio::test]
async fn test_failed_remote_sign_returns_transactions() {
    let members = roster(3);
    let proposer = members[2];

    let chain = Arc::new(MemoryChain::new(100));
    chain.set_dynasty(0, members);
    let network = Arc::new(MemoryNetwork::new());
    let accounts = Arc::new(MemoryKeychain::new());
    let config = PodConfig {
        start_mine: true,
        coinbase: Some(proposer.to_base58()),
        miner: Some(proposer.to_base58()),
        ..PodConfig::default()
    };
    let engine = Arc::new(
        PodEngine::new(chain.clone(), network, accounts, config)
            .unwrap()
            .with_time_source(Arc::new(FixedTimeSource::at_secs(10_000_000)))
            .with_remote_signer(Arc::new(HalfBrokenSigner)),
    );

    // Remote mode: enabling does not touch the local keychain.
    engine.enable_mining("ignored").await.unwrap();
    engine.resume_mining();

    let err = engine.mint_block(28).await.unwrap_err();
    assert!(matches!(err, PodError::RemoteSign(_)));

    // The packed block's transactions went back to the pool.
    tokio::task::yield_now().await;
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
    loop {
        if !chain.returned_blocks().is_empty() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "transactions never returned");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    // The broken block never became the tail.
    assert_eq!(chain.tail_block().await.height, 1);
}

// -------------------------------------------------------------------------
// Control loop and witness intake
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_witness_messages_are_collated() {
    let members = roster(3);
    let node = node(members[0], members).await;
    node.engine.clone().start().await;

    let message = WitnessMessage::new(vec![[0xC1; 32], [0xC2; 32]]);
    assert!(node.network.deliver(NetMessage {
        message_type: MESSAGE_TYPE_WITNESS.to_string(),
        from: "peer-7".to_string(),
        data: message.to_bytes().unwrap(),
    }));

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
    while node.engine.witness_claims(&[0xC1; 32]) == 0 {
        assert!(tokio::time::Instant::now() < deadline, "witness never recorded");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(node.engine.witness_claims(&[0xC2; 32]), 1);

    // Malformed payloads are dropped without killing the loop.
    assert!(node.network.deliver(NetMessage {
        message_type: MESSAGE_TYPE_WITNESS.to_string(),
        from: "peer-8".to_string(),
        data: b"garbage".to_vec(),
    }));
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(node.engine.witness_claims(&[0xC1; 32]), 1);

    node.engine.stop().await;
}
