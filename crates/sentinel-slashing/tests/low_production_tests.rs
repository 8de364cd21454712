//! Low block production slashing tests
//!
//! - Tier boundaries: fair share, `high` and `low` thresholds
//! - Validators missing from the previous window get the severe rate
//! - Ledger failures abort the run and reject the block
//! - Full lifecycle through the plugin: two rounds of confirmations, rotation,
//!   then the election block of the second round

use std::sync::Arc;

use sentinel_slashing::keys::pre_key;
use sentinel_slashing::{
    apply_low_production, classify, ConsensusHook, InMemoryStakingLedger, JsonEvidenceDecoder,
    PenaltyTier, RoundCounterStore, SlashReason, SlashingConfig, SlashingError, SlashingPlugin,
    StakingError, StakingLedger,
};
use sentinel_storage::{BaseLayer, MemoryStateDb, SnapshotDb};
use sentinel_types::{
    encode_u16, Address, Block, BlockHash, BlockHeader, Candidate, Natural, NodeId,
    EXTRA_SEAL_LEN, EXTRA_VANITY_LEN,
};

// ============================================================================
// Helpers
// ============================================================================

fn node(b: u8) -> NodeId {
    NodeId([b; 64])
}

fn candidate(b: u8, released: u32) -> Candidate {
    Candidate::with_released(node(b), Address([b; 20]), Natural::from(released))
}

/// Test sealer: the first signature byte names the producer.
fn seal_byte_recovery(header: &BlockHeader) -> Result<NodeId, SlashingError> {
    let seal = sentinel_slashing::seal_signature(header)?;
    Ok(NodeId([seal[0]; 64]))
}

/// Evidence is not submitted in these tests.
fn reject_signatures(_: &Address, _: &[u8; 32], _: &[u8]) -> bool {
    false
}

fn sealed_block(number: u64, producer: u8) -> Block {
    let mut extra = vec![0u8; EXTRA_VANITY_LEN];
    extra.extend_from_slice(&[producer; EXTRA_SEAL_LEN]);
    Block::new(BlockHeader {
        parent_hash: BlockHash::zero(),
        number,
        coinbase: Address([producer; 20]),
        timestamp: number,
        extra,
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Harness {
    db: Arc<SnapshotDb>,
    ledger: Arc<InMemoryStakingLedger>,
    plugin: SlashingPlugin,
}

fn harness(config: SlashingConfig, candidates: Vec<Candidate>) -> Harness {
    let db = Arc::new(SnapshotDb::new());
    let ledger = Arc::new(InMemoryStakingLedger::with_candidates(candidates));
    let plugin = SlashingPlugin::new(
        config,
        RoundCounterStore::new(db.clone(), db.clone()),
        ledger.clone(),
        Box::new(JsonEvidenceDecoder::new(Arc::new(reject_signatures))),
        Box::new(seal_byte_recovery),
    )
    .expect("valid config");
    Harness { db, ledger, plugin }
}

fn end_block(h: &Harness, number: u64) -> Result<bool, SlashingError> {
    let block = sealed_block(number, 0);
    let mut state = MemoryStateDb::new();
    h.plugin
        .end_block(&block.hash(), block.header(), &mut state)
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn fair_share_boundary() {
    // 250 / 25 = 10
    let mut c = SlashingConfig::mainnet();
    // widen the mild tier so that it reaches the fair share
    c.block_amount_low = 12;
    assert_eq!(classify(Some(10), &c), None);
    assert_eq!(classify(Some(9), &c).map(|d| d.tier), Some(PenaltyTier::Mild));
}

#[test]
fn count_equal_to_high_is_severe_and_removed() {
    let c = SlashingConfig::mainnet();
    let d = classify(Some(c.block_amount_high), &c).expect("penalized");
    assert_eq!(d.tier, PenaltyTier::Severe);
    assert_eq!(d.rate, c.block_amount_high_slashing);
    assert!(d.remove);
}

#[test]
fn count_equal_to_low_is_mild_and_kept() {
    let c = SlashingConfig::mainnet();
    let d = classify(Some(c.block_amount_low), &c).expect("penalized");
    assert_eq!(d.tier, PenaltyTier::Mild);
    assert_eq!(d.rate, c.block_amount_low_slashing);
    assert!(!d.remove);
}

#[test]
fn count_above_low_is_not_penalized() {
    let c = SlashingConfig::mainnet();
    assert_eq!(classify(Some(c.block_amount_low + 1), &c), None);
}

#[test]
fn absent_validator_is_never_mild() {
    let c = SlashingConfig::mainnet();
    let d = classify(None, &c).expect("penalized");
    assert_eq!(d.tier, PenaltyTier::Severe);
    assert_eq!(d.rate, c.block_amount_high_slashing);
}

// ============================================================================
// Policy run
// ============================================================================

#[test]
fn policy_charges_each_active_validator() {
    let config = SlashingConfig::mainnet();
    let db = Arc::new(SnapshotDb::new());
    let counters = RoundCounterStore::new(db.clone(), db.clone());
    let ledger = InMemoryStakingLedger::with_candidates([
        candidate(1, 1000),
        candidate(2, 1000),
        candidate(3, 1000),
        candidate(4, 1000),
    ]);
    db.put_base(&pre_key(&node(1)), &encode_u16(4)).expect("seed");
    db.put_base(&pre_key(&node(2)), &encode_u16(7)).expect("seed");
    db.put_base(&pre_key(&node(3)), &encode_u16(40)).expect("seed");
    // node 4 has no entry

    let mut state = MemoryStateDb::new();
    let applied =
        apply_low_production(&config, &counters, &ledger, &mut state, &BlockHash::zero(), 480)
            .expect("policy");

    assert_eq!(applied.len(), 3);
    let records = ledger.slash_records();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.reason == SlashReason::LowRatio));

    let by_node = |b: u8| {
        records
            .iter()
            .find(|r| r.node_id == node(b))
            .cloned()
            .expect("record")
    };
    assert_eq!(by_node(1).requested, Natural::from(50u32));
    assert!(by_node(1).removed);
    assert_eq!(by_node(2).requested, Natural::from(100u32));
    assert!(!by_node(2).removed);
    assert_eq!(by_node(4).requested, Natural::from(50u32));
    assert!(!by_node(4).removed);
    assert!(records.iter().all(|r| r.node_id != node(3)));

    assert!(!ledger.is_active(&node(1)));
    assert!(ledger.is_active(&node(2)));
    assert!(ledger.is_active(&node(4)));
}

#[test]
fn ledger_failure_rejects_the_block() {
    let h = harness(SlashingConfig::mainnet(), vec![candidate(1, 1000)]);
    h.ledger.inject_slash_failure(Some("ledger offline".into()));

    let result = end_block(&h, 480);
    assert_eq!(
        result,
        Err(SlashingError::Staking(StakingError::Ledger(
            "ledger offline".into()
        )))
    );
    assert!(!result.unwrap_err().is_business());
}

#[test]
fn first_round_election_is_skipped() {
    let h = harness(SlashingConfig::mainnet(), vec![candidate(1, 1000)]);
    assert_eq!(end_block(&h, 230), Ok(true));
    assert!(h.ledger.slash_records().is_empty());
}

#[test]
fn non_election_blocks_are_skipped() {
    let h = harness(SlashingConfig::mainnet(), vec![candidate(1, 1000)]);
    assert_eq!(end_block(&h, 479), Ok(true));
    assert_eq!(end_block(&h, 500), Ok(true));
    assert!(h.ledger.slash_records().is_empty());
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn low_producer_is_removed_after_next_election() {
    init_tracing();
    let h = harness(
        SlashingConfig::mainnet(),
        vec![candidate(1, 1000), candidate(2, 1000)],
    );

    // Round 1: node 1 seals 3 blocks, node 2 the rest.
    for number in 1..=250u64 {
        let producer = if number <= 3 { 1 } else { 2 };
        h.plugin
            .confirmed(&sealed_block(number, producer))
            .expect("confirm");
    }
    assert!(h.plugin.previous_amounts().expect("previous").is_empty());

    // Round 2 opens with a rotation.
    let rotation = h
        .plugin
        .record_confirmed(&sealed_block(251, 2))
        .expect("confirm");
    let rotation = rotation.expect("rotated at round start");
    assert_eq!(rotation.cur_count, 2);

    let previous = h.plugin.previous_amounts().expect("previous");
    assert_eq!(previous.get(&node(1)), Some(&3));
    assert_eq!(previous.get(&node(2)), Some(&247));

    for number in 252..480u64 {
        h.plugin
            .confirmed(&sealed_block(number, 2))
            .expect("confirm");
    }

    // Block 480 is the election block of round 2.
    assert!(h.plugin.config().is_election(480));
    assert_eq!(end_block(&h, 480), Ok(true));

    let records = h.ledger.slash_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].node_id, node(1));
    assert_eq!(records[0].reason.as_str(), "low-performance");
    assert_eq!(records[0].requested, Natural::from(50u32));
    assert!(records[0].removed);

    let active = h
        .ledger
        .active_validators(&BlockHash::zero(), 501)
        .expect("validators");
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].node_id, node(2));
}

#[test]
fn block_amount_tracks_the_sealer() {
    let h = harness(SlashingConfig::devnet(), vec![candidate(1, 1000)]);
    for number in 1..=4u64 {
        h.plugin.confirmed(&sealed_block(number, 1)).expect("confirm");
    }
    let block = sealed_block(5, 1);
    assert_eq!(
        h.plugin
            .block_amount(&block.hash(), block.header())
            .expect("amount"),
        4
    );
    assert_eq!(h.db.open_branches(), 0);
}

#[test]
fn unsealed_block_fails_confirmation() {
    let h = harness(SlashingConfig::devnet(), vec![candidate(1, 1000)]);
    let block = Block::new(BlockHeader {
        number: 3,
        extra: vec![0u8; 10],
        ..Default::default()
    });
    assert!(matches!(
        h.plugin.confirmed(&block),
        Err(SlashingError::SignerRecovery(_))
    ));
}
