//! End-to-end chain scenarios: elements flow into the registry, blocks are
//! mined over them, misbehaving holders are removed, and the resulting state
//! survives a snapshot round trip.

use merit_consensus::{AddOutcome, Consensus, ConsensusError, MeritRemoval, SignedElement, Verification};
use merit_crypto::{keypair_from_seed, BlsScheme};
use merit_ledger::{
    mine, Block, BlockHeader, BlockOutcome, LedgerError, Merit, NoTransactions, StateSnapshot,
};
use merit_types::{ChainParams, Hash, KeyPair, NetworkId, PublicKey, Timestamp};
use merit_work::{CancelToken, WorkGenerator};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn keypair(seed: u8) -> KeyPair {
    keypair_from_seed(&[seed; 32]).unwrap()
}

fn verification(kp: &KeyPair, nonce: u64, block: Hash) -> SignedElement {
    Verification::new(kp.public.clone(), nonce, block)
        .sign(&BlsScheme, &kp.private)
        .unwrap()
}

fn mined(merit: &Merit, consensus: &Consensus, entries: &[(PublicKey, u64)], time: u64) -> Block {
    let mut block = merit
        .prepare_block(&BlsScheme, consensus, entries, Timestamp::new(time))
        .unwrap();
    block.header = mine(
        &block.header,
        merit.difficulty(),
        &WorkGenerator::new(2),
        &CancelToken::new(),
    )
    .unwrap();
    block
}

fn append(merit: &mut Merit, consensus: &mut Consensus, entries: &[(PublicKey, u64)], time: u64) -> Block {
    let block = mined(merit, consensus, entries, time);
    let outcome = merit
        .add(&BlsScheme, &NoTransactions, consensus, block.clone())
        .unwrap();
    assert_eq!(outcome, BlockOutcome::Appended);
    block
}

/// Every block links to its parent and carries a consistent hash.
fn assert_chain_well_formed(merit: &Merit) {
    let blocks = merit.blockchain().blocks();
    for pair in blocks.windows(2) {
        assert_eq!(pair[1].header.previous_hash(), pair[0].hash());
        assert_eq!(pair[1].height(), pair[0].height() + 1);
    }
    for block in blocks {
        assert_eq!(block.hash(), block.header.compute_hash());
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn removed_holder_cannot_be_committed() {
    let p = keypair(1);
    let q = keypair(2);
    let mut merit = Merit::new(ChainParams::dev_defaults());
    let mut consensus = Consensus::new();

    // P attests to the tip twice, each attestation finalized by a block.
    for nonce in 0..2 {
        let v = verification(&p, nonce, merit.tip().hash());
        assert_eq!(consensus.add(&BlsScheme, v).unwrap(), AddOutcome::Added);
        append(&mut merit, &mut consensus, &[(p.public.clone(), nonce)], 60 * (nonce + 1));
    }
    assert_eq!(merit.height(), 2);

    // P equivocates at nonce 2.
    let v_a = verification(&p, 2, Hash::new([0xA; 32]));
    let v_b = verification(&p, 2, Hash::new([0xB; 32]));
    assert_eq!(consensus.add(&BlsScheme, v_a.clone()).unwrap(), AddOutcome::Added);
    assert_eq!(consensus.add(&BlsScheme, v_b.clone()).unwrap(), AddOutcome::PendingConflict);
    assert!(!consensus.is_removed(&p.public));

    // Q reports it.
    let removal = MeritRemoval::new(q.public.clone(), 0, v_a.to_ref(), v_b.to_ref())
        .sign(&BlsScheme, &q.private)
        .unwrap();
    assert_eq!(
        consensus.add(&BlsScheme, removal).unwrap(),
        AddOutcome::Removed { offender: p.public.clone() }
    );

    let later = verification(&p, 3, merit.tip().hash());
    assert_eq!(consensus.add(&BlsScheme, later).unwrap(), AddOutcome::FromRemovedSigner);

    // Neither the conflicting slot nor anything after it can be finalized.
    for nonce in [2, 3] {
        let block = mined(&merit, &consensus, &[(p.public.clone(), nonce)], 180);
        let err = merit
            .add(&BlsScheme, &NoTransactions, &mut consensus, block)
            .unwrap_err();
        assert!(
            matches!(err, LedgerError::UnverifiedElement { nonce: n, .. } if n == nonce),
            "unexpected error {err}"
        );
    }
    assert_eq!(merit.height(), 2);

    // The removal itself is finalizable.
    append(&mut merit, &mut consensus, &[(q.public.clone(), 0)], 180);
    assert!(consensus.is_archived(&q.public, 0));
    assert_chain_well_formed(&merit);
}

#[test]
fn removal_of_an_element_with_itself_is_rejected() {
    let p = keypair(1);
    let mut consensus = Consensus::new();
    let v1 = verification(&p, 0, Hash::new([1; 32]));
    consensus.add(&BlsScheme, v1.clone()).unwrap();
    let removal = MeritRemoval::new(p.public.clone(), 1, v1.clone(), v1)
        .sign(&BlsScheme, &p.private)
        .unwrap();
    assert!(matches!(
        consensus.add(&BlsScheme, removal),
        Err(ConsensusError::NotAConflict { .. })
    ));
    assert!(!consensus.is_removed(&p.public));
}

#[test]
fn add_is_idempotent_on_appended_blocks() {
    let mut merit = Merit::new(ChainParams::dev_defaults());
    let mut consensus = Consensus::new();
    let first = append(&mut merit, &mut consensus, &[], 60);
    append(&mut merit, &mut consensus, &[], 120);

    let before = merit.clone();
    let outcome = merit
        .add(&BlsScheme, &NoTransactions, &mut consensus, first)
        .unwrap();
    assert_eq!(outcome, BlockOutcome::Duplicate);
    assert_eq!(merit, before);
}

#[test]
fn snapshot_round_trip_reproduces_state() {
    let p = keypair(3);
    let mut params = ChainParams::dev_defaults();
    params.retarget_period = 2;
    let mut merit = Merit::new(params.clone());
    let mut consensus = Consensus::new();

    for nonce in 0..4 {
        let v = verification(&p, nonce, merit.tip().hash());
        consensus.add(&BlsScheme, v).unwrap();
        append(&mut merit, &mut consensus, &[(p.public.clone(), nonce)], nonce + 1);
    }
    assert!(merit.difficulty() > params.initial_difficulty);

    let json = StateSnapshot::capture(&merit, &consensus).to_json().unwrap();
    let text = serde_json::to_string(&json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();

    let (restored_merit, restored_consensus) = StateSnapshot::from_json(&parsed)
        .unwrap()
        .restore(params)
        .unwrap();
    assert_eq!(restored_merit, merit);
    assert_eq!(restored_merit.difficulty(), merit.difficulty());
    assert_eq!(restored_consensus, consensus);
    assert_chain_well_formed(&restored_merit);
}

#[test]
fn snapshot_rejects_tampered_header() {
    let mut merit = Merit::new(ChainParams::dev_defaults());
    let mut consensus = Consensus::new();
    append(&mut merit, &mut consensus, &[], 60);

    let mut json = StateSnapshot::capture(&merit, &consensus).to_json().unwrap();
    json["blockchain"][1]["header"]["time"] = serde_json::json!(61);
    assert!(matches!(
        StateSnapshot::from_json(&json),
        Err(LedgerError::MalformedRecord(_))
    ));
}

#[test]
fn snapshot_rejects_unarchived_commitment() {
    let p = keypair(4);
    let mut merit = Merit::new(ChainParams::dev_defaults());
    let mut consensus = Consensus::new();
    consensus.add(&BlsScheme, verification(&p, 0, merit.tip().hash())).unwrap();
    append(&mut merit, &mut consensus, &[(p.public.clone(), 0)], 60);

    let mut json = StateSnapshot::capture(&merit, &consensus).to_json().unwrap();
    json["consensus"]["archived"] = serde_json::json!({});
    let err = StateSnapshot::from_json(&json)
        .unwrap()
        .restore(ChainParams::dev_defaults())
        .unwrap_err();
    assert!(matches!(err, LedgerError::MalformedRecord(_)));
}

#[test]
fn equivocation_after_finalization_survives_round_trip() {
    let p = keypair(5);
    let q = keypair(6);
    let params = ChainParams::dev_defaults();
    let mut merit = Merit::new(params.clone());
    let mut consensus = Consensus::new();
    let v1 = verification(&p, 0, merit.tip().hash());
    consensus.add(&BlsScheme, v1.clone()).unwrap();
    let block = append(&mut merit, &mut consensus, &[(p.public.clone(), 0)], 60);

    // P equivocates on the slot block 1 already finalized.
    let v2 = verification(&p, 0, Hash::new([0xEE; 32]));
    assert_eq!(consensus.add(&BlsScheme, v2.clone()).unwrap(), AddOutcome::PendingConflict);
    assert_eq!(consensus.archived_merkle(&p.public, 0), Some(block.body.records()[0].merkle));

    let removal = MeritRemoval::new(q.public.clone(), 0, v1.to_ref(), v2.to_ref())
        .sign(&BlsScheme, &q.private)
        .unwrap();
    consensus.add(&BlsScheme, removal).unwrap();
    append(&mut merit, &mut consensus, &[(q.public.clone(), 0)], 120);

    let json = StateSnapshot::capture(&merit, &consensus).to_json().unwrap();
    let (restored_merit, restored_consensus) = StateSnapshot::from_json(&json)
        .unwrap()
        .restore(params)
        .unwrap();
    assert_eq!(restored_merit, merit);
    assert_eq!(restored_consensus, consensus);
    assert!(restored_consensus.is_removed(&p.public));
}

#[test]
fn snapshot_rejects_slot_finalized_twice() {
    let p = keypair(7);
    let mut merit = Merit::new(ChainParams::dev_defaults());
    let mut consensus = Consensus::new();
    consensus.add(&BlsScheme, verification(&p, 0, merit.tip().hash())).unwrap();
    let first = append(&mut merit, &mut consensus, &[(p.public.clone(), 0)], 60);

    // A second block replaying the first one's body and aggregate.
    let header = BlockHeader::new(2, first.hash(), Timestamp::new(120), first.header.aggregate().clone());
    let header = mine(&header, merit.difficulty(), &WorkGenerator::new(2), &CancelToken::new()).unwrap();
    let repeat = Block::new(header, first.body.clone());
    let err = merit
        .clone()
        .add(&BlsScheme, &NoTransactions, &mut consensus.clone(), repeat.clone())
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidCommitment(_)));

    let mut snapshot = StateSnapshot::capture(&merit, &consensus);
    snapshot.blockchain.push(repeat);
    assert!(matches!(
        snapshot.restore(ChainParams::dev_defaults()),
        Err(LedgerError::MalformedRecord(_))
    ));
}

#[test]
fn snapshot_rejects_archive_without_block() {
    let p = keypair(8);
    let mut merit = Merit::new(ChainParams::dev_defaults());
    let mut consensus = Consensus::new();
    consensus.add(&BlsScheme, verification(&p, 0, merit.tip().hash())).unwrap();
    append(&mut merit, &mut consensus, &[], 60);

    let merkle = consensus.get_merkle(&p.public, 0).unwrap();
    consensus.archive(&p.public, 0, merkle);
    let snapshot = StateSnapshot::capture(&merit, &consensus);
    assert!(matches!(
        snapshot.restore(ChainParams::dev_defaults()),
        Err(LedgerError::MalformedRecord(_))
    ));
}

#[test]
fn snapshot_rejects_foreign_genesis() {
    let merit = Merit::new(ChainParams::dev_defaults());
    let snapshot = StateSnapshot::capture(&merit, &Consensus::new());
    let mut params = ChainParams::dev_defaults();
    params.network_id = NetworkId::test();
    assert!(matches!(
        snapshot.restore(params),
        Err(LedgerError::MalformedRecord(_))
    ));
}

#[test]
fn snapshot_rejects_empty_chain() {
    let snapshot = StateSnapshot {
        blockchain: Vec::new(),
        consensus: Consensus::new(),
    };
    assert!(matches!(
        snapshot.restore(ChainParams::dev_defaults()),
        Err(LedgerError::MalformedRecord(_))
    ));
}
