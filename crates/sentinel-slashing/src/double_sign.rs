//! Double-sign evidence processing.
//!
//! Each penalized misbehavior leaves a record in the slashing contract's
//! state, keyed by `(address, block_number, evidence_type)` and holding the
//! hash of the transaction that applied the penalty. That record is the only
//! thing that stops the same evidence from being slashed twice.

use sentinel_storage::StateDb;
use sentinel_types::{Address, BlockHash, TxHash};
use tracing::{error, info};

use crate::config::SlashingConfig;
use crate::evidence::{Evidence, EvidenceDecoder, EvidenceType};
use crate::keys::duplicate_sign_key;
use crate::penalty::calc_slash_amount;
use crate::staking::{SlashReason, StakingLedger};
use crate::SlashingError;

/// Address of the slashing system contract.
pub const SLASHING_CONTRACT_ADDR: Address = Address([
    0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x04,
]);

/// Raw record left by a previous penalty. An empty slot counts as absent.
pub fn slash_record(
    state: &dyn StateDb,
    address: &Address,
    block_number: u64,
    evidence_type: EvidenceType,
) -> Option<Vec<u8>> {
    let key = duplicate_sign_key(address, block_number, evidence_type.code());
    state
        .get_state(&SLASHING_CONTRACT_ADDR, &key)
        .filter(|value| !value.is_empty())
}

fn put_slash_record(state: &mut dyn StateDb, evidence: &dyn Evidence) {
    let key = duplicate_sign_key(
        &evidence.address(),
        evidence.block_number(),
        evidence.evidence_type().code(),
    );
    let tx_hash = state.tx_hash();
    state.set_state(&SLASHING_CONTRACT_ADDR, &key, tx_hash.to_vec());
}

/// Whether a double sign has already been penalized, and by which
/// transaction.
///
/// A record that is not a 32-byte transaction hash is a `Codec` error here,
/// but still blocks a second penalty in [`process_evidence`].
pub fn check_duplicate_sign(
    state: &dyn StateDb,
    address: &Address,
    block_number: u64,
    evidence_type: EvidenceType,
) -> Result<(bool, Option<TxHash>), SlashingError> {
    match slash_record(state, address, block_number, evidence_type) {
        Some(value) => {
            let tx_hash = TxHash::from_slice(&value)?;
            info!(
                target: "slashing",
                block_number,
                address = %address,
                evidence_type = %evidence_type,
                tx_hash = %tx_hash,
                "duplicate sign already penalized"
            );
            Ok((true, Some(tx_hash)))
        }
        None => Ok((false, None)),
    }
}

/// Penalize a single piece of evidence.
fn slash_one(
    config: &SlashingConfig,
    ledger: &dyn StakingLedger,
    evidence: &dyn Evidence,
    branch: &BlockHash,
    block_number: u64,
    state: &mut dyn StateDb,
) -> Result<(), SlashingError> {
    evidence.validate().map_err(SlashingError::EvidenceInvalid)?;

    let address = evidence.address();
    let evidence_type = evidence.evidence_type();
    if slash_record(state, &address, evidence.block_number(), evidence_type).is_some() {
        error!(
            target: "slashing",
            block_number = evidence.block_number(),
            evidence_hash = %hex::encode(evidence.hash()),
            address = %address,
            evidence_type = %evidence_type,
            "misbehavior already penalized"
        );
        return Err(SlashingError::AlreadySlashed {
            address,
            block_number: evidence.block_number(),
            evidence_type,
        });
    }

    let candidate = ledger.candidate_by_address(branch, &address)?;
    let amount = calc_slash_amount(&candidate, config.duplicate_sign_low_slashing);
    if let Err(e) = ledger.slash(
        state,
        branch,
        block_number,
        &candidate.node_id,
        &amount,
        true,
        SlashReason::DoubleSign,
    ) {
        error!(
            target: "slashing",
            block_number,
            block_hash = %branch,
            node_id = %candidate.node_id,
            err = %e,
            "failed to slash double signer"
        );
        return Err(e.into());
    }

    put_slash_record(state, evidence);
    info!(
        target: "slashing",
        block_number,
        sign_block_number = evidence.block_number(),
        block_hash = %branch,
        node_id = %candidate.node_id,
        evidence_type = %evidence_type,
        amount = %amount,
        tx_hash = %state.tx_hash(),
        "slashed double signer"
    );
    Ok(())
}

/// Decode `data` and penalize every evidence in it, in order.
///
/// Stops at the first failing evidence. Evidences before it stay applied.
pub fn process_evidence(
    config: &SlashingConfig,
    ledger: &dyn StakingLedger,
    decoder: &dyn EvidenceDecoder,
    data: &str,
    branch: &BlockHash,
    block_number: u64,
    state: &mut dyn StateDb,
) -> Result<usize, SlashingError> {
    let evidences = decoder.decode(data).map_err(|e| {
        error!(target: "slashing", data, err = %e, "failed to decode evidence");
        SlashingError::EvidenceDecode(e)
    })?;

    for evidence in &evidences {
        slash_one(config, ledger, evidence.as_ref(), branch, block_number, state)?;
    }
    Ok(evidences.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_storage::MemoryStateDb;

    #[test]
    fn contract_address_layout() {
        assert_eq!(
            SLASHING_CONTRACT_ADDR.to_hex(),
            "1000000000000000000000000000000000000004"
        );
    }

    #[test]
    fn record_round_trip_through_state() {
        let mut state = MemoryStateDb::new();
        let address = Address([1; 20]);
        assert_eq!(
            check_duplicate_sign(&state, &address, 7, EvidenceType::DuplicateVote).unwrap(),
            (false, None)
        );

        state.set_tx_hash(TxHash([9; 32]));
        let key = duplicate_sign_key(&address, 7, EvidenceType::DuplicateVote.code());
        state.set_state(&SLASHING_CONTRACT_ADDR, &key, TxHash([9; 32]).to_vec());

        assert_eq!(
            check_duplicate_sign(&state, &address, 7, EvidenceType::DuplicateVote).unwrap(),
            (true, Some(TxHash([9; 32])))
        );
        // other kinds at the same height are independent
        assert_eq!(
            check_duplicate_sign(&state, &address, 7, EvidenceType::DuplicatePrepare).unwrap(),
            (false, None)
        );
    }

    #[test]
    fn short_record_still_counts_as_penalized() {
        let mut state = MemoryStateDb::new();
        let address = Address([1; 20]);
        let key = duplicate_sign_key(&address, 7, EvidenceType::DuplicateVote.code());
        state.set_state(&SLASHING_CONTRACT_ADDR, &key, vec![1, 2, 3]);

        assert_eq!(
            slash_record(&state, &address, 7, EvidenceType::DuplicateVote),
            Some(vec![1, 2, 3])
        );
        assert!(matches!(
            check_duplicate_sign(&state, &address, 7, EvidenceType::DuplicateVote),
            Err(SlashingError::Codec(_))
        ));

        state.set_state(&SLASHING_CONTRACT_ADDR, &key, Vec::new());
        assert_eq!(
            slash_record(&state, &address, 7, EvidenceType::DuplicateVote),
            None
        );
    }
}
