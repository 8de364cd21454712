//! Low block production policy.
//!
//! Evaluated at the election block of every round after the first, against
//! the counts of the previous round. A validator is abnormal when it produced
//! fewer than `consensus_size / validator_count` blocks. Abnormal validators
//! fall into one of two tiers:
//!
//! ```text
//! count <= high            severe: block_amount_high_slashing, removed
//! high < count <= low      mild:   block_amount_low_slashing, kept
//! ```
//!
//! A validator with no count at all produced nothing during the whole round
//! and is charged the severe rate without being removed.

use std::collections::BTreeMap;

use sentinel_storage::StateDb;
use sentinel_types::{BlockHash, Natural, NodeId};
use tracing::{debug, error};

use crate::config::SlashingConfig;
use crate::counter::RoundCounterStore;
use crate::penalty::calc_slash_amount;
use crate::staking::{SlashReason, StakingLedger};
use crate::SlashingError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PenaltyTier {
    Mild,
    Severe,
}

/// Outcome of classifying one validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PenaltyDecision {
    pub tier: PenaltyTier,
    /// Divisor applied to the candidate's total stake.
    pub rate: u64,
    /// Whether the ledger should drop the validator from the active set.
    pub remove: bool,
}

/// A penalty that was handed to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedPenalty {
    pub node_id: NodeId,
    pub count: Option<u16>,
    pub decision: PenaltyDecision,
    pub amount: Natural,
}

/// Whether `count` blocks fall short of a fair share of the round.
pub fn is_abnormal(count: u16, config: &SlashingConfig) -> bool {
    u64::from(count) < config.expected_blocks_per_validator()
}

/// Decide the penalty for a validator that produced `count` blocks in the
/// previous round, `None` meaning it has no entry.
pub fn classify(count: Option<u16>, config: &SlashingConfig) -> Option<PenaltyDecision> {
    let count = match count {
        Some(count) => count,
        None => {
            return Some(PenaltyDecision {
                tier: PenaltyTier::Severe,
                rate: config.block_amount_high_slashing,
                remove: false,
            })
        }
    };

    if !is_abnormal(count, config) {
        return None;
    }
    // `low` is the larger threshold and selects the milder tier.
    if count <= config.block_amount_low && count > config.block_amount_high {
        Some(PenaltyDecision {
            tier: PenaltyTier::Mild,
            rate: config.block_amount_low_slashing,
            remove: false,
        })
    } else if count <= config.block_amount_high {
        Some(PenaltyDecision {
            tier: PenaltyTier::Severe,
            rate: config.block_amount_high_slashing,
            remove: true,
        })
    } else {
        None
    }
}

/// Penalize every active validator that under-produced in the previous
/// round.
///
/// The first ledger failure aborts the run; penalties already handed to the
/// ledger are not undone here since the block itself is rejected.
pub fn apply_low_production(
    config: &SlashingConfig,
    counters: &RoundCounterStore,
    ledger: &dyn StakingLedger,
    state: &mut dyn StateDb,
    branch: &BlockHash,
    height: u64,
) -> Result<Vec<AppliedPenalty>, SlashingError> {
    let previous: BTreeMap<NodeId, u16> = counters.list_previous()?;
    let validators = ledger.active_validators(branch, height)?;

    let mut applied = Vec::new();
    for validator in validators {
        let node_id = validator.node_id;
        let count = previous.get(&node_id).copied();
        if let Some(amount) = count {
            debug!(
                target: "slashing",
                block_number = height,
                block_hash = %branch,
                node_id = %node_id,
                amount,
                "previous round block amount"
            );
        }

        let Some(decision) = classify(count, config) else {
            continue;
        };
        debug!(
            target: "slashing",
            block_number = height,
            block_hash = %branch,
            node_id = %node_id,
            tier = ?decision.tier,
            rate = decision.rate,
            remove = decision.remove,
            "slashing anomalous node"
        );

        let amount = calc_slash_amount(&validator, decision.rate);
        if let Err(e) = ledger.slash(
            state,
            branch,
            height,
            &node_id,
            &amount,
            decision.remove,
            SlashReason::LowRatio,
        ) {
            error!(
                target: "slashing",
                block_number = height,
                block_hash = %branch,
                node_id = %node_id,
                err = %e,
                "failed to slash low producing node"
            );
            return Err(e.into());
        }

        applied.push(AppliedPenalty {
            node_id,
            count,
            decision,
            amount,
        });
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_tiers() {
        let c = SlashingConfig::mainnet();
        // fair share is 250 / 25 = 10
        assert_eq!(classify(Some(10), &c), None);
        assert_eq!(classify(Some(9), &c), None);
        assert_eq!(
            classify(Some(8), &c).map(|d| d.tier),
            Some(PenaltyTier::Mild)
        );
        assert_eq!(
            classify(Some(6), &c).map(|d| d.tier),
            Some(PenaltyTier::Mild)
        );
        assert_eq!(
            classify(Some(5), &c),
            Some(PenaltyDecision {
                tier: PenaltyTier::Severe,
                rate: 20,
                remove: true,
            })
        );
        assert_eq!(
            classify(Some(0), &c).map(|d| d.tier),
            Some(PenaltyTier::Severe)
        );
    }

    #[test]
    fn absent_is_severe_rate() {
        let c = SlashingConfig::mainnet();
        let d = classify(None, &c).unwrap();
        assert_eq!(d.tier, PenaltyTier::Severe);
        assert_eq!(d.rate, c.block_amount_high_slashing);
    }

    #[test]
    fn abnormal_boundary() {
        let c = SlashingConfig::mainnet();
        assert!(!is_abnormal(10, &c));
        assert!(is_abnormal(9, &c));
    }
}
