//! Staking ledger seam.
//!
//! The slashing logic only decides whether and how much to penalize. Stake
//! balances, the active validator set and the actual balance mutation belong
//! to the staking ledger behind [`StakingLedger`].

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;
use sentinel_storage::StateDb;
use sentinel_types::{Address, BlockHash, Candidate, Natural, NodeId};
use tracing::info;

/// Why a validator is being slashed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlashReason {
    /// Produced too few blocks in the previous round.
    LowRatio,
    /// Signed two conflicting messages at the same height.
    DoubleSign,
}

impl SlashReason {
    /// Stable tag handed to the ledger.
    pub fn as_str(&self) -> &'static str {
        match self {
            SlashReason::LowRatio => "low-performance",
            SlashReason::DoubleSign => "double-sign",
        }
    }
}

impl fmt::Display for SlashReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for staking ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StakingError {
    #[error("no candidate with staking address {0}")]
    CandidateNotFound(Address),
    #[error("no candidate with node id {0}")]
    NodeNotFound(NodeId),
    #[error("staking ledger error: {0}")]
    Ledger(String),
}

/// Validator registry and stake ledger.
pub trait StakingLedger: Send + Sync {
    /// Validators active for the round containing `height`, as seen from
    /// `branch`.
    fn active_validators(
        &self,
        branch: &BlockHash,
        height: u64,
    ) -> Result<Vec<Candidate>, StakingError>;

    /// Candidate registered under `address`.
    fn candidate_by_address(
        &self,
        branch: &BlockHash,
        address: &Address,
    ) -> Result<Candidate, StakingError>;

    /// Burn `amount` of the candidate's stake and optionally remove it from
    /// the active set.
    #[allow(clippy::too_many_arguments)]
    fn slash(
        &self,
        state: &mut dyn StateDb,
        branch: &BlockHash,
        height: u64,
        node_id: &NodeId,
        amount: &Natural,
        remove: bool,
        reason: SlashReason,
    ) -> Result<(), StakingError>;
}

// ============================================================================
// In-memory ledger
// ============================================================================

/// A slash applied by [`InMemoryStakingLedger`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSlashRecord {
    pub node_id: NodeId,
    pub height: u64,
    pub requested: Natural,
    pub burned: Natural,
    pub removed: bool,
    pub reason: SlashReason,
}

#[derive(Debug, Default)]
struct LedgerInner {
    candidates: BTreeMap<NodeId, Candidate>,
    /// Active set in registration order.
    active: Vec<NodeId>,
    records: Vec<LedgerSlashRecord>,
    slash_failure: Option<String>,
}

/// In-memory [`StakingLedger`] used by tests and local tooling.
///
/// Branches are ignored: every branch sees the same ledger.
#[derive(Debug, Default)]
pub struct InMemoryStakingLedger {
    inner: RwLock<LedgerInner>,
}

/// Take up to `*remaining` out of `component`.
fn burn_from(component: &mut Natural, remaining: &mut Natural) {
    if *component >= *remaining {
        *component -= &*remaining;
        *remaining = Natural::from(0u32);
    } else {
        *remaining -= &*component;
        *component = Natural::from(0u32);
    }
}

impl InMemoryStakingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger where every given candidate is active.
    pub fn with_candidates(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        let ledger = Self::new();
        for c in candidates {
            ledger.add_candidate(c, true);
        }
        ledger
    }

    pub fn add_candidate(&self, candidate: Candidate, active: bool) {
        let mut inner = self.inner.write();
        let node_id = candidate.node_id;
        inner.candidates.insert(node_id, candidate);
        if active && !inner.active.contains(&node_id) {
            inner.active.push(node_id);
        }
    }

    pub fn candidate(&self, node_id: &NodeId) -> Option<Candidate> {
        self.inner.read().candidates.get(node_id).cloned()
    }

    pub fn is_active(&self, node_id: &NodeId) -> bool {
        self.inner.read().active.contains(node_id)
    }

    pub fn slash_records(&self) -> Vec<LedgerSlashRecord> {
        self.inner.read().records.clone()
    }

    /// Make every following `slash` call fail with `message`; `None` restores
    /// normal behavior.
    pub fn inject_slash_failure(&self, message: Option<String>) {
        self.inner.write().slash_failure = message;
    }
}

impl StakingLedger for InMemoryStakingLedger {
    fn active_validators(
        &self,
        _branch: &BlockHash,
        _height: u64,
    ) -> Result<Vec<Candidate>, StakingError> {
        let inner = self.inner.read();
        inner
            .active
            .iter()
            .map(|id| {
                inner
                    .candidates
                    .get(id)
                    .cloned()
                    .ok_or(StakingError::NodeNotFound(*id))
            })
            .collect()
    }

    fn candidate_by_address(
        &self,
        _branch: &BlockHash,
        address: &Address,
    ) -> Result<Candidate, StakingError> {
        self.inner
            .read()
            .candidates
            .values()
            .find(|c| c.staking_address == *address)
            .cloned()
            .ok_or(StakingError::CandidateNotFound(*address))
    }

    fn slash(
        &self,
        _state: &mut dyn StateDb,
        _branch: &BlockHash,
        height: u64,
        node_id: &NodeId,
        amount: &Natural,
        remove: bool,
        reason: SlashReason,
    ) -> Result<(), StakingError> {
        let mut inner = self.inner.write();
        if let Some(message) = &inner.slash_failure {
            return Err(StakingError::Ledger(message.clone()));
        }

        let candidate = inner
            .candidates
            .get_mut(node_id)
            .ok_or(StakingError::NodeNotFound(*node_id))?;

        // Pending stake goes first, then locked stake.
        let mut remaining = amount.clone();
        burn_from(&mut candidate.released_hes, &mut remaining);
        burn_from(&mut candidate.released, &mut remaining);
        burn_from(&mut candidate.restricting_plan_hes, &mut remaining);
        burn_from(&mut candidate.restricting_plan, &mut remaining);
        let burned = amount - &remaining;

        if remove {
            inner.active.retain(|id| id != node_id);
        }

        info!(
            target: "staking",
            height,
            node_id = %node_id,
            amount = %amount,
            burned = %burned,
            remove,
            reason = %reason,
            "slashed candidate"
        );

        inner.records.push(LedgerSlashRecord {
            node_id: *node_id,
            height,
            requested: amount.clone(),
            burned,
            removed: remove,
            reason,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_storage::MemoryStateDb;

    fn candidate(b: u8, released: u32, hes: u32) -> Candidate {
        Candidate {
            node_id: NodeId([b; 64]),
            staking_address: Address([b; 20]),
            released: Natural::from(released),
            released_hes: Natural::from(hes),
            restricting_plan: Natural::from(0u32),
            restricting_plan_hes: Natural::from(0u32),
        }
    }

    #[test]
    fn slash_burns_pending_stake_first() {
        let ledger = InMemoryStakingLedger::with_candidates([candidate(1, 100, 30)]);
        let mut state = MemoryStateDb::new();
        ledger
            .slash(
                &mut state,
                &BlockHash::zero(),
                10,
                &NodeId([1; 64]),
                &Natural::from(50u32),
                false,
                SlashReason::LowRatio,
            )
            .unwrap();

        let c = ledger.candidate(&NodeId([1; 64])).unwrap();
        assert_eq!(c.released_hes, Natural::from(0u32));
        assert_eq!(c.released, Natural::from(80u32));
        assert!(ledger.is_active(&NodeId([1; 64])));
    }

    #[test]
    fn slash_saturates_at_total_stake_and_removes() {
        let ledger = InMemoryStakingLedger::with_candidates([candidate(2, 10, 0)]);
        let mut state = MemoryStateDb::new();
        ledger
            .slash(
                &mut state,
                &BlockHash::zero(),
                10,
                &NodeId([2; 64]),
                &Natural::from(25u32),
                true,
                SlashReason::DoubleSign,
            )
            .unwrap();

        let records = ledger.slash_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].burned, Natural::from(10u32));
        assert!(!ledger.is_active(&NodeId([2; 64])));
    }

    #[test]
    fn lookup_by_unknown_address_fails() {
        let ledger = InMemoryStakingLedger::new();
        assert_eq!(
            ledger.candidate_by_address(&BlockHash::zero(), &Address([9; 20])),
            Err(StakingError::CandidateNotFound(Address([9; 20])))
        );
    }
}
