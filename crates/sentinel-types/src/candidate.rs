//! Stake snapshot of a validator candidate, as exposed by the staking ledger.

use malachite::Natural;

use crate::primitives::{Address, NodeId};

/// Read-only view of a candidate's staked value.
///
/// Amounts are arbitrary-precision; the staking ledger owns the record and is
/// the only component that mutates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub node_id: NodeId,
    pub staking_address: Address,
    /// Free (liquid) stake that is locked in.
    pub released: Natural,
    /// Free stake that is still pending (hesitating) for the current epoch.
    pub released_hes: Natural,
    /// Stake locked through a restricting plan.
    pub restricting_plan: Natural,
    /// Restricting-plan stake still pending for the current epoch.
    pub restricting_plan_hes: Natural,
}

impl Candidate {
    /// Candidate whose whole stake is liquid and locked in.
    pub fn with_released(node_id: NodeId, staking_address: Address, released: Natural) -> Self {
        Self {
            node_id,
            staking_address,
            released,
            released_hes: Natural::from(0u32),
            restricting_plan: Natural::from(0u32),
            restricting_plan_hes: Natural::from(0u32),
        }
    }

    /// Sum of all four stake components.
    pub fn total_stake(&self) -> Natural {
        let mut sum = self.released.clone();
        sum += &self.released_hes;
        sum += &self.restricting_plan;
        sum += &self.restricting_plan_hes;
        sum
    }
}
