//! Per-validator block production counters.
//!
//! Two windows are kept, distinguished by key prefix: `current` accumulates
//! blocks confirmed during the running round, `previous` holds the counts of
//! the last completed round until the next rotation (see [`crate::epoch`]).
//!
//! Reads go through the branch view; increments go to the base layer because
//! they happen on block confirmation, which is final for that branch.

use std::collections::BTreeMap;
use std::sync::Arc;

use sentinel_storage::{scan_prefix, BaseLayer, BranchRead};
use sentinel_types::{decode_u16, encode_u16, BlockHash, NodeId};
use tracing::{debug, error};

use crate::keys::{cur_key, node_id_from_key, PRE_ABNORMAL_PREFIX};
use crate::SlashingError;

/// Round counter store over a branch view and the committed base layer.
#[derive(Clone)]
pub struct RoundCounterStore {
    branch: Arc<dyn BranchRead>,
    base: Arc<dyn BaseLayer>,
}

impl std::fmt::Debug for RoundCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundCounterStore").finish()
    }
}

impl RoundCounterStore {
    pub fn new(branch: Arc<dyn BranchRead>, base: Arc<dyn BaseLayer>) -> Self {
        Self { branch, base }
    }

    pub(crate) fn base(&self) -> &dyn BaseLayer {
        self.base.as_ref()
    }

    /// Current-window count for `node_id` as seen from `branch`. Absent is 0.
    pub fn get(&self, branch: &BlockHash, node_id: &NodeId) -> Result<u16, SlashingError> {
        match self.branch.get(branch, &cur_key(node_id))? {
            Some(value) => Ok(decode_u16(&value)?),
            None => Ok(0),
        }
    }

    /// Add one confirmed block for `node_id` and return the new count.
    pub fn increment(&self, branch: &BlockHash, node_id: &NodeId) -> Result<u16, SlashingError> {
        // Saturates at u16::MAX.
        let value = self.get(branch, node_id)?.saturating_add(1);
        self.base.put_base(&cur_key(node_id), &encode_u16(value))?;
        debug!(
            target: "slashing",
            block_hash = %branch,
            node_id = %node_id,
            value,
            "incremented block amount"
        );
        Ok(value)
    }

    /// All previous-window counts.
    ///
    /// Ordered by key, which says nothing about production order.
    pub fn list_previous(&self) -> Result<BTreeMap<NodeId, u16>, SlashingError> {
        let mut result = BTreeMap::new();
        for (key, value) in scan_prefix(self.base.as_ref(), PRE_ABNORMAL_PREFIX)? {
            let amount = decode_u16(&value).map_err(|e| {
                error!(
                    target: "slashing",
                    key = %hex::encode(&key),
                    value = %hex::encode(&value),
                    err = %e,
                    "failed to decode previous round block amount"
                );
                e
            })?;
            let node_id = node_id_from_key(PRE_ABNORMAL_PREFIX, &key)?;
            debug!(
                target: "slashing",
                node_id = %node_id,
                amount,
                "previous round block amount"
            );
            result.insert(node_id, amount);
        }
        Ok(result)
    }
}
