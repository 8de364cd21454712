//! Epoch rotation of the production counters.
//!
//! Runs on the first block of every round after the first. The previous
//! window has already been consumed by the low-production policy at the last
//! election block, so it is dropped; the current window then becomes the
//! previous one and a fresh current window starts empty.
//!
//! All deletes and re-inserts go into a single [`BaseBatch`], so a crash can
//! never leave both windows populated or both empty.

use sentinel_storage::{scan_prefix, BaseBatch};
use sentinel_types::BlockHash;
use tracing::{debug, info};

use crate::counter::RoundCounterStore;
use crate::keys::{cur_to_pre_key, CUR_ABNORMAL_PREFIX, PRE_ABNORMAL_PREFIX};
use crate::SlashingError;

/// Entries touched by a rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RotationStats {
    /// Previous-window entries dropped.
    pub pre_count: usize,
    /// Current-window entries moved to the previous window.
    pub cur_count: usize,
}

/// Rotate current counts into the previous window.
pub fn switch_epoch(
    counters: &RoundCounterStore,
    block_hash: &BlockHash,
) -> Result<RotationStats, SlashingError> {
    debug!(target: "slashing", block_hash = %block_hash, "switching epoch");

    let base = counters.base();
    let previous = scan_prefix(base, PRE_ABNORMAL_PREFIX)?;
    let current = scan_prefix(base, CUR_ABNORMAL_PREFIX)?;

    let mut batch = BaseBatch::new();
    for (key, _) in &previous {
        batch.delete(key.clone());
    }
    let mut stats = RotationStats {
        pre_count: previous.len(),
        cur_count: 0,
    };
    for (key, value) in current {
        // Every key under the current prefix has a previous twin.
        if let Some(pre) = cur_to_pre_key(&key) {
            batch.delete(key);
            batch.put(pre, value);
            stats.cur_count += 1;
        }
    }
    base.write_base(batch)?;

    info!(
        target: "slashing",
        block_hash = %block_hash,
        pre_count = stats.pre_count,
        cur_count = stats.cur_count,
        "switched epoch"
    );
    Ok(stats)
}
