//! In-memory snapshot store with per-branch overlays.
//!
//! Layout:
//!
//! ```text
//! base (committed)  <-  branch A (parent = committed hash)
//!                          <-  branch B (parent = A)
//!                   <-  branch A' (competing fork)
//! ```
//!
//! Each open branch holds only its own uncommitted writes. A read from a tip
//! walks the overlay chain towards the base and stops at the first layer that
//! mentions the key (a tombstone counts as "mentioned, absent").
//!
//! Committing a branch flushes its overlay into the base layer and drops the
//! competing siblings together with their descendants.
//!
//! Lock order is always `branches` before `base`.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use sentinel_types::BlockHash;
use tracing::debug;

use crate::store::{BaseBatch, BaseLayer, BatchOp, BranchRead, WalkVisitor};
use crate::StorageError;

#[derive(Debug, Default)]
struct BranchLayer {
    parent: BlockHash,
    number: u64,
    /// `None` is a tombstone.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

/// In-memory implementation of [`BranchRead`] and [`BaseLayer`].
#[derive(Debug, Default)]
pub struct SnapshotDb {
    branches: RwLock<HashMap<BlockHash, BranchLayer>>,
    base: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl SnapshotDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a speculative branch for block `hash` on top of `parent`.
    ///
    /// `parent` is either another open branch or an already committed block.
    pub fn new_branch(
        &self,
        number: u64,
        parent: BlockHash,
        hash: BlockHash,
    ) -> Result<(), StorageError> {
        let mut branches = self.branches.write();
        if branches.contains_key(&hash) {
            return Err(StorageError::BranchExists(hash));
        }
        branches.insert(
            hash,
            BranchLayer {
                parent,
                number,
                writes: BTreeMap::new(),
            },
        );
        debug!(target: "storage", number, hash = %hash, parent = %parent, "opened branch");
        Ok(())
    }

    /// Write visible only to `branch` and its descendants.
    pub fn put(&self, branch: &BlockHash, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut branches = self.branches.write();
        let layer = branches
            .get_mut(branch)
            .ok_or(StorageError::UnknownBranch(*branch))?;
        layer.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    /// Delete visible only to `branch` and its descendants.
    pub fn del(&self, branch: &BlockHash, key: &[u8]) -> Result<(), StorageError> {
        let mut branches = self.branches.write();
        let layer = branches
            .get_mut(branch)
            .ok_or(StorageError::UnknownBranch(*branch))?;
        layer.writes.insert(key.to_vec(), None);
        Ok(())
    }

    /// Flush `branch` into the base layer and drop its competing siblings.
    ///
    /// The parent must already be committed.
    pub fn commit(&self, branch: &BlockHash) -> Result<(), StorageError> {
        let mut branches = self.branches.write();
        let parent = match branches.get(branch) {
            Some(layer) => layer.parent,
            None => return Err(StorageError::UnknownBranch(*branch)),
        };
        if branches.contains_key(&parent) {
            return Err(StorageError::ParentNotCommitted {
                branch: *branch,
                parent,
            });
        }

        let layer = branches
            .remove(branch)
            .ok_or(StorageError::UnknownBranch(*branch))?;
        {
            let mut base = self.base.write();
            for (key, value) in layer.writes {
                match value {
                    Some(v) => {
                        base.insert(key, v);
                    }
                    None => {
                        base.remove(&key);
                    }
                }
            }
        }

        let siblings: Vec<BlockHash> = branches
            .iter()
            .filter(|(_, l)| l.parent == parent)
            .map(|(h, _)| *h)
            .collect();
        for sibling in &siblings {
            Self::discard_locked(&mut branches, sibling);
        }

        debug!(
            target: "storage",
            number = layer.number,
            hash = %branch,
            dropped_forks = siblings.len(),
            "committed branch"
        );
        Ok(())
    }

    /// Drop `branch` and every branch built on top of it.
    pub fn discard(&self, branch: &BlockHash) {
        let mut branches = self.branches.write();
        Self::discard_locked(&mut branches, branch);
    }

    fn discard_locked(branches: &mut HashMap<BlockHash, BranchLayer>, branch: &BlockHash) {
        let mut pending = vec![*branch];
        while let Some(hash) = pending.pop() {
            if branches.remove(&hash).is_some() {
                pending.extend(
                    branches
                        .iter()
                        .filter(|(_, l)| l.parent == hash)
                        .map(|(h, _)| *h),
                );
            }
        }
    }

    /// Number of open (uncommitted) branches.
    pub fn open_branches(&self) -> usize {
        self.branches.read().len()
    }
}

impl BranchRead for SnapshotDb {
    fn get(&self, branch: &BlockHash, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let branches = self.branches.read();
        let mut cursor = *branch;
        while let Some(layer) = branches.get(&cursor) {
            if let Some(value) = layer.writes.get(key) {
                return Ok(value.clone());
            }
            cursor = layer.parent;
        }
        Ok(self.base.read().get(key).cloned())
    }
}

impl BaseLayer for SnapshotDb {
    fn get_base(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.base.read().get(key).cloned())
    }

    fn put_base(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.base.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn del_base(&self, key: &[u8]) -> Result<(), StorageError> {
        self.base.write().remove(key);
        Ok(())
    }

    fn walk_base(&self, prefix: &[u8], visitor: &mut WalkVisitor<'_>) -> Result<(), StorageError> {
        let entries: Vec<(Vec<u8>, Vec<u8>)> = {
            let base = self.base.read();
            base.range(prefix.to_vec()..)
                .take_while(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        for (key, value) in &entries {
            visitor(key, value)?;
        }
        Ok(())
    }

    fn write_base(&self, batch: BaseBatch) -> Result<(), StorageError> {
        let mut base = self.base.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => {
                    base.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    base.remove(&key);
                }
            }
        }
        Ok(())
    }
}
