//! Store traits.
//!
//! The snapshot store is split into two handles so that the difference
//! between speculative and committed writes is visible in the types:
//!
//! - [`BranchRead`]: reads as seen from a given branch tip. Uncommitted
//!   writes of that branch and its ancestors shadow the base layer.
//! - [`BaseLayer`]: the committed layer. Writes here are immediately visible
//!   to every branch and are never rolled back by fork resolution.
//!
//! Not found is `Ok(None)`, never an error.

use sentinel_types::BlockHash;

use crate::StorageError;

/// Branch-scoped read access.
pub trait BranchRead: Send + Sync {
    /// Read `key` as seen from the tip `branch`.
    ///
    /// A block hash without an open branch is treated as already committed
    /// and reads straight from the base layer.
    fn get(&self, branch: &BlockHash, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;
}

/// Visitor passed to [`BaseLayer::walk_base`].
pub type WalkVisitor<'a> = dyn FnMut(&[u8], &[u8]) -> Result<(), StorageError> + 'a;

/// Committed (non-branch) storage layer.
pub trait BaseLayer: Send + Sync {
    fn get_base(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    fn put_base(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    fn del_base(&self, key: &[u8]) -> Result<(), StorageError>;

    /// Visit every base entry whose key starts with `prefix`, in ascending
    /// key order.
    ///
    /// The visitor sees a point-in-time view taken when the walk starts;
    /// writes it performs do not change the entries it is handed. The first
    /// visitor error stops the walk and is returned.
    fn walk_base(&self, prefix: &[u8], visitor: &mut WalkVisitor<'_>) -> Result<(), StorageError>;

    /// Apply all operations of `batch` atomically.
    fn write_base(&self, batch: BaseBatch) -> Result<(), StorageError>;
}

/// Collect every base entry under `prefix`.
pub fn scan_prefix<B: BaseLayer + ?Sized>(
    base: &B,
    prefix: &[u8],
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
    let mut out = Vec::new();
    base.walk_base(prefix, &mut |k, v| {
        out.push((k.to_vec(), v.to_vec()));
        Ok(())
    })?;
    Ok(out)
}

/// A single write in a [`BaseBatch`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Ordered set of base-layer writes committed as one unit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BaseBatch {
    ops: Vec<BatchOp>,
}

impl BaseBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}
