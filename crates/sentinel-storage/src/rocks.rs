//! RocksDB-backed base layer.
//!
//! Holds committed state only; there are no speculative branches on disk, so
//! every branch read resolves to the committed value. Nodes that evaluate
//! forks keep the overlays in memory (see [`crate::SnapshotDb`]) and use this
//! store for what has been confirmed.

use std::fmt;
use std::path::Path;

use rocksdb::{Direction, IteratorMode, WriteBatch, DB};
use sentinel_types::BlockHash;

use crate::store::{BaseBatch, BaseLayer, BatchOp, BranchRead, WalkVisitor};
use crate::StorageError;

pub struct RocksBaseDb {
    db: DB,
}

impl fmt::Debug for RocksBaseDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksBaseDb")
            .field("path", &self.db.path())
            .finish()
    }
}

impl RocksBaseDb {
    /// Open or create a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path).map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(Self { db })
    }
}

impl BranchRead for RocksBaseDb {
    fn get(&self, _branch: &BlockHash, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.get_base(key)
    }
}

impl BaseLayer for RocksBaseDb {
    fn get_base(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.db
            .get(key)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    fn put_base(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.db
            .put(key, value)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    fn del_base(&self, key: &[u8]) -> Result<(), StorageError> {
        self.db
            .delete(key)
            .map_err(|e| StorageError::Io(e.to_string()))
    }

    fn walk_base(&self, prefix: &[u8], visitor: &mut WalkVisitor<'_>) -> Result<(), StorageError> {
        let mut entries = Vec::new();
        for item in self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(|e| StorageError::Io(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key, value));
        }
        for (key, value) in &entries {
            visitor(key, value)?;
        }
        Ok(())
    }

    fn write_base(&self, batch: BaseBatch) -> Result<(), StorageError> {
        let mut write_batch = WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { key, value } => write_batch.put(key, value),
                BatchOp::Delete { key } => write_batch.delete(key),
            }
        }
        self.db
            .write(write_batch)
            .map_err(|e| StorageError::Io(e.to_string()))
    }
}
