use sentinel_types::BlockHash;

/// Error type for storage operations.
///
/// Backend-specific failures (RocksDB, lock poisoning) are flattened into
/// strings so callers do not depend on the backend crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// I/O or database error.
    #[error("storage I/O error: {0}")]
    Io(String),
    /// A branch-scoped write targeted a block hash with no open branch.
    #[error("unknown branch {0}")]
    UnknownBranch(BlockHash),
    /// A branch with this block hash is already open.
    #[error("branch {0} already exists")]
    BranchExists(BlockHash),
    /// Branches must be committed parent-first.
    #[error("branch {branch} cannot be committed before its parent {parent}")]
    ParentNotCommitted { branch: BlockHash, parent: BlockHash },
    /// Error raised by a walk visitor.
    #[error("walk aborted: {0}")]
    Visitor(String),
}
