//! Storage layer for the slashing subsystem.
//!
//! - [`store`]: `BranchRead` / `BaseLayer` traits and the atomic `BaseBatch`
//! - [`memory`]: in-memory snapshot store with per-branch overlays
//! - [`rocks`]: RocksDB-backed committed layer
//! - [`state`]: contract-scoped transaction state

pub mod error;
pub mod memory;
pub mod rocks;
pub mod state;
pub mod store;

pub use error::StorageError;
pub use memory::SnapshotDb;
pub use rocks::RocksBaseDb;
pub use state::{MemoryStateDb, StateDb};
pub use store::{scan_prefix, BaseBatch, BaseLayer, BatchOp, BranchRead, WalkVisitor};
