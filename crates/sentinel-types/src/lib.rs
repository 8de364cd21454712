//! Core primitives shared by the sentinel crates.
//!
//! - [`primitives`]: fixed-width identifiers (`NodeId`, `Address`, `BlockHash`, `TxHash`)
//! - [`header`]: block header / block with seal layout helpers
//! - [`candidate`]: stake snapshot of a validator candidate
//! - [`codec`]: canonical counter encoding and big-endian helpers

pub mod candidate;
pub mod codec;
pub mod header;
pub mod primitives;

pub use candidate::Candidate;
pub use codec::{decode_u16, encode_u16, put_u64_be, CodecError};
pub use header::{keccak256, Block, BlockHeader, EXTRA_SEAL_LEN, EXTRA_VANITY_LEN};
pub use primitives::{Address, BlockHash, NodeId, TxHash, ADDRESS_LEN, HASH_LEN, NODE_ID_LEN};

/// Arbitrary-precision stake amount.
pub use malachite::Natural;
