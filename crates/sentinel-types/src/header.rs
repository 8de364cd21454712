//! Minimal block header and block.
//!
//! Only the fields the slashing logic and its collaborators need are kept.
//! The producer's signature lives in `extra`:
//!
//! ```text
//! extra = vanity (32 bytes) || seal signature (65 bytes) || optional tail
//! ```
//!
//! The seal hash covers everything except the signature, so the signer can be
//! recovered from `(seal_hash, extra[32..97])`.

use sha3::{Digest, Keccak256};

use crate::codec::put_u64_be;
use crate::primitives::{Address, BlockHash};

/// Bytes of free-form vanity data at the start of `extra`.
pub const EXTRA_VANITY_LEN: usize = 32;

/// Bytes of the recoverable seal signature following the vanity.
pub const EXTRA_SEAL_LEN: usize = 65;

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub parent_hash: BlockHash,
    pub number: u64,
    pub coinbase: Address,
    pub timestamp: u64,
    pub extra: Vec<u8>,
}

impl BlockHeader {
    fn preimage(&self, extra: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + 8 + 20 + 8 + extra.len());
        out.extend_from_slice(self.parent_hash.as_bytes());
        put_u64_be(&mut out, self.number);
        out.extend_from_slice(self.coinbase.as_bytes());
        put_u64_be(&mut out, self.timestamp);
        out.extend_from_slice(extra);
        out
    }

    /// Hash signed by the block producer: the header with only the vanity
    /// part of `extra`.
    pub fn seal_hash(&self) -> BlockHash {
        let vanity_end = self.extra.len().min(EXTRA_VANITY_LEN);
        BlockHash(keccak256(&self.preimage(&self.extra[..vanity_end])))
    }

    /// Full header hash, including the seal.
    pub fn hash(&self) -> BlockHash {
        BlockHash(keccak256(&self.preimage(&self.extra)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Block {
    pub header: BlockHeader,
}

impl Block {
    pub fn new(header: BlockHeader) -> Self {
        Self { header }
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }
}
