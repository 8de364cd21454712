//! Persisted key layouts.
//!
//! These are consensus-visible and must not change:
//!
//! ```text
//! current round count   "SlashCb" || node_id (64 bytes)
//! previous round count  "SlashPb" || node_id (64 bytes)
//! double-sign record    address (20 bytes) || be_u64(block_number) || "_" || be_u64(evidence_type)
//! ```

use sentinel_types::{put_u64_be, Address, CodecError, NodeId};

/// Prefix of current-round production counters.
pub const CUR_ABNORMAL_PREFIX: &[u8] = b"SlashCb";

/// Prefix of previous-round production counters.
pub const PRE_ABNORMAL_PREFIX: &[u8] = b"SlashPb";

fn prefixed(prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + suffix.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(suffix);
    key
}

pub fn cur_key(node_id: &NodeId) -> Vec<u8> {
    prefixed(CUR_ABNORMAL_PREFIX, node_id.as_bytes())
}

pub fn pre_key(node_id: &NodeId) -> Vec<u8> {
    prefixed(PRE_ABNORMAL_PREFIX, node_id.as_bytes())
}

/// Re-key a current-round entry into the previous-round namespace, keeping
/// the suffix byte-for-byte.
pub fn cur_to_pre_key(cur: &[u8]) -> Option<Vec<u8>> {
    cur.strip_prefix(CUR_ABNORMAL_PREFIX)
        .map(|suffix| prefixed(PRE_ABNORMAL_PREFIX, suffix))
}

/// Extract the node id from a counter key carrying `prefix`.
pub fn node_id_from_key(prefix: &[u8], key: &[u8]) -> Result<NodeId, CodecError> {
    let suffix = key
        .strip_prefix(prefix)
        .ok_or(CodecError::InvalidValue("counter key prefix mismatch"))?;
    NodeId::from_slice(suffix)
}

/// Key of the record sealing a penalized double-sign.
pub fn duplicate_sign_key(address: &Address, block_number: u64, evidence_type: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN + 8 + 1 + 8);
    key.extend_from_slice(address.as_bytes());
    put_u64_be(&mut key, block_number);
    key.push(b'_');
    put_u64_be(&mut key, evidence_type);
    key
}
