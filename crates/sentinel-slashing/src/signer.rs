//! Block producer recovery.
//!
//! The producer seals a block by signing [`BlockHeader::seal_hash`] and
//! placing the 65-byte recoverable signature right after the vanity bytes of
//! `extra`. Turning that signature back into a [`NodeId`] needs the node's
//! signature scheme, so it sits behind [`SignerRecovery`].
//!
//! Double-sign evidence carries signatures over consensus messages. Those
//! are checked through [`SignatureVerifier`], for the same reason.

use sentinel_types::{Address, BlockHeader, NodeId, EXTRA_SEAL_LEN, EXTRA_VANITY_LEN};

use crate::SlashingError;

/// Recovers the identity of the validator that sealed a header.
pub trait SignerRecovery: Send + Sync {
    fn recover(&self, header: &BlockHeader) -> Result<NodeId, SlashingError>;
}

impl<F> SignerRecovery for F
where
    F: Fn(&BlockHeader) -> Result<NodeId, SlashingError> + Send + Sync,
{
    fn recover(&self, header: &BlockHeader) -> Result<NodeId, SlashingError> {
        self(header)
    }
}

/// Checks a consensus message signature against the staking address of the
/// validator that claims to have produced it.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, signer: &Address, digest: &[u8; 32], signature: &[u8]) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&Address, &[u8; 32], &[u8]) -> bool + Send + Sync,
{
    fn verify(&self, signer: &Address, digest: &[u8; 32], signature: &[u8]) -> bool {
        self(signer, digest, signature)
    }
}

/// The seal signature carried in `header.extra`.
pub fn seal_signature(header: &BlockHeader) -> Result<&[u8], SlashingError> {
    let end = EXTRA_VANITY_LEN + EXTRA_SEAL_LEN;
    header.extra.get(EXTRA_VANITY_LEN..end).ok_or_else(|| {
        SlashingError::SignerRecovery(format!(
            "extra too short for seal: {} < {}",
            header.extra.len(),
            end
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_follows_vanity() {
        let mut extra = vec![0u8; EXTRA_VANITY_LEN];
        extra.extend_from_slice(&[5u8; EXTRA_SEAL_LEN]);
        extra.extend_from_slice(b"tail");
        let header = BlockHeader {
            extra,
            ..Default::default()
        };
        assert_eq!(seal_signature(&header).unwrap(), &[5u8; EXTRA_SEAL_LEN][..]);
    }

    #[test]
    fn short_extra_is_an_error() {
        let header = BlockHeader {
            extra: vec![0u8; EXTRA_VANITY_LEN + 10],
            ..Default::default()
        };
        assert!(matches!(
            seal_signature(&header),
            Err(SlashingError::SignerRecovery(_))
        ));
    }

    #[test]
    fn closures_recover() {
        let recovery =
            |_: &BlockHeader| -> Result<NodeId, SlashingError> { Ok(NodeId([3; 64])) };
        assert_eq!(
            recovery.recover(&BlockHeader::default()).unwrap(),
            NodeId([3; 64])
        );
    }

    #[test]
    fn closures_verify() {
        let verifier =
            |signer: &Address, _: &[u8; 32], sig: &[u8]| sig == signer.as_bytes();
        assert!(verifier.verify(&Address([4; 20]), &[0; 32], &[4; 20]));
        assert!(!verifier.verify(&Address([4; 20]), &[0; 32], &[5; 20]));
    }
}
