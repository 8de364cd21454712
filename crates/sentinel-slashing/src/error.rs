use sentinel_storage::StorageError;
use sentinel_types::{Address, CodecError};

use crate::evidence::{EvidenceError, EvidenceType};
use crate::staking::StakingError;

/// Error type for the slashing subsystem.
///
/// Two classes exist:
///
/// - business errors ([`SlashingError::is_business`]): the submitted evidence
///   was rejected. They are reported back to the submitter and leave state
///   untouched.
/// - everything else is fatal to the block being processed; the consensus
///   engine must reject that block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlashingError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("corrupt slashing record: {0}")]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Staking(#[from] StakingError),

    #[error("failed to recover block signer: {0}")]
    SignerRecovery(String),

    #[error("failed to decode evidence: {0}")]
    EvidenceDecode(EvidenceError),

    #[error("evidence verification failed: {0}")]
    EvidenceInvalid(EvidenceError),

    #[error(
        "misbehavior already penalized: address={address}, block_number={block_number}, type={evidence_type}"
    )]
    AlreadySlashed {
        address: Address,
        block_number: u64,
        evidence_type: EvidenceType,
    },
}

impl SlashingError {
    /// Recoverable, submitter-facing rejection rather than a block fault.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            SlashingError::AlreadySlashed { .. } | SlashingError::EvidenceInvalid(_)
        )
    }
}
