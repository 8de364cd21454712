//! Validator slashing.
//!
//! Detects and penalizes two kinds of validator misbehavior:
//!
//! - low block production: per-round production counters ([`counter`]) are
//!   rotated at every round boundary ([`epoch`]) and judged at the next
//!   election block ([`policy`]);
//! - double signing: evidence submitted in a transaction is verified,
//!   deduplicated and penalized ([`double_sign`], [`evidence`]).
//!
//! Penalty amounts come from [`penalty`]. Stake accounting and validator
//! membership stay with the staking ledger behind [`StakingLedger`].
//! [`SlashingPlugin`] ties everything to the block lifecycle.

pub mod config;
pub mod counter;
pub mod double_sign;
pub mod epoch;
pub mod error;
pub mod evidence;
pub mod keys;
pub mod penalty;
pub mod plugin;
pub mod policy;
pub mod signer;
pub mod staking;

pub use config::{ConfigError, SlashingConfig};
pub use counter::RoundCounterStore;
pub use double_sign::{
    check_duplicate_sign, process_evidence, slash_record, SLASHING_CONTRACT_ADDR,
};
pub use epoch::{switch_epoch, RotationStats};
pub use error::SlashingError;
pub use evidence::{
    DuplicateSignEvidence, Evidence, EvidenceDecoder, EvidenceError, EvidenceType,
    JsonEvidenceDecoder, SignedMessage,
};
pub use penalty::{calc_penalty, calc_slash_amount};
pub use plugin::{ConsensusHook, SlashingPlugin};
pub use policy::{
    apply_low_production, classify, is_abnormal, AppliedPenalty, PenaltyDecision, PenaltyTier,
};
pub use signer::{seal_signature, SignatureVerifier, SignerRecovery};
pub use staking::{
    InMemoryStakingLedger, LedgerSlashRecord, SlashReason, StakingError, StakingLedger,
};
