//! Slashing plugin driven by the block lifecycle.
//!
//! The consensus engine calls, for every block on a branch:
//!
//! 1. [`ConsensusHook::begin_block`] before executing transactions,
//! 2. [`ConsensusHook::end_block`] after executing them,
//! 3. [`ConsensusHook::confirmed`] once the block is confirmed.
//!
//! A `false` result or an error rejects the block. Transactions reporting
//! evidence reach [`SlashingPlugin::slash`] from the execution layer.
//!
//! Per block number `n` within rounds of length `consensus_size`:
//!
//! | block                            | hook        | action                          |
//! |----------------------------------|-------------|---------------------------------|
//! | `n % size == 1 && n > 1`         | `confirmed` | rotate current into previous    |
//! | any                              | `confirmed` | count one block for the sealer  |
//! | election block, `n > size`       | `end_block` | penalize low production         |

use std::collections::BTreeMap;
use std::sync::Arc;

use sentinel_storage::StateDb;
use sentinel_types::{Address, Block, BlockHash, BlockHeader, NodeId, TxHash};
use tracing::{debug, error};

use crate::config::{ConfigError, SlashingConfig};
use crate::counter::RoundCounterStore;
use crate::double_sign::{check_duplicate_sign, process_evidence};
use crate::epoch::{switch_epoch, RotationStats};
use crate::evidence::{EvidenceDecoder, EvidenceType};
use crate::policy::{apply_low_production, AppliedPenalty};
use crate::signer::SignerRecovery;
use crate::staking::StakingLedger;
use crate::SlashingError;

/// Block lifecycle callbacks.
pub trait ConsensusHook: Send + Sync {
    fn begin_block(
        &self,
        branch: &BlockHash,
        header: &BlockHeader,
        state: &mut dyn StateDb,
    ) -> Result<bool, SlashingError>;

    fn end_block(
        &self,
        branch: &BlockHash,
        header: &BlockHeader,
        state: &mut dyn StateDb,
    ) -> Result<bool, SlashingError>;

    fn confirmed(&self, block: &Block) -> Result<(), SlashingError>;
}

/// Validator slashing.
///
/// Holds no global state; any number of instances can run side by side, each
/// over its own stores.
pub struct SlashingPlugin {
    config: SlashingConfig,
    counters: RoundCounterStore,
    ledger: Arc<dyn StakingLedger>,
    decoder: Box<dyn EvidenceDecoder>,
    signer: Box<dyn SignerRecovery>,
}

impl std::fmt::Debug for SlashingPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlashingPlugin")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SlashingPlugin {
    /// Build a plugin. `config` is validated first.
    pub fn new(
        config: SlashingConfig,
        counters: RoundCounterStore,
        ledger: Arc<dyn StakingLedger>,
        decoder: Box<dyn EvidenceDecoder>,
        signer: Box<dyn SignerRecovery>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            counters,
            ledger,
            decoder,
            signer,
        })
    }

    pub fn config(&self) -> &SlashingConfig {
        &self.config
    }

    pub fn counters(&self) -> &RoundCounterStore {
        &self.counters
    }

    /// Current-round count of the validator that sealed `header`.
    pub fn block_amount(
        &self,
        branch: &BlockHash,
        header: &BlockHeader,
    ) -> Result<u16, SlashingError> {
        let node_id = self.signer.recover(header)?;
        self.counters.get(branch, &node_id)
    }

    /// Counts of every validator that produced in the previous round.
    pub fn previous_amounts(&self) -> Result<BTreeMap<NodeId, u16>, SlashingError> {
        self.counters.list_previous()
    }

    /// Run the low production policy if `header` is an election block past
    /// the first round. Returns the penalties applied.
    pub fn punish_low_production(
        &self,
        branch: &BlockHash,
        header: &BlockHeader,
        state: &mut dyn StateDb,
    ) -> Result<Vec<AppliedPenalty>, SlashingError> {
        let number = header.number;
        if !self.config.is_election(number) || number <= self.config.consensus_size {
            return Ok(Vec::new());
        }
        debug!(
            target: "slashing",
            block_number = number,
            block_hash = %branch,
            consensus_size = self.config.consensus_size,
            election_distance = self.config.election_distance,
            "ranking block amount"
        );
        apply_low_production(
            &self.config,
            &self.counters,
            self.ledger.as_ref(),
            state,
            branch,
            number,
        )
    }

    /// Rotate if `block` opens a round, then count it for its sealer.
    ///
    /// Returns the rotation stats when a rotation happened.
    pub fn record_confirmed(&self, block: &Block) -> Result<Option<RotationStats>, SlashingError> {
        let number = block.number();
        let hash = block.hash();
        debug!(
            target: "slashing",
            block_number = number,
            block_hash = %hash,
            consensus_size = self.config.consensus_size,
            "block confirmed"
        );

        let mut rotation = None;
        if self.config.is_round_start(number) {
            match switch_epoch(&self.counters, &hash) {
                Ok(stats) => rotation = Some(stats),
                Err(e) => {
                    error!(
                        target: "slashing",
                        block_number = number,
                        block_hash = %hash,
                        err = %e,
                        "failed to switch epoch"
                    );
                    return Err(e);
                }
            }
        }

        let counted = self
            .signer
            .recover(block.header())
            .and_then(|node_id| self.counters.increment(&hash, &node_id));
        if let Err(e) = counted {
            error!(
                target: "slashing",
                block_number = number,
                block_hash = %hash,
                err = %e,
                "failed to set block amount"
            );
            return Err(e);
        }
        Ok(rotation)
    }

    /// Process a report-evidence payload submitted in a transaction.
    pub fn slash(
        &self,
        data: &str,
        branch: &BlockHash,
        block_number: u64,
        state: &mut dyn StateDb,
    ) -> Result<(), SlashingError> {
        process_evidence(
            &self.config,
            self.ledger.as_ref(),
            self.decoder.as_ref(),
            data,
            branch,
            block_number,
            state,
        )
        .map(|_| ())
    }

    /// Whether `(address, block_number, evidence_type)` was already
    /// penalized, and the transaction that did it.
    pub fn check_duplicate_sign(
        &self,
        address: &Address,
        block_number: u64,
        evidence_type: EvidenceType,
        state: &dyn StateDb,
    ) -> Result<(bool, Option<TxHash>), SlashingError> {
        check_duplicate_sign(state, address, block_number, evidence_type)
    }
}

impl ConsensusHook for SlashingPlugin {
    fn begin_block(
        &self,
        _branch: &BlockHash,
        _header: &BlockHeader,
        _state: &mut dyn StateDb,
    ) -> Result<bool, SlashingError> {
        Ok(true)
    }

    fn end_block(
        &self,
        branch: &BlockHash,
        header: &BlockHeader,
        state: &mut dyn StateDb,
    ) -> Result<bool, SlashingError> {
        self.punish_low_production(branch, header, state)?;
        Ok(true)
    }

    fn confirmed(&self, block: &Block) -> Result<(), SlashingError> {
        self.record_confirmed(block).map(|_| ())
    }
}
