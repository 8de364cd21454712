//! Slashing parameters.
//!
//! These are chain-wide constants: every node must run with the same values
//! or the nodes will disagree on who is penalized. They are loaded once at
//! startup (from TOML or a named profile), validated, and then shared
//! read-only.
//!
//! # Round arithmetic
//!
//! With `consensus_size = 250` and `election_distance = 20`:
//!
//! ```text
//! round 1: blocks   1 ..= 250   election at 230
//! round 2: blocks 251 ..= 500   election at 480, rotation at 251
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Error returned when a configuration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("consensus_size must be greater than zero")]
    ZeroRoundLength,
    #[error("validator_count must be greater than zero")]
    ZeroValidatorCount,
    #[error("election_distance ({distance}) must be smaller than consensus_size ({size})")]
    ElectionOutsideRound { distance: u64, size: u64 },
    #[error("block_amount_low ({low}) must be greater than block_amount_high ({high})")]
    ThresholdOrder { low: u16, high: u16 },
    #[error("penalty rate {0} must be greater than zero")]
    ZeroRate(&'static str),
    #[error("failed to read config: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

/// Round/epoch parameters and penalty rates.
///
/// Penalty rates are divisors: a rate of `10` slashes one tenth of the
/// candidate's total stake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SlashingConfig {
    /// Blocks per consensus round.
    pub consensus_size: u64,
    /// Distance of the election block from the end of the round.
    pub election_distance: u64,
    /// Expected number of validators per round.
    pub validator_count: u64,
    /// Upper bound of the mild tier. A count in `(high, low]` is penalized
    /// without removal.
    pub block_amount_low: u16,
    /// Upper bound of the severe tier. A count in `[0, high]` is penalized
    /// and the validator removed.
    pub block_amount_high: u16,
    /// Rate for the mild tier.
    pub block_amount_low_slashing: u64,
    /// Rate for the severe tier.
    pub block_amount_high_slashing: u64,
    /// Number of conflicting signatures that constitute a double sign.
    pub duplicate_sign_num: u16,
    /// Rate applied to double-sign evidence.
    pub duplicate_sign_low_slashing: u64,
    /// Second double-sign tier. Not applied by the evidence path yet.
    pub duplicate_sign_high_slashing: u64,
}

impl Default for SlashingConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl SlashingConfig {
    /// Production parameters.
    pub fn mainnet() -> Self {
        Self {
            consensus_size: 250,
            election_distance: 20,
            validator_count: 25,
            block_amount_low: 8,
            block_amount_high: 5,
            block_amount_low_slashing: 10,
            block_amount_high_slashing: 20,
            duplicate_sign_num: 2,
            duplicate_sign_low_slashing: 10,
            duplicate_sign_high_slashing: 20,
        }
    }

    /// Short rounds for local networks: 40 blocks, 4 validators, election 5
    /// blocks before the boundary.
    pub fn devnet() -> Self {
        Self {
            consensus_size: 40,
            election_distance: 5,
            validator_count: 4,
            block_amount_low: 8,
            block_amount_high: 5,
            ..Self::mainnet()
        }
    }

    /// Reject parameter sets that would make the round arithmetic or the
    /// penalty computation ill-defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consensus_size == 0 {
            return Err(ConfigError::ZeroRoundLength);
        }
        if self.validator_count == 0 {
            return Err(ConfigError::ZeroValidatorCount);
        }
        if self.election_distance >= self.consensus_size {
            return Err(ConfigError::ElectionOutsideRound {
                distance: self.election_distance,
                size: self.consensus_size,
            });
        }
        if self.block_amount_low <= self.block_amount_high {
            return Err(ConfigError::ThresholdOrder {
                low: self.block_amount_low,
                high: self.block_amount_high,
            });
        }
        for (name, rate) in [
            ("block_amount_low_slashing", self.block_amount_low_slashing),
            ("block_amount_high_slashing", self.block_amount_high_slashing),
            ("duplicate_sign_low_slashing", self.duplicate_sign_low_slashing),
            ("duplicate_sign_high_slashing", self.duplicate_sign_high_slashing),
        ] {
            if rate == 0 {
                return Err(ConfigError::ZeroRate(name));
            }
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Missing keys take the mainnet
    /// value.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Election block: `election_distance` blocks before a round boundary.
    pub fn is_election(&self, block_number: u64) -> bool {
        let size = self.consensus_size;
        block_number % size == (size - self.election_distance % size) % size
    }

    /// First block of a round other than genesis round 1.
    pub fn is_round_start(&self, block_number: u64) -> bool {
        block_number > 1 && block_number % self.consensus_size == 1
    }

    /// 1-based round containing `block_number`. Block 0 is in round 0.
    pub fn round_of(&self, block_number: u64) -> u64 {
        if block_number == 0 {
            return 0;
        }
        (block_number - 1) / self.consensus_size + 1
    }

    /// Production count below which a validator is considered abnormal.
    pub fn expected_blocks_per_validator(&self) -> u64 {
        self.consensus_size / self.validator_count
    }
}
