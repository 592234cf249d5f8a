//! # Validation Configuration
//!
//! Rule variants a deployment may choose between. Every node of one chain
//! must run with the same configuration or they will disagree on blocks.
//!
//! ## Environment Overrides
//!
//! - `VC_PROPOSER_CHECK`: `exact` | `membership`
//! - `VC_BLOCK_TIME`: `monotonic` | `weighted_median`

use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable selecting the proposer rule.
pub const ENV_PROPOSER_CHECK: &str = "VC_PROPOSER_CHECK";
/// Environment variable selecting the block time rule.
pub const ENV_BLOCK_TIME: &str = "VC_BLOCK_TIME";

/// How the header's proposer address is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposerCheck {
    /// Must be the validator set's proposer for the height.
    #[default]
    Exact,
    /// Any current validator. The round the block was first proposed in
    /// is not known to validation, so the exact proposer can't always be
    /// derived.
    Membership,
}

impl FromStr for ProposerCheck {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "membership" => Ok(Self::Membership),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_PROPOSER_CHECK,
                value: value.to_string(),
            }),
        }
    }
}

/// How the header's time is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockTimeRule {
    /// Strictly after the last block time.
    #[default]
    Monotonic,
    /// Also equal to the weighted median of the last commit's timestamps;
    /// genesis time at the first height.
    WeightedMedian,
}

impl FromStr for BlockTimeRule {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monotonic" => Ok(Self::Monotonic),
            "weighted_median" | "weighted-median" => Ok(Self::WeightedMedian),
            _ => Err(ConfigError::InvalidValue {
                key: ENV_BLOCK_TIME,
                value: value.to_string(),
            }),
        }
    }
}

/// Complete validation configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Proposer rule.
    pub proposer_check: ProposerCheck,
    /// Block time rule.
    pub block_time: BlockTimeRule,
}

impl ValidationConfig {
    /// Defaults with `VC_*` environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PROPOSER_CHECK) {
            self.proposer_check = value.parse()?;
        }
        if let Some(value) = lookup(ENV_BLOCK_TIME) {
            self.block_time = value.parse()?;
        }
        Ok(self)
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Unrecognized value for a setting.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
