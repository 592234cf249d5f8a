//! Consensus parameters.

use serde::{Deserialize, Serialize};
use shared_crypto::hashing::{FieldHasher, Hash};

/// Block size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParams {
    pub max_bytes: u64,
    /// `-1` for unlimited.
    pub max_gas: i64,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self {
            max_bytes: 22_020_096, // 21MB
            max_gas: -1,
        }
    }
}

/// Evidence admission limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceParams {
    /// Oldest admissible evidence, in blocks behind the current height.
    pub max_age_num_blocks: u64,
    /// Most evidence items one block may carry.
    pub max_num: u32,
}

impl Default for EvidenceParams {
    fn default() -> Self {
        Self {
            max_age_num_blocks: 100_000,
            max_num: 50,
        }
    }
}

/// Parameters the header's consensus hash commits to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    pub block: BlockParams,
    pub evidence: EvidenceParams,
}

impl ConsensusParams {
    /// Hash of every parameter.
    pub fn hash(&self) -> Hash {
        let mut hasher = FieldHasher::new();
        hasher
            .u64(self.block.max_bytes)
            .i64(self.block.max_gas)
            .u64(self.evidence.max_age_num_blocks)
            .u64(u64::from(self.evidence.max_num));
        hasher.finalize()
    }
}
