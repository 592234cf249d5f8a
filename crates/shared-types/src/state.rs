//! # Chain State Snapshot
//!
//! What the chain looks like after the last committed block: enough to
//! judge the next one. Produced by the state-transition engine once per
//! height; read-only to validation.

use crate::block::{Block, ConsensusVersion, Data, Header};
use crate::commit::Commit;
use crate::evidence::{Evidence, EvidenceList};
use crate::params::ConsensusParams;
use crate::validator::ValidatorSet;
use crate::vote::BlockId;
use chrono::{DateTime, Duration, Utc};
use shared_crypto::hashing::Hash;
use shared_crypto::Address;

/// Immutable snapshot of the chain after `last_block_height`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    pub version: ConsensusVersion,
    pub chain_id: String,

    /// Zero before the first block.
    pub last_block_height: u64,
    pub last_block_id: BlockId,
    /// Genesis time before the first block.
    pub last_block_time: DateTime<Utc>,

    /// Validators for the next block.
    pub validators: ValidatorSet,
    /// Validators for the block after next.
    pub next_validators: ValidatorSet,
    /// Validators that signed the last block's commit.
    pub last_validators: ValidatorSet,

    pub consensus_params: ConsensusParams,
    pub last_results_hash: Hash,
    pub app_hash: Hash,
}

impl ChainState {
    /// State before the first block.
    pub fn genesis(
        chain_id: impl Into<String>,
        genesis_time: DateTime<Utc>,
        validators: ValidatorSet,
        consensus_params: ConsensusParams,
    ) -> Self {
        Self {
            version: ConsensusVersion { block: 10, app: 0 },
            chain_id: chain_id.into(),
            last_block_height: 0,
            last_block_id: BlockId::default(),
            last_block_time: genesis_time,
            next_validators: validators.with_proposer_incremented(1),
            validators,
            last_validators: ValidatorSet::default(),
            consensus_params,
            last_results_hash: Hash::default(),
            app_hash: Hash::default(),
        }
    }

    /// Height of the next block. Evidence is judged at this height.
    pub fn current_height(&self) -> u64 {
        self.last_block_height + 1
    }

    /// Whether the next block is the first one.
    pub fn is_initial_height(&self) -> bool {
        self.last_block_height == 0
    }

    /// Build a block on top of this state with every state-derived field
    /// filled in. Content hashes are computed from the given content.
    pub fn make_block(
        &self,
        height: u64,
        txs: Vec<Vec<u8>>,
        last_commit: Commit,
        evidence: Vec<Evidence>,
        proposer_address: Address,
    ) -> Block {
        let time = if height <= 1 {
            self.last_block_time
        } else {
            last_commit
                .weighted_median_time(&self.last_validators)
                .unwrap_or(self.last_block_time + Duration::seconds(1))
        };
        let mut block = Block {
            header: Header {
                version: self.version,
                chain_id: self.chain_id.clone(),
                height,
                time,
                last_block_id: self.last_block_id,
                last_commit_hash: Hash::default(),
                data_hash: Hash::default(),
                validators_hash: self.validators.hash(),
                next_validators_hash: self.next_validators.hash(),
                consensus_hash: self.consensus_params.hash(),
                app_hash: self.app_hash,
                last_results_hash: self.last_results_hash,
                evidence_hash: Hash::default(),
                proposer_address,
            },
            data: Data { txs },
            evidence: EvidenceList(evidence),
            last_commit,
        };
        block.fill_header();
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Validator;
    use chrono::TimeZone;
    use shared_crypto::Ed25519KeyPair;

    fn genesis() -> ChainState {
        let validators = ValidatorSet::new(
            (1..=3u8)
                .map(|i| Validator::new(Ed25519KeyPair::from_seed([i; 32]).public_key().into(), 10))
                .collect(),
        )
        .unwrap();
        ChainState::genesis(
            "state-chain",
            Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap(),
            validators,
            ConsensusParams::default(),
        )
    }

    #[test]
    fn test_first_block_uses_genesis_time() {
        let state = genesis();
        let proposer = state.validators.proposer().unwrap().address.clone();
        let block = state.make_block(1, vec![b"tx".to_vec()], Commit::default(), vec![], proposer);

        assert_eq!(block.header.time, state.last_block_time);
        assert_eq!(block.header.validators_hash, state.validators.hash());
        assert_eq!(block.header.data_hash, block.data.hash());
        assert_eq!(state.current_height(), 1);
    }

    #[test]
    fn test_next_validators_rotate_proposer() {
        let state = genesis();
        assert_ne!(
            state.validators.proposer().unwrap().address,
            state.next_validators.proposer().unwrap().address
        );
        assert_eq!(state.validators.hash(), state.next_validators.hash());
    }
}
