//! # Blocks and Headers

use crate::commit::Commit;
use crate::evidence::EvidenceList;
use crate::vote::{BlockId, PartSetHeader};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_crypto::hashing::{merkle_root, merkle_root_of, FieldHasher, Hash};
use shared_crypto::Address;
use std::fmt;

/// Protocol versions a header commits to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsensusVersion {
    /// Block protocol version.
    pub block: u64,
    /// Application protocol version.
    pub app: u64,
}

/// The content-hash fields of a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderField {
    LastCommitHash,
    DataHash,
    ValidatorsHash,
    NextValidatorsHash,
    ConsensusHash,
    AppHash,
    LastResultsHash,
    EvidenceHash,
}

impl HeaderField {
    /// Whether the value follows from chain state alone (as opposed to
    /// the block's own content).
    pub fn is_state_derived(self) -> bool {
        matches!(
            self,
            Self::ValidatorsHash
                | Self::NextValidatorsHash
                | Self::ConsensusHash
                | Self::AppHash
                | Self::LastResultsHash
        )
    }

    /// Field value in `header`.
    pub fn get(self, header: &Header) -> &Hash {
        match self {
            Self::LastCommitHash => &header.last_commit_hash,
            Self::DataHash => &header.data_hash,
            Self::ValidatorsHash => &header.validators_hash,
            Self::NextValidatorsHash => &header.next_validators_hash,
            Self::ConsensusHash => &header.consensus_hash,
            Self::AppHash => &header.app_hash,
            Self::LastResultsHash => &header.last_results_hash,
            Self::EvidenceHash => &header.evidence_hash,
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LastCommitHash => "LastCommitHash",
            Self::DataHash => "DataHash",
            Self::ValidatorsHash => "ValidatorsHash",
            Self::NextValidatorsHash => "NextValidatorsHash",
            Self::ConsensusHash => "ConsensusHash",
            Self::AppHash => "AppHash",
            Self::LastResultsHash => "LastResultsHash",
            Self::EvidenceHash => "EvidenceHash",
        };
        f.write_str(name)
    }
}

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub version: ConsensusVersion,
    pub chain_id: String,
    pub height: u64,
    pub time: DateTime<Utc>,

    /// Id of the previous block.
    pub last_block_id: BlockId,

    // Hashes of this block's own content
    pub last_commit_hash: Hash,
    pub data_hash: Hash,

    // Hashes derived from chain state after the previous block
    pub validators_hash: Hash,
    pub next_validators_hash: Hash,
    pub consensus_hash: Hash,
    pub app_hash: Hash,
    pub last_results_hash: Hash,

    pub evidence_hash: Hash,
    pub proposer_address: Address,
}

impl Header {
    /// Hash of every header field.
    pub fn hash(&self) -> Hash {
        let mut hasher = FieldHasher::new();
        hasher
            .u64(self.version.block)
            .u64(self.version.app)
            .field(self.chain_id.as_bytes())
            .u64(self.height)
            .i64(self.time.timestamp())
            .u64(u64::from(self.time.timestamp_subsec_nanos()));
        self.last_block_id.write_to(&mut hasher);
        hasher
            .field(&self.last_commit_hash)
            .field(&self.data_hash)
            .field(&self.validators_hash)
            .field(&self.next_validators_hash)
            .field(&self.consensus_hash)
            .field(&self.app_hash)
            .field(&self.last_results_hash)
            .field(&self.evidence_hash)
            .field(self.proposer_address.as_bytes());
        hasher.finalize()
    }
}

/// Transactions carried by a block. Opaque to validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub txs: Vec<Vec<u8>>,
}

impl Data {
    /// Merkle root over the transactions.
    pub fn hash(&self) -> Hash {
        merkle_root_of(&self.txs)
    }
}

/// A candidate block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: Header,
    pub data: Data,
    pub evidence: EvidenceList,
    pub last_commit: Commit,
}

impl Block {
    /// Header hash.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Block id. Blocks are gossiped as a single part whose hash commits
    /// to the header and every content root.
    pub fn block_id(&self) -> BlockId {
        let parts = merkle_root(&[
            self.header.hash(),
            self.data.hash(),
            self.evidence.hash(),
            self.last_commit.hash(),
        ]);
        BlockId {
            hash: self.hash(),
            part_set_header: PartSetHeader {
                total: 1,
                hash: parts,
            },
        }
    }

    /// Recompute the content hashes from the block's own content.
    pub fn fill_header(&mut self) {
        self.header.last_commit_hash = self.last_commit.hash();
        self.header.data_hash = self.data.hash();
        self.header.evidence_hash = self.evidence.hash();
    }
}
