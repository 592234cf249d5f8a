//! # Commits
//!
//! A commit is the set of precommits that finalized a block, stored as
//! one slot per validator of the set that produced it, in set order.

use crate::vote::{canonical_vote_bytes, BlockId, Vote, VoteType, MAX_SIGNATURE_SIZE};
use crate::{TypeError, ValidatorSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_crypto::hashing::{merkle_root, FieldHasher, Hash};
use shared_crypto::{Address, ADDRESS_SIZE};

/// What a validator's commit slot says about the committed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockIdFlag {
    /// No precommit received.
    Absent,
    /// Precommitted the committed block.
    Commit,
    /// Precommitted nil.
    Nil,
}

/// One validator's slot in a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSig {
    pub block_id_flag: BlockIdFlag,
    pub validator_address: Address,
    pub timestamp: DateTime<Utc>,
    pub signature: Vec<u8>,
}

impl CommitSig {
    /// An empty slot.
    pub fn absent() -> Self {
        Self {
            block_id_flag: BlockIdFlag::Absent,
            validator_address: Address::default(),
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            signature: Vec::new(),
        }
    }

    /// Slot holding a precommit for the committed block.
    pub fn for_block(&self) -> bool {
        self.block_id_flag == BlockIdFlag::Commit
    }

    /// Slot without a precommit.
    pub fn is_absent(&self) -> bool {
        self.block_id_flag == BlockIdFlag::Absent
    }

    fn validate_basic(&self) -> Result<(), String> {
        match self.block_id_flag {
            BlockIdFlag::Absent => {
                if !self.validator_address.is_empty() {
                    return Err("absent slot carries a validator address".to_string());
                }
                if !self.signature.is_empty() {
                    return Err("absent slot carries a signature".to_string());
                }
            }
            BlockIdFlag::Commit | BlockIdFlag::Nil => {
                if self.validator_address.len() != ADDRESS_SIZE {
                    return Err(format!(
                        "expected validator address size {}, got {}",
                        ADDRESS_SIZE,
                        self.validator_address.len()
                    ));
                }
                if self.signature.is_empty() {
                    return Err("signature is missing".to_string());
                }
                if self.signature.len() > MAX_SIGNATURE_SIZE {
                    return Err(format!("signature is too big: {}", self.signature.len()));
                }
            }
        }
        Ok(())
    }

    fn hash(&self) -> Hash {
        let flag = match self.block_id_flag {
            BlockIdFlag::Absent => 1,
            BlockIdFlag::Commit => 2,
            BlockIdFlag::Nil => 3,
        };
        let mut hasher = FieldHasher::new();
        hasher
            .u64(flag)
            .field(self.validator_address.as_bytes())
            .i64(self.timestamp.timestamp())
            .u64(u64::from(self.timestamp.timestamp_subsec_nanos()))
            .field(&self.signature);
        hasher.finalize()
    }
}

impl Vote {
    /// The commit slot this precommit fills.
    pub fn commit_sig(&self) -> CommitSig {
        CommitSig {
            block_id_flag: if self.is_nil() {
                BlockIdFlag::Nil
            } else {
                BlockIdFlag::Commit
            },
            validator_address: self.validator_address.clone(),
            timestamp: self.timestamp,
            signature: self.signature.clone(),
        }
    }
}

/// Precommits that finalized the block at `height`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub height: u64,
    pub round: u32,
    pub block_id: BlockId,
    pub signatures: Vec<CommitSig>,
}

impl Commit {
    /// Create a commit.
    pub fn new(height: u64, round: u32, block_id: BlockId, signatures: Vec<CommitSig>) -> Self {
        Self {
            height,
            round,
            block_id,
            signatures,
        }
    }

    /// Number of slots.
    pub fn size(&self) -> usize {
        self.signatures.len()
    }

    /// No slots at all.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Block id the slot at `index` voted for.
    fn slot_block_id(&self, sig: &CommitSig) -> BlockId {
        match sig.block_id_flag {
            BlockIdFlag::Commit => self.block_id,
            BlockIdFlag::Absent | BlockIdFlag::Nil => BlockId::default(),
        }
    }

    /// Rebuild the precommit stored in slot `index`. Absent slots have none.
    pub fn get_vote(&self, index: usize) -> Option<Vote> {
        let sig = self.signatures.get(index)?;
        if sig.is_absent() {
            return None;
        }
        Some(Vote {
            vote_type: VoteType::Precommit,
            height: self.height,
            round: self.round,
            block_id: self.slot_block_id(sig),
            timestamp: sig.timestamp,
            validator_address: sig.validator_address.clone(),
            validator_index: u32::try_from(index).ok()?,
            signature: sig.signature.clone(),
        })
    }

    /// Bytes the validator in slot `index` signed.
    pub fn vote_sign_bytes(&self, chain_id: &str, index: usize) -> Option<Vec<u8>> {
        let sig = self.signatures.get(index)?;
        Some(canonical_vote_bytes(
            chain_id,
            VoteType::Precommit,
            self.height,
            self.round,
            &self.slot_block_id(sig),
            &sig.timestamp,
        ))
    }

    /// Merkle root over the slot hashes.
    pub fn hash(&self) -> Hash {
        let leaves: Vec<Hash> = self.signatures.iter().map(CommitSig::hash).collect();
        merkle_root(&leaves)
    }

    /// Stateless structural checks.
    pub fn validate_basic(&self) -> Result<(), TypeError> {
        if self.height == 0 {
            if !self.signatures.is_empty() {
                return Err(TypeError::InvalidCommit(
                    "commit at height 0 must be empty".to_string(),
                ));
            }
            return Ok(());
        }
        if self.block_id.is_zero() {
            return Err(TypeError::InvalidCommit("commit is for nil".to_string()));
        }
        if self.signatures.is_empty() {
            return Err(TypeError::InvalidCommit("no signatures".to_string()));
        }
        for (index, sig) in self.signatures.iter().enumerate() {
            sig.validate_basic()
                .map_err(|reason| TypeError::InvalidCommitSig { index, reason })?;
        }
        Ok(())
    }

    /// Voting-power weighted median of the slot timestamps.
    ///
    /// `validators` must be the set that produced the commit. Slots whose
    /// address is not in the set are skipped. `None` when no slot counts.
    pub fn weighted_median_time(&self, validators: &ValidatorSet) -> Option<DateTime<Utc>> {
        let mut weighted: Vec<(DateTime<Utc>, u64)> = self
            .signatures
            .iter()
            .filter(|sig| !sig.is_absent())
            .filter_map(|sig| {
                validators
                    .get_by_address(&sig.validator_address)
                    .map(|(_, val)| (sig.timestamp, val.voting_power))
            })
            .collect();
        if weighted.is_empty() {
            return None;
        }
        weighted.sort_by_key(|(time, _)| *time);

        let total: u64 = weighted.iter().map(|(_, power)| power).sum();
        let mut median = total / 2;
        for (time, power) in &weighted {
            if median <= *power {
                return Some(*time);
            }
            median -= power;
        }
        weighted.last().map(|(time, _)| *time)
    }
}
