//! # Votes and Block Identifiers
//!
//! A vote is signed over its canonical sign bytes: chain id, vote type,
//! height, round, block id and timestamp. The validator address and index
//! are not part of the signed payload, so a commit slot can be turned
//! back into the exact vote that was signed.

use crate::TypeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_crypto::hashing::{FieldHasher, Hash, SENTINEL_HASH};
use shared_crypto::{Address, PubKey, PublicKey, ADDRESS_SIZE};

/// Largest signature accepted anywhere (a threshold bundle included).
pub const MAX_SIGNATURE_SIZE: usize = 64 * 1024;

/// Header of the part set a block was split into for gossip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartSetHeader {
    /// Number of parts.
    pub total: u32,
    /// Merkle root of the parts.
    pub hash: Hash,
}

/// Identifies a block by its header hash and part set header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId {
    /// Header hash.
    pub hash: Hash,
    /// Part set header.
    pub part_set_header: PartSetHeader,
}

impl BlockId {
    /// The "no block" id: what a nil vote carries.
    pub fn is_zero(&self) -> bool {
        self.hash == SENTINEL_HASH && self.part_set_header == PartSetHeader::default()
    }

    /// Both the hash and the part set header are set.
    pub fn is_complete(&self) -> bool {
        self.hash != SENTINEL_HASH
            && self.part_set_header.total > 0
            && self.part_set_header.hash != SENTINEL_HASH
    }

    pub(crate) fn write_to(&self, hasher: &mut FieldHasher) {
        hasher
            .field(&self.hash)
            .u64(u64::from(self.part_set_header.total))
            .field(&self.part_set_header.hash);
    }

    /// Byte key that orders block ids: hash, part count, part set hash.
    pub fn key(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(68);
        self.write_bytes(&mut out);
        out
    }

    fn write_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.hash);
        out.extend_from_slice(&self.part_set_header.total.to_be_bytes());
        out.extend_from_slice(&self.part_set_header.hash);
    }
}

/// Step of the consensus round a vote belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteType {
    /// First voting step of a round.
    Prevote,
    /// Second voting step; a quorum of these commits the block.
    Precommit,
}

impl VoteType {
    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            Self::Prevote => 1,
            Self::Precommit => 2,
        }
    }
}

/// Canonical payload a validator signs.
pub fn canonical_vote_bytes(
    chain_id: &str,
    vote_type: VoteType,
    height: u64,
    round: u32,
    block_id: &BlockId,
    timestamp: &DateTime<Utc>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(128 + chain_id.len());
    out.extend_from_slice(&(chain_id.len() as u64).to_be_bytes());
    out.extend_from_slice(chain_id.as_bytes());
    out.push(vote_type.code());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&round.to_be_bytes());
    block_id.write_bytes(&mut out);
    out.extend_from_slice(&timestamp.timestamp().to_be_bytes());
    out.extend_from_slice(&timestamp.timestamp_subsec_nanos().to_be_bytes());
    out
}

/// A signed prevote or precommit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub vote_type: VoteType,
    pub height: u64,
    pub round: u32,
    /// Zero for a nil vote.
    pub block_id: BlockId,
    pub timestamp: DateTime<Utc>,
    pub validator_address: Address,
    pub validator_index: u32,
    pub signature: Vec<u8>,
}

impl Vote {
    /// Bytes covered by the signature.
    pub fn sign_bytes(&self, chain_id: &str) -> Vec<u8> {
        canonical_vote_bytes(
            chain_id,
            self.vote_type,
            self.height,
            self.round,
            &self.block_id,
            &self.timestamp,
        )
    }

    /// Whether this is a vote for nil.
    pub fn is_nil(&self) -> bool {
        self.block_id.is_zero()
    }

    /// Check that `pub_key` owns this vote and signed it on `chain_id`.
    pub fn verify(&self, chain_id: &str, pub_key: &PublicKey) -> Result<(), TypeError> {
        let key_address = pub_key.address();
        if key_address != self.validator_address {
            return Err(TypeError::AddressMismatch {
                vote: self.validator_address.clone(),
                key: key_address,
            });
        }
        pub_key
            .verify_signature(&self.sign_bytes(chain_id), &self.signature)
            .map_err(|source| TypeError::InvalidSignature {
                address: self.validator_address.clone(),
                source,
            })
    }

    /// Stateless structural checks.
    pub fn validate_basic(&self) -> Result<(), TypeError> {
        if self.height == 0 {
            return Err(TypeError::ZeroHeight);
        }
        if !self.validator_address.is_valid_size() {
            return Err(TypeError::InvalidAddressSize {
                expected: ADDRESS_SIZE,
                actual: self.validator_address.len(),
            });
        }
        if self.signature.is_empty() {
            return Err(TypeError::MissingSignature);
        }
        if self.signature.len() > MAX_SIGNATURE_SIZE {
            return Err(TypeError::SignatureTooLarge {
                size: self.signature.len(),
                max: MAX_SIGNATURE_SIZE,
            });
        }
        Ok(())
    }

    /// Content hash, signature included.
    pub fn hash(&self) -> Hash {
        let mut hasher = FieldHasher::new();
        self.write_to(&mut hasher);
        hasher.finalize()
    }

    pub(crate) fn write_to(&self, hasher: &mut FieldHasher) {
        hasher
            .u64(u64::from(self.vote_type.code()))
            .u64(self.height)
            .u64(u64::from(self.round));
        self.block_id.write_to(hasher);
        hasher
            .i64(self.timestamp.timestamp())
            .u64(u64::from(self.timestamp.timestamp_subsec_nanos()))
            .field(self.validator_address.as_bytes())
            .u64(u64::from(self.validator_index))
            .field(&self.signature);
    }
}
