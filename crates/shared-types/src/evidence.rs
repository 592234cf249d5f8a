//! # Evidence of Validator Misbehavior
//!
//! Evidence is a closed set of accusation kinds. Each kind checks its own
//! shape in `validate_basic` and the accused's signatures in `verify`;
//! everything that needs chain state (age, membership, voting power) is
//! judged by the validation crate.
//!
//! ## Hash Identity
//!
//! An amnesia accusation hashes the same with or without a proof of lock
//! change, so the pool sees an upgraded accusation as the same item.

use crate::block::{Header, HeaderField};
use crate::vote::{BlockId, Vote, VoteType};
use crate::TypeError;
use chrono::{DateTime, Utc};
use shared_crypto::hashing::{merkle_root, FieldHasher, Hash};
use shared_crypto::{Address, PubKey, PublicKey};
use std::collections::HashSet;

// =============================================================================
// VOTE-PAIR ACCUSATIONS
// =============================================================================

/// Two conflicting votes at the same height and round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateVoteEvidence {
    pub vote_a: Vote,
    pub vote_b: Vote,
}

impl DuplicateVoteEvidence {
    /// Pair two conflicting votes, ordered by block id.
    pub fn new(first: Vote, second: Vote) -> Self {
        if second.block_id.key() < first.block_id.key() {
            Self {
                vote_a: second,
                vote_b: first,
            }
        } else {
            Self {
                vote_a: first,
                vote_b: second,
            }
        }
    }

    fn validate_basic(&self) -> Result<(), TypeError> {
        self.vote_a.validate_basic()?;
        self.vote_b.validate_basic()?;
        same_voter(&self.vote_a, &self.vote_b)?;
        if self.vote_a.round != self.vote_b.round {
            return Err(TypeError::VoteFieldMismatch("round"));
        }
        if self.vote_a.block_id == self.vote_b.block_id {
            return Err(TypeError::SameBlockId);
        }
        if self.vote_a.block_id.key() > self.vote_b.block_id.key() {
            return Err(TypeError::VoteOrder);
        }
        Ok(())
    }

    /// Independent of the order the votes are stored in.
    fn hash(&self) -> Hash {
        let (first, second) = if self.vote_b.block_id.key() < self.vote_a.block_id.key() {
            (&self.vote_b, &self.vote_a)
        } else {
            (&self.vote_a, &self.vote_b)
        };
        let mut hasher = FieldHasher::new();
        hasher.field(b"duplicate-vote");
        first.write_to(&mut hasher);
        second.write_to(&mut hasher);
        hasher.finalize()
    }
}

/// Two votes from different rounds that look like the validator forgot
/// its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PotentialAmnesiaEvidence {
    /// Earlier vote.
    pub vote_a: Vote,
    /// Later vote, for a different block.
    pub vote_b: Vote,
}

impl PotentialAmnesiaEvidence {
    fn validate_basic(&self) -> Result<(), TypeError> {
        self.vote_a.validate_basic()?;
        self.vote_b.validate_basic()?;
        same_voter(&self.vote_a, &self.vote_b)?;
        if self.vote_a.round >= self.vote_b.round {
            return Err(TypeError::RoundOrder {
                first: self.vote_a.round,
                second: self.vote_b.round,
            });
        }
        if self.vote_a.block_id == self.vote_b.block_id {
            return Err(TypeError::SameBlockId);
        }
        Ok(())
    }

    fn hash(&self) -> Hash {
        let mut hasher = FieldHasher::new();
        hasher.field(b"amnesia");
        self.vote_a.write_to(&mut hasher);
        self.vote_b.write_to(&mut hasher);
        hasher.finalize()
    }
}

fn same_voter(a: &Vote, b: &Vote) -> Result<(), TypeError> {
    if a.height != b.height {
        return Err(TypeError::VoteFieldMismatch("height"));
    }
    if a.vote_type != b.vote_type {
        return Err(TypeError::VoteFieldMismatch("type"));
    }
    if a.validator_address != b.validator_address {
        return Err(TypeError::VoteFieldMismatch("validator address"));
    }
    if a.validator_index != b.validator_index {
        return Err(TypeError::VoteFieldMismatch("validator index"));
    }
    Ok(())
}

/// Prevotes from one round justifying why the accused changed its lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfLockChange {
    pub votes: Vec<Vote>,
    /// Key of the validator the proof defends.
    pub pub_key: PublicKey,
}

impl ProofOfLockChange {
    /// Height of the prevotes.
    pub fn height(&self) -> Option<u64> {
        self.votes.first().map(|v| v.height)
    }

    /// Round of the prevotes.
    pub fn round(&self) -> Option<u32> {
        self.votes.first().map(|v| v.round)
    }

    /// Block the prevotes are for.
    pub fn block_id(&self) -> Option<BlockId> {
        self.votes.first().map(|v| v.block_id)
    }

    /// Address of the defended validator.
    pub fn address(&self) -> Address {
        self.pub_key.address()
    }

    /// Prevotes for one non-nil block, one height and round, distinct voters.
    pub fn validate_basic(&self) -> Result<(), TypeError> {
        let first = self
            .votes
            .first()
            .ok_or_else(|| TypeError::InvalidPolc("no votes".to_string()))?;
        if first.block_id.is_zero() {
            return Err(TypeError::InvalidPolc("votes are for nil".to_string()));
        }

        let mut voters = HashSet::with_capacity(self.votes.len());
        for vote in &self.votes {
            vote.validate_basic()?;
            if vote.vote_type != VoteType::Prevote {
                return Err(TypeError::InvalidPolc(format!(
                    "vote from {} is not a prevote",
                    vote.validator_address
                )));
            }
            if vote.height != first.height || vote.round != first.round {
                return Err(TypeError::InvalidPolc(
                    "votes span several heights or rounds".to_string(),
                ));
            }
            if vote.block_id != first.block_id {
                return Err(TypeError::InvalidPolc(
                    "votes are for different blocks".to_string(),
                ));
            }
            if !voters.insert(&vote.validator_address) {
                return Err(TypeError::InvalidPolc(format!(
                    "duplicate vote from {}",
                    vote.validator_address
                )));
            }
        }
        Ok(())
    }
}

/// Amnesia accusation, optionally answered by a proof of lock change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmnesiaEvidence {
    pub potential: PotentialAmnesiaEvidence,
    /// `None` when no defense has been offered yet.
    pub polc: Option<ProofOfLockChange>,
}

impl AmnesiaEvidence {
    fn validate_basic(&self) -> Result<(), TypeError> {
        self.potential.validate_basic()?;
        let Some(polc) = &self.polc else {
            return Ok(());
        };
        polc.validate_basic()?;

        let vote_a = &self.potential.vote_a;
        let vote_b = &self.potential.vote_b;
        if polc.address() != vote_a.validator_address {
            return Err(TypeError::InvalidPolc(
                "key does not belong to the accused validator".to_string(),
            ));
        }
        if polc.height() != Some(vote_b.height) {
            return Err(TypeError::InvalidPolc(
                "votes are not from the evidence height".to_string(),
            ));
        }
        match polc.round() {
            Some(round) if round > vote_a.round && round <= vote_b.round => {}
            _ => {
                return Err(TypeError::InvalidPolc(format!(
                    "round must be in ({}, {}]",
                    vote_a.round, vote_b.round
                )))
            }
        }
        if polc.block_id() != Some(vote_b.block_id) {
            return Err(TypeError::InvalidPolc(
                "votes are not for the block of the later vote".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// HEADER ACCUSATIONS
// =============================================================================

/// A vote signed by an address that was not a validator at that height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhantomValidatorEvidence {
    pub header: Header,
    pub vote: Vote,
    /// Last height at which the accused was still in the set.
    pub last_height_validator_was_in_set: u64,
}

impl PhantomValidatorEvidence {
    fn validate_basic(&self) -> Result<(), TypeError> {
        self.vote.validate_basic()?;
        if !self.vote.block_id.is_complete() {
            return Err(TypeError::HeaderVoteMismatch(
                "vote is not for a complete block id".to_string(),
            ));
        }
        if self.header.height != self.vote.height {
            return Err(TypeError::HeaderVoteMismatch(format!(
                "header height {} != vote height {}",
                self.header.height, self.vote.height
            )));
        }
        let last = self.last_height_validator_was_in_set;
        if last == 0 || last >= self.vote.height {
            return Err(TypeError::InvalidLastHeight {
                last,
                height: self.vote.height,
            });
        }
        Ok(())
    }
}

/// A vote for a header whose state-derived field is wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LunaticValidatorEvidence {
    pub header: Header,
    pub vote: Vote,
    /// Which field the accuser claims is wrong.
    pub invalid_header_field: HeaderField,
}

impl LunaticValidatorEvidence {
    fn validate_basic(&self) -> Result<(), TypeError> {
        self.vote.validate_basic()?;
        if self.header.height != self.vote.height {
            return Err(TypeError::HeaderVoteMismatch(format!(
                "header height {} != vote height {}",
                self.header.height, self.vote.height
            )));
        }
        if self.vote.block_id.hash != self.header.hash() {
            return Err(TypeError::HeaderVoteMismatch(
                "vote is not for the accused header".to_string(),
            ));
        }
        if !self.invalid_header_field.is_state_derived() {
            return Err(TypeError::InvalidHeaderField(self.invalid_header_field));
        }
        Ok(())
    }
}

// =============================================================================
// EVIDENCE
// =============================================================================

/// Any accusation a block can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    DuplicateVote(DuplicateVoteEvidence),
    PotentialAmnesia(PotentialAmnesiaEvidence),
    Amnesia(AmnesiaEvidence),
    PhantomValidator(PhantomValidatorEvidence),
    LunaticValidator(LunaticValidatorEvidence),
}

impl Evidence {
    /// Short name of the accusation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateVote(_) => "duplicate_vote",
            Self::PotentialAmnesia(_) => "potential_amnesia",
            Self::Amnesia(_) => "amnesia",
            Self::PhantomValidator(_) => "phantom_validator",
            Self::LunaticValidator(_) => "lunatic_validator",
        }
    }

    /// Height the misbehavior happened at.
    pub fn height(&self) -> u64 {
        match self {
            Self::DuplicateVote(ev) => ev.vote_a.height,
            Self::PotentialAmnesia(ev) => ev.vote_a.height,
            Self::Amnesia(ev) => ev.potential.vote_a.height,
            Self::PhantomValidator(ev) => ev.vote.height,
            Self::LunaticValidator(ev) => ev.header.height,
        }
    }

    /// When the misbehavior happened.
    pub fn time(&self) -> DateTime<Utc> {
        match self {
            Self::DuplicateVote(ev) => ev.vote_a.timestamp,
            Self::PotentialAmnesia(ev) => ev.vote_a.timestamp,
            Self::Amnesia(ev) => ev.potential.vote_a.timestamp,
            Self::PhantomValidator(ev) => ev.vote.timestamp,
            Self::LunaticValidator(ev) => ev.header.time,
        }
    }

    /// Address of the accused validator.
    pub fn address(&self) -> &Address {
        match self {
            Self::DuplicateVote(ev) => &ev.vote_a.validator_address,
            Self::PotentialAmnesia(ev) => &ev.vote_a.validator_address,
            Self::Amnesia(ev) => &ev.potential.vote_a.validator_address,
            Self::PhantomValidator(ev) => &ev.vote.validator_address,
            Self::LunaticValidator(ev) => &ev.vote.validator_address,
        }
    }

    /// Identity hash.
    pub fn hash(&self) -> Hash {
        match self {
            Self::DuplicateVote(ev) => ev.hash(),
            Self::PotentialAmnesia(ev) => ev.hash(),
            Self::Amnesia(ev) => ev.potential.hash(),
            Self::PhantomValidator(ev) => {
                let mut hasher = FieldHasher::new();
                hasher.field(b"phantom-validator").field(&ev.header.hash());
                ev.vote.write_to(&mut hasher);
                hasher.u64(ev.last_height_validator_was_in_set);
                hasher.finalize()
            }
            Self::LunaticValidator(ev) => {
                let mut hasher = FieldHasher::new();
                hasher.field(b"lunatic-validator").field(&ev.header.hash());
                ev.vote.write_to(&mut hasher);
                hasher.field(ev.invalid_header_field.to_string().as_bytes());
                hasher.finalize()
            }
        }
    }

    /// Stateless structural checks.
    pub fn validate_basic(&self) -> Result<(), TypeError> {
        match self {
            Self::DuplicateVote(ev) => ev.validate_basic(),
            Self::PotentialAmnesia(ev) => ev.validate_basic(),
            Self::Amnesia(ev) => ev.validate_basic(),
            Self::PhantomValidator(ev) => ev.validate_basic(),
            Self::LunaticValidator(ev) => ev.validate_basic(),
        }
    }

    /// Check the accused's own signatures under `pub_key`.
    ///
    /// Proof-of-lock-change prevotes are signed by other validators and
    /// are checked against the validator set instead.
    pub fn verify(&self, chain_id: &str, pub_key: &PublicKey) -> Result<(), TypeError> {
        match self {
            Self::DuplicateVote(DuplicateVoteEvidence { vote_a, vote_b })
            | Self::PotentialAmnesia(PotentialAmnesiaEvidence { vote_a, vote_b })
            | Self::Amnesia(AmnesiaEvidence {
                potential: PotentialAmnesiaEvidence { vote_a, vote_b },
                ..
            }) => {
                vote_a.verify(chain_id, pub_key)?;
                vote_b.verify(chain_id, pub_key)
            }
            Self::PhantomValidator(PhantomValidatorEvidence { vote, .. })
            | Self::LunaticValidator(LunaticValidatorEvidence { vote, .. }) => {
                vote.verify(chain_id, pub_key)
            }
        }
    }
}

/// Evidence carried by one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceList(pub Vec<Evidence>);

impl EvidenceList {
    /// Merkle root over item hashes.
    pub fn hash(&self) -> Hash {
        let leaves: Vec<Hash> = self.0.iter().map(Evidence::hash).collect();
        merkle_root(&leaves)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Items in block order.
    pub fn iter(&self) -> std::slice::Iter<'_, Evidence> {
        self.0.iter()
    }
}

impl From<Vec<Evidence>> for EvidenceList {
    fn from(items: Vec<Evidence>) -> Self {
        Self(items)
    }
}
