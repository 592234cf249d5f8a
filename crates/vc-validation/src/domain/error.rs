//! Error types for block validation
//!
//! Every rejection is a typed, non-fatal error. Display strings carry the
//! messages operators grep for; `label()` gives the metric label.

use chrono::{DateTime, Utc};
use shared_types::{Address, BlockId, ConsensusVersion, Hash, HeaderField, TypeError};
use thiserror::Error;

/// Header does not follow from the chain state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("wrong Block.Header.Version: expected {expected:?}, got {got:?}")]
    WrongVersion {
        expected: ConsensusVersion,
        got: ConsensusVersion,
    },

    #[error("wrong Block.Header.ChainID: expected {expected}, got {got}")]
    WrongChainId { expected: String, got: String },

    #[error("wrong Block.Header.Height: expected {expected}, got {got}")]
    WrongHeight { expected: u64, got: u64 },

    #[error("block time {block} is not greater than last block time {last}")]
    TimeNotMonotonic {
        block: DateTime<Utc>,
        last: DateTime<Utc>,
    },

    #[error("block time {block} is before genesis time {genesis}")]
    TimeBeforeGenesis {
        block: DateTime<Utc>,
        genesis: DateTime<Utc>,
    },

    #[error("invalid block time: expected {expected}, got {block}")]
    TimeNotMedian {
        block: DateTime<Utc>,
        expected: DateTime<Utc>,
    },

    #[error("wrong Block.Header.LastBlockID: expected {expected:?}, got {got:?}")]
    WrongLastBlockId { expected: BlockId, got: BlockId },

    #[error(
        "wrong Block.Header.{field}: expected {}, got {}",
        hex::encode_upper(.expected),
        hex::encode_upper(.got)
    )]
    HashMismatch {
        field: HeaderField,
        expected: Hash,
        got: Hash,
    },

    #[error("invalid proposer address size: expected {expected}, got {got}")]
    InvalidProposerAddressSize { expected: usize, got: usize },

    #[error("block proposer {0} is not a validator")]
    ProposerNotValidator(Address),

    #[error("wrong block proposer: expected {expected}, got {got}")]
    WrongProposer { expected: Address, got: Address },

    #[error("validator set is empty")]
    EmptyValidatorSet,
}

impl HeaderError {
    /// Short stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::WrongVersion { .. } => "wrong_version",
            Self::WrongChainId { .. } => "wrong_chain_id",
            Self::WrongHeight { .. } => "wrong_height",
            Self::TimeNotMonotonic { .. } => "time_not_monotonic",
            Self::TimeBeforeGenesis { .. } => "time_before_genesis",
            Self::TimeNotMedian { .. } => "time_not_median",
            Self::WrongLastBlockId { .. } => "wrong_last_block_id",
            Self::HashMismatch { .. } => "hash_mismatch",
            Self::InvalidProposerAddressSize { .. } => "invalid_proposer_address_size",
            Self::ProposerNotValidator(_) => "proposer_not_validator",
            Self::WrongProposer { .. } => "wrong_proposer",
            Self::EmptyValidatorSet => "empty_validator_set",
        }
    }
}

/// Last commit does not finalize the previous block.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("block at the initial height can't have LastCommit signatures, got {size}")]
    NonEmptyInitialCommit { size: usize },

    #[error("invalid commit: {0}")]
    Malformed(#[source] TypeError),

    #[error("invalid commit height: expected {expected}, got {got}")]
    InvalidCommitHeight { expected: u64, got: u64 },

    #[error("invalid commit signatures: expected {expected}, got {got}")]
    InvalidCommitSignatures { expected: usize, got: usize },

    #[error("invalid commit: wrong block id: expected {expected:?}, got {got:?}")]
    WrongBlockId { expected: BlockId, got: BlockId },

    #[error("commit slot #{index} signed by {address}, which is not the validator at that index")]
    UnexpectedValidator { index: usize, address: Address },

    #[error("wrong signature (#{index}): {source}")]
    WrongSignature {
        index: usize,
        #[source]
        source: TypeError,
    },

    #[error("invalid commit: insufficient voting power: got {got}, needed {needed}")]
    InsufficientVotingPower { needed: u64, got: u64 },
}

impl CommitError {
    /// Short stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NonEmptyInitialCommit { .. } => "non_empty_initial_commit",
            Self::Malformed(_) => "malformed_commit",
            Self::InvalidCommitHeight { .. } => "invalid_commit_height",
            Self::InvalidCommitSignatures { .. } => "invalid_commit_signatures",
            Self::WrongBlockId { .. } => "wrong_commit_block_id",
            Self::UnexpectedValidator { .. } => "unexpected_validator",
            Self::WrongSignature { .. } => "wrong_signature",
            Self::InsufficientVotingPower { .. } => "insufficient_voting_power",
        }
    }
}

/// A proof of lock change that does not justify the later vote.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PolcError {
    #[error("not enough voting power to reach majority needed: {needed}, got {got}")]
    NotEnoughVotingPower { needed: u64, got: u64 },

    #[error("prevote from {0}, which was not a validator")]
    UnknownVoter(Address),

    #[error("{0}")]
    InvalidVote(#[source] TypeError),
}

/// The evidence pool refused an item.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvidencePoolError {
    #[error("{0}")]
    Rejected(String),

    #[error("evidence pool unavailable")]
    Unavailable,
}

/// No validator set is known for a height.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("no validator set recorded at or below height {0}")]
    NotFound(u64),

    #[error("validator history unavailable: {0}")]
    Unavailable(String),
}

/// Why a single evidence item does not stand.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvidenceError {
    #[error(
        "evidence from height {height} (created at: {time}) is too old; \
         min height is {min_height} and evidence can not be older than {max_age} blocks"
    )]
    TooOld {
        height: u64,
        time: DateTime<Utc>,
        min_height: u64,
        max_age: u64,
    },

    #[error("evidence from height {height} is from the future; current height is {current}")]
    FromFuture { height: u64, current: u64 },

    #[error("address {address} was not a validator at height {height}")]
    NotAValidator { address: Address, height: u64 },

    #[error("address {address} was a validator at height {height}")]
    PhantomStillValidator { address: Address, height: u64 },

    #[error(
        "last time validator was in the set at height {last}, min: {min_height}"
    )]
    PhantomTooOld { last: u64, min_height: u64 },

    #[error("phantom validator {address} not found in validator set at height {height}")]
    PhantomNotFound { address: Address, height: u64 },

    #[error("evidence was already committed")]
    AlreadyCommitted,

    #[error("{0}")]
    Malformed(#[source] TypeError),

    #[error("{0}")]
    InvalidSignature(#[source] TypeError),

    #[error("unknown amnesia evidence, trying to add to evidence pool, err: {0}")]
    PoolInsertion(#[source] EvidencePoolError),

    #[error("amnesia evidence contains invalid polc, err: {0}")]
    InvalidPolc(#[source] PolcError),

    #[error("verification of lunatic validator evidence ({field}) is not yet supported")]
    LunaticUnsupported { field: HeaderField },

    #[error("validator set at height {height}: {source}")]
    History {
        height: u64,
        #[source]
        source: HistoryError,
    },
}

impl EvidenceError {
    /// Short stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TooOld { .. } => "too_old",
            Self::FromFuture { .. } => "from_future",
            Self::NotAValidator { .. } => "not_a_validator",
            Self::PhantomStillValidator { .. } => "phantom_still_validator",
            Self::PhantomTooOld { .. } => "phantom_too_old",
            Self::PhantomNotFound { .. } => "phantom_not_found",
            Self::AlreadyCommitted => "already_committed",
            Self::Malformed(_) => "malformed",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::PoolInsertion(_) => "pool_insertion",
            Self::InvalidPolc(_) => "invalid_polc",
            Self::LunaticUnsupported { .. } => "lunatic_unsupported",
            Self::History { .. } => "history",
        }
    }
}

/// Top-level verdict error for a candidate block.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error("too much evidence: max {max}, got {got}")]
    EvidenceOverflow { max: u32, got: usize },

    #[error("evidence {} was submitted twice", hex::encode_upper(.hash))]
    DuplicateEvidence { hash: Hash },

    #[error("Invalid evidence: {source}")]
    InvalidEvidence {
        hash: Hash,
        #[source]
        source: EvidenceError,
    },
}

impl ValidationError {
    /// Short stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Header(err) => err.label(),
            Self::Commit(err) => err.label(),
            Self::EvidenceOverflow { .. } => "evidence_overflow",
            Self::DuplicateEvidence { .. } => "duplicate_evidence",
            Self::InvalidEvidence { source, .. } => source.label(),
        }
    }

    /// Which group of checks failed: `header`, `commit` or `evidence`.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Header(_) => "header",
            Self::Commit(_) => "commit",
            Self::EvidenceOverflow { .. }
            | Self::DuplicateEvidence { .. }
            | Self::InvalidEvidence { .. } => "evidence",
        }
    }
}

/// Result type for block validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polc_message_is_stable() {
        let err = EvidenceError::InvalidPolc(PolcError::NotEnoughVotingPower {
            needed: 2667,
            got: 1000,
        });
        assert_eq!(
            err.to_string(),
            "amnesia evidence contains invalid polc, err: \
             not enough voting power to reach majority needed: 2667, got 1000"
        );
    }

    #[test]
    fn test_invalid_evidence_prefix() {
        let err = ValidationError::InvalidEvidence {
            hash: [0u8; 32],
            source: EvidenceError::AlreadyCommitted,
        };
        assert_eq!(err.to_string(), "Invalid evidence: evidence was already committed");
        assert_eq!(err.label(), "already_committed");
    }

    #[test]
    fn test_header_hash_mismatch_names_field() {
        let err = HeaderError::HashMismatch {
            field: HeaderField::AppHash,
            expected: [0xAB; 32],
            got: [0u8; 32],
        };
        assert!(err.to_string().starts_with("wrong Block.Header.AppHash: expected ABAB"));
    }

    #[test]
    fn test_rejection_stage() {
        let header = ValidationError::Header(HeaderError::WrongHeight {
            expected: 2,
            got: 3,
        });
        assert_eq!((header.stage(), header.label()), ("header", "wrong_height"));

        let duplicate = ValidationError::DuplicateEvidence { hash: [0u8; 32] };
        assert_eq!(duplicate.stage(), "evidence");
    }
}
