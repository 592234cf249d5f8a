//! # Error Types
//!
//! Structural errors raised while checking chain entities on their own,
//! before any chain state is consulted.

use crate::HeaderField;
use shared_crypto::{Address, CryptoError};
use thiserror::Error;

/// Errors found by `validate_basic` and signature checks on entities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Height zero is reserved for "no block".
    #[error("height must be positive")]
    ZeroHeight,

    /// Validator address of the wrong length.
    #[error("expected validator address size {expected}, got {actual}")]
    InvalidAddressSize { expected: usize, actual: usize },

    /// Signature absent where one is required.
    #[error("signature is missing")]
    MissingSignature,

    /// Signature larger than any key type produces.
    #[error("signature is too big: {size} > {max}")]
    SignatureTooLarge { size: usize, max: usize },

    /// Signature does not verify under the signer's key.
    #[error("invalid signature from {address}: {source}")]
    InvalidSignature {
        address: Address,
        #[source]
        source: CryptoError,
    },

    /// Vote claims an address other than the key's.
    #[error("vote address {vote} does not match key address {key}")]
    AddressMismatch { vote: Address, key: Address },

    /// The two votes of an accusation disagree on a field they must share.
    #[error("conflicting votes differ in {0}")]
    VoteFieldMismatch(&'static str),

    /// The two votes of a double-sign accusation are for the same block.
    #[error("conflicting votes are for the same block")]
    SameBlockId,

    /// Double-sign votes must be ordered by block id.
    #[error("conflicting votes must be ordered by block id")]
    VoteOrder,

    /// Amnesia votes must come from increasing rounds.
    #[error("votes must be in increasing rounds: {first} >= {second}")]
    RoundOrder { first: u32, second: u32 },

    /// Malformed proof of lock change.
    #[error("invalid proof of lock change: {0}")]
    InvalidPolc(String),

    /// Header and vote of an evidence item disagree.
    #[error("header and vote disagree: {0}")]
    HeaderVoteMismatch(String),

    /// Phantom evidence claims an impossible last height.
    #[error("last height validator was in set {last} must be in [1, {height})")]
    InvalidLastHeight { last: u64, height: u64 },

    /// Lunatic evidence names a field the state does not determine.
    #[error("{0} is not a state-derived header field")]
    InvalidHeaderField(HeaderField),

    /// A commit signature slot is malformed.
    #[error("commit signature #{index}: {reason}")]
    InvalidCommitSig { index: usize, reason: String },

    /// Commit for a block is missing a block id or signatures.
    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// Validator listed twice in one set.
    #[error("duplicate validator {0}")]
    DuplicateValidator(Address),

    /// Validator with no voting power.
    #[error("validator {0} has zero voting power")]
    ZeroVotingPower(Address),

    /// Sum of voting power does not fit in 64 bits.
    #[error("total voting power overflows")]
    VotingPowerOverflow,

    /// Key could not be encoded or decoded.
    #[error("key encoding: {0}")]
    Key(#[from] CryptoError),

    /// Validator set JSON is malformed.
    #[error("malformed validator set: {0}")]
    MalformedValidatorSet(String),
}

impl TypeError {
    /// Short stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ZeroHeight => "zero_height",
            Self::InvalidAddressSize { .. } => "invalid_address_size",
            Self::MissingSignature => "missing_signature",
            Self::SignatureTooLarge { .. } => "signature_too_large",
            Self::InvalidSignature { .. } => "invalid_signature",
            Self::AddressMismatch { .. } => "address_mismatch",
            Self::VoteFieldMismatch(_) => "vote_field_mismatch",
            Self::SameBlockId => "same_block_id",
            Self::VoteOrder => "vote_order",
            Self::RoundOrder { .. } => "round_order",
            Self::InvalidPolc(_) => "invalid_polc",
            Self::HeaderVoteMismatch(_) => "header_vote_mismatch",
            Self::InvalidLastHeight { .. } => "invalid_last_height",
            Self::InvalidHeaderField(_) => "invalid_header_field",
            Self::InvalidCommitSig { .. } => "invalid_commit_sig",
            Self::InvalidCommit(_) => "invalid_commit",
            Self::DuplicateValidator(_) => "duplicate_validator",
            Self::ZeroVotingPower(_) => "zero_voting_power",
            Self::VotingPowerOverflow => "voting_power_overflow",
            Self::Key(_) => "key_encoding",
            Self::MalformedValidatorSet(_) => "malformed_validator_set",
        }
    }
}
