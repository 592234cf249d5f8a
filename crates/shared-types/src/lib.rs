//! # Shared Types Crate
//!
//! Chain entities consumed by block validation: votes, commits, headers,
//! blocks, validator sets, consensus parameters, the chain state snapshot,
//! and the closed set of evidence kinds.
//!
//! ## Design Principles
//!
//! - **Canonical sign bytes**: a vote's signature covers chain id, type,
//!   height, round, block id and timestamp only.
//! - **Stateless checks here**: `validate_basic` and signature checks need
//!   no chain state; stateful rules live in `vc-validation`.
//! - **Deterministic hashing**: every hash is SHA-256 over length-prefixed
//!   fields, lists via a padded Merkle root.

pub mod block;
pub mod commit;
pub mod errors;
pub mod evidence;
pub mod params;
pub mod state;
pub mod validator;
pub mod vote;

pub use block::{Block, ConsensusVersion, Data, Header, HeaderField};
pub use commit::{BlockIdFlag, Commit, CommitSig};
pub use errors::TypeError;
pub use evidence::{
    AmnesiaEvidence, DuplicateVoteEvidence, Evidence, EvidenceList, LunaticValidatorEvidence,
    PhantomValidatorEvidence, PotentialAmnesiaEvidence, ProofOfLockChange,
};
pub use params::{BlockParams, ConsensusParams, EvidenceParams};
pub use state::ChainState;
pub use validator::{Validator, ValidatorSet};
pub use vote::{canonical_vote_bytes, BlockId, PartSetHeader, Vote, VoteType, MAX_SIGNATURE_SIZE};

pub use shared_crypto::hashing::Hash;
pub use shared_crypto::Address;
