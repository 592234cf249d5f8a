//! # vc-validation
//!
//! Block acceptance for a BFT chain: decides whether a candidate block
//! extends the chain state validly, and whether the misbehavior evidence
//! it carries stands.
//!
//! ## Architecture
//!
//! ```text
//! ValidationService::validate_block(state, block)
//!     │
//!     ├── HeaderValidator    version, chain id, height, time, last block id,
//!     │                      content and state hashes, proposer
//!     ├── CommitValidator    last commit: height, cardinality, block id,
//!     │                      signatures, > 2/3 voting power
//!     └── EvidenceVerifier   count, duplicates, then per item: freshness,
//!                            membership, pool, structure, signatures, kind
//! ```
//!
//! The evidence pool and validator history are ports; the in-memory
//! adapters serve tests and single-process nodes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vc_validation::{ValidationService, ValidationDependencies, ValidationConfig};
//! use vc_validation::ports::BlockValidationApi;
//!
//! let service = ValidationService::new(ValidationDependencies {
//!     evidence_pool,
//!     validator_history,
//!     config: ValidationConfig::from_env()?,
//! });
//!
//! service.validate_block(&state, &block)?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export main types
pub use adapters::{InMemoryEvidencePool, InMemoryValidatorHistory};
pub use config::{BlockTimeRule, ConfigError, ProposerCheck, ValidationConfig};
pub use domain::{
    CommitError, EvidenceError, EvidencePoolError, EvidenceVerdict, HeaderError, HistoryError,
    PolcError, ValidationError, ValidationResult, VotingPowerMajority,
};
pub use ports::{BlockValidationApi, EvidencePool, ValidatorHistory};
pub use service::{ValidationDependencies, ValidationService};
pub use validation::{CommitValidator, EvidenceVerifier, HeaderValidator};
