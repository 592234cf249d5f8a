//! Driven ports (Outbound dependencies)

use crate::domain::{EvidencePoolError, HistoryError};
use shared_types::{Evidence, ValidatorSet};

/// Store of evidence awaiting or past adjudication.
///
/// Implementations shared across callers must be thread-safe. Calls are
/// synchronous and are never retried by validation.
pub trait EvidencePool: Send + Sync {
    /// Whether the item is known and awaiting adjudication.
    fn is_pending(&self, evidence: &Evidence) -> bool;

    /// Whether the item was already included in a committed block.
    fn is_committed(&self, evidence: &Evidence) -> bool;

    /// Add an item for later adjudication.
    ///
    /// The only mutation validation performs.
    fn add_evidence(&self, evidence: Evidence) -> Result<(), EvidencePoolError>;
}

/// Validator sets at past heights.
pub trait ValidatorHistory: Send + Sync {
    /// The set that validated the block at `height`.
    fn validators_at(&self, height: u64) -> Result<ValidatorSet, HistoryError>;
}
