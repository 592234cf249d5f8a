//! Driving ports (Inbound API)

use crate::domain::{EvidenceError, EvidenceVerdict, ValidationError};
use shared_types::{Block, ChainState, Evidence};

/// Block acceptance API.
///
/// Calls are deterministic in their inputs and the collaborators' answers:
/// every honest node reaches the same verdict for the same block.
pub trait BlockValidationApi: Send + Sync {
    /// Validate a candidate block against the state after the previous one.
    ///
    /// Checks the header, then the last commit, then the evidence.
    fn validate_block(&self, state: &ChainState, block: &Block) -> Result<(), ValidationError>;

    /// Verify a single evidence item, e.g. one received over gossip.
    fn verify_evidence(
        &self,
        state: &ChainState,
        evidence: &Evidence,
    ) -> Result<EvidenceVerdict, EvidenceError>;
}
