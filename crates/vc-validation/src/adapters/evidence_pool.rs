//! In-memory evidence pool
//!
//! Implements the EvidencePool port by evidence hash.

use crate::domain::EvidencePoolError;
use crate::ports::EvidencePool;
use parking_lot::RwLock;
use shared_types::{Evidence, Hash};
use std::collections::HashMap;

#[derive(Default)]
struct PoolState {
    pending: HashMap<Hash, Evidence>,
    committed: HashMap<Hash, u64>,
}

/// In-memory evidence pool adapter for testing and single-process nodes.
#[derive(Default)]
pub struct InMemoryEvidencePool {
    state: RwLock<PoolState>,
}

impl InMemoryEvidencePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `evidence` as included in the block at `height`.
    pub fn mark_committed(&self, evidence: &Evidence, height: u64) {
        let hash = evidence.hash();
        let mut state = self.state.write();
        state.pending.remove(&hash);
        state.committed.insert(hash, height);
    }

    /// Height at which `evidence` was committed.
    pub fn committed_at(&self, evidence: &Evidence) -> Option<u64> {
        self.state.read().committed.get(&evidence.hash()).copied()
    }

    pub fn pending_count(&self) -> usize {
        self.state.read().pending.len()
    }

    /// Pending items, in no particular order.
    pub fn pending_evidence(&self) -> Vec<Evidence> {
        self.state.read().pending.values().cloned().collect()
    }
}

impl EvidencePool for InMemoryEvidencePool {
    fn is_pending(&self, evidence: &Evidence) -> bool {
        self.state.read().pending.contains_key(&evidence.hash())
    }

    fn is_committed(&self, evidence: &Evidence) -> bool {
        self.state.read().committed.contains_key(&evidence.hash())
    }

    fn add_evidence(&self, evidence: Evidence) -> Result<(), EvidencePoolError> {
        let hash = evidence.hash();
        let mut state = self.state.write();
        if state.committed.contains_key(&hash) {
            return Err(EvidencePoolError::Rejected(
                "evidence was already committed".to_string(),
            ));
        }
        state.pending.entry(hash).or_insert(evidence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ChainFixture;
    use shared_types::{PotentialAmnesiaEvidence, VoteType};

    fn amnesia(chain: &ChainFixture) -> Evidence {
        Evidence::PotentialAmnesia(PotentialAmnesiaEvidence {
            vote_a: chain.vote(0, VoteType::Prevote, 1, 0, chain.block_id_for(b"a")),
            vote_b: chain.vote(0, VoteType::Prevote, 1, 1, chain.block_id_for(b"b")),
        })
    }

    #[test]
    fn test_pending_then_committed() {
        let chain = ChainFixture::new(1);
        let pool = InMemoryEvidencePool::new();
        let evidence = amnesia(&chain);

        pool.add_evidence(evidence.clone()).unwrap();
        pool.add_evidence(evidence.clone()).unwrap();
        assert!(pool.is_pending(&evidence));
        assert_eq!(pool.pending_count(), 1);

        pool.mark_committed(&evidence, 4);
        assert!(!pool.is_pending(&evidence));
        assert!(pool.is_committed(&evidence));
        assert_eq!(pool.committed_at(&evidence), Some(4));
        assert!(matches!(
            pool.add_evidence(evidence),
            Err(EvidencePoolError::Rejected(_))
        ));
    }
}
