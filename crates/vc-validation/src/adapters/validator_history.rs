//! In-memory validator history
//!
//! Sets are recorded at the height they take effect; a lookup answers
//! with the most recent set at or below the requested height.

use crate::domain::HistoryError;
use crate::ports::ValidatorHistory;
use parking_lot::RwLock;
use shared_types::ValidatorSet;
use std::collections::BTreeMap;

/// In-memory validator history adapter.
#[derive(Default)]
pub struct InMemoryValidatorHistory {
    sets: RwLock<BTreeMap<u64, ValidatorSet>>,
}

impl InMemoryValidatorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// History starting with `validators` at `height`.
    pub fn starting_at(height: u64, validators: ValidatorSet) -> Self {
        let history = Self::new();
        history.record(height, validators);
        history
    }

    /// Record the set that validates blocks from `height` on.
    pub fn record(&self, height: u64, validators: ValidatorSet) {
        self.sets.write().insert(height, validators);
    }

    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.read().is_empty()
    }
}

impl ValidatorHistory for InMemoryValidatorHistory {
    fn validators_at(&self, height: u64) -> Result<ValidatorSet, HistoryError> {
        self.sets
            .read()
            .range(..=height)
            .next_back()
            .map(|(_, set)| set.clone())
            .ok_or(HistoryError::NotFound(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::Validator;

    fn set(seeds: &[u8]) -> ValidatorSet {
        ValidatorSet::new(
            seeds
                .iter()
                .map(|&seed| {
                    Validator::new(Ed25519KeyPair::from_seed([seed; 32]).public_key().into(), 10)
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_lookup_uses_latest_set_at_or_below() {
        let history = InMemoryValidatorHistory::starting_at(1, set(&[1, 2]));
        history.record(5, set(&[3]));

        assert_eq!(history.validators_at(0), Err(HistoryError::NotFound(0)));
        assert_eq!(history.validators_at(4).unwrap().size(), 2);
        assert_eq!(history.validators_at(5).unwrap().size(), 1);
        assert_eq!(history.validators_at(100).unwrap().size(), 1);
        assert_eq!(history.len(), 2);
    }
}
