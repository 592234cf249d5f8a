use crate::domain::{CommitError, VotingPowerMajority};
use shared_types::{Block, BlockId, ChainState, Commit, ValidatorSet};

/// Checks that a block's last commit finalizes the previous block.
pub struct CommitValidator;

impl CommitValidator {
    /// Validate `block.last_commit` against the state it extends.
    ///
    /// The first block carries an empty commit.
    pub fn validate(state: &ChainState, block: &Block) -> Result<(), CommitError> {
        let commit = &block.last_commit;
        if state.is_initial_height() {
            if !commit.is_empty() {
                return Err(CommitError::NonEmptyInitialCommit {
                    size: commit.size(),
                });
            }
            return Ok(());
        }

        commit.validate_basic().map_err(CommitError::Malformed)?;
        Self::verify_commit(
            &state.chain_id,
            &state.last_validators,
            &state.last_block_id,
            state.last_block_height,
            commit,
        )
    }

    /// Verify that `validators` committed `block_id` at `height`.
    ///
    /// Every present slot must carry a valid precommit from the validator
    /// at the same index; only slots for the block count towards power.
    pub fn verify_commit(
        chain_id: &str,
        validators: &ValidatorSet,
        block_id: &BlockId,
        height: u64,
        commit: &Commit,
    ) -> Result<(), CommitError> {
        if commit.height != height {
            return Err(CommitError::InvalidCommitHeight {
                expected: height,
                got: commit.height,
            });
        }
        if commit.size() != validators.size() {
            return Err(CommitError::InvalidCommitSignatures {
                expected: validators.size(),
                got: commit.size(),
            });
        }
        if &commit.block_id != block_id {
            return Err(CommitError::WrongBlockId {
                expected: *block_id,
                got: commit.block_id,
            });
        }

        let mut tally: u64 = 0;
        for (index, (sig, validator)) in commit
            .signatures
            .iter()
            .zip(validators.validators())
            .enumerate()
        {
            if sig.is_absent() {
                continue;
            }
            if sig.validator_address != validator.address {
                return Err(CommitError::UnexpectedValidator {
                    index,
                    address: sig.validator_address.clone(),
                });
            }
            let vote = commit
                .get_vote(index)
                .ok_or(CommitError::InvalidCommitSignatures {
                    expected: validators.size(),
                    got: commit.size(),
                })?;
            vote.verify(chain_id, &validator.pub_key)
                .map_err(|source| CommitError::WrongSignature { index, source })?;

            if sig.for_block() {
                tally = tally.saturating_add(validator.voting_power);
            }
        }

        let majority = VotingPowerMajority::new(validators.total_voting_power());
        if !majority.is_reached(tally) {
            return Err(CommitError::InsufficientVotingPower {
                needed: majority.needed(),
                got: tally,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ChainFixture, TEST_CHAIN_ID};
    use shared_types::{BlockIdFlag, CommitSig};

    fn chain_at_height_two(validators: usize) -> ChainFixture {
        let mut chain = ChainFixture::new(validators);
        chain.commit_next_block();
        chain
    }

    #[test]
    fn test_good_commit() {
        let chain = chain_at_height_two(4);
        let block = chain.next_block();
        assert_eq!(CommitValidator::validate(chain.state(), &block), Ok(()));
    }

    #[test]
    fn test_initial_block_needs_empty_commit() {
        let chain = chain_at_height_two(1);
        let commit = chain.next_block().last_commit;

        let fresh = ChainFixture::new(1);
        let mut block = fresh.next_block();
        block.last_commit = commit;
        assert!(matches!(
            CommitValidator::validate(fresh.state(), &block),
            Err(CommitError::NonEmptyInitialCommit { size: 1 })
        ));
    }

    #[test]
    fn test_wrong_height() {
        let chain = chain_at_height_two(1);
        let mut block = chain.next_block();
        block.last_commit.height = block.header.height;

        assert!(matches!(
            CommitValidator::validate(chain.state(), &block),
            Err(CommitError::InvalidCommitHeight { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_wrong_cardinality() {
        let chain = chain_at_height_two(1);
        let mut block = chain.next_block();
        let extra = block.last_commit.signatures[0].clone();
        block.last_commit.signatures.push(extra);

        assert!(matches!(
            CommitValidator::validate(chain.state(), &block),
            Err(CommitError::InvalidCommitSignatures { expected: 1, got: 2 })
        ));
    }

    #[test]
    fn test_bad_signature_content() {
        let chain = chain_at_height_two(3);
        let mut block = chain.next_block();
        block.last_commit.signatures[1].signature[0] ^= 0xFF;

        assert!(matches!(
            CommitValidator::validate(chain.state(), &block),
            Err(CommitError::WrongSignature { index: 1, .. })
        ));
    }

    #[test]
    fn test_slot_from_other_validator() {
        let chain = chain_at_height_two(3);
        let mut block = chain.next_block();
        block.last_commit.signatures.swap(0, 1);

        assert!(matches!(
            CommitValidator::validate(chain.state(), &block),
            Err(CommitError::UnexpectedValidator { index: 0, .. })
        ));
    }

    #[test]
    fn test_insufficient_power() {
        let chain = chain_at_height_two(4);
        let mut block = chain.next_block();
        block.last_commit.signatures[2] = CommitSig::absent();
        assert_eq!(CommitValidator::validate(chain.state(), &block), Ok(()));

        block.last_commit.signatures[3] = CommitSig::absent();
        assert!(matches!(
            CommitValidator::validate(chain.state(), &block),
            Err(CommitError::InsufficientVotingPower { needed: 27, got: 20 })
        ));
    }

    #[test]
    fn test_nil_precommit_is_verified_but_not_counted() {
        let chain = chain_at_height_two(4);
        let mut block = chain.next_block();
        let nil_vote = chain.precommit(3, 1, BlockId::default());
        block.last_commit.signatures[3] = nil_vote.commit_sig();
        assert_eq!(block.last_commit.signatures[3].block_id_flag, BlockIdFlag::Nil);
        assert_eq!(CommitValidator::validate(chain.state(), &block), Ok(()));

        block.last_commit.signatures[3].signature[0] ^= 0xFF;
        assert!(matches!(
            CommitValidator::validate(chain.state(), &block),
            Err(CommitError::WrongSignature { index: 3, .. })
        ));
    }

    #[test]
    fn test_commit_for_other_block() {
        let chain = chain_at_height_two(2);
        let mut block = chain.next_block();
        block.last_commit.block_id.hash = [0xAA; 32];

        assert!(matches!(
            CommitValidator::verify_commit(
                TEST_CHAIN_ID,
                &chain.state().last_validators,
                &chain.state().last_block_id,
                1,
                &block.last_commit
            ),
            Err(CommitError::WrongBlockId { .. })
        ));
    }
}
