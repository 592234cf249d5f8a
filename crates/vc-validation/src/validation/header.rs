use crate::config::{BlockTimeRule, ProposerCheck, ValidationConfig};
use crate::domain::HeaderError;
use shared_crypto::ADDRESS_SIZE;
use shared_types::{Block, ChainState, Hash, Header, HeaderField};

/// Stateless checks of a header against the chain state it extends.
pub struct HeaderValidator;

impl HeaderValidator {
    /// Run every header check in field order.
    ///
    /// Content hashes are recomputed from `block`; state-derived hashes
    /// come from `state`.
    pub fn validate(
        state: &ChainState,
        block: &Block,
        config: &ValidationConfig,
    ) -> Result<(), HeaderError> {
        let header = &block.header;
        Self::validate_version(header, state)?;
        Self::validate_chain_id(header, state)?;
        Self::validate_height(header, state)?;
        Self::validate_time(block, state, config.block_time)?;
        Self::validate_last_block_id(header, state)?;
        Self::validate_hashes(block, state)?;
        Self::validate_proposer(header, state, config.proposer_check)
    }

    /// Protocol version
    pub fn validate_version(header: &Header, state: &ChainState) -> Result<(), HeaderError> {
        if header.version != state.version {
            return Err(HeaderError::WrongVersion {
                expected: state.version,
                got: header.version,
            });
        }
        Ok(())
    }

    /// Chain id
    pub fn validate_chain_id(header: &Header, state: &ChainState) -> Result<(), HeaderError> {
        if header.chain_id != state.chain_id {
            return Err(HeaderError::WrongChainId {
                expected: state.chain_id.clone(),
                got: header.chain_id.clone(),
            });
        }
        Ok(())
    }

    /// Sequential height
    pub fn validate_height(header: &Header, state: &ChainState) -> Result<(), HeaderError> {
        let expected = state.current_height();
        if header.height != expected {
            return Err(HeaderError::WrongHeight {
                expected,
                got: header.height,
            });
        }
        Ok(())
    }

    /// Block time ordering.
    ///
    /// At the first height `last_block_time` is the genesis time.
    pub fn validate_time(
        block: &Block,
        state: &ChainState,
        rule: BlockTimeRule,
    ) -> Result<(), HeaderError> {
        let time = block.header.time;
        let last = state.last_block_time;

        if state.is_initial_height() {
            return match rule {
                BlockTimeRule::Monotonic if time < last => Err(HeaderError::TimeBeforeGenesis {
                    block: time,
                    genesis: last,
                }),
                BlockTimeRule::WeightedMedian if time != last => {
                    Err(HeaderError::TimeNotMedian {
                        block: time,
                        expected: last,
                    })
                }
                _ => Ok(()),
            };
        }

        if time <= last {
            return Err(HeaderError::TimeNotMonotonic { block: time, last });
        }
        if rule == BlockTimeRule::WeightedMedian {
            // An empty or foreign commit has no median; the commit check rejects it.
            if let Some(expected) = block.last_commit.weighted_median_time(&state.last_validators) {
                if time != expected {
                    return Err(HeaderError::TimeNotMedian {
                        block: time,
                        expected,
                    });
                }
            }
        }
        Ok(())
    }

    /// Id of the previous block
    pub fn validate_last_block_id(header: &Header, state: &ChainState) -> Result<(), HeaderError> {
        if header.last_block_id != state.last_block_id {
            return Err(HeaderError::WrongLastBlockId {
                expected: state.last_block_id,
                got: header.last_block_id,
            });
        }
        Ok(())
    }

    /// Content hashes against the block's own content, the rest against state.
    pub fn validate_hashes(block: &Block, state: &ChainState) -> Result<(), HeaderError> {
        let expected: [(HeaderField, Hash); 8] = [
            (HeaderField::LastCommitHash, block.last_commit.hash()),
            (HeaderField::DataHash, block.data.hash()),
            (HeaderField::ValidatorsHash, state.validators.hash()),
            (HeaderField::NextValidatorsHash, state.next_validators.hash()),
            (HeaderField::ConsensusHash, state.consensus_params.hash()),
            (HeaderField::AppHash, state.app_hash),
            (HeaderField::LastResultsHash, state.last_results_hash),
            (HeaderField::EvidenceHash, block.evidence.hash()),
        ];
        for (field, expected) in expected {
            let got = *field.get(&block.header);
            if got != expected {
                return Err(HeaderError::HashMismatch {
                    field,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }

    /// Proposer address length, then identity or membership.
    pub fn validate_proposer(
        header: &Header,
        state: &ChainState,
        check: ProposerCheck,
    ) -> Result<(), HeaderError> {
        let proposer = &header.proposer_address;
        if !proposer.is_valid_size() {
            return Err(HeaderError::InvalidProposerAddressSize {
                expected: ADDRESS_SIZE,
                got: proposer.len(),
            });
        }

        match check {
            ProposerCheck::Exact => {
                let expected = state
                    .validators
                    .proposer()
                    .ok_or(HeaderError::EmptyValidatorSet)?;
                if &expected.address != proposer {
                    return Err(HeaderError::WrongProposer {
                        expected: expected.address.clone(),
                        got: proposer.clone(),
                    });
                }
            }
            ProposerCheck::Membership => {
                if !state.validators.has_address(proposer) {
                    return Err(HeaderError::ProposerNotValidator(proposer.clone()));
                }
            }
        }
        Ok(())
    }
}
