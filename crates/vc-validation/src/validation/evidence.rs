use crate::domain::{
    EvidenceError, EvidenceVerdict, PolcError, ValidationError, VotingPowerMajority,
};
use crate::ports::{EvidencePool, ValidatorHistory};
use shared_crypto::PublicKey;
use shared_types::{
    AmnesiaEvidence, ChainState, Evidence, EvidenceList, PhantomValidatorEvidence,
    ProofOfLockChange, ValidatorSet,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// Judges evidence against chain state, validator history and the pool.
///
/// Per item, in order: freshness, membership of the accused, pool
/// consultation, structure and signatures, then the kind-specific rule.
pub struct EvidenceVerifier;

impl EvidenceVerifier {
    /// Check every item a block carries.
    ///
    /// Count and duplicates are checked before any item is verified, so a
    /// rejected list never reaches the pool.
    pub fn validate_block_evidence<P, H>(
        state: &ChainState,
        evidence: &EvidenceList,
        pool: &P,
        history: &H,
    ) -> Result<Vec<EvidenceVerdict>, ValidationError>
    where
        P: EvidencePool + ?Sized,
        H: ValidatorHistory + ?Sized,
    {
        let max = state.consensus_params.evidence.max_num;
        if evidence.len() > max as usize {
            return Err(ValidationError::EvidenceOverflow {
                max,
                got: evidence.len(),
            });
        }

        let mut seen = HashSet::with_capacity(evidence.len());
        for item in evidence.iter() {
            let hash = item.hash();
            if !seen.insert(hash) {
                return Err(ValidationError::DuplicateEvidence { hash });
            }
        }

        evidence
            .iter()
            .map(|item| {
                Self::verify(state, item, pool, history).map_err(|source| {
                    ValidationError::InvalidEvidence {
                        hash: item.hash(),
                        source,
                    }
                })
            })
            .collect()
    }

    /// Verify one item.
    pub fn verify<P, H>(
        state: &ChainState,
        evidence: &Evidence,
        pool: &P,
        history: &H,
    ) -> Result<EvidenceVerdict, EvidenceError>
    where
        P: EvidencePool + ?Sized,
        H: ValidatorHistory + ?Sized,
    {
        Self::check_freshness(state, evidence)?;
        let accused_key = Self::check_membership(state, evidence, history)?;

        if pool.is_committed(evidence) {
            return Err(EvidenceError::AlreadyCommitted);
        }
        if pool.is_pending(evidence) {
            debug!(kind = evidence.kind(), height = evidence.height(), "Evidence already pending");
            return Ok(EvidenceVerdict::AlreadyPending);
        }

        evidence.validate_basic().map_err(EvidenceError::Malformed)?;
        evidence
            .verify(&state.chain_id, &accused_key)
            .map_err(EvidenceError::InvalidSignature)?;

        match evidence {
            Evidence::DuplicateVote(_) | Evidence::PhantomValidator(_) => {
                Ok(EvidenceVerdict::Verified)
            }
            Evidence::PotentialAmnesia(_) => Self::forward_undecided(evidence, pool),
            Evidence::Amnesia(amnesia) => match &amnesia.polc {
                None => Self::forward_undecided(evidence, pool),
                Some(polc) => {
                    Self::check_polc(state, amnesia, polc, history)?;
                    Ok(EvidenceVerdict::LockChangeJustified)
                }
            },
            Evidence::LunaticValidator(lunatic) => Err(EvidenceError::LunaticUnsupported {
                field: lunatic.invalid_header_field,
            }),
        }
    }

    /// Reject evidence older than the configured age or from the future.
    ///
    /// Age is measured in blocks from the height being decided.
    pub fn check_freshness(state: &ChainState, evidence: &Evidence) -> Result<(), EvidenceError> {
        let current = state.current_height();
        let height = evidence.height();
        if height > current {
            return Err(EvidenceError::FromFuture { height, current });
        }

        let max_age = state.consensus_params.evidence.max_age_num_blocks;
        if current - height > max_age {
            return Err(EvidenceError::TooOld {
                height,
                time: evidence.time(),
                min_height: current.saturating_sub(max_age),
                max_age,
            });
        }
        Ok(())
    }

    /// Resolve the key the accused's signatures are checked against.
    ///
    /// The accused must have been a validator at the evidence height,
    /// except for phantom accusations which claim the opposite.
    fn check_membership<H>(
        state: &ChainState,
        evidence: &Evidence,
        history: &H,
    ) -> Result<PublicKey, EvidenceError>
    where
        H: ValidatorHistory + ?Sized,
    {
        let height = evidence.height();
        let address = evidence.address();
        let validators = Self::validators_at(history, height)?;

        if let Evidence::PhantomValidator(phantom) = evidence {
            if validators.has_address(address) {
                return Err(EvidenceError::PhantomStillValidator {
                    address: address.clone(),
                    height,
                });
            }
            return Self::check_phantom_history(state, phantom, history);
        }

        validators
            .get_by_address(address)
            .map(|(_, validator)| validator.pub_key.clone())
            .ok_or_else(|| EvidenceError::NotAValidator {
                address: address.clone(),
                height,
            })
    }

    /// The accused left the set recently enough and really was in it at
    /// the claimed height.
    fn check_phantom_history<H>(
        state: &ChainState,
        phantom: &PhantomValidatorEvidence,
        history: &H,
    ) -> Result<PublicKey, EvidenceError>
    where
        H: ValidatorHistory + ?Sized,
    {
        let last = phantom.last_height_validator_was_in_set;
        let current = state.current_height();
        let max_age = state.consensus_params.evidence.max_age_num_blocks;
        if current.saturating_sub(last) > max_age {
            return Err(EvidenceError::PhantomTooOld {
                last,
                min_height: current.saturating_sub(max_age),
            });
        }

        let address = &phantom.vote.validator_address;
        Self::validators_at(history, last)?
            .get_by_address(address)
            .map(|(_, validator)| validator.pub_key.clone())
            .ok_or_else(|| EvidenceError::PhantomNotFound {
                address: address.clone(),
                height: last,
            })
    }

    /// A proof of lock change stands when its prevotes verify and carry
    /// a two-thirds majority of the set at the proof's height.
    fn check_polc<H>(
        state: &ChainState,
        amnesia: &AmnesiaEvidence,
        polc: &ProofOfLockChange,
        history: &H,
    ) -> Result<(), EvidenceError>
    where
        H: ValidatorHistory + ?Sized,
    {
        let height = polc.height().unwrap_or(amnesia.potential.vote_b.height);
        let validators = Self::validators_at(history, height)?;
        Self::tally_polc(&state.chain_id, polc, &validators).map_err(EvidenceError::InvalidPolc)
    }

    fn tally_polc(
        chain_id: &str,
        polc: &ProofOfLockChange,
        validators: &ValidatorSet,
    ) -> Result<(), PolcError> {
        let mut tally: u64 = 0;
        for vote in &polc.votes {
            let (_, validator) = validators
                .get_by_address(&vote.validator_address)
                .ok_or_else(|| PolcError::UnknownVoter(vote.validator_address.clone()))?;
            vote.verify(chain_id, &validator.pub_key)
                .map_err(PolcError::InvalidVote)?;
            tally = tally.saturating_add(validator.voting_power);
        }

        let majority = VotingPowerMajority::new(validators.total_voting_power());
        if !majority.is_reached(tally) {
            return Err(PolcError::NotEnoughVotingPower {
                needed: majority.needed(),
                got: tally,
            });
        }
        Ok(())
    }

    fn forward_undecided<P>(evidence: &Evidence, pool: &P) -> Result<EvidenceVerdict, EvidenceError>
    where
        P: EvidencePool + ?Sized,
    {
        pool.add_evidence(evidence.clone())
            .map_err(EvidenceError::PoolInsertion)?;
        info!(
            kind = evidence.kind(),
            height = evidence.height(),
            address = %evidence.address(),
            "Undecided amnesia evidence added to pool"
        );
        Ok(EvidenceVerdict::UndecidedForwarded)
    }

    fn validators_at<H>(history: &H, height: u64) -> Result<ValidatorSet, EvidenceError>
    where
        H: ValidatorHistory + ?Sized,
    {
        history
            .validators_at(height)
            .map_err(|source| EvidenceError::History { height, source })
    }
}
