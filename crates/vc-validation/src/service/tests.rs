use super::*;
use crate::adapters::{InMemoryEvidencePool, InMemoryValidatorHistory};
use crate::domain::{EvidencePoolError, PolcError};
use crate::test_utils::{genesis_time, init_tracing, ChainFixture, MockPV};
use shared_types::{
    AmnesiaEvidence, ConsensusParams, DuplicateVoteEvidence, EvidenceList, HeaderField,
    LunaticValidatorEvidence, PhantomValidatorEvidence, PotentialAmnesiaEvidence,
    ProofOfLockChange, TypeError, VoteType,
};
use std::sync::atomic::{AtomicU64, Ordering};

// Mock implementations for testing
#[derive(Default)]
struct MockEvidencePool {
    pending: bool,
    committed: bool,
    add_error: Option<String>,
    added: AtomicU64,
}

impl MockEvidencePool {
    fn pending() -> Self {
        Self {
            pending: true,
            ..Self::default()
        }
    }

    fn committed() -> Self {
        Self {
            committed: true,
            ..Self::default()
        }
    }

    fn failing(reason: &str) -> Self {
        Self {
            add_error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    fn added(&self) -> u64 {
        self.added.load(Ordering::SeqCst)
    }
}

impl EvidencePool for MockEvidencePool {
    fn is_pending(&self, _evidence: &Evidence) -> bool {
        self.pending
    }

    fn is_committed(&self, _evidence: &Evidence) -> bool {
        self.committed
    }

    fn add_evidence(&self, _evidence: Evidence) -> Result<(), EvidencePoolError> {
        if let Some(reason) = &self.add_error {
            return Err(EvidencePoolError::Rejected(reason.clone()));
        }
        self.added.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn service<P: EvidencePool>(
    chain: &ChainFixture,
    pool: P,
) -> ValidationService<P, InMemoryValidatorHistory> {
    init_tracing();
    ValidationService::new(ValidationDependencies {
        evidence_pool: Arc::new(pool),
        validator_history: Arc::clone(chain.history()),
        config: ValidationConfig::default(),
    })
}

fn duplicate_vote(chain: &ChainFixture, index: usize, height: u64, seed: u8) -> Evidence {
    Evidence::DuplicateVote(DuplicateVoteEvidence::new(
        chain.vote(index, VoteType::Prevote, height, 0, chain.block_id_for(&[seed, 1])),
        chain.vote(index, VoteType::Prevote, height, 0, chain.block_id_for(&[seed, 2])),
    ))
}

fn potential_amnesia(chain: &ChainFixture, index: usize, height: u64) -> PotentialAmnesiaEvidence {
    PotentialAmnesiaEvidence {
        vote_a: chain.vote(index, VoteType::Prevote, height, 1, chain.block_id_for(b"locked")),
        vote_b: chain.vote(index, VoteType::Prevote, height, 2, chain.block_id_for(b"changed")),
    }
}

fn polc(chain: &ChainFixture, accused: usize, voters: &[usize], height: u64) -> ProofOfLockChange {
    ProofOfLockChange {
        votes: voters
            .iter()
            .map(|&index| {
                chain.vote(index, VoteType::Prevote, height, 2, chain.block_id_for(b"changed"))
            })
            .collect(),
        pub_key: chain.pv(accused).pub_key().clone(),
    }
}

// === BLOCK VALIDATION ===

#[test]
fn test_validate_good_blocks_over_many_heights() {
    let mut chain = ChainFixture::new(4);
    let service = service(&chain, InMemoryEvidencePool::new());

    for _ in 0..6 {
        let block = chain.next_block();
        assert_eq!(service.validate_block(chain.state(), &block), Ok(()));
        chain.commit_block(&block);
    }
    assert_eq!(chain.state().last_block_height, 6);
}

#[test]
fn test_header_error_is_surfaced() {
    let chain = ChainFixture::new(1);
    let service = service(&chain, InMemoryEvidencePool::new());
    let mut block = chain.next_block();
    block.header.chain_id = "other-chain".to_string();

    let err = service.validate_block(chain.state(), &block).unwrap_err();
    assert_eq!(err.label(), "wrong_chain_id");
}

#[test]
fn test_commit_error_is_surfaced() {
    let mut chain = ChainFixture::new(1);
    chain.advance(1);
    let service = service(&chain, InMemoryEvidencePool::new());
    let mut block = chain.next_block();
    block.last_commit.height = 2;
    block.fill_header();

    assert!(matches!(
        service.validate_block(chain.state(), &block),
        Err(ValidationError::Commit(
            crate::domain::CommitError::InvalidCommitHeight { expected: 1, got: 2 }
        ))
    ));
}

// === EVIDENCE IN BLOCKS ===

#[test]
fn test_evidence_count_ceiling() {
    let mut params = ConsensusParams::default();
    params.evidence.max_num = 3;
    let mut chain = ChainFixture::with_params(1, 10, params);
    chain.advance(1);
    let service = service(&chain, InMemoryEvidencePool::new());

    let at_max: Vec<Evidence> = (0..3).map(|seed| duplicate_vote(&chain, 0, 1, seed)).collect();
    let block = chain.next_block_with_evidence(at_max);
    assert_eq!(
        service.validate_block_verdicts(chain.state(), &block),
        Ok(vec![EvidenceVerdict::Verified; 3])
    );

    let over: Vec<Evidence> = (0..4).map(|seed| duplicate_vote(&chain, 0, 1, seed)).collect();
    let block = chain.next_block_with_evidence(over);
    assert_eq!(
        service.validate_block(chain.state(), &block),
        Err(ValidationError::EvidenceOverflow { max: 3, got: 4 })
    );
}

#[test]
fn test_committed_evidence_rejected() {
    let mut chain = ChainFixture::new(2);
    chain.advance(1);
    let service = service(&chain, MockEvidencePool::committed());
    let block = chain.next_block_with_evidence(vec![duplicate_vote(&chain, 1, 1, 0)]);

    match service.validate_block(chain.state(), &block) {
        Err(ValidationError::InvalidEvidence { source, .. }) => {
            assert_eq!(source, EvidenceError::AlreadyCommitted)
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_pending_evidence_accepted_without_rechecking() {
    let mut chain = ChainFixture::new(2);
    chain.advance(1);
    let service = service(&chain, MockEvidencePool::pending());
    let mut evidence = duplicate_vote(&chain, 1, 1, 0);
    if let Evidence::DuplicateVote(ev) = &mut evidence {
        ev.vote_b.signature = vec![0u8; 64];
    }

    assert_eq!(
        service.verify_evidence(chain.state(), &evidence),
        Ok(EvidenceVerdict::AlreadyPending)
    );
    let block = chain.next_block_with_evidence(vec![evidence]);
    assert_eq!(service.validate_block(chain.state(), &block), Ok(()));
}

#[test]
fn test_duplicate_evidence_in_block() {
    let mut chain = ChainFixture::new(2);
    chain.advance(1);
    let pool = MockEvidencePool::default();
    let service = service(&chain, pool);
    let first = duplicate_vote(&chain, 0, 1, 0);
    let second = duplicate_vote(&chain, 1, 1, 0);
    let block = chain.next_block_with_evidence(vec![first, second.clone(), second.clone()]);

    assert_eq!(
        service.validate_block(chain.state(), &block),
        Err(ValidationError::DuplicateEvidence {
            hash: second.hash()
        })
    );
}

#[test]
fn test_swapped_duplicate_votes_count_once() {
    let mut chain = ChainFixture::new(3);
    chain.advance(2);
    let service = service(&chain, MockEvidencePool::default());
    let canonical = duplicate_vote(&chain, 1, 2, 0);
    let swapped = match &canonical {
        Evidence::DuplicateVote(ev) => Evidence::DuplicateVote(DuplicateVoteEvidence {
            vote_a: ev.vote_b.clone(),
            vote_b: ev.vote_a.clone(),
        }),
        _ => unreachable!(),
    };
    assert_eq!(swapped.hash(), canonical.hash());

    let block = chain.next_block_with_evidence(vec![canonical.clone(), swapped.clone()]);
    assert_eq!(
        service.validate_block_verdicts(chain.state(), &block),
        Err(ValidationError::DuplicateEvidence {
            hash: canonical.hash()
        })
    );

    // Alone, the swapped pair is malformed
    assert!(matches!(
        service.verify_evidence(chain.state(), &swapped),
        Err(EvidenceError::Malformed(TypeError::VoteOrder))
    ));
}

// === AMNESIA ===

#[test]
fn test_amnesia_pool_failure() {
    let mut chain = ChainFixture::new(1);
    chain.advance(1);
    let service = service(&chain, MockEvidencePool::failing("test error"));
    let evidence = Evidence::Amnesia(AmnesiaEvidence {
        potential: potential_amnesia(&chain, 0, 1),
        polc: None,
    });

    let err = service.verify_evidence(chain.state(), &evidence).unwrap_err();
    assert!(err
        .to_string()
        .starts_with("unknown amnesia evidence, trying to add to evidence pool, err: test error"));

    let block = chain.next_block_with_evidence(vec![evidence]);
    let err = service.validate_block(chain.state(), &block).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid evidence: unknown amnesia evidence, trying to add to evidence pool, err: test error"
    );
}

#[test]
fn test_undecided_amnesia_forwarded_once() {
    let mut chain = ChainFixture::new(1);
    chain.advance(1);
    let service = service(&chain, InMemoryEvidencePool::new());
    let evidence = Evidence::PotentialAmnesia(potential_amnesia(&chain, 0, 1));

    assert_eq!(
        service.verify_evidence(chain.state(), &evidence),
        Ok(EvidenceVerdict::UndecidedForwarded)
    );
    assert_eq!(service.evidence_pool().pending_count(), 1);
    assert_eq!(
        service.verify_evidence(chain.state(), &evidence),
        Ok(EvidenceVerdict::AlreadyPending)
    );
    assert_eq!(service.evidence_pool().pending_count(), 1);
}

#[test]
fn test_amnesia_with_polc() {
    let mut params = ConsensusParams::default();
    params.evidence.max_age_num_blocks = 10;
    let mut chain = ChainFixture::with_params(4, 1000, params);
    chain.advance(1);
    let pool = MockEvidencePool::default();
    let service = service(&chain, pool);

    let weak = Evidence::Amnesia(AmnesiaEvidence {
        potential: potential_amnesia(&chain, 0, 1),
        polc: Some(polc(&chain, 0, &[1], 1)),
    });
    let err = service.verify_evidence(chain.state(), &weak).unwrap_err();
    assert_eq!(
        err,
        EvidenceError::InvalidPolc(PolcError::NotEnoughVotingPower {
            needed: 2667,
            got: 1000
        })
    );
    assert!(err
        .to_string()
        .ends_with("not enough voting power to reach majority needed: 2667, got 1000"));

    let strong = Evidence::Amnesia(AmnesiaEvidence {
        potential: potential_amnesia(&chain, 0, 1),
        polc: Some(polc(&chain, 0, &[1, 2, 3], 1)),
    });
    assert_eq!(
        service.verify_evidence(chain.state(), &strong),
        Ok(EvidenceVerdict::LockChangeJustified)
    );
    // Neither outcome touches the pool
    assert_eq!(service.evidence_pool().added(), 0);
}

#[test]
fn test_polc_with_forged_prevote() {
    let mut chain = ChainFixture::with_params(4, 1000, ConsensusParams::default());
    chain.advance(1);
    let service = service(&chain, MockEvidencePool::default());

    let mut proof = polc(&chain, 0, &[1, 2, 3], 1);
    proof.votes[2].signature[0] ^= 0xFF;
    let evidence = Evidence::Amnesia(AmnesiaEvidence {
        potential: potential_amnesia(&chain, 0, 1),
        polc: Some(proof),
    });

    assert!(matches!(
        service.verify_evidence(chain.state(), &evidence),
        Err(EvidenceError::InvalidPolc(PolcError::InvalidVote(
            TypeError::InvalidSignature { .. }
        )))
    ));
}

// === MEMBERSHIP AND AGE ===

#[test]
fn test_accused_not_a_validator() {
    let mut chain = ChainFixture::new(2);
    chain.advance(1);
    let service = service(&chain, MockEvidencePool::default());

    let stranger = MockPV::random();
    let block_a = chain.block_id_for(b"a");
    let block_b = chain.block_id_for(b"b");
    let vote = |block_id| {
        stranger.make_vote(
            &chain.state().chain_id,
            VoteType::Prevote,
            1,
            0,
            block_id,
            genesis_time(),
            0,
        )
    };
    let evidence = Evidence::DuplicateVote(DuplicateVoteEvidence::new(vote(block_a), vote(block_b)));

    let block = chain.next_block_with_evidence(vec![evidence]);
    let err = service.validate_block(chain.state(), &block).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Invalid evidence: address {} was not a validator at height 1",
            stranger.address()
        )
    );
}

#[test]
fn test_expired_evidence() {
    let mut params = ConsensusParams::default();
    params.evidence.max_age_num_blocks = 1;
    let mut chain = ChainFixture::with_params(1, 10, params);
    chain.advance(3);
    let service = service(&chain, MockEvidencePool::default());
    let block = chain.next_block_with_evidence(vec![duplicate_vote(&chain, 0, 1, 0)]);

    let err = service.validate_block(chain.state(), &block).unwrap_err();
    assert!(
        err.to_string().starts_with(
            "Invalid evidence: evidence from height 1 (created at: 2019-01-01 00:00:00 UTC) is too old"
        ),
        "{err}"
    );
}

// === PHANTOM AND LUNATIC ===

#[test]
fn test_phantom_validator_still_in_set() {
    let mut chain = ChainFixture::new(4);
    chain.advance(2);
    let service = service(&chain, MockEvidencePool::default());
    let header = chain.next_block().header;
    let block_id = chain.block_id_for(b"phantom");
    let evidence = Evidence::PhantomValidator(PhantomValidatorEvidence {
        vote: chain.vote(0, VoteType::Prevote, 2, 0, block_id),
        header: shared_types::Header { height: 2, ..header },
        last_height_validator_was_in_set: 1,
    });

    assert!(matches!(
        service.verify_evidence(chain.state(), &evidence),
        Err(EvidenceError::PhantomStillValidator { height: 2, .. })
    ));
}

#[test]
fn test_phantom_validator_after_leaving() {
    let mut chain = ChainFixture::new(4);
    chain.advance(2);
    let remaining = shared_types::ValidatorSet::new(
        chain.state().validators.validators()[..3].to_vec(),
    )
    .unwrap();
    chain.history().record(3, remaining);
    let block = chain.commit_next_block();
    let service = service(&chain, MockEvidencePool::default());

    let phantom = |last| {
        Evidence::PhantomValidator(PhantomValidatorEvidence {
            vote: chain.vote(3, VoteType::Prevote, 3, 0, block.block_id()),
            header: block.header.clone(),
            last_height_validator_was_in_set: last,
        })
    };

    assert_eq!(
        service.verify_evidence(chain.state(), &phantom(2)),
        Ok(EvidenceVerdict::Verified)
    );
}

#[test]
fn test_phantom_last_height_too_old() {
    let mut params = ConsensusParams::default();
    params.evidence.max_age_num_blocks = 2;
    let mut chain = ChainFixture::with_params(4, 10, params);
    chain.advance(2);
    let remaining = shared_types::ValidatorSet::new(
        chain.state().validators.validators()[..3].to_vec(),
    )
    .unwrap();
    chain.history().record(3, remaining);
    chain.advance(1);
    let block = chain.commit_next_block();
    let service = service(&chain, MockEvidencePool::default());

    // Current height 5, oldest admissible last height 3
    let evidence = Evidence::PhantomValidator(PhantomValidatorEvidence {
        vote: chain.vote(3, VoteType::Prevote, 4, 0, block.block_id()),
        header: block.header.clone(),
        last_height_validator_was_in_set: 2,
    });
    assert_eq!(
        service.verify_evidence(chain.state(), &evidence),
        Err(EvidenceError::PhantomTooOld {
            last: 2,
            min_height: 3
        })
    );
}

#[test]
fn test_lunatic_validator_is_unsupported() {
    let mut chain = ChainFixture::new(3);
    chain.advance(2);
    let block = chain.commit_next_block();
    let service = service(&chain, MockEvidencePool::default());
    let lunatic = |field| {
        Evidence::LunaticValidator(LunaticValidatorEvidence {
            header: block.header.clone(),
            vote: chain.vote(1, VoteType::Precommit, 3, 0, block.block_id()),
            invalid_header_field: field,
        })
    };

    assert_eq!(
        service.verify_evidence(chain.state(), &lunatic(HeaderField::AppHash)),
        Err(EvidenceError::LunaticUnsupported {
            field: HeaderField::AppHash
        })
    );
    assert_eq!(
        service.verify_evidence(chain.state(), &lunatic(HeaderField::DataHash)),
        Err(EvidenceError::Malformed(TypeError::InvalidHeaderField(
            HeaderField::DataHash
        )))
    );
}

#[test]
fn test_evidence_list_hash_in_header() {
    let mut chain = ChainFixture::new(2);
    chain.advance(1);
    let service = service(&chain, MockEvidencePool::default());
    let mut block = chain.next_block_with_evidence(vec![duplicate_vote(&chain, 0, 1, 0)]);
    block.evidence = EvidenceList::default();

    assert!(matches!(
        service.validate_block(chain.state(), &block),
        Err(ValidationError::Header(
            crate::domain::HeaderError::HashMismatch {
                field: HeaderField::EvidenceHash,
                ..
            }
        ))
    ));
}
