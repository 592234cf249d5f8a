//! Chains whose validators use different key algorithms, including a
//! threshold multisig group key.

use proptest::prelude::*;
use shared_crypto::{KeyRegistry, Multisignature};
use shared_types::{CommitSig, ConsensusParams, ValidatorSet};
use std::sync::Arc;
use vc_validation::test_utils::{init_tracing, ChainFixture, KeyKind, MockPV, TEST_CHAIN_ID};
use vc_validation::{
    BlockValidationApi, CommitError, InMemoryEvidencePool, InMemoryValidatorHistory,
    ValidationConfig, ValidationDependencies, ValidationError, ValidationService,
};

fn group_members() -> Vec<MockPV> {
    vec![
        MockPV::new(KeyKind::Ed25519, 20),
        MockPV::new(KeyKind::Secp256k1, 21),
        MockPV::new(KeyKind::Sr25519, 22),
    ]
}

fn mixed_chain() -> ChainFixture {
    let pvs = vec![
        MockPV::new(KeyKind::Ed25519, 1),
        MockPV::new(KeyKind::Secp256k1, 2),
        MockPV::new(KeyKind::Sr25519, 3),
        MockPV::threshold(2, group_members()),
    ];
    ChainFixture::from_pvs(pvs, 10, ConsensusParams::default())
}

fn service(
    chain: &ChainFixture,
) -> ValidationService<InMemoryEvidencePool, InMemoryValidatorHistory> {
    init_tracing();
    ValidationService::new(ValidationDependencies {
        evidence_pool: Arc::new(InMemoryEvidencePool::new()),
        validator_history: Arc::clone(chain.history()),
        config: ValidationConfig::default(),
    })
}

#[test]
fn test_mixed_key_chain_validates() {
    let mut chain = mixed_chain();
    let service = service(&chain);

    for height in 1..=5 {
        let block = chain.next_block();
        assert_eq!(service.validate_block(chain.state(), &block), Ok(()), "height {height}");
        chain.commit_block(&block);
    }
}

#[test]
fn test_group_signature_below_threshold() {
    let mut chain = mixed_chain();
    chain.advance(1);
    let service = service(&chain);

    let mut block = chain.next_block();
    let sign_bytes = block
        .last_commit
        .vote_sign_bytes(TEST_CHAIN_ID, 3)
        .expect("slot 3 exists");
    let mut partial = Multisignature::new(3);
    partial
        .add_signature(group_members()[1].sign(&sign_bytes), 1)
        .unwrap();
    block.last_commit.signatures[3].signature = partial.to_bytes().unwrap();
    block.fill_header();

    assert!(matches!(
        service.validate_block(chain.state(), &block),
        Err(ValidationError::Commit(CommitError::WrongSignature { index: 3, .. }))
    ));

    // Two of three members is enough
    partial
        .add_signature(group_members()[2].sign(&sign_bytes), 2)
        .unwrap();
    block.last_commit.signatures[3].signature = partial.to_bytes().unwrap();
    block.fill_header();
    assert_eq!(service.validate_block(chain.state(), &block), Ok(()));
}

#[test]
fn test_validator_set_survives_registry_round_trip() {
    let chain = mixed_chain();
    let registry = KeyRegistry::with_builtin_keys();
    let encoded = chain.state().validators.to_json(&registry).unwrap();
    let decoded = ValidatorSet::from_json(&registry, &encoded).unwrap();

    assert_eq!(decoded.hash(), chain.state().validators.hash());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_commit_accepted_iff_quorum(absent in proptest::collection::vec(any::<bool>(), 4)) {
        let mut chain = ChainFixture::new(4);
        chain.advance(1);
        let service = service(&chain);

        let mut block = chain.next_block();
        for (slot, is_absent) in absent.iter().enumerate() {
            if *is_absent {
                block.last_commit.signatures[slot] = CommitSig::absent();
            }
        }
        block.fill_header();

        let present = absent.iter().filter(|a| !**a).count() as u64;
        let quorum = present * 10 * 3 > 40 * 2;
        let result = service.validate_block(chain.state(), &block);
        if quorum {
            prop_assert_eq!(result, Ok(()));
        } else if present == 0 {
            prop_assert!(result.is_err());
        } else {
            let is_power_error = matches!(
                result,
                Err(ValidationError::Commit(CommitError::InsufficientVotingPower { .. }))
            );
            prop_assert!(is_power_error);
        }
    }
}
