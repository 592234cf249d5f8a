//! Test support: mock private validators and a chain that builds, signs
//! and commits good blocks height after height.

use crate::adapters::InMemoryValidatorHistory;
use chrono::{DateTime, Duration, TimeZone, Utc};
use shared_crypto::{
    sha256, Ed25519KeyPair, Multisignature, PubKey, PublicKey, Secp256k1KeyPair,
    Sr25519KeyPair, ThresholdMultisigKey,
};
use shared_types::{
    Address, Block, BlockId, ChainState, Commit, ConsensusParams, Evidence, PartSetHeader,
    Validator, ValidatorSet, Vote, VoteType,
};
use std::sync::{Arc, Once};

/// Chain id of every fixture chain.
pub const TEST_CHAIN_ID: &str = "validation-test-chain";

/// Genesis time of every fixture chain.
pub fn genesis_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0)
        .single()
        .expect("valid genesis time")
}

/// Install a fmt subscriber honoring `RUST_LOG`, once per process.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Signature algorithm of a mock validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Ed25519,
    Secp256k1,
    Sr25519,
}

enum Signer {
    Ed25519(Ed25519KeyPair),
    Secp256k1(Secp256k1KeyPair),
    Sr25519(Sr25519KeyPair),
    Threshold(Vec<MockPV>),
}

/// Mock private validator: holds a private key and signs votes with it.
pub struct MockPV {
    signer: Signer,
    pub_key: PublicKey,
}

impl MockPV {
    /// Deterministic key of `kind` from `seed`. Seed 0 is not a valid
    /// secp256k1 scalar.
    pub fn new(kind: KeyKind, seed: u8) -> Self {
        let (pub_key, signer): (PublicKey, Signer) = match kind {
            KeyKind::Ed25519 => {
                let pair = Ed25519KeyPair::from_seed([seed; 32]);
                (pair.public_key().into(), Signer::Ed25519(pair))
            }
            KeyKind::Secp256k1 => {
                let pair = Secp256k1KeyPair::from_bytes([seed; 32]).expect("valid secp256k1 seed");
                (pair.public_key().into(), Signer::Secp256k1(pair))
            }
            KeyKind::Sr25519 => {
                let pair = Sr25519KeyPair::from_seed([seed; 32]).expect("valid sr25519 seed");
                (pair.public_key().into(), Signer::Sr25519(pair))
            }
        };
        Self { signer, pub_key }
    }

    /// Fresh random ed25519 key.
    pub fn random() -> Self {
        let pair = Ed25519KeyPair::generate();
        Self {
            pub_key: pair.public_key().into(),
            signer: Signer::Ed25519(pair),
        }
    }

    /// Group key over `members`. Signs with every member.
    pub fn threshold(threshold: usize, members: Vec<MockPV>) -> Self {
        let pubkeys = members.iter().map(|m| m.pub_key.clone()).collect();
        let key = ThresholdMultisigKey::new(threshold, pubkeys).expect("valid threshold");
        Self {
            signer: Signer::Threshold(members),
            pub_key: key.into(),
        }
    }

    pub fn pub_key(&self) -> &PublicKey {
        &self.pub_key
    }

    pub fn address(&self) -> Address {
        self.pub_key.address()
    }

    /// Sign raw bytes.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        match &self.signer {
            Signer::Ed25519(pair) => pair.sign(message),
            Signer::Secp256k1(pair) => pair.sign(message),
            Signer::Sr25519(pair) => pair.sign(message),
            Signer::Threshold(members) => {
                let mut multisig = Multisignature::new(members.len());
                for (index, member) in members.iter().enumerate() {
                    multisig
                        .add_signature(member.sign(message), index)
                        .expect("index within key size");
                }
                multisig.to_bytes().expect("multisignature encodes")
            }
        }
    }

    /// Sign `vote` in place on `chain_id`.
    pub fn sign_vote(&self, chain_id: &str, vote: &mut Vote) {
        vote.signature = self.sign(&vote.sign_bytes(chain_id));
    }

    /// A signed vote from this validator.
    #[allow(clippy::too_many_arguments)]
    pub fn make_vote(
        &self,
        chain_id: &str,
        vote_type: VoteType,
        height: u64,
        round: u32,
        block_id: BlockId,
        timestamp: DateTime<Utc>,
        validator_index: u32,
    ) -> Vote {
        let mut vote = Vote {
            vote_type,
            height,
            round,
            block_id,
            timestamp,
            validator_address: self.address(),
            validator_index,
            signature: Vec::new(),
        };
        self.sign_vote(chain_id, &mut vote);
        vote
    }
}

/// A chain of honest validators.
///
/// Every validator precommits every block one second after its time, so
/// the next block's weighted median time is always one second later.
pub struct ChainFixture {
    state: ChainState,
    pvs: Vec<MockPV>,
    last_commit: Commit,
    history: Arc<InMemoryValidatorHistory>,
}

impl ChainFixture {
    /// `validators` ed25519 validators of power 10.
    pub fn new(validators: usize) -> Self {
        Self::with_params(validators, 10, ConsensusParams::default())
    }

    /// `validators` ed25519 validators of equal `power`.
    pub fn with_params(validators: usize, power: u64, params: ConsensusParams) -> Self {
        let pvs = (1..=validators)
            .map(|seed| MockPV::new(KeyKind::Ed25519, seed as u8))
            .collect();
        Self::from_pvs(pvs, power, params)
    }

    /// Chain over the given validators, in set order.
    pub fn from_pvs(pvs: Vec<MockPV>, power: u64, params: ConsensusParams) -> Self {
        let validators = ValidatorSet::new(
            pvs.iter()
                .map(|pv| Validator::new(pv.pub_key.clone(), power))
                .collect(),
        )
        .expect("valid validator set");
        let history = Arc::new(InMemoryValidatorHistory::starting_at(1, validators.clone()));
        Self {
            state: ChainState::genesis(TEST_CHAIN_ID, genesis_time(), validators, params),
            pvs,
            last_commit: Commit::default(),
            history,
        }
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ChainState {
        &mut self.state
    }

    pub fn pv(&self, index: usize) -> &MockPV {
        &self.pvs[index]
    }

    pub fn pvs(&self) -> &[MockPV] {
        &self.pvs
    }

    pub fn history(&self) -> &Arc<InMemoryValidatorHistory> {
        &self.history
    }

    /// Commit that the next block must carry.
    pub fn last_commit(&self) -> &Commit {
        &self.last_commit
    }

    /// A good block for the next height.
    pub fn next_block(&self) -> Block {
        self.next_block_with_evidence(Vec::new())
    }

    /// A good block for the next height carrying `evidence`.
    pub fn next_block_with_evidence(&self, evidence: Vec<Evidence>) -> Block {
        let height = self.state.current_height();
        let proposer = self
            .state
            .validators
            .proposer()
            .map(|val| val.address.clone())
            .unwrap_or_default();
        self.state.make_block(
            height,
            vec![format!("tx-{height}").into_bytes()],
            self.last_commit.clone(),
            evidence,
            proposer,
        )
    }

    /// Have every validator precommit `block` and move the state past it.
    pub fn commit_block(&mut self, block: &Block) {
        let block_id = block.block_id();
        let height = block.header.height;
        let timestamp = block.header.time + Duration::seconds(1);
        let signatures = self
            .pvs
            .iter()
            .enumerate()
            .map(|(index, pv)| {
                pv.make_vote(
                    TEST_CHAIN_ID,
                    VoteType::Precommit,
                    height,
                    0,
                    block_id,
                    timestamp,
                    index as u32,
                )
                .commit_sig()
            })
            .collect();
        self.last_commit = Commit::new(height, 0, block_id, signatures);

        let state = &mut self.state;
        state.last_block_height = height;
        state.last_block_id = block_id;
        state.last_block_time = block.header.time;
        state.last_validators = state.validators.clone();
        state.validators = state.next_validators.clone();
        state.next_validators = state.next_validators.with_proposer_incremented(1);
        state.app_hash = sha256(&block.hash());
    }

    /// Build, commit and return the next good block.
    pub fn commit_next_block(&mut self) -> Block {
        let block = self.next_block();
        self.commit_block(&block);
        block
    }

    /// Commit `blocks` good blocks.
    pub fn advance(&mut self, blocks: usize) {
        for _ in 0..blocks {
            self.commit_next_block();
        }
    }

    /// A vote signed by validator `index`, stamped with the genesis time.
    pub fn vote(
        &self,
        index: usize,
        vote_type: VoteType,
        height: u64,
        round: u32,
        block_id: BlockId,
    ) -> Vote {
        self.pvs[index].make_vote(
            TEST_CHAIN_ID,
            vote_type,
            height,
            round,
            block_id,
            genesis_time(),
            index as u32,
        )
    }

    /// A round-0 precommit by validator `index`, stamped like the fixture's
    /// own commits.
    pub fn precommit(&self, index: usize, height: u64, block_id: BlockId) -> Vote {
        self.pvs[index].make_vote(
            TEST_CHAIN_ID,
            VoteType::Precommit,
            height,
            0,
            block_id,
            self.state.last_block_time + Duration::seconds(1),
            index as u32,
        )
    }

    /// A complete block id derived from `seed`.
    pub fn block_id_for(&self, seed: &[u8]) -> BlockId {
        BlockId {
            hash: sha256(seed),
            part_set_header: PartSetHeader {
                total: 1,
                hash: sha256(&[seed, b"parts".as_slice()].concat()),
            },
        }
    }
}
