//! # Validators
//!
//! Validator sets keep their members in a fixed order: commit slots and
//! vote indices refer to positions in that order. Proposer selection is a
//! round-robin cursor over the same order.

use crate::TypeError;
use serde_json::{json, Value};
use shared_crypto::hashing::{merkle_root, FieldHasher, Hash};
use shared_crypto::{Address, KeyRegistry, PubKey, PublicKey};
use std::collections::HashMap;

/// A validator: key, derived address, and voting power.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validator {
    pub address: Address,
    pub pub_key: PublicKey,
    pub voting_power: u64,
}

impl Validator {
    /// Validator whose address is derived from `pub_key`.
    pub fn new(pub_key: PublicKey, voting_power: u64) -> Self {
        Self {
            address: pub_key.address(),
            pub_key,
            voting_power,
        }
    }

    fn hash(&self) -> Hash {
        let mut hasher = FieldHasher::new();
        hasher
            .field(self.pub_key.route().as_bytes())
            .field(&self.pub_key.to_bytes())
            .u64(self.voting_power);
        hasher.finalize()
    }
}

/// Ordered validator set with a proposer cursor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatorSet {
    validators: Vec<Validator>,
    proposer_index: usize,
    total_voting_power: u64,
    lookup: HashMap<Address, usize>,
}

impl ValidatorSet {
    /// Build a set, rejecting duplicates, zero power, and power overflow.
    pub fn new(validators: Vec<Validator>) -> Result<Self, TypeError> {
        let mut lookup = HashMap::with_capacity(validators.len());
        let mut total: u64 = 0;
        for (index, val) in validators.iter().enumerate() {
            if val.voting_power == 0 {
                return Err(TypeError::ZeroVotingPower(val.address.clone()));
            }
            if lookup.insert(val.address.clone(), index).is_some() {
                return Err(TypeError::DuplicateValidator(val.address.clone()));
            }
            total = total
                .checked_add(val.voting_power)
                .ok_or(TypeError::VotingPowerOverflow)?;
        }
        Ok(Self {
            validators,
            proposer_index: 0,
            total_voting_power: total,
            lookup,
        })
    }

    /// Number of validators.
    pub fn size(&self) -> usize {
        self.validators.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Sum of member voting power.
    pub fn total_voting_power(&self) -> u64 {
        self.total_voting_power
    }

    /// Members in set order.
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Look up a member and its index.
    pub fn get_by_address(&self, address: &Address) -> Option<(usize, &Validator)> {
        self.lookup
            .get(address)
            .map(|&index| (index, &self.validators[index]))
    }

    /// Member at `index`.
    pub fn get_by_index(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    /// Whether `address` is a member.
    pub fn has_address(&self, address: &Address) -> bool {
        self.lookup.contains_key(address)
    }

    /// Current proposer.
    pub fn proposer(&self) -> Option<&Validator> {
        self.validators.get(self.proposer_index)
    }

    /// Move the proposer cursor forward `times` heights.
    pub fn increment_proposer(&mut self, times: usize) {
        if !self.validators.is_empty() {
            self.proposer_index = (self.proposer_index + times) % self.validators.len();
        }
    }

    /// Copy with the proposer cursor moved forward.
    pub fn with_proposer_incremented(&self, times: usize) -> Self {
        let mut next = self.clone();
        next.increment_proposer(times);
        next
    }

    /// Merkle root over member hashes. Independent of the proposer cursor.
    pub fn hash(&self) -> Hash {
        let leaves: Vec<Hash> = self.validators.iter().map(Validator::hash).collect();
        merkle_root(&leaves)
    }

    /// Encode through the key registry.
    pub fn to_json(&self, registry: &KeyRegistry) -> Result<Value, TypeError> {
        let validators = self
            .validators
            .iter()
            .map(|val| {
                Ok(json!({
                    "address": val.address.to_string(),
                    "pub_key": registry.encode(&val.pub_key)?,
                    "voting_power": val.voting_power,
                }))
            })
            .collect::<Result<Vec<_>, TypeError>>()?;
        Ok(json!({
            "validators": validators,
            "proposer_index": self.proposer_index,
        }))
    }

    /// Decode through the key registry. Addresses are re-derived from keys
    /// and must match the encoded ones.
    pub fn from_json(registry: &KeyRegistry, value: &Value) -> Result<Self, TypeError> {
        let malformed = |reason: &str| TypeError::MalformedValidatorSet(reason.to_string());
        let entries = value
            .get("validators")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed("missing validators"))?;

        let mut validators = Vec::with_capacity(entries.len());
        for entry in entries {
            let pub_key = registry.decode(
                entry
                    .get("pub_key")
                    .ok_or_else(|| malformed("missing pub_key"))?,
            )?;
            let voting_power = entry
                .get("voting_power")
                .and_then(Value::as_u64)
                .ok_or_else(|| malformed("missing voting_power"))?;
            let validator = Validator::new(pub_key, voting_power);
            if let Some(address) = entry.get("address").and_then(Value::as_str) {
                if address != validator.address.to_string() {
                    return Err(malformed("address does not match pub_key"));
                }
            }
            validators.push(validator);
        }

        let mut set = Self::new(validators)?;
        let proposer_index = value
            .get("proposer_index")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let proposer_index =
            usize::try_from(proposer_index).map_err(|_| malformed("proposer_index"))?;
        if !set.is_empty() && proposer_index >= set.size() {
            return Err(malformed("proposer_index out of range"));
        }
        set.proposer_index = proposer_index;
        Ok(set)
    }
}
