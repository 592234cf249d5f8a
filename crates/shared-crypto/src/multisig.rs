//! # Threshold Multisignature Keys
//!
//! A k-of-n key over heterogeneous sub-keys. A signature bundle is a
//! compact bit array naming the signers plus their signatures in
//! ascending signer order.
//!
//! ## Wire Format
//!
//! The bundle is bincode with fixed-width integers and a size limit, so
//! a hostile length prefix cannot force a large allocation.

use crate::keys::{PubKey, PublicKey};
use crate::CryptoError;
use bincode::Options;
use serde::{Deserialize, Serialize};

/// Route name under which threshold keys are registered.
pub const THRESHOLD_MULTISIG_ROUTE: &str = "threshold-multisig";

/// Upper bound on an encoded signature bundle.
pub const MAX_MULTISIG_BYTES: u64 = 64 * 1024;

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(MAX_MULTISIG_BYTES)
}

/// Fixed-size bit array, eight bits per byte, most significant bit first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBitArray")]
pub struct CompactBitArray {
    bits: usize,
    elems: Vec<u8>,
}

#[derive(Deserialize)]
struct RawBitArray {
    bits: usize,
    elems: Vec<u8>,
}

impl TryFrom<RawBitArray> for CompactBitArray {
    type Error = CryptoError;

    fn try_from(raw: RawBitArray) -> Result<Self, Self::Error> {
        if raw.elems.len() != raw.bits.div_ceil(8) {
            return Err(CryptoError::MalformedEncoding(format!(
                "bit array of {} bits carries {} bytes",
                raw.bits,
                raw.elems.len()
            )));
        }
        Ok(Self {
            bits: raw.bits,
            elems: raw.elems,
        })
    }
}

impl CompactBitArray {
    /// All-clear bit array of `bits` entries.
    pub fn new(bits: usize) -> Self {
        Self {
            bits,
            elems: vec![0u8; bits.div_ceil(8)],
        }
    }

    /// Number of bits.
    pub fn size(&self) -> usize {
        self.bits
    }

    /// Whether bit `index` is set. Out-of-range reads are `false`.
    pub fn get_index(&self, index: usize) -> bool {
        if index >= self.bits {
            return false;
        }
        self.elems
            .get(index / 8)
            .is_some_and(|byte| byte & (0x80 >> (index % 8)) != 0)
    }

    /// Set or clear bit `index`.
    pub fn set_index(&mut self, index: usize, value: bool) -> Result<(), CryptoError> {
        if index >= self.bits {
            return Err(CryptoError::IndexOutOfRange {
                index,
                size: self.bits,
            });
        }
        let mask = 0x80 >> (index % 8);
        if value {
            self.elems[index / 8] |= mask;
        } else {
            self.elems[index / 8] &= !mask;
        }
        Ok(())
    }

    /// Number of set bits strictly before `index`.
    pub fn num_true_bits_before(&self, index: usize) -> usize {
        (0..index.min(self.bits))
            .filter(|&i| self.get_index(i))
            .count()
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.num_true_bits_before(self.bits)
    }

    /// Indices of set bits in ascending order.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.bits).filter(move |&i| self.get_index(i))
    }
}

/// Signature bundle for a [`ThresholdMultisigKey`].
///
/// Decoding guarantees one signature per set bit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMultisignature")]
pub struct Multisignature {
    /// Which sub-keys signed.
    pub bit_array: CompactBitArray,
    /// Signatures in ascending signer order.
    pub sigs: Vec<Vec<u8>>,
}

#[derive(Deserialize)]
struct RawMultisignature {
    bit_array: CompactBitArray,
    sigs: Vec<Vec<u8>>,
}

impl TryFrom<RawMultisignature> for Multisignature {
    type Error = CryptoError;

    fn try_from(raw: RawMultisignature) -> Result<Self, Self::Error> {
        let multisig = Self {
            bit_array: raw.bit_array,
            sigs: raw.sigs,
        };
        multisig.check_counts()?;
        Ok(multisig)
    }
}

impl Multisignature {
    /// Empty bundle for a key with `n` sub-keys.
    pub fn new(n: usize) -> Self {
        Self {
            bit_array: CompactBitArray::new(n),
            sigs: Vec::new(),
        }
    }

    /// Add the signature of sub-key `index`, replacing any previous one.
    pub fn add_signature(&mut self, sig: Vec<u8>, index: usize) -> Result<(), CryptoError> {
        self.check_counts()?;
        let position = self.bit_array.num_true_bits_before(index);
        if self.bit_array.get_index(index) {
            self.sigs[position] = sig;
            return Ok(());
        }
        self.bit_array.set_index(index, true)?;
        self.sigs.insert(position, sig);
        Ok(())
    }

    /// Add the signature of `pubkey`, looking up its index among `keys`.
    pub fn add_signature_from_pubkey(
        &mut self,
        sig: Vec<u8>,
        pubkey: &PublicKey,
        keys: &[PublicKey],
    ) -> Result<(), CryptoError> {
        let index = keys
            .iter()
            .position(|k| k == pubkey)
            .ok_or(CryptoError::KeyNotMember)?;
        self.add_signature(sig, index)
    }

    /// Encode to the wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        wire_options()
            .serialize(self)
            .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))
    }

    /// Decode from the wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let raw: RawMultisignature = wire_options()
            .deserialize(bytes)
            .map_err(|e| CryptoError::MalformedEncoding(e.to_string()))?;
        Self::try_from(raw)
    }

    fn check_counts(&self) -> Result<(), CryptoError> {
        let set_bits = self.bit_array.count_ones();
        if self.sigs.len() != set_bits {
            return Err(CryptoError::InvalidSignatureList {
                signatures: self.sigs.len(),
                set_bits,
            });
        }
        Ok(())
    }
}

/// k-of-n threshold key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThresholdMultisigKey {
    threshold: usize,
    pubkeys: Vec<PublicKey>,
}

impl ThresholdMultisigKey {
    /// Build a key requiring `threshold` of `pubkeys`.
    ///
    /// The threshold must be in `1..=pubkeys.len()`.
    pub fn new(threshold: usize, pubkeys: Vec<PublicKey>) -> Result<Self, CryptoError> {
        if threshold == 0 || threshold > pubkeys.len() {
            return Err(CryptoError::InvalidThreshold {
                threshold,
                keys: pubkeys.len(),
            });
        }
        Ok(Self { threshold, pubkeys })
    }

    /// Minimum number of signers.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Sub-keys in signer-index order.
    pub fn pubkeys(&self) -> &[PublicKey] {
        &self.pubkeys
    }

    /// Verify `signatures` over `message` from the signers named by `bitmask`.
    ///
    /// The bitmask must cover every sub-key, carry exactly one signature
    /// per set bit, and name at least `threshold` signers. Every named
    /// signer's signature must verify.
    pub fn verify(
        &self,
        message: &[u8],
        bitmask: &CompactBitArray,
        signatures: &[Vec<u8>],
    ) -> Result<(), CryptoError> {
        if bitmask.size() != self.pubkeys.len() {
            return Err(CryptoError::InvalidBitArraySize {
                expected: self.pubkeys.len(),
                actual: bitmask.size(),
            });
        }

        let set_bits = bitmask.count_ones();
        if signatures.len() != set_bits {
            return Err(CryptoError::InvalidSignatureList {
                signatures: signatures.len(),
                set_bits,
            });
        }
        if set_bits < self.threshold {
            return Err(CryptoError::InsufficientSigners {
                got: set_bits,
                threshold: self.threshold,
            });
        }

        for (sig, index) in signatures.iter().zip(bitmask.iter_set()) {
            if !self.pubkeys[index].verify_bytes(message, sig) {
                return Err(CryptoError::SubKeyVerificationFailed { index });
            }
        }
        Ok(())
    }

    /// Verify a decoded bundle.
    pub fn verify_multisignature(
        &self,
        message: &[u8],
        multisig: &Multisignature,
    ) -> Result<(), CryptoError> {
        self.verify(message, &multisig.bit_array, &multisig.sigs)
    }
}

impl PubKey for ThresholdMultisigKey {
    fn route(&self) -> &'static str {
        THRESHOLD_MULTISIG_ROUTE
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.threshold as u64).to_be_bytes());
        out.extend_from_slice(&(self.pubkeys.len() as u64).to_be_bytes());
        for key in &self.pubkeys {
            let route = key.route().as_bytes();
            let bytes = key.to_bytes();
            out.extend_from_slice(&(route.len() as u64).to_be_bytes());
            out.extend_from_slice(route);
            out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
            out.extend_from_slice(&bytes);
        }
        out
    }

    fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let multisig = Multisignature::from_bytes(signature)?;
        self.verify_multisignature(message, &multisig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ed25519KeyPair, Secp256k1KeyPair, Sr25519KeyPair};
    use proptest::prelude::*;

    struct Signer {
        sign: Box<dyn Fn(&[u8]) -> Vec<u8>>,
        key: PublicKey,
    }

    fn mixed_signers() -> Vec<Signer> {
        let ed = Ed25519KeyPair::from_seed([1u8; 32]);
        let secp = Secp256k1KeyPair::from_bytes([2u8; 32]).unwrap();
        let sr = Sr25519KeyPair::from_seed([3u8; 32]).unwrap();
        let ed2 = Ed25519KeyPair::from_seed([4u8; 32]);
        vec![
            Signer {
                key: ed.public_key().into(),
                sign: Box::new(move |m| ed.sign(m)),
            },
            Signer {
                key: secp.public_key().into(),
                sign: Box::new(move |m| secp.sign(m)),
            },
            Signer {
                key: sr.public_key().into(),
                sign: Box::new(move |m| sr.sign(m)),
            },
            Signer {
                key: ed2.public_key().into(),
                sign: Box::new(move |m| ed2.sign(m)),
            },
        ]
    }

    fn threshold_key(k: usize, signers: &[Signer]) -> ThresholdMultisigKey {
        ThresholdMultisigKey::new(k, signers.iter().map(|s| s.key.clone()).collect()).unwrap()
    }

    #[test]
    fn test_bit_array_get_set() {
        let mut bits = CompactBitArray::new(10);
        bits.set_index(0, true).unwrap();
        bits.set_index(9, true).unwrap();

        assert!(bits.get_index(0));
        assert!(bits.get_index(9));
        assert!(!bits.get_index(5));
        assert_eq!(bits.count_ones(), 2);
        assert_eq!(bits.num_true_bits_before(9), 1);
        assert!(bits.set_index(10, true).is_err());
    }

    #[test]
    fn test_threshold_bounds() {
        let signers = mixed_signers();
        let keys: Vec<PublicKey> = signers.iter().map(|s| s.key.clone()).collect();

        assert!(ThresholdMultisigKey::new(0, keys.clone()).is_err());
        assert!(ThresholdMultisigKey::new(5, keys.clone()).is_err());
        assert!(ThresholdMultisigKey::new(4, keys).is_ok());
    }

    #[test]
    fn test_signatures_added_out_of_order_verify() {
        let signers = mixed_signers();
        let key = threshold_key(2, &signers);
        let msg = b"block";

        let mut multisig = Multisignature::new(4);
        multisig.add_signature((signers[2].sign)(msg), 2).unwrap();
        multisig.add_signature((signers[0].sign)(msg), 0).unwrap();

        assert!(key.verify_multisignature(msg, &multisig).is_ok());
        let encoded = multisig.to_bytes().unwrap();
        assert!(key.verify_bytes(msg, &encoded));
    }

    #[test]
    fn test_add_signature_from_pubkey() {
        let signers = mixed_signers();
        let key = threshold_key(1, &signers);
        let msg = b"vote";

        let mut multisig = Multisignature::new(4);
        multisig
            .add_signature_from_pubkey((signers[1].sign)(msg), &signers[1].key, key.pubkeys())
            .unwrap();
        assert!(key.verify_multisignature(msg, &multisig).is_ok());

        let outsider: PublicKey = Ed25519KeyPair::from_seed([9u8; 32]).public_key().into();
        assert_eq!(
            multisig.add_signature_from_pubkey(vec![0u8; 64], &outsider, key.pubkeys()),
            Err(CryptoError::KeyNotMember)
        );
    }

    #[test]
    fn test_below_threshold_fails() {
        let signers = mixed_signers();
        let key = threshold_key(3, &signers);
        let msg = b"block";

        let mut multisig = Multisignature::new(4);
        multisig.add_signature((signers[0].sign)(msg), 0).unwrap();
        multisig.add_signature((signers[3].sign)(msg), 3).unwrap();

        assert_eq!(
            key.verify_multisignature(msg, &multisig),
            Err(CryptoError::InsufficientSigners { got: 2, threshold: 3 })
        );
    }

    #[test]
    fn test_signature_count_mismatch_fails() {
        let signers = mixed_signers();
        let key = threshold_key(1, &signers);
        let msg = b"block";

        let mut bits = CompactBitArray::new(4);
        bits.set_index(0, true).unwrap();
        let sigs = vec![(signers[0].sign)(msg), (signers[1].sign)(msg)];

        assert_eq!(
            key.verify(msg, &bits, &sigs),
            Err(CryptoError::InvalidSignatureList { signatures: 2, set_bits: 1 })
        );
    }

    #[test]
    fn test_wrong_bitmask_size_fails() {
        let signers = mixed_signers();
        let key = threshold_key(1, &signers);
        let msg = b"block";

        let mut bits = CompactBitArray::new(3);
        bits.set_index(0, true).unwrap();

        assert_eq!(
            key.verify(msg, &bits, &[(signers[0].sign)(msg)]),
            Err(CryptoError::InvalidBitArraySize { expected: 4, actual: 3 })
        );
    }

    #[test]
    fn test_bad_sub_signature_reports_index() {
        let signers = mixed_signers();
        let key = threshold_key(2, &signers);
        let msg = b"block";

        let mut multisig = Multisignature::new(4);
        multisig.add_signature((signers[0].sign)(msg), 0).unwrap();
        multisig.add_signature((signers[2].sign)(b"other"), 2).unwrap();

        assert_eq!(
            key.verify_multisignature(msg, &multisig),
            Err(CryptoError::SubKeyVerificationFailed { index: 2 })
        );
    }

    #[test]
    fn test_decoded_bundle_needs_one_signature_per_bit() {
        let mut bits = CompactBitArray::new(4);
        bits.set_index(0, true).unwrap();
        let unsigned = Multisignature {
            bit_array: bits,
            sigs: Vec::new(),
        };
        let encoded = wire_options().serialize(&unsigned).unwrap();

        assert_eq!(
            Multisignature::from_bytes(&encoded),
            Err(CryptoError::InvalidSignatureList { signatures: 0, set_bits: 1 })
        );
        assert!(wire_options()
            .deserialize::<Multisignature>(&encoded)
            .is_err());

        let mut built = unsigned;
        assert_eq!(
            built.add_signature(vec![1u8; 64], 2),
            Err(CryptoError::InvalidSignatureList { signatures: 0, set_bits: 1 })
        );
    }

    #[test]
    fn test_short_bit_array_rejected() {
        let raw = (9usize, vec![0xFFu8]);
        let encoded = wire_options().serialize(&raw).unwrap();
        assert!(wire_options()
            .deserialize::<CompactBitArray>(&encoded)
            .is_err());
    }

    #[test]
    fn test_garbage_bundle_rejected() {
        let signers = mixed_signers();
        let key = threshold_key(1, &signers);
        assert!(!key.verify_bytes(b"block", &[0xFF; 7]));
    }

    #[test]
    fn test_address_depends_on_threshold() {
        let signers = mixed_signers();
        assert_ne!(
            threshold_key(1, &signers).address(),
            threshold_key(2, &signers).address()
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_verifies_iff_enough_signers(k in 1usize..=4, mask in 0u8..16) {
            let signers = mixed_signers();
            let key = threshold_key(k, &signers);
            let msg = b"proptest";

            let mut multisig = Multisignature::new(4);
            for (i, signer) in signers.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    multisig.add_signature((signer.sign)(msg), i).unwrap();
                }
            }

            let signed = mask.count_ones() as usize;
            prop_assert_eq!(key.verify_multisignature(msg, &multisig).is_ok(), signed >= k);
        }
    }
}
