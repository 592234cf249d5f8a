//! # Polymorphic Public Keys
//!
//! Validator keys of mixed algorithms live behind one [`PublicKey`] sum
//! type. Each variant is also usable on its own through the [`PubKey`]
//! trait, which is the verification capability the threshold key relies
//! on for its sub-keys.

use crate::ecdsa::{Secp256k1PublicKey, SECP256K1_ROUTE};
use crate::multisig::ThresholdMultisigKey;
use crate::signatures::{Ed25519PublicKey, ED25519_ROUTE};
use crate::sr25519::{Sr25519PublicKey, SR25519_ROUTE};
use crate::{Address, CryptoError};

/// Verification capability shared by every key algorithm.
pub trait PubKey {
    /// Registry route name of the algorithm.
    fn route(&self) -> &'static str;

    /// Canonical byte encoding.
    fn to_bytes(&self) -> Vec<u8>;

    /// Address derived from the canonical bytes.
    fn address(&self) -> Address {
        Address::from_pubkey_bytes(&self.to_bytes())
    }

    /// Verify `signature` over `message`.
    fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError>;

    /// Boolean form of [`PubKey::verify_signature`].
    fn verify_bytes(&self, message: &[u8], signature: &[u8]) -> bool {
        self.verify_signature(message, signature).is_ok()
    }
}

impl PubKey for Ed25519PublicKey {
    fn route(&self) -> &'static str {
        ED25519_ROUTE
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        self.verify(message, signature)
    }
}

impl PubKey for Secp256k1PublicKey {
    fn route(&self) -> &'static str {
        SECP256K1_ROUTE
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        self.verify(message, signature)
    }
}

impl PubKey for Sr25519PublicKey {
    fn route(&self) -> &'static str {
        SR25519_ROUTE
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        self.verify(message, signature)
    }
}

/// Any public key a validator may hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    /// Ed25519 key.
    Ed25519(Ed25519PublicKey),
    /// Compressed secp256k1 key.
    Secp256k1(Secp256k1PublicKey),
    /// Sr25519 key.
    Sr25519(Sr25519PublicKey),
    /// k-of-n threshold key.
    ThresholdMultisig(ThresholdMultisigKey),
}

impl PublicKey {
    fn as_dyn(&self) -> &dyn PubKey {
        match self {
            Self::Ed25519(key) => key,
            Self::Secp256k1(key) => key,
            Self::Sr25519(key) => key,
            Self::ThresholdMultisig(key) => key,
        }
    }
}

impl PubKey for PublicKey {
    fn route(&self) -> &'static str {
        self.as_dyn().route()
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.as_dyn().to_bytes()
    }

    fn address(&self) -> Address {
        self.as_dyn().address()
    }

    fn verify_signature(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        self.as_dyn().verify_signature(message, signature)
    }
}

impl From<Ed25519PublicKey> for PublicKey {
    fn from(key: Ed25519PublicKey) -> Self {
        Self::Ed25519(key)
    }
}

impl From<Secp256k1PublicKey> for PublicKey {
    fn from(key: Secp256k1PublicKey) -> Self {
        Self::Secp256k1(key)
    }
}

impl From<Sr25519PublicKey> for PublicKey {
    fn from(key: Sr25519PublicKey) -> Self {
        Self::Sr25519(key)
    }
}

impl From<ThresholdMultisigKey> for PublicKey {
    fn from(key: ThresholdMultisigKey) -> Self {
        Self::ThresholdMultisig(key)
    }
}
