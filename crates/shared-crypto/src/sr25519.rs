//! # Sr25519 Signatures
//!
//! Schnorr signatures over Ristretto25519 (schnorrkel). Every signature
//! is bound to a fixed signing context.

use crate::{Address, CryptoError};
use schnorrkel::keys::{ExpansionMode, Keypair, MiniSecretKey, PublicKey as SrPublicKey};
use schnorrkel::Signature;

/// Route name under which sr25519 keys are registered.
pub const SR25519_ROUTE: &str = "sr25519";

/// Sr25519 public key size.
pub const SR25519_PUBKEY_SIZE: usize = 32;

const SIGNING_CONTEXT: &[u8] = b"vc-validator";

/// Sr25519 public key (32 bytes, compressed Ristretto point).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Sr25519PublicKey([u8; 32]);

impl Sr25519PublicKey {
    /// Create from bytes, rejecting encodings that are not a valid point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        SrPublicKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Create from a slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: SR25519_PUBKEY_SIZE,
                actual: bytes.len(),
            })?;
        Self::from_bytes(array)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Address derived from the key bytes.
    pub fn address(&self) -> Address {
        Address::from_pubkey_bytes(&self.0)
    }

    /// Verify a 64-byte signature made under the validator signing context.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        let key = SrPublicKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = Signature::from_bytes(signature).map_err(|_| CryptoError::InvalidSignatureFormat)?;
        key.verify_simple(SIGNING_CONTEXT, message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Sr25519 keypair.
pub struct Sr25519KeyPair {
    keypair: Keypair,
}

impl Sr25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let keypair = MiniSecretKey::generate().expand_to_keypair(ExpansionMode::Ed25519);
        Self { keypair }
    }

    /// Create from a 32-byte mini secret key.
    pub fn from_seed(seed: [u8; 32]) -> Result<Self, CryptoError> {
        let mini = MiniSecretKey::from_bytes(&seed).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self {
            keypair: mini.expand_to_keypair(ExpansionMode::Ed25519),
        })
    }

    /// Get public key.
    pub fn public_key(&self) -> Sr25519PublicKey {
        Sr25519PublicKey(self.keypair.public.to_bytes())
    }

    /// Sign a message under the validator signing context.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.keypair
            .sign_simple(SIGNING_CONTEXT, message)
            .to_bytes()
            .to_vec()
    }
}
