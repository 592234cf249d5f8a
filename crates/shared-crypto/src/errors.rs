//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Number of signatures does not match the number of set bits
    #[error("Invalid signature list: {signatures} signatures for {set_bits} set bits")]
    InvalidSignatureList {
        /// Signatures carried by the bundle
        signatures: usize,
        /// Bits set in the signer bitmask
        set_bits: usize,
    },

    /// Signer bitmask does not cover every sub-key exactly
    #[error("Invalid bit array size: expected {expected}, got {actual}")]
    InvalidBitArraySize {
        /// Number of sub-keys
        expected: usize,
        /// Size of the bitmask
        actual: usize,
    },

    /// Fewer signers than the threshold
    #[error("Not enough signers: got {got}, threshold {threshold}")]
    InsufficientSigners {
        /// Number of signers present
        got: usize,
        /// Required minimum
        threshold: usize,
    },

    /// Sub-key signature failed to verify
    #[error("Sub-key #{index} signature verification failed")]
    SubKeyVerificationFailed {
        /// Index of the failing sub-key
        index: usize,
    },

    /// Threshold outside `1..=keys`
    #[error("Invalid threshold {threshold} for {keys} keys")]
    InvalidThreshold {
        /// Requested threshold
        threshold: usize,
        /// Number of sub-keys
        keys: usize,
    },

    /// Index outside the bit array
    #[error("Index {index} out of range for {size} keys")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of sub-keys
        size: usize,
    },

    /// Sub-key not part of the threshold key
    #[error("Public key is not a member of the threshold key")]
    KeyNotMember,

    /// No codec registered under the route name
    #[error("Unregistered key route: {0}")]
    UnregisteredRoute(String),

    /// Route name registered twice
    #[error("Key route already registered: {0}")]
    DuplicateRoute(String),

    /// Serialized key or signature bundle could not be decoded
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),
}
