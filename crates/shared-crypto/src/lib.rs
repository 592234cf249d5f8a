//! # Shared Crypto - Validator Key Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256, Merkle root | Header and evidence hashes |
//! | `signatures` | Ed25519 | Default validator key |
//! | `ecdsa` | secp256k1 | Validator key |
//! | `sr25519` | Schnorr/Ristretto | Validator key |
//! | `multisig` | k-of-n over the above | Group validator key |
//! | `registry` | Route name to codec | Key (de)serialization |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, strict verification
//! - **secp256k1**: RFC 6979 deterministic, low-S only
//! - **Threshold keys**: signature list must match the signer bitmask exactly

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod ecdsa;
pub mod errors;
pub mod hashing;
pub mod keys;
pub mod multisig;
pub mod registry;
pub mod signatures;
pub mod sr25519;

// Re-exports
pub use address::{Address, ADDRESS_SIZE};
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey};
pub use errors::CryptoError;
pub use hashing::{merkle_root, merkle_root_of, sha256, FieldHasher, Hash, SENTINEL_HASH};
pub use keys::{PubKey, PublicKey};
pub use multisig::{CompactBitArray, Multisignature, ThresholdMultisigKey};
pub use registry::{KeyCodec, KeyRegistry, KeyRegistryBuilder};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey};
pub use sr25519::{Sr25519KeyPair, Sr25519PublicKey};
