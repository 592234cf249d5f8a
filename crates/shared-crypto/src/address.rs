//! Validator addresses.

use crate::hashing::sha256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of a well-formed address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Account/validator address: the first 20 bytes of SHA-256(pubkey).
///
/// The inner bytes are not length-checked on construction because headers
/// and evidence arrive from untrusted peers; use [`Address::is_valid_size`]
/// where the size matters.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(Vec<u8>);

impl Address {
    /// Wrap raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Derive the address of raw public key bytes.
    pub fn from_pubkey_bytes(pubkey: &[u8]) -> Self {
        Self(sha256(pubkey)[..ADDRESS_SIZE].to_vec())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the address has the canonical length.
    pub fn is_valid_size(&self) -> bool {
        self.0.len() == ADDRESS_SIZE
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the address is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Address {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Upper-case hex, the form used in every error message.
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}
