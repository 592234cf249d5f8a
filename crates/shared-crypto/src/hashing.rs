//! # SHA-256 Hashing
//!
//! Every content hash on the chain (headers, votes, evidence, validator
//! sets) is SHA-256. Lists are committed to with a padded binary Merkle
//! tree so that the same list always yields the same root.

use sha2::{Digest, Sha256};

/// SHA-256 output (256-bit).
pub type Hash = [u8; 32];

/// Size of a [`Hash`] in bytes.
pub const HASH_SIZE: usize = 32;

/// Padding leaf and root of an empty list.
pub const SENTINEL_HASH: Hash = [0u8; 32];

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Hash multiple inputs as one stream.
pub fn sha256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Incremental hasher with length-prefixed fields.
///
/// Length prefixes keep `("ab", "c")` and `("a", "bc")` apart.
pub struct FieldHasher {
    inner: Sha256,
}

impl FieldHasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Append a variable-length field.
    pub fn field(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update((data.len() as u64).to_be_bytes());
        self.inner.update(data);
        self
    }

    /// Append a fixed-width integer.
    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    /// Append a signed integer.
    pub fn i64(&mut self, value: i64) -> &mut Self {
        self.inner.update(value.to_be_bytes());
        self
    }

    /// Finalize and return hash.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

impl Default for FieldHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Merkle root over already-hashed leaves.
///
/// Leaves are padded to a power of two with [`SENTINEL_HASH`]; a single
/// leaf is padded to two. The empty list hashes to the sentinel.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    if leaves.is_empty() {
        return SENTINEL_HASH;
    }

    let padded = if leaves.len() == 1 {
        2
    } else {
        leaves.len().next_power_of_two()
    };
    let mut level: Vec<Hash> = leaves.to_vec();
    level.resize(padded, SENTINEL_HASH);

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    level[0]
}

/// Merkle root over raw items, hashing each item first.
pub fn merkle_root_of<T: AsRef<[u8]>>(items: &[T]) -> Hash {
    let leaves: Vec<Hash> = items.iter().map(|item| sha256(item.as_ref())).collect();
    merkle_root(&leaves)
}

/// parent = H(left || right)
fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}
