//! Keccak-256 hashing

use evmsim_primitives::H256;
use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 hash of `data`
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_bytes(hasher.finalize().into())
}

/// Hash the concatenation of several byte strings without allocating
pub fn keccak256_concat(parts: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    H256::from_bytes(hasher.finalize().into())
}
