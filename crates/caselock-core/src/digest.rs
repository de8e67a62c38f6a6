//! # Keccak-256 Hash Primitive
//!
//! The single digest function of the system. It derives wallet addresses from
//! public keys, produces EIP-191 message digests, and hashes canonical
//! manifests into content hashes.
//!
//! Keccak-256 here is the original Keccak submission used by Ethereum, not
//! the finalized NIST SHA3-256 (they differ in padding).

use sha3::{Digest, Keccak256 as Keccak256Hasher};

/// A 32-byte hash function behind a narrow interface.
///
/// Verification and content hashing are written against this trait so they
/// can be exercised with known-answer vectors independent of the backing
/// library.
pub trait HashPrimitive: Send + Sync {
    /// Hash `data` into 32 bytes.
    fn hash(&self, data: &[u8]) -> [u8; 32];
}

/// Ethereum Keccak-256.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keccak256;

impl HashPrimitive for Keccak256 {
    fn hash(&self, data: &[u8]) -> [u8; 32] {
        keccak256(data)
    }
}

/// Compute the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let hash = Keccak256Hasher::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    bytes
}

/// Keccak-256 of `data` as `0x`-prefixed lowercase hex.
pub fn keccak256_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(keccak256(data)))
}
