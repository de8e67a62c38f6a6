//! # caselock-crypto: Cryptographic Primitives
//!
//! Provides the elliptic-curve and digest building blocks used by the
//! sign-in verifier and the evidence pipeline:
//!
//! - **Key recovery**: secp256k1 public key recovery from a 65-byte
//!   `r || s || v` signature over a 32-byte digest, behind the
//!   [`KeyRecovery`] trait.
//! - **EIP-191**: the personal-message prefix and digest wallets sign.
//! - **Address derivation**: last 20 bytes of Keccak-256 over the
//!   uncompressed public key body.
//! - **Personal signer**: a local EIP-191 signer for tooling and tests.
//! - **File digests**: SHA-256 and Keccak-256 of uploaded files.
//!
//! ## Crate Policy
//!
//! - Depends only on `caselock-core` internally.
//! - No mocking of curve operations in tests: recovery is exercised against
//!   real signatures produced by [`PersonalSigner`].
//! - Private keys are never serialized or logged.

pub mod address;
pub mod eip191;
pub mod error;
pub mod file_digest;
pub mod recovery;
pub mod signer;

pub use address::address_from_public_key;
pub use eip191::{personal_message_digest, personal_message_prefix, EIP191_PREFIX};
pub use error::CryptoError;
pub use file_digest::FileDigests;
pub use recovery::{
    KeyRecovery, RecoverableSignature, Secp256k1Recovery, UncompressedPublicKey, SIGNATURE_LEN,
};
pub use signer::PersonalSigner;
