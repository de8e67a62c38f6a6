//! Errors from signature parsing, key recovery, and key handling.

use thiserror::Error;

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The signature is not valid hex.
    #[error("signature is not valid hex: {0}")]
    InvalidHex(String),

    /// The signature does not decode to exactly 65 bytes.
    #[error("signature must be 65 bytes, got {0}")]
    BadSignatureLength(usize),

    /// `v` is outside {0, 1, 27, 28}.
    #[error("invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    /// `r` or `s` is zero or not below the curve order.
    #[error("signature scalar out of range")]
    InvalidScalar,

    /// No public key could be recovered.
    #[error("public key recovery failed")]
    RecoveryFailed,

    /// A private key could not be parsed.
    #[error("key error: {0}")]
    KeyError(String),
}
