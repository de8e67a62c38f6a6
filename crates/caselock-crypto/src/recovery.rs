//! # secp256k1 Public Key Recovery
//!
//! Wallet signatures arrive as 65 bytes `r(32) || s(32) || v(1)`. The
//! recovery id `v` is accepted in both the legacy form (27/28) and the raw
//! form (0/1); anything else is rejected before any curve arithmetic.
//!
//! ## Security Invariant
//!
//! Both halves of a malleable pair recover the same key. A high `s` is
//! replaced by `n - s` and the parity of the recovery id is flipped before
//! any curve arithmetic, so recovery only ever runs on low-S signatures.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::error::CryptoError;

/// Length of a recoverable signature in bytes.
pub const SIGNATURE_LEN: usize = 65;

/// A 65-byte recoverable ECDSA signature as produced by wallets.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature([u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    /// Build from raw bytes. The length must be exactly 65.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::BadSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Parse hex with an optional `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.trim();
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The `r || s` portion.
    pub fn rs(&self) -> &[u8] {
        &self.0[..64]
    }

    /// The raw trailing `v` byte.
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Normalized recovery id: 27/28 map to 0/1, 0/1 pass through.
    pub fn recovery_id(&self) -> Result<u8, CryptoError> {
        match self.v() {
            v @ (27 | 28) => Ok(v - 27),
            v @ (0 | 1) => Ok(v),
            v => Err(CryptoError::InvalidRecoveryId(v)),
        }
    }

    /// The full 65 bytes.
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

/// An uncompressed SEC1 public key: `0x04 || X(32) || Y(32)`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct UncompressedPublicKey([u8; 65]);

impl UncompressedPublicKey {
    /// Wrap 65 bytes. The leading tag must be `0x04`.
    pub fn from_bytes(bytes: [u8; 65]) -> Result<Self, CryptoError> {
        if bytes[0] != 0x04 {
            return Err(CryptoError::KeyError(format!(
                "expected uncompressed tag 0x04, got {:#04x}",
                bytes[0]
            )));
        }
        Ok(Self(bytes))
    }

    /// The 64-byte `X || Y` body without the SEC1 tag.
    pub fn body(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub(crate) fn from_verifying_key(key: &VerifyingKey) -> Result<Self, CryptoError> {
        let point = k256::PublicKey::from(key).to_encoded_point(false);
        let bytes: [u8; 65] = point
            .as_bytes()
            .try_into()
            .map_err(|_| CryptoError::RecoveryFailed)?;
        Self::from_bytes(bytes)
    }
}

impl std::fmt::Debug for UncompressedPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UncompressedPublicKey(0x{})", hex::encode(self.0))
    }
}

/// Recover the signer's public key from a 32-byte digest and a signature.
///
/// Verification is written against this trait so the curve backend can be
/// swapped or exercised in isolation.
pub trait KeyRecovery: Send + Sync {
    fn recover(
        &self,
        digest: &[u8; 32],
        signature: &RecoverableSignature,
    ) -> Result<UncompressedPublicKey, CryptoError>;
}

/// secp256k1 recovery backed by `k256`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Recovery;

impl KeyRecovery for Secp256k1Recovery {
    fn recover(
        &self,
        digest: &[u8; 32],
        signature: &RecoverableSignature,
    ) -> Result<UncompressedPublicKey, CryptoError> {
        let v = signature.recovery_id()?;
        let recid = RecoveryId::from_byte(v).ok_or(CryptoError::InvalidRecoveryId(v))?;
        let sig = Signature::from_slice(signature.rs()).map_err(|_| CryptoError::InvalidScalar)?;
        let (sig, recid) = match sig.normalize_s() {
            // Negating s mirrors R, so the y parity flips with it.
            Some(low) => (low, RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced())),
            None => (sig, recid),
        };
        let key = VerifyingKey::recover_from_prehash(digest, &sig, recid)
            .map_err(|_| CryptoError::RecoveryFailed)?;
        UncompressedPublicKey::from_verifying_key(&key)
    }
}
