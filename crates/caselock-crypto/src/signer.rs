//! # Personal-Message Signer
//!
//! A local secp256k1 key that produces the same 65-byte `personal_sign`
//! signatures a browser wallet does. Used by the CLI to sign test messages
//! and by tests to drive the verifier with real signatures.
//!
//! ## Security Invariant
//!
//! `PersonalSigner` does not implement `Serialize`, `Clone`, or a `Debug`
//! that prints key material.

use caselock_core::{Keccak256, WalletAddress};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;

use crate::address::address_from_public_key;
use crate::eip191::personal_message_digest;
use crate::error::CryptoError;
use crate::recovery::{RecoverableSignature, UncompressedPublicKey, SIGNATURE_LEN};

/// A secp256k1 private key for EIP-191 signing.
pub struct PersonalSigner {
    signing_key: SigningKey,
}

impl PersonalSigner {
    /// Generate a fresh key from the OS random source.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// Load a 32-byte big-endian secret scalar.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| CryptoError::KeyError(format!("invalid secret key: {e}")))?;
        Ok(Self { signing_key })
    }

    /// Load a secret from hex with an optional `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let s = s.trim();
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| CryptoError::KeyError(e.to_string()))?;
        let secret: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::KeyError(format!("secret key must be 32 bytes, got {}", bytes.len()))
        })?;
        Self::from_bytes(&secret)
    }

    pub fn public_key(&self) -> Result<UncompressedPublicKey, CryptoError> {
        UncompressedPublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// The wallet address controlled by this key.
    pub fn address(&self) -> Result<WalletAddress, CryptoError> {
        Ok(address_from_public_key(&self.public_key()?, &Keccak256))
    }

    /// Sign a 32-byte digest. `v` is emitted in the 27/28 form.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::KeyError(format!("signing failed: {e}")))?;
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[..64].copy_from_slice(&sig.to_bytes());
        bytes[64] = recid.to_byte() + 27;
        RecoverableSignature::from_bytes(&bytes)
    }

    /// Sign `message` as `personal_sign` does.
    pub fn sign_message(&self, message: &[u8]) -> Result<RecoverableSignature, CryptoError> {
        self.sign_digest(&personal_message_digest(message, &Keccak256))
    }
}

impl std::fmt::Debug for PersonalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.address() {
            Ok(addr) => write!(f, "PersonalSigner({addr})"),
            Err(_) => f.write_str("PersonalSigner(<invalid>)"),
        }
    }
}
