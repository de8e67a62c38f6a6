//! EIP-191 version `0x45` ("personal_sign") message digests.
//!
//! The digest a wallet signs for a text message is
//! `H("\x19Ethereum Signed Message:\n" || decimal(len(msg)) || msg)` where
//! the length is the byte length of `msg`, not its character count.

use caselock_core::HashPrimitive;

/// Fixed prefix of every personal-sign preimage.
pub const EIP191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// The prefix plus the decimal byte length of a message of `len` bytes.
pub fn personal_message_prefix(len: usize) -> String {
    format!("{EIP191_PREFIX}{len}")
}

/// Hash a message the way wallets do for `personal_sign`.
pub fn personal_message_digest(message: &[u8], hasher: &dyn HashPrimitive) -> [u8; 32] {
    let prefix = personal_message_prefix(message.len());
    let mut preimage = Vec::with_capacity(prefix.len() + message.len());
    preimage.extend_from_slice(prefix.as_bytes());
    preimage.extend_from_slice(message);
    hasher.hash(&preimage)
}
