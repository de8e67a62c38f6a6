//! Ethereum address derivation: the last 20 bytes of the hash of the
//! 64-byte `X || Y` public key body.

use caselock_core::{HashPrimitive, WalletAddress};

use crate::recovery::UncompressedPublicKey;

pub fn address_from_public_key(
    key: &UncompressedPublicKey,
    hasher: &dyn HashPrimitive,
) -> WalletAddress {
    let hash = hasher.hash(key.body());
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    WalletAddress::from_bytes(addr)
}
