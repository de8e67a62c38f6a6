//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier exchanged with wallets and the
//! external evidence registry. Distinct types prevent a transaction hash
//! from being recorded as a content hash, or an evidence id from being
//! submitted where a case id is expected.
//!
//! ## Wire Format
//!
//! - Wallet addresses: `0x` + 40 hex characters, any case on input,
//!   always lower-case on output. No EIP-55 checksum enforcement.
//! - Ledger identifiers (evidence id, content hash, transaction hash):
//!   `0x` + 64 hex characters, validated by exact pattern before use and
//!   lower-cased.
//! - Case ids: UUIDs assigned by the case-management layer.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::IdentifierError;

/// Decode `0x` + `N*2` hex characters into `N` bytes.
fn parse_prefixed_hex<const N: usize>(
    s: &str,
    kind: &'static str,
) -> Result<[u8; N], IdentifierError> {
    let malformed = || IdentifierError::Malformed {
        kind,
        expected_hex: N * 2,
        got: s.to_string(),
    };
    let body = s.strip_prefix("0x").ok_or_else(malformed)?;
    if body.len() != N * 2 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    let mut out = [0u8; N];
    hex::decode_to_slice(body, &mut out).map_err(|_| malformed())?;
    Ok(out)
}

// ─── Wallet Address ──────────────────────────────────────────────────

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress([u8; 20]);

impl WalletAddress {
    /// The all-zero address, never a valid custodian.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Parse `0x` + 40 hex characters (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        parse_prefixed_hex::<20>(s, "wallet address").map(Self)
    }

    /// Wrap raw address bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// The raw 20 address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lower-case `0x`-prefixed hex rendering.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletAddress({})", self.to_hex())
    }
}

impl std::str::FromStr for WalletAddress {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ─── 32-byte Ledger Identifiers ──────────────────────────────────────

macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            /// Parse `0x` + 64 hex characters (case-insensitive).
            pub fn parse(s: &str) -> Result<Self, IdentifierError> {
                parse_prefixed_hex::<32>(s, $kind).map(Self)
            }

            /// Wrap raw bytes.
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// The raw 32 bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Lower-case `0x`-prefixed hex rendering.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdentifierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

ledger_id!(
    /// Identifier of an evidence item, shared with the registry contract.
    EvidenceId,
    "evidence id"
);

ledger_id!(
    /// Keccak-256 content hash of a canonical evidence manifest.
    ContentHash,
    "content hash"
);

ledger_id!(
    /// Hash of the registry transaction that anchored an evidence item.
    TxHash,
    "transaction hash"
);

impl EvidenceId {
    /// Generate a fresh random evidence identifier from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

// ─── Case Id ─────────────────────────────────────────────────────────

/// Identifier of a legal case, assigned by the case-management layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub Uuid);

impl CaseId {
    /// Generate a new random case identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a hyphenated UUID.
    pub fn parse(s: &str) -> Result<Self, IdentifierError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdentifierError::InvalidCaseId(s.to_string()))
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
