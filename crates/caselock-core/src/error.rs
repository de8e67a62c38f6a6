//! # Error Types
//!
//! Errors shared by every caselock crate. All errors use `thiserror`;
//! each failure is a distinct typed value so callers at the HTTP boundary
//! can map them to status codes without string matching.

use thiserror::Error;

/// Error raised while canonicalizing or hashing a manifest.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    /// The input cannot be brought into canonical form.
    #[error("invalid manifest: {0}")]
    InvalidManifest(ManifestDefect),

    /// Serialization of the canonical tree failed.
    #[error("manifest serialization failed: {0}")]
    Serialization(String),
}

/// The specific reason a manifest was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManifestDefect {
    /// A map contains the same key twice.
    #[error("duplicate key {0:?}")]
    DuplicateKey(String),

    /// NaN or infinity has no JSON representation.
    #[error("non-finite number {0}")]
    NonFiniteNumber(f64),

    /// Nesting exceeds the maximum supported depth.
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),
}

impl From<ManifestDefect> for IntegrityError {
    fn from(defect: ManifestDefect) -> Self {
        Self::InvalidManifest(defect)
    }
}

/// Error parsing one of the validated identifier newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// The value does not match `0x` followed by the expected hex length.
    #[error("{kind} must be 0x followed by {expected_hex} hex characters, got {got:?}")]
    Malformed {
        /// Identifier kind, e.g. "wallet address".
        kind: &'static str,
        /// Expected number of hex characters after the prefix.
        expected_hex: usize,
        /// The rejected input.
        got: String,
    },

    /// A case identifier is not a UUID.
    #[error("invalid case id {0:?}")]
    InvalidCaseId(String),
}

/// The system clock could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("clock unavailable: {0}")]
pub struct ClockError(pub String);
