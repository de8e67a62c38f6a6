//! Sign-in errors. Every rejection is terminal for the attempt; nothing
//! here is retried.

use caselock_core::{ClockError, WalletAddress};
use thiserror::Error;

/// Why a sign-in attempt was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed sign-in message: {0}")]
    ParseError(String),

    #[error("no challenge was issued for this session")]
    MissingChallenge,

    #[error("nonce does not match the issued challenge")]
    InvalidNonce,

    #[error("domain not allowed: {0}")]
    DomainNotAllowed(String),

    #[error("origin not allowed: {0}")]
    OriginNotAllowed(String),

    #[error("chain not allowed: {0}")]
    ChainNotAllowed(u64),

    /// `issuedAt` is further from the current time than the allowed skew.
    #[error("message issued {skew_seconds}s away from now, limit is {max_skew_seconds}s")]
    StaleMessage {
        skew_seconds: i64,
        max_skew_seconds: u64,
    },

    #[error("bad signature format: {0}")]
    BadSignatureFormat(String),

    #[error("signature recovery failed: {0}")]
    SignatureRecoveryFailed(String),

    #[error("recovered address {recovered} does not match claimed address {claimed}")]
    AddressMismatch {
        claimed: String,
        recovered: WalletAddress,
    },

    #[error(transparent)]
    Clock(#[from] ClockError),
}

impl AuthError {
    /// Stable upper-case code for logs and the HTTP boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ParseError(_) => "PARSE_ERROR",
            Self::MissingChallenge => "MISSING_CHALLENGE",
            Self::InvalidNonce => "INVALID_NONCE",
            Self::DomainNotAllowed(_) => "DOMAIN_NOT_ALLOWED",
            Self::OriginNotAllowed(_) => "ORIGIN_NOT_ALLOWED",
            Self::ChainNotAllowed(_) => "CHAIN_NOT_ALLOWED",
            Self::StaleMessage { .. } => "STALE_MESSAGE",
            Self::BadSignatureFormat(_) => "BAD_SIGNATURE_FORMAT",
            Self::SignatureRecoveryFailed(_) => "SIGNATURE_RECOVERY_FAILED",
            Self::AddressMismatch { .. } => "ADDRESS_MISMATCH",
            Self::Clock(_) => "CLOCK",
        }
    }
}

/// Verifier configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: String, reason: String },

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
