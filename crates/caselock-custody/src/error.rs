//! Custody errors. All are terminal for the call; a `Conflict` means the
//! caller computed its transition from a stale snapshot.

use caselock_core::{ClockError, EvidenceId, IntegrityError, WalletAddress};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CustodyError {
    /// The operation is not permitted from the current lifecycle status.
    #[error("invalid transition from {from} to {to}")]
    InvalidState { from: String, to: String },

    /// The actor is not the current custodian.
    #[error("{actor} is not the current custodian")]
    NotCustodian { actor: WalletAddress },

    /// No transfer to this address is pending.
    #[error("no pending transfer to {to}")]
    NoPendingTransfer { to: WalletAddress },

    /// The recipient is the current custodian or the zero address.
    #[error("invalid recipient {to}")]
    BadRecipient { to: WalletAddress },

    #[error("evidence {0} not found")]
    NotFound(EvidenceId),

    #[error("evidence {0} already exists")]
    AlreadyExists(EvidenceId),

    /// The stored version moved on since the transition was computed.
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    Conflict {
        id: EvidenceId,
        expected: u64,
        actual: u64,
    },

    /// Evidence details failed validation.
    #[error("invalid evidence details: {0}")]
    InvalidDetails(String),

    /// The event log or a snapshot is internally inconsistent.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error(transparent)]
    Manifest(#[from] IntegrityError),

    #[error(transparent)]
    Clock(#[from] ClockError),
}
