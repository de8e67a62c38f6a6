//! # caselock-custody: Evidence Integrity and Chain of Custody
//!
//! Evidence items are described by an [`EvidenceManifest`] whose canonical
//! form is content-hashed with Keccak-256 at anchor time. Custody of each
//! item is an append-only log of [`CustodyEvent`]s folded into a
//! [`CustodyState`] snapshot.
//!
//! ## Lifecycle
//!
//! ```text
//! create ──► DRAFT ──mark_ready──► READY ──anchor──► ANCHORED
//!              └────────────anchor──────────────────────┘
//!
//! custody:  initiate_transfer(from=current, to) ──► pending = to
//!           accept_custody(to)                  ──► current = to
//!           return_custody(from=current, to)    ──► current = to, pending cleared
//! ```
//!
//! ## Security Invariant
//!
//! Every snapshot equals the replay of its event log. Commands and replay
//! share one transition function, and a snapshot is only stored together
//! with the event that produced it, under an optimistic version check.
//! A content hash, once anchored, never changes.

pub mod anchor;
pub mod error;
pub mod event;
pub mod hasher;
pub mod ledger;
pub mod manifest;
pub mod repository;
pub mod state;

pub use anchor::{prepare_anchor, AnchorConfig, AnchorPayload, DEFAULT_ANCHOR_CHAIN_ID};
pub use error::CustodyError;
pub use event::{sort_events, CustodyEvent, CustodyPayload};
pub use hasher::ContentHasher;
pub use ledger::{CustodyLedger, TransferDetails};
pub use manifest::{
    EvidenceDetails, EvidenceKind, EvidenceManifest, FileDescriptor, Jurisdiction,
    MANIFEST_VERSION,
};
pub use repository::{CustodyRepository, MemoryCustodyRepository};
pub use state::{CustodyState, EvidenceStatus};
