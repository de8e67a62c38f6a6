//! # Custody State Machine
//!
//! Folds custody events into a snapshot. [`CustodyState::apply`] is the only
//! transition function: the ledger uses it to compute the next snapshot for
//! a command, and [`CustodyState::replay`] uses it to rebuild a snapshot
//! from a stored log. A snapshot therefore always equals the replay of the
//! events that produced it.
//!
//! ## States
//!
//! ```text
//! DRAFT ──▶ READY ──▶ ANCHORED (terminal for the lifecycle)
//!   │                    ▲
//!   └────────────────────┘
//! ```
//!
//! Custody (current / pending custodian) is orthogonal to the lifecycle
//! status: transfers are accepted in every status, and files may be
//! attached after anchoring without changing the recorded content hash.

use caselock_core::{CaseId, ContentHash, EvidenceId, Timestamp, TxHash, WalletAddress};
use serde::{Deserialize, Serialize};

use crate::error::CustodyError;
use crate::event::{CustodyEvent, CustodyPayload};

// ─── Evidence Status ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceStatus {
    Draft,
    Ready,
    Anchored,
}

impl EvidenceStatus {
    /// Whether the item may still be anchored.
    pub fn can_anchor(&self) -> bool {
        matches!(self, Self::Draft | Self::Ready)
    }
}

impl std::fmt::Display for EvidenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "DRAFT",
            Self::Ready => "READY",
            Self::Anchored => "ANCHORED",
        };
        f.write_str(s)
    }
}

// ─── Custody State ───────────────────────────────────────────────────

/// Snapshot of an evidence item after `version` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyState {
    pub evidence_id: EvidenceId,
    pub case_id: CaseId,
    pub status: EvidenceStatus,
    pub submitter: WalletAddress,
    pub current_custodian: WalletAddress,
    pub pending_custodian: Option<WalletAddress>,
    pub content_hash: Option<ContentHash>,
    pub anchor_tx: Option<TxHash>,
    pub anchored_at: Option<Timestamp>,
    /// Number of events folded into this snapshot.
    pub version: u64,
}

impl CustodyState {
    /// The snapshot produced by an `EVIDENCE_CREATED` event at sequence 0.
    pub fn genesis(event: &CustodyEvent) -> Result<Self, CustodyError> {
        let CustodyPayload::EvidenceCreated {
            submitter, case_id, ..
        } = &event.payload
        else {
            return Err(CustodyError::Integrity(format!(
                "log of {} starts with {} instead of EVIDENCE_CREATED",
                event.evidence_id,
                event.kind()
            )));
        };
        if event.sequence != 0 {
            return Err(CustodyError::Integrity(format!(
                "creation event of {} has sequence {}",
                event.evidence_id, event.sequence
            )));
        }
        if submitter.is_zero() {
            return Err(CustodyError::InvalidDetails("submitter is the zero address".into()));
        }
        Ok(Self {
            evidence_id: event.evidence_id,
            case_id: *case_id,
            status: EvidenceStatus::Draft,
            submitter: *submitter,
            current_custodian: *submitter,
            pending_custodian: None,
            content_hash: None,
            anchor_tx: None,
            anchored_at: None,
            version: 1,
        })
    }

    /// Compute the snapshot after `event`, or reject the event.
    pub fn apply(&self, event: &CustodyEvent) -> Result<Self, CustodyError> {
        if event.evidence_id != self.evidence_id {
            return Err(CustodyError::Integrity(format!(
                "event for {} applied to {}",
                event.evidence_id, self.evidence_id
            )));
        }
        if event.sequence != self.version {
            return Err(CustodyError::Integrity(format!(
                "event sequence {} does not follow version {}",
                event.sequence, self.version
            )));
        }

        let mut next = self.clone();
        match &event.payload {
            CustodyPayload::EvidenceCreated { .. } => {
                return Err(CustodyError::AlreadyExists(self.evidence_id));
            }
            CustodyPayload::EvidenceReady => {
                self.require_status(&[EvidenceStatus::Draft], EvidenceStatus::Ready)?;
                next.status = EvidenceStatus::Ready;
            }
            CustodyPayload::FileAttached { .. } => {}
            CustodyPayload::Anchored { tx, content_hash } => {
                self.require_status(
                    &[EvidenceStatus::Draft, EvidenceStatus::Ready],
                    EvidenceStatus::Anchored,
                )?;
                next.status = EvidenceStatus::Anchored;
                next.content_hash = Some(*content_hash);
                next.anchor_tx = Some(*tx);
                next.anchored_at = Some(event.created_at);
            }
            CustodyPayload::TransferInitiated { from, to, .. } => {
                self.require_custodian(&event.actor, from)?;
                self.require_recipient(to)?;
                next.pending_custodian = Some(*to);
            }
            CustodyPayload::TransferAccepted { to } => {
                if event.actor != *to || self.pending_custodian != Some(*to) {
                    return Err(CustodyError::NoPendingTransfer { to: event.actor });
                }
                next.current_custodian = *to;
                next.pending_custodian = None;
            }
            CustodyPayload::Returned { from, to, .. } => {
                self.require_custodian(&event.actor, from)?;
                self.require_recipient(to)?;
                next.current_custodian = *to;
                next.pending_custodian = None;
            }
        }
        next.version += 1;
        Ok(next)
    }

    /// Rebuild a snapshot from a complete log in sequence order.
    pub fn replay(events: &[CustodyEvent]) -> Result<Self, CustodyError> {
        let mut ordered: Vec<&CustodyEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.sequence);
        let (first, rest) = ordered
            .split_first()
            .ok_or_else(|| CustodyError::Integrity("empty custody log".into()))?;
        rest.iter()
            .try_fold(Self::genesis(first)?, |state, event| state.apply(event))
    }

    fn require_status(
        &self,
        allowed: &[EvidenceStatus],
        target: EvidenceStatus,
    ) -> Result<(), CustodyError> {
        if !allowed.contains(&self.status) {
            return Err(CustodyError::InvalidState {
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        Ok(())
    }

    fn require_custodian(
        &self,
        actor: &WalletAddress,
        from: &WalletAddress,
    ) -> Result<(), CustodyError> {
        if *actor != self.current_custodian || *from != self.current_custodian {
            return Err(CustodyError::NotCustodian { actor: *actor });
        }
        Ok(())
    }

    fn require_recipient(&self, to: &WalletAddress) -> Result<(), CustodyError> {
        if to.is_zero() || *to == self.current_custodian {
            return Err(CustodyError::BadRecipient { to: *to });
        }
        Ok(())
    }
}
