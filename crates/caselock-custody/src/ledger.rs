//! # Custody Ledger
//!
//! Command surface over the custody state machine. Every command loads the
//! current snapshot, builds the next event, folds it with
//! [`CustodyState::apply`], and hands both to the repository's check-and-set
//! append. A concurrent writer that got there first turns the append into
//! [`CustodyError::Conflict`]; nothing is retried.

use std::sync::Arc;

use caselock_core::{CaseId, Clock, ContentHash, EvidenceId, SystemClock, Timestamp, TxHash, WalletAddress};

use crate::error::CustodyError;
use crate::event::{sort_events, CustodyEvent, CustodyPayload};
use crate::hasher::ContentHasher;
use crate::manifest::{EvidenceDetails, EvidenceManifest, FileDescriptor};
use crate::repository::CustodyRepository;
use crate::state::CustodyState;

/// Optional context recorded with a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferDetails {
    pub purpose: Option<String>,
    pub expected_return_at: Option<Timestamp>,
    pub offchain_context_hash: Option<String>,
}

/// Chain-of-custody ledger for evidence items.
pub struct CustodyLedger {
    repo: Arc<dyn CustodyRepository>,
    clock: Arc<dyn Clock>,
    hasher: ContentHasher,
}

impl CustodyLedger {
    pub fn new(repo: Arc<dyn CustodyRepository>) -> Self {
        Self {
            repo,
            clock: Arc::new(SystemClock),
            hasher: ContentHasher::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_hasher(mut self, hasher: ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Register a new evidence item in `DRAFT`, held by its submitter.
    pub fn create(
        &self,
        evidence_id: EvidenceId,
        case_id: CaseId,
        submitter: WalletAddress,
        details: &EvidenceDetails,
    ) -> Result<CustodyState, CustodyError> {
        details.validate()?;
        let event = CustodyEvent {
            evidence_id,
            sequence: 0,
            actor: submitter,
            payload: CustodyPayload::EvidenceCreated {
                submitter,
                case_id,
                title: details.title.clone(),
                kind: details.kind,
                jurisdiction: details.jurisdiction.clone(),
            },
            created_at: self.clock.now()?,
        };
        let state = CustodyState::genesis(&event)?;
        self.repo.insert(&state, event)?;
        tracing::info!(
            evidence_id = %evidence_id,
            case_id = %case_id,
            submitter = %submitter,
            kind = "EVIDENCE_CREATED",
            "evidence created"
        );
        Ok(state)
    }

    pub fn mark_ready(
        &self,
        id: &EvidenceId,
        actor: WalletAddress,
    ) -> Result<CustodyState, CustodyError> {
        self.transition(id, actor, CustodyPayload::EvidenceReady)
    }

    /// Record a stored file. The snapshot, including any anchored content
    /// hash, is unchanged apart from its version.
    pub fn attach_file(
        &self,
        id: &EvidenceId,
        actor: WalletAddress,
        file: &FileDescriptor,
    ) -> Result<CustodyState, CustodyError> {
        self.transition(
            id,
            actor,
            CustodyPayload::FileAttached {
                filename: file.filename.clone(),
                sha256: file.sha256.to_lowercase(),
                keccak256: file.keccak256.to_lowercase(),
                provider: file.storage_provider.clone(),
                cid: file.storage_locator.clone(),
            },
        )
    }

    /// Fix the content hash and registry transaction. Allowed once, from
    /// `DRAFT` or `READY`.
    pub fn anchor(
        &self,
        id: &EvidenceId,
        actor: WalletAddress,
        tx: TxHash,
        content_hash: ContentHash,
    ) -> Result<CustodyState, CustodyError> {
        self.transition(id, actor, CustodyPayload::Anchored { tx, content_hash })
    }

    /// Hash `manifest` and anchor the result.
    pub fn anchor_manifest(
        &self,
        id: &EvidenceId,
        actor: WalletAddress,
        tx: TxHash,
        manifest: &EvidenceManifest,
    ) -> Result<CustodyState, CustodyError> {
        if manifest.evidence_id != *id {
            return Err(CustodyError::Integrity(format!(
                "manifest describes {} not {id}",
                manifest.evidence_id
            )));
        }
        let content_hash = self.hasher.compute_manifest(manifest)?;
        self.anchor(id, actor, tx, content_hash)
    }

    /// Offer custody to `to`. Re-initiating while a transfer is pending
    /// retargets it.
    pub fn initiate_transfer(
        &self,
        id: &EvidenceId,
        from: WalletAddress,
        to: WalletAddress,
        details: TransferDetails,
    ) -> Result<CustodyState, CustodyError> {
        self.transition(
            id,
            from,
            CustodyPayload::TransferInitiated {
                from,
                to,
                purpose: details.purpose,
                expected_return_at: details.expected_return_at,
                offchain_context_hash: details.offchain_context_hash,
            },
        )
    }

    pub fn accept_custody(
        &self,
        id: &EvidenceId,
        to: WalletAddress,
    ) -> Result<CustodyState, CustodyError> {
        self.transition(id, to, CustodyPayload::TransferAccepted { to })
    }

    /// Hand custody back directly, cancelling any pending transfer.
    pub fn return_custody(
        &self,
        id: &EvidenceId,
        from: WalletAddress,
        to: WalletAddress,
        note: Option<String>,
    ) -> Result<CustodyState, CustodyError> {
        self.transition(id, from, CustodyPayload::Returned { from, to, note })
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn state(&self, id: &EvidenceId) -> Result<CustodyState, CustodyError> {
        self.repo.load(id)?.ok_or(CustodyError::NotFound(*id))
    }

    /// Events ordered by `(created_at, sequence)`.
    pub fn list_events(&self, id: &EvidenceId) -> Result<Vec<CustodyEvent>, CustodyError> {
        let mut events = self.repo.events(id)?;
        sort_events(&mut events);
        Ok(events)
    }

    /// Rebuild the snapshot from the log and check it against the stored one.
    pub fn replay(&self, id: &EvidenceId) -> Result<CustodyState, CustodyError> {
        let replayed = CustodyState::replay(&self.repo.events(id)?)?;
        let stored = self.state(id)?;
        if replayed != stored {
            tracing::error!(evidence_id = %id, "snapshot diverges from event log");
            return Err(CustodyError::Integrity(format!(
                "snapshot of {id} at version {} diverges from its log at version {}",
                stored.version, replayed.version
            )));
        }
        Ok(replayed)
    }

    fn transition(
        &self,
        id: &EvidenceId,
        actor: WalletAddress,
        payload: CustodyPayload,
    ) -> Result<CustodyState, CustodyError> {
        let current = self.state(id)?;
        let event = CustodyEvent {
            evidence_id: *id,
            sequence: current.version,
            actor,
            payload,
            created_at: self.clock.now()?,
        };
        let kind = event.kind();
        let next = match current.apply(&event) {
            Ok(next) => next,
            Err(err) => {
                tracing::warn!(evidence_id = %id, actor = %actor, kind, error = %err, "custody transition rejected");
                return Err(err);
            }
        };
        self.repo.append(id, current.version, &next, event)?;
        tracing::info!(
            evidence_id = %id,
            actor = %actor,
            kind,
            status = %next.status,
            version = next.version,
            "custody transition"
        );
        Ok(next)
    }
}

impl std::fmt::Debug for CustodyLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodyLedger").finish_non_exhaustive()
    }
}
