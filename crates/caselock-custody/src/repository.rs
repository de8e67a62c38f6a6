//! # Custody Repository
//!
//! Persistence seam for custody snapshots and their event logs. An
//! implementation must store an event and its resulting snapshot together
//! or not at all, and must refuse an append computed from a stale version.

use std::collections::HashMap;

use caselock_core::EvidenceId;
use parking_lot::RwLock;

use crate::error::CustodyError;
use crate::event::CustodyEvent;
use crate::state::CustodyState;

/// Durable storage of custody state.
pub trait CustodyRepository: Send + Sync {
    /// Store a new item with its creation event. Fails with
    /// [`CustodyError::AlreadyExists`] if the id is taken.
    fn insert(&self, state: &CustodyState, genesis: CustodyEvent) -> Result<(), CustodyError>;

    fn load(&self, id: &EvidenceId) -> Result<Option<CustodyState>, CustodyError>;

    /// Append `event` and replace the snapshot with `next`, provided the
    /// stored version is still `expected_version`.
    fn append(
        &self,
        id: &EvidenceId,
        expected_version: u64,
        next: &CustodyState,
        event: CustodyEvent,
    ) -> Result<(), CustodyError>;

    /// All events for `id` in the order they were appended.
    fn events(&self, id: &EvidenceId) -> Result<Vec<CustodyEvent>, CustodyError>;
}

struct Record {
    state: CustodyState,
    events: Vec<CustodyEvent>,
}

/// In-process [`CustodyRepository`]. Every mutation happens under a single
/// write lock covering both the snapshot and the log.
#[derive(Default)]
pub struct MemoryCustodyRepository {
    records: RwLock<HashMap<EvidenceId, Record>>,
}

impl MemoryCustodyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl std::fmt::Debug for MemoryCustodyRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCustodyRepository")
            .field("items", &self.len())
            .finish()
    }
}

impl CustodyRepository for MemoryCustodyRepository {
    fn insert(&self, state: &CustodyState, genesis: CustodyEvent) -> Result<(), CustodyError> {
        let mut records = self.records.write();
        if records.contains_key(&state.evidence_id) {
            return Err(CustodyError::AlreadyExists(state.evidence_id));
        }
        records.insert(
            state.evidence_id,
            Record {
                state: state.clone(),
                events: vec![genesis],
            },
        );
        Ok(())
    }

    fn load(&self, id: &EvidenceId) -> Result<Option<CustodyState>, CustodyError> {
        Ok(self.records.read().get(id).map(|r| r.state.clone()))
    }

    fn append(
        &self,
        id: &EvidenceId,
        expected_version: u64,
        next: &CustodyState,
        event: CustodyEvent,
    ) -> Result<(), CustodyError> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or(CustodyError::NotFound(*id))?;
        if record.state.version != expected_version {
            return Err(CustodyError::Conflict {
                id: *id,
                expected: expected_version,
                actual: record.state.version,
            });
        }
        if next.version != expected_version + 1 || event.sequence != expected_version {
            return Err(CustodyError::Integrity(format!(
                "append to {id} at version {expected_version} carries sequence {} and next version {}",
                event.sequence, next.version
            )));
        }
        record.events.push(event);
        record.state = next.clone();
        Ok(())
    }

    fn events(&self, id: &EvidenceId) -> Result<Vec<CustodyEvent>, CustodyError> {
        self.records
            .read()
            .get(id)
            .map(|r| r.events.clone())
            .ok_or(CustodyError::NotFound(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CustodyPayload;
    use crate::manifest::{EvidenceKind, Jurisdiction};
    use caselock_core::{CaseId, Timestamp, WalletAddress};

    fn id() -> EvidenceId {
        EvidenceId::from_bytes([3; 32])
    }

    fn ev(sequence: u64, payload: CustodyPayload) -> CustodyEvent {
        CustodyEvent {
            evidence_id: id(),
            sequence,
            actor: WalletAddress::from_bytes([1; 20]),
            payload,
            created_at: Timestamp::from_unix(1_736_942_400).unwrap(),
        }
    }

    fn seeded() -> (MemoryCustodyRepository, CustodyState) {
        let genesis = ev(
            0,
            CustodyPayload::EvidenceCreated {
                submitter: WalletAddress::from_bytes([1; 20]),
                case_id: CaseId::new(),
                title: "t".into(),
                kind: EvidenceKind::Other,
                jurisdiction: Jurisdiction::new("QC-CA").unwrap(),
            },
        );
        let state = CustodyState::genesis(&genesis).unwrap();
        let repo = MemoryCustodyRepository::new();
        repo.insert(&state, genesis).unwrap();
        (repo, state)
    }

    #[test]
    fn test_insert_then_load() {
        let (repo, state) = seeded();
        assert_eq!(repo.load(&id()).unwrap(), Some(state));
        assert_eq!(repo.events(&id()).unwrap().len(), 1);
        assert_eq!(repo.load(&EvidenceId::from_bytes([9; 32])).unwrap(), None);
    }

    #[test]
    fn test_duplicate_insert() {
        let (repo, state) = seeded();
        let again = repo.events(&id()).unwrap().remove(0);
        assert_eq!(
            repo.insert(&state, again),
            Err(CustodyError::AlreadyExists(id()))
        );
    }

    #[test]
    fn test_append_checks_version() {
        let (repo, state) = seeded();
        let e = ev(1, CustodyPayload::EvidenceReady);
        let next = state.apply(&e).unwrap();
        repo.append(&id(), 1, &next, e.clone()).unwrap();

        // Same transition computed from the old snapshot loses.
        assert_eq!(
            repo.append(&id(), 1, &next, e),
            Err(CustodyError::Conflict {
                id: id(),
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(repo.events(&id()).unwrap().len(), 2);
        assert_eq!(repo.load(&id()).unwrap().unwrap().version, 2);
    }

    #[test]
    fn test_append_rejects_mismatched_sequence() {
        let (repo, state) = seeded();
        let e = ev(1, CustodyPayload::EvidenceReady);
        let next = state.apply(&e).unwrap();
        let mut wrong = e;
        wrong.sequence = 4;
        assert!(matches!(
            repo.append(&id(), 1, &next, wrong),
            Err(CustodyError::Integrity(_))
        ));
        assert_eq!(repo.events(&id()).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_id() {
        let repo = MemoryCustodyRepository::new();
        assert!(matches!(
            repo.events(&id()),
            Err(CustodyError::NotFound(_))
        ));
        let (_, state) = seeded();
        assert!(matches!(
            repo.append(&id(), 1, &state, ev(1, CustodyPayload::EvidenceReady)),
            Err(CustodyError::NotFound(_))
        ));
    }
}
