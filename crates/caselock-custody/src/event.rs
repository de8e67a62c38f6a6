//! # Custody Events
//!
//! The append-only log entries of an evidence item. Each event carries a
//! typed payload serialized as `{"kind": "...", "data": {...}}` next to the
//! envelope fields.

use caselock_core::{CaseId, ContentHash, EvidenceId, Timestamp, TxHash, WalletAddress};
use serde::{Deserialize, Serialize};

use crate::manifest::{EvidenceKind, Jurisdiction};

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustodyPayload {
    EvidenceCreated {
        submitter: WalletAddress,
        case_id: CaseId,
        title: String,
        kind: EvidenceKind,
        jurisdiction: Jurisdiction,
    },
    EvidenceReady,
    FileAttached {
        filename: String,
        sha256: String,
        keccak256: String,
        provider: String,
        cid: String,
    },
    Anchored {
        tx: TxHash,
        content_hash: ContentHash,
    },
    TransferInitiated {
        from: WalletAddress,
        to: WalletAddress,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purpose: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_return_at: Option<Timestamp>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offchain_context_hash: Option<String>,
    },
    TransferAccepted {
        to: WalletAddress,
    },
    Returned {
        from: WalletAddress,
        to: WalletAddress,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
}

impl CustodyPayload {
    /// The wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EvidenceCreated { .. } => "EVIDENCE_CREATED",
            Self::EvidenceReady => "EVIDENCE_READY",
            Self::FileAttached { .. } => "FILE_ATTACHED",
            Self::Anchored { .. } => "ANCHORED",
            Self::TransferInitiated { .. } => "TRANSFER_INITIATED",
            Self::TransferAccepted { .. } => "TRANSFER_ACCEPTED",
            Self::Returned { .. } => "RETURNED",
        }
    }
}

/// One entry of an evidence item's custody log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyEvent {
    pub evidence_id: EvidenceId,
    /// Zero-based position in the log.
    pub sequence: u64,
    pub actor: WalletAddress,
    #[serde(flatten)]
    pub payload: CustodyPayload,
    pub created_at: Timestamp,
}

impl CustodyEvent {
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}

/// Sort events into log order: `(created_at, sequence)` ascending.
pub fn sort_events(events: &mut [CustodyEvent]) {
    events.sort_by_key(|e| (e.created_at, e.sequence));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> WalletAddress {
        WalletAddress::from_bytes([b; 20])
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_unix(secs).unwrap()
    }

    #[test]
    fn test_wire_shape_has_kind_and_data() {
        let event = CustodyEvent {
            evidence_id: EvidenceId::from_bytes([1; 32]),
            sequence: 3,
            actor: addr(0xaa),
            payload: CustodyPayload::TransferAccepted { to: addr(0xaa) },
            created_at: ts(1_736_942_400),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "TRANSFER_ACCEPTED");
        assert_eq!(json["data"]["to"], addr(0xaa).to_hex());
        assert_eq!(json["sequence"], 3);
        assert_eq!(json["created_at"], "2025-01-15T12:00:00Z");

        let back: CustodyEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_optional_transfer_fields_omitted() {
        let payload = CustodyPayload::TransferInitiated {
            from: addr(1),
            to: addr(2),
            purpose: None,
            expected_return_at: None,
            offchain_context_hash: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        let data = json["data"].as_object().unwrap();
        assert_eq!(data.len(), 2);

        let with_purpose = CustodyPayload::TransferInitiated {
            from: addr(1),
            to: addr(2),
            purpose: Some("lab analysis".into()),
            expected_return_at: Some(ts(1_737_000_000)),
            offchain_context_hash: None,
        };
        let json = serde_json::to_value(&with_purpose).unwrap();
        assert_eq!(json["data"]["purpose"], "lab analysis");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let raw = r#"{"kind":"DESTROYED","data":{}}"#;
        assert!(serde_json::from_str::<CustodyPayload>(raw).is_err());
    }

    #[test]
    fn test_sort_by_time_then_sequence() {
        let mk = |seq, secs| CustodyEvent {
            evidence_id: EvidenceId::from_bytes([1; 32]),
            sequence: seq,
            actor: addr(1),
            payload: CustodyPayload::EvidenceReady,
            created_at: ts(secs),
        };
        let mut events = vec![mk(2, 100), mk(1, 100), mk(0, 50)];
        sort_events(&mut events);
        let order: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
