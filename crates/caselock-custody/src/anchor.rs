//! # Anchor Preparation
//!
//! Builds the payload a client submits to the on-chain evidence registry.
//! Nothing here talks to a chain: the registry transaction hash comes back
//! later through [`CustodyLedger::anchor`](crate::ledger::CustodyLedger::anchor).

use caselock_core::{CaseId, ContentHash, EvidenceId, WalletAddress};
use serde::{Deserialize, Serialize};

use crate::error::CustodyError;
use crate::hasher::ContentHasher;
use crate::manifest::{EvidenceKind, EvidenceManifest, Jurisdiction};
use crate::state::{CustodyState, EvidenceStatus};

/// Sepolia.
pub const DEFAULT_ANCHOR_CHAIN_ID: u64 = 11_155_111;

fn default_chain_id() -> u64 {
    DEFAULT_ANCHOR_CHAIN_ID
}

/// Where anchors are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchorConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Address of the evidence registry contract.
    pub registry: WalletAddress,
}

impl AnchorConfig {
    pub fn new(registry: WalletAddress) -> Self {
        Self {
            chain_id: DEFAULT_ANCHOR_CHAIN_ID,
            registry,
        }
    }
}

/// Arguments for the registry's anchor call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPayload {
    pub evidence_id: EvidenceId,
    pub case_id: CaseId,
    pub jurisdiction: Jurisdiction,
    pub kind: EvidenceKind,
    pub content_hash: ContentHash,
    pub media_uri: Option<String>,
    pub chain_id: u64,
    pub registry: WalletAddress,
}

/// Hash `manifest` and assemble the anchor payload for `state`.
///
/// Fails with `InvalidState` once the item is anchored, and with
/// `Integrity` if the manifest describes a different item.
pub fn prepare_anchor(
    state: &CustodyState,
    manifest: &EvidenceManifest,
    config: &AnchorConfig,
    hasher: &ContentHasher,
) -> Result<AnchorPayload, CustodyError> {
    if !state.status.can_anchor() {
        return Err(CustodyError::InvalidState {
            from: state.status.to_string(),
            to: EvidenceStatus::Anchored.to_string(),
        });
    }
    if manifest.evidence_id != state.evidence_id || manifest.case_id != state.case_id {
        return Err(CustodyError::Integrity(format!(
            "manifest for {} does not describe {}",
            manifest.evidence_id, state.evidence_id
        )));
    }
    let content_hash = hasher.compute_manifest(manifest)?;
    tracing::debug!(
        evidence_id = %state.evidence_id,
        content_hash = %content_hash,
        chain_id = config.chain_id,
        "anchor payload prepared"
    );
    Ok(AnchorPayload {
        evidence_id: state.evidence_id,
        case_id: state.case_id,
        jurisdiction: manifest.jurisdiction.clone(),
        kind: manifest.kind,
        content_hash,
        media_uri: manifest.media_uri().map(str::to_owned),
        chain_id: config.chain_id,
        registry: config.registry,
    })
}
