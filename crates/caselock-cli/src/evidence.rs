//! # Evidence Commands
//!
//! `hash`, `digest-file`, `replay`, and `anchor-payload`. Manifests and
//! event logs are read as JSON files in the shapes the custody crate
//! serializes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use caselock_core::{ContentHash, ManifestValue};
use caselock_crypto::FileDigests;
use caselock_custody::{
    prepare_anchor, AnchorConfig, AnchorPayload, ContentHasher, CustodyEvent, CustodyState,
    EvidenceManifest,
};

use crate::read_json;

/// Arguments for `caselock hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// JSON manifest.
    pub manifest: PathBuf,
    /// Hash the JSON as-is instead of reading it as an evidence manifest.
    #[arg(long)]
    pub raw: bool,
}

/// Arguments for `caselock digest-file`.
#[derive(Args, Debug)]
pub struct DigestFileArgs {
    pub file: PathBuf,
}

/// Arguments for `caselock replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// JSON array of custody events.
    pub events: PathBuf,
}

/// Arguments for `caselock anchor-payload`.
#[derive(Args, Debug)]
pub struct AnchorPayloadArgs {
    /// JSON evidence manifest.
    #[arg(long)]
    pub manifest: PathBuf,
    /// JSON custody event log of the same item.
    #[arg(long)]
    pub events: PathBuf,
}

pub fn run_hash(args: &HashArgs) -> Result<u8> {
    let hash = hash_file(&args.manifest, args.raw)?;
    println!("{hash}");
    Ok(0)
}

/// Content hash of a manifest file.
pub fn hash_file(path: &Path, raw: bool) -> Result<ContentHash> {
    let hasher = ContentHasher::default();
    let hash = if raw {
        let json: serde_json::Value = read_json(path)?;
        hasher.compute(&ManifestValue::from(json))?
    } else {
        let manifest: EvidenceManifest = read_json(path)?;
        hasher.compute_manifest(&manifest)?
    };
    tracing::info!(path = %path.display(), content_hash = %hash, "manifest hashed");
    Ok(hash)
}

pub fn run_digest_file(args: &DigestFileArgs) -> Result<u8> {
    let digests = FileDigests::of_path(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    println!("  size:      {}", digests.size);
    println!("  sha256:    {}", digests.sha256);
    println!("  keccak256: {}", digests.keccak256);
    Ok(0)
}

pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let state = replay_file(&args.events)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(0)
}

/// Fold a stored event log into its custody state.
pub fn replay_file(path: &Path) -> Result<CustodyState> {
    let events: Vec<CustodyEvent> = read_json(path)?;
    let state = CustodyState::replay(&events)
        .with_context(|| format!("event log {} does not replay", path.display()))?;
    tracing::info!(
        evidence_id = %state.evidence_id,
        status = %state.status,
        version = state.version,
        "custody log replayed"
    );
    Ok(state)
}

pub fn run_anchor_payload(args: &AnchorPayloadArgs, config: &AnchorConfig) -> Result<u8> {
    let payload = anchor_payload(&args.manifest, &args.events, config)?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(0)
}

/// Registry call arguments for a manifest, checked against its custody log.
pub fn anchor_payload(
    manifest: &Path,
    events: &Path,
    config: &AnchorConfig,
) -> Result<AnchorPayload> {
    let state = replay_file(events)?;
    let manifest: EvidenceManifest = read_json(manifest)?;
    Ok(prepare_anchor(
        &state,
        &manifest,
        config,
        &ContentHasher::default(),
    )?)
}
