//! # caselock-cli: CLI Tool for caselock
//!
//! Provides the `caselock` command-line interface over the sign-in and
//! custody crates. Every command is offline: nothing here talks to a wallet,
//! a storage provider, or a chain.
//!
//! ## Subcommands
//!
//! - `caselock nonce`: Fresh challenge nonce.
//! - `caselock message`: Render a sign-in message.
//! - `caselock sign` / `caselock verify`: Personal-message signatures.
//! - `caselock hash`: Content hash of a manifest.
//! - `caselock digest-file`: SHA-256 and Keccak-256 of a file.
//! - `caselock replay`: Rebuild custody state from an event log.
//! - `caselock anchor-payload`: Registry call arguments for a manifest.
//!
//! ```bash
//! caselock nonce --bytes 24
//! caselock message --domain portal.example --address 0x… --uri https://portal.example \
//!     --chain-id 11155111 --nonce abc > msg.txt
//! caselock -v --config caselock.yaml verify --message msg.txt --signature 0x… --nonce abc
//! ```

pub mod auth;
pub mod config;
pub mod evidence;

use std::path::Path;

use anyhow::{Context, Result};

/// Read a UTF-8 text file, dropping one trailing line break so that a file
/// written by `caselock message > msg.txt` holds exactly the rendered text.
pub fn read_text(path: &Path) -> Result<String> {
    let mut text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    Ok(text)
}

/// Read and deserialize a JSON file.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}
