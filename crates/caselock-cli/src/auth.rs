//! # Sign-In Commands
//!
//! `nonce`, `message`, `sign`, and `verify`. `verify` checks a message
//! against a nonce given on the command line rather than a stored
//! challenge, with the allow-lists from `--config` and the environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use caselock_auth::{
    generate_nonce, MemoryNonceStore, MessageVerifier, RecoveredIdentity, SignedMessage,
    VerifierConfig, MIN_NONCE_BYTES,
};
use caselock_core::{Clock, SystemClock};
use caselock_crypto::{PersonalSigner, RecoverableSignature};

use crate::read_text;

/// Arguments for `caselock nonce`.
#[derive(Args, Debug)]
pub struct NonceArgs {
    /// Random bytes before encoding; values below 16 are raised to 16.
    #[arg(long, default_value_t = MIN_NONCE_BYTES)]
    pub bytes: usize,
}

/// Arguments for `caselock message`.
#[derive(Args, Debug)]
pub struct MessageArgs {
    #[arg(long)]
    pub domain: String,
    #[arg(long)]
    pub address: String,
    #[arg(long)]
    pub uri: String,
    #[arg(long)]
    pub chain_id: u64,
    #[arg(long)]
    pub nonce: String,
    #[arg(long)]
    pub statement: Option<String>,
    /// RFC 3339 issue time. Defaults to now.
    #[arg(long)]
    pub issued_at: Option<String>,
}

/// Arguments for `caselock sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// File holding the exact message text.
    #[arg(long)]
    pub message: PathBuf,
    /// Hex secp256k1 secret key.
    #[arg(long)]
    pub key: String,
}

/// Arguments for `caselock verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// File holding the exact signed message text.
    #[arg(long)]
    pub message: PathBuf,
    /// 65-byte signature as hex.
    #[arg(long)]
    pub signature: String,
    /// The nonce the message must carry.
    #[arg(long)]
    pub nonce: String,
}

pub fn run_nonce(args: &NonceArgs) -> Result<u8> {
    println!("{}", generate_nonce(args.bytes));
    Ok(0)
}

pub fn run_message(args: &MessageArgs) -> Result<u8> {
    let message = build_message(args, &SystemClock)?;
    println!("{}", message.render());
    Ok(0)
}

/// Assemble a sign-in message, stamping the issue time from `clock` when
/// none was given.
pub fn build_message(args: &MessageArgs, clock: &dyn Clock) -> Result<SignedMessage> {
    let issued_at = match &args.issued_at {
        Some(t) => t.clone(),
        None => clock.now()?.to_iso8601(),
    };
    let message = SignedMessage {
        domain: args.domain.clone(),
        address: args.address.clone(),
        statement: args.statement.clone(),
        uri: args.uri.clone(),
        version: "1".into(),
        chain_id: args.chain_id,
        nonce: args.nonce.clone(),
        issued_at,
    };
    // Round-trip so a message this command prints always parses.
    SignedMessage::parse(&message.render()).context("message fields do not render a valid message")
}

pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let signature = sign_file(&args.message, &args.key)?;
    println!("{}", signature.to_hex());
    Ok(0)
}

pub fn sign_file(message: &Path, key: &str) -> Result<RecoverableSignature> {
    let text = read_text(message)?;
    let signer = PersonalSigner::from_hex(key).context("invalid signer key")?;
    tracing::debug!(address = %signer.address()?, "signing message");
    Ok(signer.sign_message(text.as_bytes())?)
}

pub fn run_verify(args: &VerifyArgs, config: &VerifierConfig) -> Result<u8> {
    match verify_file(&args.message, &args.signature, &args.nonce, config)? {
        Ok(identity) => {
            println!("OK: signed by {}", identity.address);
            println!("{}", serde_json::to_string_pretty(&identity)?);
            Ok(0)
        }
        Err(err) => {
            println!("REJECTED: {}: {err}", err.kind());
            Ok(1)
        }
    }
}

/// Verify a message file. The outer `Result` is for I/O, the inner one the
/// verification outcome.
pub fn verify_file(
    message: &Path,
    signature: &str,
    nonce: &str,
    config: &VerifierConfig,
) -> Result<Result<RecoveredIdentity, caselock_auth::AuthError>> {
    let text = read_text(message)?;
    let verifier = MessageVerifier::new(config.clone(), Arc::new(MemoryNonceStore::default()));
    Ok(verifier.verify(&text, signature, nonce))
}
