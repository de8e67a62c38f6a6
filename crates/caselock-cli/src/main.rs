//! # caselock CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use caselock_cli::auth::{
    run_message, run_nonce, run_sign, run_verify, MessageArgs, NonceArgs, SignArgs, VerifyArgs,
};
use caselock_cli::config::CliConfig;
use caselock_cli::evidence::{
    run_anchor_payload, run_digest_file, run_hash, run_replay, AnchorPayloadArgs, DigestFileArgs,
    HashArgs, ReplayArgs,
};

/// Wallet sign-in and evidence custody toolchain.
#[derive(Parser, Debug)]
#[command(name = "caselock", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a fresh challenge nonce.
    Nonce(NonceArgs),

    /// Render a sign-in message.
    Message(MessageArgs),

    /// Sign a message file with a local key (personal_sign).
    Sign(SignArgs),

    /// Verify a signed sign-in message.
    Verify(VerifyArgs),

    /// Content hash of a JSON manifest.
    Hash(HashArgs),

    /// SHA-256 and Keccak-256 of a file.
    DigestFile(DigestFileArgs),

    /// Replay a JSON custody event log.
    Replay(ReplayArgs),

    /// Build the registry anchor payload for a manifest.
    AnchorPayload(AnchorPayloadArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = CliConfig::load(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Nonce(args) => run_nonce(args),
        Commands::Message(args) => run_message(args),
        Commands::Sign(args) => run_sign(args),
        Commands::Verify(args) => run_verify(args, &config.verifier),
        Commands::Hash(args) => run_hash(args),
        Commands::DigestFile(args) => run_digest_file(args),
        Commands::Replay(args) => run_replay(args),
        Commands::AnchorPayload(args) => run_anchor_payload(args, config.anchor()?),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
