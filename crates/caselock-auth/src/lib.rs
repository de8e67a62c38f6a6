//! # caselock-auth: Wallet Sign-In
//!
//! Challenge-response authentication for wallet holders. The server issues a
//! single-use nonce, the wallet signs a structured sign-in message that
//! embeds it, and [`MessageVerifier`] recovers the signer and checks the
//! message against the issued challenge and the deployment's allow-lists.
//!
//! ## Flow
//!
//! ```text
//! NonceStore::issue(session) ──► nonce ──► client renders + signs message
//!                                                     │
//! MessageVerifier::verify_challenge(session, message, signature)
//!     1. NonceStore::consume(session)        (exactly once, even on failure)
//!     2. parse message
//!     3. nonce · domain · origin · chain · freshness
//!     4. signature format · EIP-191 digest · key recovery · address match
//! ```
//!
//! ## Security Invariant
//!
//! A consumed nonce never satisfies a second verification. Nonce comparison
//! is constant-time. Rejections are logged by kind only; nonces and
//! signatures never reach the log.

pub mod error;
pub mod message;
pub mod nonce;
pub mod verifier;

pub use error::{AuthError, ConfigError};
pub use message::SignedMessage;
pub use nonce::{generate_nonce, Challenge, MemoryNonceStore, NonceStore, MIN_NONCE_BYTES};
pub use verifier::{MessageVerifier, RecoveredIdentity, VerifierConfig, DEFAULT_MAX_SKEW_SECONDS};
