//! # Challenge Nonces
//!
//! A session may hold at most one outstanding challenge. Issuing replaces
//! any earlier challenge for the same session; consuming removes it under
//! the same lock that reads it, so two concurrent verifications of one
//! session can never both observe the nonce.
//!
//! Challenges that are never consumed stay in memory until
//! [`MemoryNonceStore::purge_older_than`] drops them; callers run it on a
//! timer with their sign-in window as the age limit.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use caselock_core::{Clock, SystemClock, Timestamp};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::AuthError;

/// Lower bound on nonce entropy in bytes (128 bits).
pub const MIN_NONCE_BYTES: usize = 16;

/// Draw `bytes` (at least [`MIN_NONCE_BYTES`]) from the OS random source and
/// encode them as unpadded base64url.
pub fn generate_nonce(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes.max(MIN_NONCE_BYTES)];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// An issued, not yet consumed, challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub nonce: String,
    pub issued_at: Timestamp,
    /// The session the challenge is bound to.
    pub owner: String,
}

/// Storage of outstanding challenges keyed by session.
pub trait NonceStore: Send + Sync {
    /// Issue a fresh challenge for `session_key`, replacing any previous one.
    fn issue(&self, session_key: &str) -> Result<Challenge, AuthError>;

    /// Atomically remove and return the challenge for `session_key`.
    fn consume(&self, session_key: &str) -> Option<Challenge>;
}

/// Process-local [`NonceStore`].
pub struct MemoryNonceStore {
    challenges: Mutex<HashMap<String, Challenge>>,
    clock: Arc<dyn Clock>,
    nonce_bytes: usize,
}

impl MemoryNonceStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
            clock,
            nonce_bytes: MIN_NONCE_BYTES,
        }
    }

    /// Use `bytes` of entropy per nonce. Values below the minimum are raised.
    pub fn with_nonce_bytes(mut self, bytes: usize) -> Self {
        self.nonce_bytes = bytes.max(MIN_NONCE_BYTES);
        self
    }

    /// Number of outstanding challenges.
    pub fn len(&self) -> usize {
        self.challenges.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.lock().is_empty()
    }

    /// Drop every challenge issued more than `max_age_seconds` ago and return
    /// how many were removed.
    pub fn purge_older_than(&self, max_age_seconds: u64) -> Result<usize, AuthError> {
        let now = self.clock.now()?;
        let max_age = i64::try_from(max_age_seconds).unwrap_or(i64::MAX);
        let mut challenges = self.challenges.lock();
        let before = challenges.len();
        challenges.retain(|_, c| now.seconds_since(&c.issued_at) <= max_age);
        let purged = before - challenges.len();
        if purged > 0 {
            tracing::debug!(purged, remaining = challenges.len(), "purged stale challenges");
        }
        Ok(purged)
    }
}

impl Default for MemoryNonceStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for MemoryNonceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNonceStore")
            .field("outstanding", &self.len())
            .field("nonce_bytes", &self.nonce_bytes)
            .finish()
    }
}

impl NonceStore for MemoryNonceStore {
    fn issue(&self, session_key: &str) -> Result<Challenge, AuthError> {
        let challenge = Challenge {
            nonce: generate_nonce(self.nonce_bytes),
            issued_at: self.clock.now()?,
            owner: session_key.to_string(),
        };
        self.challenges
            .lock()
            .insert(session_key.to_string(), challenge.clone());
        tracing::debug!(session = session_key, "issued sign-in challenge");
        Ok(challenge)
    }

    fn consume(&self, session_key: &str) -> Option<Challenge> {
        self.challenges.lock().remove(session_key)
    }
}
