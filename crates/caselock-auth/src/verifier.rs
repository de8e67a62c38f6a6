//! # Sign-In Verification
//!
//! [`MessageVerifier`] checks a signed sign-in message against the issued
//! challenge and the deployment's allow-lists, then recovers the signer.
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. nonce (constant-time)
//! 2. domain allow-list
//! 3. origin allow-list, matched against the message `URI`
//! 4. chain allow-list
//! 5. freshness: `|now - issuedAt| <= max_skew_seconds`
//! 6. signature format: 65 bytes of hex, optional `0x`
//! 7. EIP-191 digest and public key recovery
//! 8. recovered address equals the claimed address (case-insensitive)
//!
//! Empty allow-lists accept any value.

use std::sync::Arc;

use caselock_core::{Clock, HashPrimitive, Keccak256, SystemClock, Timestamp, WalletAddress};
use caselock_crypto::{
    address_from_public_key, personal_message_digest, KeyRecovery, RecoverableSignature,
    Secp256k1Recovery,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::{AuthError, ConfigError};
use crate::message::SignedMessage;
use crate::nonce::{Challenge, NonceStore};

/// Default tolerated distance between `issuedAt` and now (15 minutes).
pub const DEFAULT_MAX_SKEW_SECONDS: u64 = 900;

// ── Configuration ───────────────────────────────────────────────────────────

/// Allow-lists and freshness window for sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerifierConfig {
    pub allowed_domains: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub allowed_chain_ids: Vec<u64>,
    pub max_skew_seconds: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            allowed_domains: Vec::new(),
            allowed_origins: Vec::new(),
            allowed_chain_ids: Vec::new(),
            max_skew_seconds: DEFAULT_MAX_SKEW_SECONDS,
        }
    }
}

impl VerifierConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Defaults overridden by environment variables.
    ///
    /// Variables (lists are comma separated):
    /// - `CASELOCK_ALLOWED_DOMAINS`
    /// - `CASELOCK_ALLOWED_ORIGINS`
    /// - `CASELOCK_ALLOWED_CHAIN_IDS`
    /// - `CASELOCK_MAX_SKEW_SECONDS` (default: 900)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply environment overrides on top of `self`. Unset variables leave
    /// the current value in place.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CASELOCK_ALLOWED_DOMAINS") {
            self.allowed_domains = split_list(&raw);
        }
        if let Some(raw) = lookup("CASELOCK_ALLOWED_ORIGINS") {
            self.allowed_origins = split_list(&raw);
        }
        if let Some(raw) = lookup("CASELOCK_ALLOWED_CHAIN_IDS") {
            self.allowed_chain_ids = split_list(&raw)
                .iter()
                .map(|s| {
                    s.parse::<u64>().map_err(|e| ConfigError::InvalidVar {
                        var: "CASELOCK_ALLOWED_CHAIN_IDS".into(),
                        reason: format!("{s:?}: {e}"),
                    })
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(raw) = lookup("CASELOCK_MAX_SKEW_SECONDS") {
            self.max_skew_seconds =
                raw.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidVar {
                        var: "CASELOCK_MAX_SKEW_SECONDS".into(),
                        reason: e.to_string(),
                    })?;
        }
        Ok(self)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Verified Identity ───────────────────────────────────────────────────────

/// The outcome of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveredIdentity {
    /// Serializes as lowercase `0x` hex.
    pub address: WalletAddress,
    pub fields: SignedMessage,
}

// ── Verifier ────────────────────────────────────────────────────────────────

/// Verifies signed sign-in messages.
pub struct MessageVerifier {
    config: VerifierConfig,
    nonces: Arc<dyn NonceStore>,
    recovery: Arc<dyn KeyRecovery>,
    hasher: Arc<dyn HashPrimitive>,
    clock: Arc<dyn Clock>,
}

impl MessageVerifier {
    /// Verifier with secp256k1 recovery, Keccak-256, and the system clock.
    pub fn new(config: VerifierConfig, nonces: Arc<dyn NonceStore>) -> Self {
        Self {
            config,
            nonces,
            recovery: Arc::new(Secp256k1Recovery),
            hasher: Arc::new(Keccak256),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_recovery(mut self, recovery: Arc<dyn KeyRecovery>) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn HashPrimitive>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Issue a challenge for `session_key` through the configured store.
    pub fn issue_challenge(&self, session_key: &str) -> Result<Challenge, AuthError> {
        self.nonces.issue(session_key)
    }

    /// Consume the challenge for `session_key` and verify against it.
    ///
    /// The challenge is gone after this call whatever the outcome.
    pub fn verify_challenge(
        &self,
        session_key: &str,
        raw_message: &str,
        signature: &str,
    ) -> Result<RecoveredIdentity, AuthError> {
        let Some(challenge) = self.nonces.consume(session_key) else {
            let err = AuthError::MissingChallenge;
            tracing::warn!(kind = err.kind(), session = session_key, "sign-in rejected");
            return Err(err);
        };
        self.verify(raw_message, signature, &challenge.nonce)
    }

    /// Verify `raw_message` and `signature` against `expected_nonce`.
    pub fn verify(
        &self,
        raw_message: &str,
        signature: &str,
        expected_nonce: &str,
    ) -> Result<RecoveredIdentity, AuthError> {
        let result = self.check(raw_message, signature, expected_nonce);
        match &result {
            Ok(identity) => tracing::debug!(
                address = %identity.address,
                domain = %identity.fields.domain,
                chain_id = identity.fields.chain_id,
                "sign-in verified"
            ),
            Err(err) => tracing::warn!(kind = err.kind(), error = %err, "sign-in rejected"),
        }
        result
    }

    fn check(
        &self,
        raw_message: &str,
        signature: &str,
        expected_nonce: &str,
    ) -> Result<RecoveredIdentity, AuthError> {
        let fields = SignedMessage::parse(raw_message)?;

        if !constant_time_nonce_eq(&fields.nonce, expected_nonce) {
            return Err(AuthError::InvalidNonce);
        }
        if !allowed(&self.config.allowed_domains, &fields.domain) {
            return Err(AuthError::DomainNotAllowed(fields.domain));
        }
        if !allowed(&self.config.allowed_origins, &fields.uri) {
            return Err(AuthError::OriginNotAllowed(fields.uri));
        }
        if !self.config.allowed_chain_ids.is_empty()
            && !self.config.allowed_chain_ids.contains(&fields.chain_id)
        {
            return Err(AuthError::ChainNotAllowed(fields.chain_id));
        }
        self.check_freshness(&fields.issued_at)?;

        let sig = RecoverableSignature::from_hex(signature)
            .map_err(|e| AuthError::BadSignatureFormat(e.to_string()))?;
        let digest = personal_message_digest(raw_message.as_bytes(), self.hasher.as_ref());
        let public_key = self
            .recovery
            .recover(&digest, &sig)
            .map_err(|e| AuthError::SignatureRecoveryFailed(e.to_string()))?;
        let recovered = address_from_public_key(&public_key, self.hasher.as_ref());

        if !recovered.to_hex().eq_ignore_ascii_case(&fields.address) {
            return Err(AuthError::AddressMismatch {
                claimed: fields.address,
                recovered,
            });
        }
        Ok(RecoveredIdentity {
            address: recovered,
            fields,
        })
    }

    fn check_freshness(&self, issued_at: &str) -> Result<(), AuthError> {
        let iat = Timestamp::parse_rfc3339(issued_at)
            .map_err(|e| AuthError::ParseError(format!("invalid issued at {issued_at:?}: {e}")))?;
        let now = self.clock.now()?;
        let skew = now.seconds_since(&iat);
        if skew.unsigned_abs() > self.config.max_skew_seconds {
            return Err(AuthError::StaleMessage {
                skew_seconds: skew,
                max_skew_seconds: self.config.max_skew_seconds,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for MessageVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageVerifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn allowed(list: &[String], value: &str) -> bool {
    list.is_empty() || list.iter().any(|v| v == value)
}

/// Constant-time nonce comparison. On length mismatch a dummy comparison
/// still runs so timing does not reveal the expected length.
fn constant_time_nonce_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::MemoryNonceStore;
    use caselock_core::FixedClock;
    use caselock_crypto::PersonalSigner;
    use std::collections::HashMap;

    const NOW: i64 = 1_736_942_400; // 2025-01-15T12:00:00Z
    const NONCE: &str = "q7Yx3mZ0dQ9sL2kR8vWb1A";

    fn signer() -> PersonalSigner {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        PersonalSigner::from_bytes(&secret).unwrap()
    }

    fn message(address: &str) -> SignedMessage {
        SignedMessage {
            domain: "portal.example".into(),
            address: address.into(),
            statement: Some("Sign in to the evidence portal.".into()),
            uri: "https://portal.example".into(),
            version: "1".into(),
            chain_id: 11155111,
            nonce: NONCE.into(),
            issued_at: "2025-01-15T12:00:00Z".into(),
        }
    }

    fn config() -> VerifierConfig {
        VerifierConfig {
            allowed_domains: vec!["portal.example".into()],
            allowed_origins: vec!["https://portal.example".into()],
            allowed_chain_ids: vec![11155111],
            max_skew_seconds: DEFAULT_MAX_SKEW_SECONDS,
        }
    }

    fn verifier_at(now: i64, config: VerifierConfig) -> MessageVerifier {
        let clock = Arc::new(FixedClock(Timestamp::from_unix(now).unwrap()));
        MessageVerifier::new(config, Arc::new(MemoryNonceStore::new(clock.clone())))
            .with_clock(clock)
    }

    fn signed(msg: &SignedMessage) -> (String, String) {
        let text = msg.render();
        let sig = signer().sign_message(text.as_bytes()).unwrap();
        (text, sig.to_hex())
    }

    fn valid() -> (String, String) {
        signed(&message("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"))
    }

    // ── Happy path ──────────────────────────────────────────────────

    #[test]
    fn test_valid_message_returns_lowercase_address() {
        let (text, sig) = valid();
        let identity = verifier_at(NOW, config()).verify(&text, &sig, NONCE).unwrap();
        assert_eq!(
            identity.address.to_hex(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert_eq!(identity.fields.domain, "portal.example");
        let rendered = serde_yaml::to_string(&identity).unwrap();
        assert!(rendered.contains("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"));
    }

    #[test]
    fn test_signature_without_prefix_accepted() {
        let (text, sig) = valid();
        let bare = sig.trim_start_matches("0x");
        assert!(verifier_at(NOW, config()).verify(&text, bare, NONCE).is_ok());
    }

    #[test]
    fn test_empty_allow_lists_accept_anything() {
        let (text, sig) = valid();
        let v = verifier_at(NOW, VerifierConfig::default());
        assert!(v.verify(&text, &sig, NONCE).is_ok());
    }

    // ── Ordered rejections ──────────────────────────────────────────

    #[test]
    fn test_wrong_nonce() {
        let (text, sig) = valid();
        let v = verifier_at(NOW, config());
        assert_eq!(v.verify(&text, &sig, "other"), Err(AuthError::InvalidNonce));
        assert_eq!(
            v.verify(&text, &sig, "q7Yx3mZ0dQ9sL2kR8vWb1B"),
            Err(AuthError::InvalidNonce)
        );
    }

    #[test]
    fn test_nonce_checked_before_bad_timestamp() {
        let mut msg = message("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        msg.issued_at = "garbage".into();
        let (text, sig) = signed(&msg);
        let v = verifier_at(NOW, config());
        assert_eq!(v.verify(&text, &sig, "other"), Err(AuthError::InvalidNonce));
        assert!(matches!(
            v.verify(&text, &sig, NONCE),
            Err(AuthError::ParseError(_))
        ));
    }

    #[test]
    fn test_domain_not_allowed() {
        let mut msg = message("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        msg.domain = "evil.example".into();
        let (text, sig) = signed(&msg);
        assert_eq!(
            verifier_at(NOW, config()).verify(&text, &sig, NONCE),
            Err(AuthError::DomainNotAllowed("evil.example".into()))
        );
    }

    #[test]
    fn test_origin_not_allowed() {
        let mut msg = message("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        msg.uri = "https://portal.example/login".into();
        let (text, sig) = signed(&msg);
        assert!(matches!(
            verifier_at(NOW, config()).verify(&text, &sig, NONCE),
            Err(AuthError::OriginNotAllowed(_))
        ));
    }

    #[test]
    fn test_chain_not_allowed() {
        let mut msg = message("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        msg.chain_id = 1;
        let (text, sig) = signed(&msg);
        assert_eq!(
            verifier_at(NOW, config()).verify(&text, &sig, NONCE),
            Err(AuthError::ChainNotAllowed(1))
        );
    }

    #[test]
    fn test_freshness_boundary() {
        let (text, sig) = valid();
        let max = DEFAULT_MAX_SKEW_SECONDS as i64;
        for now in [NOW + max, NOW - max] {
            assert!(verifier_at(now, config()).verify(&text, &sig, NONCE).is_ok());
        }
        for now in [NOW + max + 1, NOW - max - 1] {
            assert!(matches!(
                verifier_at(now, config()).verify(&text, &sig, NONCE),
                Err(AuthError::StaleMessage { .. })
            ));
        }
    }

    #[test]
    fn test_zero_skew_requires_exact_second() {
        let (text, sig) = valid();
        let cfg = VerifierConfig {
            max_skew_seconds: 0,
            ..config()
        };
        assert!(verifier_at(NOW, cfg.clone()).verify(&text, &sig, NONCE).is_ok());
        assert!(verifier_at(NOW + 1, cfg).verify(&text, &sig, NONCE).is_err());
    }

    #[test]
    fn test_bad_signature_format() {
        let (text, sig) = valid();
        let v = verifier_at(NOW, config());
        let short = &sig[..sig.len() - 2];
        let long = format!("{sig}00");
        let non_hex = sig.replace('a', "g");
        for bad in [short, long.as_str(), "", "0x"] {
            assert!(matches!(
                v.verify(&text, bad, NONCE),
                Err(AuthError::BadSignatureFormat(_))
            ));
        }
        if non_hex != sig {
            assert!(matches!(
                v.verify(&text, &non_hex, NONCE),
                Err(AuthError::BadSignatureFormat(_))
            ));
        }
    }

    #[test]
    fn test_invalid_recovery_id() {
        let (text, sig) = valid();
        let bad_v = format!("{}25", &sig[..sig.len() - 2]);
        assert!(matches!(
            verifier_at(NOW, config()).verify(&text, &bad_v, NONCE),
            Err(AuthError::SignatureRecoveryFailed(_))
        ));
    }

    #[test]
    fn test_claimed_address_of_other_key() {
        let other = PersonalSigner::generate();
        let claimed = other.address().unwrap().to_hex();
        let msg = message(&claimed);
        let (text, sig) = signed(&msg);
        assert!(matches!(
            verifier_at(NOW, config()).verify(&text, &sig, NONCE),
            Err(AuthError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn test_signature_over_other_text() {
        let (text, _) = valid();
        let sig = signer().sign_message(b"something else").unwrap().to_hex();
        assert!(matches!(
            verifier_at(NOW, config()).verify(&text, &sig, NONCE),
            Err(AuthError::AddressMismatch { .. }) | Err(AuthError::SignatureRecoveryFailed(_))
        ));
    }

    #[test]
    fn test_single_bit_flip_never_succeeds() {
        let (text, sig) = valid();
        let v = verifier_at(NOW, config());
        let bytes = RecoverableSignature::from_hex(&sig).unwrap();
        for byte in 0..65 {
            for bit in 0..8 {
                let mut flipped = *bytes.as_bytes();
                flipped[byte] ^= 1 << bit;
                let flipped_hex = format!("0x{}", hex::encode(flipped));
                let result = v.verify(&text, &flipped_hex, NONCE);
                assert!(
                    matches!(
                        result,
                        Err(AuthError::SignatureRecoveryFailed(_))
                            | Err(AuthError::AddressMismatch { .. })
                    ),
                    "byte {byte} bit {bit}: {result:?}"
                );
            }
        }
    }

    // ── Challenge flow ──────────────────────────────────────────────

    #[test]
    fn test_verify_challenge_consumes_once() {
        let clock = Arc::new(FixedClock(Timestamp::from_unix(NOW).unwrap()));
        let store = Arc::new(MemoryNonceStore::new(clock.clone()));
        let v = MessageVerifier::new(config(), store.clone()).with_clock(clock);

        let challenge = v.issue_challenge("session").unwrap();
        let mut msg = message("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        msg.nonce = challenge.nonce;
        let (text, sig) = signed(&msg);

        assert!(v.verify_challenge("session", &text, &sig).is_ok());
        assert_eq!(
            v.verify_challenge("session", &text, &sig),
            Err(AuthError::MissingChallenge)
        );
    }

    #[test]
    fn test_failed_attempt_still_consumes() {
        let clock = Arc::new(FixedClock(Timestamp::from_unix(NOW).unwrap()));
        let store = Arc::new(MemoryNonceStore::new(clock.clone()));
        let v = MessageVerifier::new(config(), store.clone()).with_clock(clock);

        let challenge = v.issue_challenge("session").unwrap();
        let mut msg = message("0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        msg.nonce = challenge.nonce;
        let (text, _) = signed(&msg);

        assert!(v.verify_challenge("session", &text, "0x00").is_err());
        assert!(store.is_empty());
    }

    // ── Configuration ───────────────────────────────────────────────

    #[test]
    fn test_config_yaml_defaults() {
        let cfg = VerifierConfig::from_yaml_str("allowed_domains: [portal.example]\n").unwrap();
        assert_eq!(cfg.allowed_domains, vec!["portal.example".to_string()]);
        assert_eq!(cfg.max_skew_seconds, DEFAULT_MAX_SKEW_SECONDS);
        assert!(cfg.allowed_chain_ids.is_empty());
    }

    #[test]
    fn test_config_yaml_rejects_unknown_key() {
        assert!(VerifierConfig::from_yaml_str("allowed_domain: [x]\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CASELOCK_ALLOWED_DOMAINS", "a.example, b.example,,"),
            ("CASELOCK_ALLOWED_CHAIN_IDS", "1,11155111"),
            ("CASELOCK_MAX_SKEW_SECONDS", "60"),
        ]
        .into_iter()
        .collect();
        let cfg = config()
            .with_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.allowed_domains, vec!["a.example", "b.example"]);
        assert_eq!(cfg.allowed_origins, vec!["https://portal.example"]);
        assert_eq!(cfg.allowed_chain_ids, vec![1, 11155111]);
        assert_eq!(cfg.max_skew_seconds, 60);
    }

    #[test]
    fn test_env_override_rejects_bad_chain_id() {
        let err = VerifierConfig::default()
            .with_overrides_from(|k| (k == "CASELOCK_ALLOWED_CHAIN_IDS").then(|| "x".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { .. }));
    }

    #[test]
    fn test_constant_time_nonce_eq() {
        assert!(constant_time_nonce_eq("abc", "abc"));
        assert!(!constant_time_nonce_eq("abc", "abd"));
        assert!(!constant_time_nonce_eq("abc", "abcd"));
        assert!(!constant_time_nonce_eq("", "a"));
    }
}
