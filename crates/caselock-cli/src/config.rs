//! # CLI Configuration
//!
//! One YAML file with a section per concern, overlaid with environment
//! variables:
//!
//! ```yaml
//! verifier:
//!   allowed_domains: [portal.example]
//!   allowed_origins: ["https://portal.example"]
//!   allowed_chain_ids: [11155111]
//!   max_skew_seconds: 900
//! anchor:
//!   chain_id: 11155111
//!   registry: "0x…"
//! ```
//!
//! Verifier variables are listed on [`VerifierConfig::from_env`]. The anchor
//! section reads `CASELOCK_ANCHOR_REGISTRY` and `CASELOCK_ANCHOR_CHAIN_ID`.

use std::path::Path;

use anyhow::{Context, Result};
use caselock_auth::VerifierConfig;
use caselock_core::WalletAddress;
use caselock_custody::AnchorConfig;
use serde::Deserialize;

/// Parsed `--config` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub anchor: Option<AnchorConfig>,
}

impl CliConfig {
    /// Load from `path` if given, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_yaml_str(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        base.with_overrides_from(|var| std::env::var(var).ok())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.verifier = self.verifier.with_overrides_from(&lookup)?;

        if let Some(raw) = lookup("CASELOCK_ANCHOR_REGISTRY") {
            let registry = WalletAddress::parse(raw.trim())
                .context("CASELOCK_ANCHOR_REGISTRY is not an address")?;
            match self.anchor.as_mut() {
                Some(anchor) => anchor.registry = registry,
                None => self.anchor = Some(AnchorConfig::new(registry)),
            }
        }
        if let Some(raw) = lookup("CASELOCK_ANCHOR_CHAIN_ID") {
            let chain_id: u64 = raw
                .trim()
                .parse()
                .context("CASELOCK_ANCHOR_CHAIN_ID is not an integer")?;
            let anchor = self
                .anchor
                .as_mut()
                .context("CASELOCK_ANCHOR_CHAIN_ID set without a registry")?;
            anchor.chain_id = chain_id;
        }
        Ok(self)
    }

    /// The anchor section, which is required for anchor commands.
    pub fn anchor(&self) -> Result<&AnchorConfig> {
        self.anchor
            .as_ref()
            .context("no anchor registry configured (set anchor.registry or CASELOCK_ANCHOR_REGISTRY)")
    }
}
