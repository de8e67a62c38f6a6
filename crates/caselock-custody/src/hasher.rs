//! # Content Hashing
//!
//! `content_hash = Keccak256(compact_json(canonicalize(manifest)))`.
//!
//! The canonical JSON is UTF-8 with no insignificant whitespace and no
//! escaping beyond what JSON requires, so the hash can be recomputed from
//! the manifest by any party holding the same canonicalization rules.

use std::sync::Arc;

use caselock_core::{
    CanonicalBytes, ContentHash, HashPrimitive, IntegrityError, Keccak256, ManifestValue,
};

use crate::manifest::EvidenceManifest;

/// Computes content hashes over canonical manifests.
#[derive(Clone)]
pub struct ContentHasher {
    hasher: Arc<dyn HashPrimitive>,
}

impl ContentHasher {
    pub fn new(hasher: Arc<dyn HashPrimitive>) -> Self {
        Self { hasher }
    }

    /// Hash an arbitrary manifest-shaped value.
    pub fn compute(&self, value: &ManifestValue) -> Result<ContentHash, IntegrityError> {
        let bytes = CanonicalBytes::new(value)?;
        Ok(ContentHash::from_bytes(self.hasher.hash(bytes.as_bytes())))
    }

    pub fn compute_manifest(
        &self,
        manifest: &EvidenceManifest,
    ) -> Result<ContentHash, IntegrityError> {
        self.compute(&manifest.to_value())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(Arc::new(Keccak256))
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher").finish_non_exhaustive()
    }
}
