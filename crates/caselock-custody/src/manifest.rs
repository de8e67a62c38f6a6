//! # Evidence Manifest
//!
//! The typed description of an evidence item that gets content-hashed at
//! anchor time. [`EvidenceManifest::to_value`] converts it into the tagged
//! [`ManifestValue`] tree under fixed keys:
//!
//! ```text
//! version, case_id, evidence_id, title, kind, jurisdiction, description,
//! submitter_address, current_custodian, files[
//!     filename, mime, size, sha256, keccak256, provider, cid, uri, encrypted
//! ]
//! ```
//!
//! Addresses and hex digests are lower-cased here; the hasher does not
//! re-normalize case.

use caselock_core::{CaseId, EvidenceId, ManifestValue, WalletAddress};
use caselock_crypto::FileDigests;
use serde::{Deserialize, Serialize};

use crate::error::CustodyError;

/// Manifest schema version.
pub const MANIFEST_VERSION: u64 = 1;

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 4000;

// ─── Evidence Kind ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceKind {
    DigitalDump,
    Fileset,
    Photo,
    Video,
    Audio,
    PhysicalItem,
    Other,
}

impl EvidenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DigitalDump => "DIGITAL_DUMP",
            Self::Fileset => "FILESET",
            Self::Photo => "PHOTO",
            Self::Video => "VIDEO",
            Self::Audio => "AUDIO",
            Self::PhysicalItem => "PHYSICAL_ITEM",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EvidenceKind {
    type Err = CustodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIGITAL_DUMP" => Ok(Self::DigitalDump),
            "FILESET" => Ok(Self::Fileset),
            "PHOTO" => Ok(Self::Photo),
            "VIDEO" => Ok(Self::Video),
            "AUDIO" => Ok(Self::Audio),
            "PHYSICAL_ITEM" => Ok(Self::PhysicalItem),
            "OTHER" => Ok(Self::Other),
            other => Err(CustodyError::InvalidDetails(format!(
                "unknown evidence kind {other:?}"
            ))),
        }
    }
}

// ─── Jurisdiction ────────────────────────────────────────────────────

/// A jurisdiction code: two capital letters, a hyphen, then at least two
/// capital letters or digits (e.g. `QC-CA`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Jurisdiction(String);

impl Jurisdiction {
    pub fn new(code: impl Into<String>) -> Result<Self, CustodyError> {
        let code = code.into();
        if !is_jurisdiction_code(&code) {
            return Err(CustodyError::InvalidDetails(format!(
                "invalid jurisdiction {code:?}"
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_jurisdiction_code(code: &str) -> bool {
    let Some((region, rest)) = code.split_once('-') else {
        return false;
    };
    region.len() == 2
        && region.bytes().all(|b| b.is_ascii_uppercase())
        && rest.len() >= 2
        && rest
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

impl TryFrom<String> for Jurisdiction {
    type Error = CustodyError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<Jurisdiction> for String {
    fn from(j: Jurisdiction) -> Self {
        j.0
    }
}

impl std::fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Evidence Details ────────────────────────────────────────────────

/// Descriptive fields supplied when an evidence item is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceDetails {
    pub title: String,
    pub kind: EvidenceKind,
    pub jurisdiction: Jurisdiction,
    #[serde(default)]
    pub description: String,
}

impl EvidenceDetails {
    /// Check title and description bounds.
    pub fn validate(&self) -> Result<(), CustodyError> {
        if self.title.trim().is_empty() {
            return Err(CustodyError::InvalidDetails("title is required".into()));
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(CustodyError::InvalidDetails(format!(
                "title exceeds {MAX_TITLE_CHARS} characters"
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(CustodyError::InvalidDetails(format!(
                "description exceeds {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        Ok(())
    }
}

// ─── File Descriptor ─────────────────────────────────────────────────

/// One stored file belonging to an evidence item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub filename: String,
    pub mime: String,
    pub size: u64,
    pub sha256: String,
    pub keccak256: String,
    #[serde(rename = "provider")]
    pub storage_provider: String,
    #[serde(rename = "cid")]
    pub storage_locator: String,
    #[serde(rename = "uri", default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
    #[serde(default)]
    pub encrypted: bool,
}

impl FileDescriptor {
    /// Describe a file from its computed digests.
    pub fn from_digests(
        filename: impl Into<String>,
        mime: impl Into<String>,
        digests: &FileDigests,
        storage_provider: impl Into<String>,
        storage_locator: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime: mime.into(),
            size: digests.size,
            sha256: digests.sha256.to_lowercase(),
            keccak256: digests.keccak256.to_lowercase(),
            storage_provider: storage_provider.into(),
            storage_locator: storage_locator.into(),
            storage_uri: None,
            encrypted: false,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.storage_uri = Some(uri.into());
        self
    }

    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    /// Tagged value form. A missing URI is rendered as an empty string so
    /// every file carries the same key set.
    pub fn to_value(&self) -> ManifestValue {
        ManifestValue::map([
            ("filename", self.filename.as_str().into()),
            ("mime", self.mime.as_str().into()),
            ("size", ManifestValue::UInt(self.size)),
            ("sha256", self.sha256.to_lowercase().into()),
            ("keccak256", self.keccak256.to_lowercase().into()),
            ("provider", self.storage_provider.as_str().into()),
            ("cid", self.storage_locator.as_str().into()),
            (
                "uri",
                self.storage_uri.clone().unwrap_or_default().into(),
            ),
            ("encrypted", self.encrypted.into()),
        ])
    }
}

// ─── Evidence Manifest ───────────────────────────────────────────────

/// The hashed description of an evidence item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceManifest {
    pub version: u64,
    pub case_id: CaseId,
    pub evidence_id: EvidenceId,
    pub title: String,
    pub kind: EvidenceKind,
    pub jurisdiction: Jurisdiction,
    pub description: String,
    pub submitter_address: WalletAddress,
    pub current_custodian: WalletAddress,
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

impl EvidenceManifest {
    /// A manifest with no files, held by its submitter.
    pub fn new(
        case_id: CaseId,
        evidence_id: EvidenceId,
        submitter: WalletAddress,
        details: EvidenceDetails,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION,
            case_id,
            evidence_id,
            title: details.title,
            kind: details.kind,
            jurisdiction: details.jurisdiction,
            description: details.description,
            submitter_address: submitter,
            current_custodian: submitter,
            files: Vec::new(),
        }
    }

    pub fn with_custodian(mut self, custodian: WalletAddress) -> Self {
        self.current_custodian = custodian;
        self
    }

    pub fn add_file(&mut self, file: FileDescriptor) {
        self.files.push(file);
    }

    /// The first file URI, if any file has one.
    pub fn media_uri(&self) -> Option<&str> {
        self.files.iter().find_map(|f| f.storage_uri.as_deref())
    }

    /// Convert to the tagged tree the content hash is computed over.
    pub fn to_value(&self) -> ManifestValue {
        ManifestValue::map([
            ("version", ManifestValue::UInt(self.version)),
            ("case_id", self.case_id.to_string().into()),
            ("evidence_id", self.evidence_id.to_hex().into()),
            ("title", self.title.as_str().into()),
            ("kind", self.kind.as_str().into()),
            ("jurisdiction", self.jurisdiction.as_str().into()),
            ("description", self.description.as_str().into()),
            ("submitter_address", self.submitter_address.to_hex().into()),
            ("current_custodian", self.current_custodian.to_hex().into()),
            (
                "files",
                ManifestValue::List(self.files.iter().map(FileDescriptor::to_value).collect()),
            ),
        ])
    }
}
