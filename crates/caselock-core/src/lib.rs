//! # caselock-core: Foundational Types
//!
//! This crate is the leaf of the caselock workspace. It defines the value
//! tree that evidence manifests are hashed over, the canonicalization rules
//! that make that hash order-independent, the Keccak-256 primitive, and the
//! validated identifiers exchanged with the wallet and the external ledger.
//!
//! ## Key Design Principles
//!
//! 1. **Tagged value tree.** Manifests are represented as [`ManifestValue`],
//!    a closed enum of map/list/scalar variants. Canonicalization is a total
//!    recursive function over that enum; there is no runtime type sniffing.
//!
//! 2. **`CanonicalBytes` newtype.** Every content hash flows through
//!    [`CanonicalBytes::new()`], which canonicalizes before serializing.
//!
//! 3. **Newtype identifiers.** `WalletAddress`, `EvidenceId`, `ContentHash`,
//!    `TxHash` and `CaseId` are distinct types with validated constructors.
//!    A transaction hash cannot be passed where a content hash is expected.
//!
//! 4. **UTC-only timestamps** with seconds precision, read through an
//!    injectable [`Clock`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `caselock-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::{canonicalize, CanonicalBytes, ManifestValue, MAX_DEPTH};
pub use digest::{keccak256, keccak256_hex, HashPrimitive, Keccak256};
pub use error::{ClockError, IdentifierError, IntegrityError, ManifestDefect};
pub use identity::{CaseId, ContentHash, EvidenceId, TxHash, WalletAddress};
pub use temporal::{Clock, FixedClock, SystemClock, Timestamp};
