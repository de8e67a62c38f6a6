//! # Canonical Serialization: Order-Independent Manifest Bytes
//!
//! Defines [`ManifestValue`], the tagged value tree every evidence manifest
//! is converted into before hashing, and [`CanonicalBytes`], the sole
//! construction path for bytes that feed a content hash.
//!
//! ## Canonicalization Rules
//!
//! 1. **Scalars**: null, booleans, integers, finite floats and strings pass
//!    through unchanged.
//! 2. **Maps**: entries are re-sorted by key in ascending byte order and each
//!    value is canonicalized. Duplicate keys are rejected.
//! 3. **File lists**: a non-empty list whose every element is a map with a
//!    `filename` key has its elements canonicalized, then is sorted by
//!    `(lowercase filename, lowercase sha256, canonical element bytes)`.
//!    The last key orders entries that share a name and digest.
//! 4. **Other lists**: element order is preserved; only the elements are
//!    canonicalized. Order in e.g. an audit trail is meaningful.
//!
//! After canonicalization the tree is written as compact JSON: no
//! whitespace, `/` left unescaped, non-ASCII written as raw UTF-8.
//!
//! ## Security Invariant
//!
//! `CanonicalBytes` has a private inner field and one constructor that always
//! canonicalizes first. Any function that hashes manifest content must accept
//! `&CanonicalBytes`, so a hash over non-canonical bytes cannot be produced.

use std::cmp::Ordering;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{IntegrityError, ManifestDefect};

/// Maximum container nesting accepted by [`canonicalize()`].
pub const MAX_DEPTH: usize = 64;

/// Key whose presence on every element marks a list as a file list.
const FILENAME_KEY: &str = "filename";

/// Secondary sort key for file lists.
const SHA256_KEY: &str = "sha256";

/// A dynamically-shaped manifest value.
///
/// Maps keep their entries in insertion order until canonicalized; this is
/// what lets callers build manifests field by field and still obtain an
/// order-independent hash.
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestValue {
    /// JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer too large for `i64`, or any `u64` source.
    UInt(u64),
    /// A floating point number. Must be finite to canonicalize.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered list.
    List(Vec<ManifestValue>),
    /// Key/value entries in insertion order.
    Map(Vec<(String, ManifestValue)>),
}

impl ManifestValue {
    /// Build a map from `(key, value)` pairs, keeping their order.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ManifestValue)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up the first entry with `key` if this value is a map.
    pub fn get(&self, key: &str) -> Option<&ManifestValue> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// The string content, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is a map containing `key`.
    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn is_file_list(items: &[ManifestValue]) -> bool {
        !items.is_empty() && items.iter().all(|item| item.has_key(FILENAME_KEY))
    }

    /// Lower-cased text of a sort-key field; missing fields sort as "".
    fn sort_text(&self, key: &str) -> String {
        match self.get(key) {
            None | Some(Self::Null) => String::new(),
            Some(Self::String(s)) => s.to_lowercase(),
            Some(other) => serde_json::to_string(other)
                .unwrap_or_default()
                .to_lowercase(),
        }
    }
}

impl From<&str> for ManifestValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for ManifestValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ManifestValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for ManifestValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for ManifestValue {
    fn from(n: u64) -> Self {
        Self::UInt(n)
    }
}

impl From<Vec<ManifestValue>> for ManifestValue {
    fn from(items: Vec<ManifestValue>) -> Self {
        Self::List(items)
    }
}

impl<T: Into<ManifestValue>> From<Option<T>> for ManifestValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

impl From<Value> for ManifestValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl Serialize for ManifestValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::UInt(n) => serializer.serialize_u64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Produce the canonical form of `value`.
///
/// The result is invariant under any permutation of map entries at any depth
/// and under any reordering of a file list.
///
/// # Errors
///
/// Returns [`IntegrityError::InvalidManifest`] for duplicate map keys,
/// non-finite floats, or nesting deeper than [`MAX_DEPTH`].
pub fn canonicalize(value: &ManifestValue) -> Result<ManifestValue, IntegrityError> {
    canonicalize_at(value, 0)
}

fn canonicalize_at(value: &ManifestValue, depth: usize) -> Result<ManifestValue, IntegrityError> {
    match value {
        ManifestValue::Float(f) if !f.is_finite() => {
            Err(ManifestDefect::NonFiniteNumber(*f).into())
        }
        ManifestValue::List(items) => {
            check_depth(depth)?;
            let canon = items
                .iter()
                .map(|item| canonicalize_at(item, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            if !ManifestValue::is_file_list(&canon) {
                return Ok(ManifestValue::List(canon));
            }
            let mut keyed = canon
                .into_iter()
                .map(|item| {
                    let bytes = serde_json::to_vec(&item)
                        .map_err(|e| IntegrityError::Serialization(e.to_string()))?;
                    Ok((item, bytes))
                })
                .collect::<Result<Vec<_>, IntegrityError>>()?;
            keyed.sort_by(|(a, a_bytes), (b, b_bytes)| {
                compare_files(a, b).then_with(|| a_bytes.cmp(b_bytes))
            });
            Ok(ManifestValue::List(keyed.into_iter().map(|(item, _)| item).collect()))
        }
        ManifestValue::Map(entries) => {
            check_depth(depth)?;
            let mut sorted: Vec<&(String, ManifestValue)> = entries.iter().collect();
            sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            if let Some(pair) = sorted.windows(2).find(|w| w[0].0 == w[1].0) {
                return Err(ManifestDefect::DuplicateKey(pair[0].0.clone()).into());
            }
            let canon = sorted
                .into_iter()
                .map(|(k, v)| Ok((k.clone(), canonicalize_at(v, depth + 1)?)))
                .collect::<Result<Vec<_>, IntegrityError>>()?;
            Ok(ManifestValue::Map(canon))
        }
        scalar => Ok(scalar.clone()),
    }
}

fn check_depth(depth: usize) -> Result<(), IntegrityError> {
    if depth >= MAX_DEPTH {
        return Err(ManifestDefect::TooDeep(MAX_DEPTH).into());
    }
    Ok(())
}

fn compare_files(a: &ManifestValue, b: &ManifestValue) -> Ordering {
    a.sort_text(FILENAME_KEY)
        .cmp(&b.sort_text(FILENAME_KEY))
        .then_with(|| a.sort_text(SHA256_KEY).cmp(&b.sort_text(SHA256_KEY)))
}

/// Bytes produced exclusively by [`canonicalize()`] followed by compact
/// JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize `value` and serialize it.
    ///
    /// # Errors
    ///
    /// Propagates canonicalization failures; returns
    /// [`IntegrityError::Serialization`] if JSON encoding fails.
    pub fn new(value: &ManifestValue) -> Result<Self, IntegrityError> {
        let canon = canonicalize(value)?;
        let bytes =
            serde_json::to_vec(&canon).map_err(|e| IntegrityError::Serialization(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Convert any serializable value into a [`ManifestValue`] and
    /// canonicalize it.
    pub fn from_serializable(obj: &impl Serialize) -> Result<Self, IntegrityError> {
        let value =
            serde_json::to_value(obj).map_err(|e| IntegrityError::Serialization(e.to_string()))?;
        Self::new(&ManifestValue::from(value))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = ManifestValue> {
        prop_oneof![
            Just(ManifestValue::Null),
            any::<bool>().prop_map(ManifestValue::Bool),
            any::<i64>().prop_map(ManifestValue::Int),
            "[a-zA-Z0-9/ _.-]{0,12}".prop_map(ManifestValue::String),
        ]
    }

    fn file_list() -> impl Strategy<Value = ManifestValue> {
        prop::collection::btree_map("[a-zA-Z]{1,8}\\.txt", "[0-9a-f]{8}", 1..6).prop_map(|files| {
            ManifestValue::List(
                files
                    .into_iter()
                    .map(|(name, sha)| {
                        ManifestValue::map([
                            ("size", ManifestValue::Int(name.len() as i64)),
                            ("sha256", sha.into()),
                            ("filename", name.into()),
                        ])
                    })
                    .collect(),
            )
        })
    }

    /// Files that all share one name and digest and differ only in `cid`.
    fn duplicate_file_list() -> impl Strategy<Value = ManifestValue> {
        prop::collection::vec("[a-z0-9]{1,6}", 2..6).prop_map(|cids| {
            ManifestValue::List(
                cids.into_iter()
                    .map(|cid| {
                        ManifestValue::map([
                            ("filename", "evidence.txt".into()),
                            ("sha256", "aa".into()),
                            ("cid", cid.into()),
                        ])
                    })
                    .collect(),
            )
        })
    }

    fn tree() -> impl Strategy<Value = ManifestValue> {
        let base = prop_oneof![leaf(), file_list(), duplicate_file_list()];
        base.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(ManifestValue::List),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..6)
                    .prop_map(|m| ManifestValue::Map(m.into_iter().collect())),
            ]
        })
    }

    /// Rotate every map and every file list by `k`, leaving other lists alone.
    fn reorder(value: &ManifestValue, k: usize) -> ManifestValue {
        match value {
            ManifestValue::Map(entries) => {
                let mut out: Vec<_> = entries.iter().map(|(key, v)| (key.clone(), reorder(v, k))).collect();
                if !out.is_empty() {
                    let n = k % out.len();
                    out.rotate_left(n);
                }
                ManifestValue::Map(out)
            }
            ManifestValue::List(items) => {
                let mut out: Vec<_> = items.iter().map(|v| reorder(v, k)).collect();
                if ManifestValue::is_file_list(items) {
                    let n = k % out.len();
                    out.rotate_left(n);
                    out.reverse();
                }
                ManifestValue::List(out)
            }
            other => other.clone(),
        }
    }

    proptest! {
        #[test]
        fn canonical_bytes_invariant_under_reordering(value in tree(), k in 0usize..16) {
            let a = CanonicalBytes::new(&value).unwrap();
            let b = CanonicalBytes::new(&reorder(&value, k)).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        #[test]
        fn canonicalize_is_idempotent(value in tree()) {
            let once = canonicalize(&value).unwrap();
            let twice = canonicalize(&once).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn canonical_bytes_are_valid_json(value in tree()) {
            let cb = CanonicalBytes::new(&value).unwrap();
            let parsed: Result<Value, _> = serde_json::from_slice(cb.as_bytes());
            prop_assert!(parsed.is_ok());
        }
    }
}
