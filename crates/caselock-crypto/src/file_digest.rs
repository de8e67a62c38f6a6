//! # File Digests
//!
//! Every uploaded file is fingerprinted twice: SHA-256 (bare lowercase hex,
//! the form storage providers report) and Keccak-256 (`0x`-prefixed, the
//! form on-chain consumers expect). Files are streamed, never loaded whole.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use sha3::Keccak256;

const CHUNK: usize = 64 * 1024;

/// The pair of digests recorded for an evidence file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigests {
    /// Lowercase hex SHA-256, no prefix.
    pub sha256: String,
    /// `0x`-prefixed lowercase hex Keccak-256.
    pub keccak256: String,
    /// Number of bytes hashed.
    pub size: u64,
}

impl FileDigests {
    pub fn of_bytes(data: &[u8]) -> Self {
        Self {
            sha256: hex::encode(Sha256::digest(data)),
            keccak256: caselock_core::keccak256_hex(data),
            size: data.len() as u64,
        }
    }

    /// Stream a reader to the end, hashing as it goes.
    pub fn of_reader<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut sha = Sha256::new();
        let mut keccak = Keccak256::new();
        let mut buf = vec![0u8; CHUNK];
        let mut size = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            sha.update(&buf[..n]);
            keccak.update(&buf[..n]);
            size += n as u64;
        }
        Ok(Self {
            sha256: hex::encode(sha.finalize()),
            keccak256: format!("0x{}", hex::encode(keccak.finalize())),
            size,
        })
    }

    pub fn of_path(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::of_reader(File::open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_known_vectors() {
        let d = FileDigests::of_bytes(b"");
        assert_eq!(
            d.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            d.keccak256,
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(d.size, 0);
    }

    #[test]
    fn test_sha256_abc() {
        assert_eq!(
            FileDigests::of_bytes(b"abc").sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_streaming_matches_in_memory() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let streamed = FileDigests::of_reader(io::Cursor::new(&data)).unwrap();
        assert_eq!(streamed, FileDigests::of_bytes(&data));
    }

    #[test]
    fn test_of_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"evidence bytes").unwrap();
        file.flush().unwrap();
        let d = FileDigests::of_path(file.path()).unwrap();
        assert_eq!(d, FileDigests::of_bytes(b"evidence bytes"));
    }

    #[test]
    fn test_missing_path_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileDigests::of_path(dir.path().join("absent.bin")).is_err());
    }
}
