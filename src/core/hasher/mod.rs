//! # Hasher Module
//!
//! Computes content fingerprints by streaming file bytes through SHA-256.
//!
//! Files are read in fixed-size chunks so peak memory stays bounded no matter
//! how large a video is. Identical bytes always give identical fingerprints;
//! that is the only property duplicate detection relies on.
//!
//! ## Example
//! ```rust,ignore
//! use photo_sifter::core::hasher::ContentHasher;
//!
//! let hashed = ContentHasher::new().hash_file(&path)?;
//! println!("{} ({} bytes)", hashed.fingerprint, hashed.bytes);
//! ```

mod fingerprint;

pub use fingerprint::{Fingerprint, ParseFingerprintError, FINGERPRINT_LEN};

use crate::error::ReadError;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Default read chunk (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Output of hashing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashedContent {
    pub fingerprint: Fingerprint,
    /// Number of bytes that went into the digest
    pub bytes: u64,
}

/// Streaming content hasher
#[derive(Debug, Clone)]
pub struct ContentHasher {
    chunk_size: usize,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the read chunk size. Zero is clamped to one byte.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Hash a file on disk
    pub fn hash_file(&self, path: &Path) -> Result<HashedContent, ReadError> {
        let file = File::open(path).map_err(|source| ReadError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        self.hash_reader(file).map_err(|source| ReadError::Interrupted {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Hash any reader to exhaustion
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> std::io::Result<HashedContent> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..n]);
            total += n as u64;
        }

        let mut digest = [0u8; FINGERPRINT_LEN];
        digest.copy_from_slice(&hasher.finalize());

        Ok(HashedContent {
            fingerprint: Fingerprint::from_bytes(digest),
            bytes: total,
        })
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
