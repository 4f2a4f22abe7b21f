//! Append-only fingerprint index shared by hashing workers.

use crate::core::hasher::Fingerprint;
use crate::core::scanner::MediaFile;
use std::collections::HashMap;
use std::sync::Mutex;

/// Maps fingerprints to every file that produced them.
///
/// Workers insert concurrently through [`FingerprintIndex::insert`], the single
/// synchronized entry point, so no insertion can be lost.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    entries: Mutex<HashMap<Fingerprint, Vec<MediaFile>>>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hashed file. Files without a fingerprint are rejected.
    pub fn insert(&self, file: MediaFile) -> bool {
        let Some(fingerprint) = file.fingerprint else {
            return false;
        };
        // A poisoned lock only means another worker panicked mid-push;
        // the map itself is still consistent.
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.entry(fingerprint).or_default().push(file);
        true
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the finished index
    pub fn into_inner(self) -> HashMap<Fingerprint, Vec<MediaFile>> {
        self.entries.into_inner().unwrap_or_else(|p| p.into_inner())
    }
}
