//! # Scanner Module
//!
//! Discovers photo and video files under one or more roots and turns them
//! into a fingerprint index.
//!
//! ## Flow
//! 1. [`MediaWalker`] lazily walks the roots (single thread, sorted, symlinks
//!    never followed) and enforces the file-count ceiling.
//! 2. [`ScanSession`] hashes every discovered file on a bounded worker pool.
//! 3. The duplicate grouper partitions the finished index.
//!
//! Per-entry problems become [`SkippedEntry`] values; only an unreadable
//! root fails the scan.
//!
//! ## Example
//! ```rust,ignore
//! use photo_sifter::core::scanner::{ScanConfig, ScanSession};
//!
//! let session = ScanSession::new(ScanConfig::default().ceiling(Some(150)));
//! let result = session.scan(&["/Users/me/Pictures".into()])?;
//! ```

mod filter;
mod session;
mod walker;

pub use filter::{MediaFilter, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
pub use session::ScanSession;
pub use walker::{MediaWalker, ScanConfig, WalkItem, DEFAULT_WORKERS};

use crate::core::grouper::DuplicateGroup;
use crate::core::hasher::{Fingerprint, HashedContent};
use crate::core::metadata::{local_datetime, DateSource};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

/// Broad media category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

/// A discovered media file.
///
/// Each pipeline stage returns a new record instead of mutating a shared one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path; the file's identity
    pub path: PathBuf,
    /// Size in bytes. After hashing this is the number of bytes hashed.
    pub size: u64,
    /// Filesystem modification time
    pub modified: SystemTime,
    /// Timestamp from embedded metadata, when present and parseable
    pub capture_date: Option<NaiveDateTime>,
    /// Content fingerprint, populated by the hashing pass
    pub fingerprint: Option<Fingerprint>,
    pub kind: MediaKind,
    /// Position in walk order across all roots
    pub discovery_index: usize,
}

impl MediaFile {
    /// A freshly discovered file with nothing computed yet
    pub fn discovered(path: PathBuf, size: u64, modified: SystemTime, discovery_index: usize) -> Self {
        let kind = MediaKind::from_path(&path);
        Self {
            path,
            size,
            modified,
            capture_date: None,
            fingerprint: None,
            kind,
            discovery_index,
        }
    }

    pub fn with_hash(self, hashed: HashedContent) -> Self {
        Self {
            fingerprint: Some(hashed.fingerprint),
            size: hashed.bytes,
            ..self
        }
    }

    pub fn with_capture_date(self, capture_date: Option<NaiveDateTime>) -> Self {
        Self {
            capture_date,
            ..self
        }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
    }

    /// The date used for organizing: capture date, else modification time
    pub fn effective_date(&self) -> (NaiveDateTime, DateSource) {
        match self.capture_date {
            Some(date) => (date, DateSource::Capture),
            None => (local_datetime(self.modified), DateSource::Modified),
        }
    }
}

/// Why an entry was left out of a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum SkipReason {
    /// The file-count ceiling had already been reached
    CeilingReached,
    /// A directory or entry could not be listed or inspected
    Inaccessible(String),
    /// The file could not be read while hashing
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::CeilingReached => write!(f, "ceiling reached"),
            SkipReason::Inaccessible(message) => write!(f, "inaccessible: {}", message),
            SkipReason::Unreadable(message) => write!(f, "unreadable: {}", message),
        }
    }
}

/// A path that was skipped, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

impl SkippedEntry {
    pub fn new(path: impl Into<PathBuf>, reason: SkipReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

/// Result of a scan operation
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    /// Session that produced this result
    pub session_id: Uuid,
    /// Duplicate sets, ordered by first discovery
    pub groups: Vec<DuplicateGroup>,
    /// Everything left out, with reasons
    pub skipped: Vec<SkippedEntry>,
    /// Files that went through hashing (successfully or not)
    pub files_examined: usize,
    /// Eligible files not examined because of the ceiling
    pub ceiling_skipped: usize,
    /// Every successfully hashed file, in discovery order
    pub files: Vec<MediaFile>,
    /// The scan stopped early on request
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl ScanResult {
    /// Number of redundant copies across all groups
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.len() - 1).sum()
    }

    /// Bytes freed if one copy per group were kept
    pub fn reclaimable_bytes(&self) -> u64 {
        self.groups.iter().map(|g| g.reclaimable_bytes()).sum()
    }

    pub fn group_for(&self, path: &Path) -> Option<&DuplicateGroup> {
        self.groups.iter().find(|g| g.contains(path))
    }
}
