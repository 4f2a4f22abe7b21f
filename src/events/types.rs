//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory walking
    Scan(ScanEvent),
    /// Content hashing
    Hash(HashEvent),
    /// Review area moves
    Stage(StageEvent),
    /// Date-based reorganization
    Organize(OrganizeEvent),
}

/// Events during the walking phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Walking has started
    Started { roots: Vec<PathBuf> },
    /// Progress update during walking
    Progress(ScanProgress),
    /// An entry was skipped; the walk continues
    Skipped { path: PathBuf, reason: String },
    /// The ceiling was hit; later files are counted but not examined
    CeilingReached { ceiling: usize },
    /// Walking completed
    Completed {
        files_found: usize,
        ceiling_skipped: usize,
    },
}

/// Progress information during walking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories entered so far
    pub directories_scanned: usize,
    /// Number of eligible media files found so far
    pub files_found: usize,
    /// Directory currently being walked
    pub current_path: PathBuf,
}

/// Events during the hashing phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// Hashing has started
    Started { total_files: usize, workers: usize },
    /// Progress update during hashing
    Progress(HashProgress),
    /// A file could not be read and is excluded
    Error { path: PathBuf, message: String },
    /// Hashing completed
    Completed {
        total_hashed: usize,
        duplicate_groups: usize,
    },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Number of files hashed so far
    pub completed: usize,
    /// Total number of files to hash
    pub total: usize,
    /// File just finished
    pub current_path: PathBuf,
    /// Bytes hashed so far
    pub bytes_hashed: u64,
}

/// Events from the review area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageEvent {
    Staged { original: PathBuf, staged: PathBuf },
    Reverted { original: PathBuf },
    Deleted { staged: PathBuf },
    Failed { path: PathBuf, message: String },
}

/// Events during organize apply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrganizeEvent {
    Started { total_files: usize },
    Progress { completed: usize, total: usize, current_path: PathBuf },
    Completed { moved: usize, failed: usize },
}

impl Event {
    /// Short label for log lines and progress messages
    pub fn label(&self) -> &'static str {
        match self {
            Event::Scan(_) => "Scanning",
            Event::Hash(_) => "Hashing",
            Event::Stage(_) => "Staging",
            Event::Organize(_) => "Organizing",
        }
    }
}
