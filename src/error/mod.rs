//! # Error Module
//!
//! Error types for the photo sifter core.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - every message names the path involved
//! - **Per-file failures are values** - batch operations collect them
//! - **Nothing is resolved by deleting or overwriting** user files

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SiftError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    #[error("Staging error: {0}")]
    Stage(#[from] StageError),

    #[error("Revert error: {0}")]
    Revert(#[from] RevertError),

    #[error("Delete error: {0}")]
    CommitDelete(#[from] CommitDeleteError),

    #[error("Organize error: {0}")]
    Organize(#[from] OrganizeError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

/// A file could not be read while hashing or inspecting it.
///
/// The file is excluded from grouping; the surrounding scan continues.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Read failed part-way through {path}: {source}")]
    Interrupted {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ReadError::Open { path, .. } | ReadError::Interrupted { path, .. } => path,
        }
    }
}

/// Fatal errors for a scan invocation. Only the roots themselves can fail a scan.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read scan root {path}: {source}")]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan root is not a directory: {path}")]
    RootNotDirectory { path: PathBuf },

    #[error("No scan roots were given")]
    NoRoots,

    #[error("Failed to start hashing workers: {0}")]
    WorkerPool(String),
}

/// Errors moving a file into the review area
#[derive(Error, Debug)]
pub enum StageError {
    #[error("File to stage no longer exists: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Only regular files can be staged: {path}")]
    NotRegularFile { path: PathBuf },

    #[error("{path} is already inside the review area")]
    AlreadyStaged { path: PathBuf },

    #[error("{path} no longer matches duplicate set {expected} (content is now {actual})")]
    FingerprintMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Could not read {path} to confirm its content: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: ReadError,
    },

    #[error("Could not create review directory {path}: {source}")]
    ReviewDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Moved {path} but could not record it, so the move was undone: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("{path} is not a member of the duplicate set")]
    NotInGroup { path: PathBuf },

    #[error("Staging was cancelled before {path}")]
    Cancelled { path: PathBuf },
}

/// Errors moving a staged file back to where it came from
#[derive(Error, Debug)]
pub enum RevertError {
    #[error("No active staging record {id}")]
    UnknownRecord { id: String },

    #[error("Staged file is missing: {path}")]
    StagedMissing { path: PathBuf },

    #[error("Original location {path} is occupied by another file; nothing was overwritten")]
    OriginalOccupied { path: PathBuf },

    #[error("Failed to move {from} back to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not clear the record for {path}, so the file was moved back into review: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Could not look up staging record: {0}")]
    Store(#[from] StoreError),
}

/// Errors permanently deleting a staged file. The record stays valid.
#[derive(Error, Debug)]
pub enum CommitDeleteError {
    #[error("No active staging record {id}")]
    UnknownRecord { id: String },

    #[error("Staged file is missing: {path}. Use forget to clear the record.")]
    StagedMissing { path: PathBuf },

    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Deleted {path} but could not clear its record: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Could not look up staging record: {0}")]
    Store(#[from] StoreError),
}

/// Errors planning or applying a date-based reorganization
#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("Cannot read source folder {path}: {source}")]
    SourceInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination {path} exists but is not a directory")]
    DestinationNotDirectory { path: PathBuf },

    #[error("Cannot create destination {path}: {source}")]
    DestinationUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source file not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the persistent staging record database
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open record database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Record query failed: {0}")]
    QueryFailed(String),

    #[error("Record database lock poisoned at {path}. Restart and try again.")]
    Poisoned { path: PathBuf },
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        StoreError::QueryFailed(error.to_string())
    }
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_error_includes_path() {
        let error = ScanError::RootNotDirectory {
            path: PathBuf::from("/photos/vacation.jpg"),
        };
        assert!(error.to_string().contains("/photos/vacation.jpg"));
    }

    #[test]
    fn revert_conflict_says_nothing_was_overwritten() {
        let error = RevertError::OriginalOccupied {
            path: PathBuf::from("/photos/a.jpg"),
        };
        let message = error.to_string();
        assert!(message.contains("/photos/a.jpg"));
        assert!(message.contains("nothing was overwritten"));
    }

    #[test]
    fn missing_staged_file_suggests_forget() {
        let error = CommitDeleteError::StagedMissing {
            path: PathBuf::from("/review/a.jpg"),
        };
        assert!(error.to_string().contains("forget"));
    }

    #[test]
    fn read_error_exposes_path() {
        let error = ReadError::Open {
            path: PathBuf::from("/photos/locked.jpg"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert_eq!(error.path(), &PathBuf::from("/photos/locked.jpg"));
    }

    #[test]
    fn stage_error_converts_to_top_level() {
        let error: SiftError = StageError::SourceMissing {
            path: PathBuf::from("/photos/gone.jpg"),
        }
        .into();
        assert!(error.to_string().starts_with("Staging error"));
    }
}
