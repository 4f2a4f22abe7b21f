//! Types for the review area.

use crate::core::hasher::Fingerprint;
use crate::error::StageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A file currently held in the review area.
///
/// While the record is active the file is at `staged_path` and nothing of
/// ours is at `original_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub id: Uuid,
    pub original_path: PathBuf,
    pub staged_path: PathBuf,
    /// Duplicate set the file was staged from
    pub fingerprint: Fingerprint,
    pub size: u64,
    pub staged_at: DateTime<Utc>,
}

/// Per-file result of resolving a duplicate set
#[derive(Debug)]
pub struct StageOutcome {
    pub path: PathBuf,
    pub result: Result<StageRecord, StageError>,
}

impl StageOutcome {
    pub fn is_staged(&self) -> bool {
        self.result.is_ok()
    }
}

/// Totals over the review area
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub files: usize,
    pub total_bytes: u64,
}

impl ReviewSummary {
    pub fn from_records(records: &[StageRecord]) -> Self {
        Self {
            files: records.len(),
            total_bytes: records.iter().map(|r| r.size).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::FINGERPRINT_LEN;

    #[test]
    fn record_serializes_fingerprint_as_hex() {
        let record = StageRecord {
            id: Uuid::new_v4(),
            original_path: PathBuf::from("/photos/a.jpg"),
            staged_path: PathBuf::from("/review/a.jpg"),
            fingerprint: Fingerprint::from_bytes([0xaa; FINGERPRINT_LEN]),
            size: 3,
            staged_at: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(&"aa".repeat(FINGERPRINT_LEN)));

        let back: StageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn summary_totals_sizes() {
        let make = |size| StageRecord {
            id: Uuid::new_v4(),
            original_path: PathBuf::from("/a"),
            staged_path: PathBuf::from("/b"),
            fingerprint: Fingerprint::from_bytes([0; FINGERPRINT_LEN]),
            size,
            staged_at: Utc::now(),
        };
        let summary = ReviewSummary::from_records(&[make(10), make(32)]);
        assert_eq!(summary, ReviewSummary { files: 2, total_bytes: 42 });
    }
}
