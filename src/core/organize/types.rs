//! Types for the organize module.

use crate::core::hasher::Fingerprint;
use crate::core::metadata::DateSource;
use crate::core::scanner::{ScanConfig, SkippedEntry};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Folder structure options for organization
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FolderStructure {
    /// Year/Month (e.g., 2024/01/)
    #[default]
    YearMonth,
    /// Year/Month/Day (e.g., 2024/01/15/)
    YearMonthDay,
}

/// Configuration for planning a reorganization
#[derive(Debug, Clone, Default)]
pub struct OrganizeConfig {
    pub structure: FolderStructure,
    /// Which files are picked up when planning from folders
    pub scan: ScanConfig,
}

impl OrganizeConfig {
    pub fn structure(mut self, structure: FolderStructure) -> Self {
        self.structure = structure;
        self
    }

    pub fn scan(mut self, scan: ScanConfig) -> Self {
        self.scan = scan;
        self
    }
}

/// What applying a plan entry will do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PlannedAction {
    Move,
    /// The file already sits at its destination
    AlreadyInPlace,
    /// A file with the same content already occupies the destination.
    /// Left for the duplicate workflow; the organizer does not touch it.
    SkipDuplicate { existing: PathBuf },
}

/// A destination that was taken by different content and had to be renamed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizeCollision {
    /// Where the file would have gone
    pub requested: PathBuf,
    /// The `name (n).ext` it was given instead
    pub resolved: PathBuf,
}

/// One file in the plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub date: NaiveDateTime,
    pub date_source: DateSource,
    pub size: u64,
    /// Present when it had to be computed to settle a collision
    pub fingerprint: Option<Fingerprint>,
    pub action: PlannedAction,
    pub collision: Option<OrganizeCollision>,
}

/// Summary of files by year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub count: usize,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub to_move: usize,
    pub already_in_place: usize,
    pub duplicates: usize,
    /// Newest year first
    pub by_year: Vec<YearSummary>,
    /// Files dated by modification time because no capture date was found
    pub no_capture_date: usize,
    pub collisions: usize,
}

/// The organization plan (preview). Nothing has been moved yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizePlan {
    pub id: Uuid,
    pub destination_root: PathBuf,
    pub files: Vec<PlannedFile>,
    /// Entries the walk could not consider
    pub skipped: Vec<SkippedEntry>,
    pub summary: PlanSummary,
}

impl OrganizePlan {
    pub fn moves(&self) -> impl Iterator<Item = &PlannedFile> {
        self.files
            .iter()
            .filter(|f| f.action == PlannedAction::Move)
    }
}

/// How one plan entry turned out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FileOutcome {
    Moved { destination: PathBuf },
    AlreadyInPlace { destination: PathBuf },
    SkippedDuplicate { existing: PathBuf },
    Failed { message: String },
}

/// Per-file result of applying a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    pub source: PathBuf,
    pub outcome: FileOutcome,
}

impl FileResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, FileOutcome::Failed { .. })
    }
}

/// Result of executing the plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizeReport {
    pub results: Vec<FileResult>,
    pub moved: usize,
    pub already_in_place: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub folders_created: usize,
    /// Apply stopped early; entries after the last result were not attempted
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl OrganizeReport {
    pub fn failures(&self) -> impl Iterator<Item = &FileResult> {
        self.results.iter().filter(|r| r.is_failure())
    }
}
