//! Plan generator for organization operations.

use super::types::*;
use crate::core::cancellation::CancellationToken;
use crate::core::hasher::{ContentHasher, Fingerprint};
use crate::core::metadata::{read_capture_date, DateSource};
use crate::core::scanner::{MediaFile, MediaKind, MediaWalker, WalkItem};
use crate::error::OrganizeError;
use chrono::{Datelike, NaiveDateTime};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Generates organization plans. Planning never touches the filesystem
/// beyond reading it.
pub struct OrganizePlanner {
    config: OrganizeConfig,
    cancel: CancellationToken,
}

impl OrganizePlanner {
    pub fn new(config: OrganizeConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Walk `roots` and plan a move for every media file found
    pub fn plan(&self, roots: &[PathBuf], destination_root: &Path) -> Result<OrganizePlan, OrganizeError> {
        let roots = validate_sources(roots)?;
        check_destination(destination_root)?;

        let mut files = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        let walker = MediaWalker::new(roots, &self.config.scan).with_cancellation(self.cancel.clone());
        for item in walker {
            match item {
                WalkItem::File(file) => {
                    if !seen.insert(file.path.clone()) {
                        continue;
                    }
                    let capture_date = if self.config.scan.read_capture_dates && file.kind == MediaKind::Image {
                        read_capture_date(&file.path)
                    } else {
                        None
                    };
                    files.push(file.with_capture_date(capture_date));
                }
                WalkItem::Skipped(entry) => skipped.push(entry),
            }
        }

        let mut plan = self.plan_files(files, destination_root)?;
        plan.skipped = skipped;
        Ok(plan)
    }

    /// Plan moves for files that were already discovered, such as scanner output
    pub fn plan_files(
        &self,
        files: impl IntoIterator<Item = MediaFile>,
        destination_root: &Path,
    ) -> Result<OrganizePlan, OrganizeError> {
        check_destination(destination_root)?;
        let destination_root = absolute(destination_root);

        let mut contents = ContentCache::default();
        // destination -> source that claimed it
        let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut planned = Vec::new();

        for file in files {
            let (date, date_source) = file.effective_date();
            let requested = destination_root
                .join(Self::build_folder_path(self.config.structure, date))
                .join(file.path.file_name().unwrap_or_default());

            if let Some(fp) = file.fingerprint {
                contents.remember(&file.path, fp);
            }

            let (action, destination, collision) =
                resolve_destination(&file.path, &requested, &claimed, &mut contents);

            if action == PlannedAction::Move || action == PlannedAction::AlreadyInPlace {
                claimed.insert(destination.clone(), file.path.clone());
            }

            planned.push(PlannedFile {
                fingerprint: contents.known(&file.path),
                source: file.path,
                destination,
                date,
                date_source,
                size: file.size,
                action,
                collision,
            });
        }

        let summary = summarize(&planned);
        tracing::info!(
            "Planned {} files: {} to move, {} in place, {} duplicates, {} renamed",
            summary.total_files,
            summary.to_move,
            summary.already_in_place,
            summary.duplicates,
            summary.collisions
        );

        Ok(OrganizePlan {
            id: Uuid::new_v4(),
            destination_root,
            files: planned,
            skipped: Vec::new(),
            summary,
        })
    }

    fn build_folder_path(structure: FolderStructure, date: NaiveDateTime) -> PathBuf {
        let year = date.year().to_string();
        let month = format!("{:02}", date.month());

        match structure {
            FolderStructure::YearMonth => [year, month].iter().collect(),
            FolderStructure::YearMonthDay => [year, month, format!("{:02}", date.day())]
                .iter()
                .collect(),
        }
    }
}

/// Pick the destination for `source`. The requested path is tried first,
/// then `name (1).ext`, `name (2).ext`, ... Same content at a candidate
/// makes the entry a duplicate instead.
fn resolve_destination(
    source: &Path,
    requested: &Path,
    claimed: &HashMap<PathBuf, PathBuf>,
    contents: &mut ContentCache,
) -> (PlannedAction, PathBuf, Option<OrganizeCollision>) {
    let mut n = 0usize;
    loop {
        let candidate = if n == 0 {
            requested.to_path_buf()
        } else {
            numbered_path(requested, n)
        };
        n += 1;

        if candidate == source {
            return (PlannedAction::AlreadyInPlace, candidate, None);
        }

        let occupant = match claimed.get(&candidate) {
            Some(other) => Some(other.clone()),
            None if fs::symlink_metadata(&candidate).is_ok() => Some(candidate.clone()),
            None => None,
        };

        match occupant {
            None => {
                let collision = (n > 1).then(|| OrganizeCollision {
                    requested: requested.to_path_buf(),
                    resolved: candidate.clone(),
                });
                return (PlannedAction::Move, candidate, collision);
            }
            Some(other) => {
                if contents.same_content(source, &other) {
                    return (
                        PlannedAction::SkipDuplicate {
                            existing: candidate.clone(),
                        },
                        candidate,
                        None,
                    );
                }
            }
        }
    }
}

/// `dir/name (n).ext`
pub(super) fn numbered_path(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    };
    path.with_file_name(name)
}

/// Fingerprints computed on demand, only when two files compete for a path
#[derive(Default)]
pub(super) struct ContentCache {
    hasher: ContentHasher,
    known: HashMap<PathBuf, Option<Fingerprint>>,
}

impl ContentCache {
    pub(super) fn remember(&mut self, path: &Path, fingerprint: Fingerprint) {
        self.known.insert(path.to_path_buf(), Some(fingerprint));
    }

    pub(super) fn known(&self, path: &Path) -> Option<Fingerprint> {
        self.known.get(path).copied().flatten()
    }

    pub(super) fn fingerprint(&mut self, path: &Path) -> Option<Fingerprint> {
        if let Some(known) = self.known.get(path) {
            return *known;
        }
        let fingerprint = match self.hasher.hash_file(path) {
            Ok(hashed) => Some(hashed.fingerprint),
            Err(e) => {
                tracing::warn!("Could not compare {}: {}", path.display(), e);
                None
            }
        };
        self.known.insert(path.to_path_buf(), fingerprint);
        fingerprint
    }

    /// Unreadable files never count as the same content
    pub(super) fn same_content(&mut self, a: &Path, b: &Path) -> bool {
        match (self.fingerprint(a), self.fingerprint(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub(super) fn forget(&mut self, path: &Path) {
        self.known.remove(path);
    }
}

fn summarize(files: &[PlannedFile]) -> PlanSummary {
    let mut by_year: BTreeMap<i32, (usize, u64)> = BTreeMap::new();
    let mut summary = PlanSummary {
        total_files: files.len(),
        ..PlanSummary::default()
    };

    for file in files {
        summary.total_size_bytes += file.size;
        match file.action {
            PlannedAction::Move => summary.to_move += 1,
            PlannedAction::AlreadyInPlace => summary.already_in_place += 1,
            PlannedAction::SkipDuplicate { .. } => summary.duplicates += 1,
        }
        if file.date_source == DateSource::Modified {
            summary.no_capture_date += 1;
        }
        if file.collision.is_some() {
            summary.collisions += 1;
        }
        let entry = by_year.entry(file.date.year()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += file.size;
    }

    summary.by_year = by_year
        .into_iter()
        .rev()
        .map(|(year, (count, size_bytes))| YearSummary {
            year,
            count,
            size_bytes,
        })
        .collect();
    summary
}

fn validate_sources(roots: &[PathBuf]) -> Result<Vec<PathBuf>, OrganizeError> {
    roots
        .iter()
        .map(|root| {
            let canonical = root
                .canonicalize()
                .map_err(|source| OrganizeError::SourceInaccessible {
                    path: root.clone(),
                    source,
                })?;
            fs::read_dir(&canonical).map_err(|source| OrganizeError::SourceInaccessible {
                path: root.clone(),
                source,
            })?;
            Ok(canonical)
        })
        .collect()
}

fn check_destination(destination: &Path) -> Result<(), OrganizeError> {
    match fs::metadata(destination) {
        Ok(meta) if !meta.is_dir() => Err(OrganizeError::DestinationNotDirectory {
            path: destination.to_path_buf(),
        }),
        _ => Ok(()),
    }
}

/// Canonical form of the deepest existing ancestor, with the rest appended
fn absolute(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                rest.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
    if existing.as_os_str().is_empty() {
        existing = PathBuf::from(".");
    }
    let mut resolved = existing.canonicalize().unwrap_or(existing);
    for name in rest.into_iter().rev() {
        resolved.push(name);
    }
    resolved
}
