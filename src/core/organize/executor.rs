//! Executor for organization plans.

use super::planner::{numbered_path, ContentCache};
use super::types::*;
use crate::core::cancellation::CancellationToken;
use crate::core::mover::move_file;
use crate::error::OrganizeError;
use crate::events::{Event, EventSender, OrganizeEvent};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Executes organization plans
pub struct OrganizeExecutor {
    events: EventSender,
    cancel: CancellationToken,
}

impl Default for OrganizeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl OrganizeExecutor {
    pub fn new() -> Self {
        Self {
            events: EventSender::disabled(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Move every planned file. Per-file failures are collected in the
    /// report; only an unusable destination root aborts.
    pub fn apply(&self, plan: &OrganizePlan) -> Result<OrganizeReport, OrganizeError> {
        let start = Instant::now();
        let root = &plan.destination_root;

        if root.exists() && !root.is_dir() {
            return Err(OrganizeError::DestinationNotDirectory { path: root.clone() });
        }
        fs::create_dir_all(root).map_err(|source| OrganizeError::DestinationUnavailable {
            path: root.clone(),
            source,
        })?;

        let total = plan.files.len();
        self.events
            .send(Event::Organize(OrganizeEvent::Started { total_files: total }));

        let mut report = OrganizeReport::default();
        let mut created_dirs: HashSet<PathBuf> = HashSet::new();
        let mut contents = ContentCache::default();

        for (i, file) in plan.files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!("Organize cancelled after {} of {} files", i, total);
                report.cancelled = true;
                break;
            }

            let outcome = match &file.action {
                PlannedAction::AlreadyInPlace => FileOutcome::AlreadyInPlace {
                    destination: file.destination.clone(),
                },
                PlannedAction::SkipDuplicate { existing } => FileOutcome::SkippedDuplicate {
                    existing: existing.clone(),
                },
                PlannedAction::Move => {
                    match self.move_one(file, &mut created_dirs, &mut contents) {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::warn!("{}", e);
                            FileOutcome::Failed {
                                message: e.to_string(),
                            }
                        }
                    }
                }
            };

            match &outcome {
                FileOutcome::Moved { .. } => report.moved += 1,
                FileOutcome::AlreadyInPlace { .. } => report.already_in_place += 1,
                FileOutcome::SkippedDuplicate { .. } => report.duplicates += 1,
                FileOutcome::Failed { .. } => report.failed += 1,
            }
            report.results.push(FileResult {
                source: file.source.clone(),
                outcome,
            });

            self.events.send(Event::Organize(OrganizeEvent::Progress {
                completed: i + 1,
                total,
                current_path: file.source.clone(),
            }));
        }

        report.folders_created = created_dirs.len();
        report.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Organize finished: {} moved, {} in place, {} duplicates, {} failed",
            report.moved,
            report.already_in_place,
            report.duplicates,
            report.failed
        );
        self.events.send(Event::Organize(OrganizeEvent::Completed {
            moved: report.moved,
            failed: report.failed,
        }));

        Ok(report)
    }

    fn move_one(
        &self,
        file: &PlannedFile,
        created_dirs: &mut HashSet<PathBuf>,
        contents: &mut ContentCache,
    ) -> Result<FileOutcome, OrganizeError> {
        if fs::symlink_metadata(&file.source).is_err() {
            // A plan applied a second time finds its files already moved
            if let Some(destination) = moved_copy(file, contents) {
                return Ok(FileOutcome::AlreadyInPlace { destination });
            }
            return Err(OrganizeError::SourceMissing {
                path: file.source.clone(),
            });
        }

        if let Some(parent) = file.destination.parent() {
            if !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|source| OrganizeError::Move {
                    from: file.source.clone(),
                    to: file.destination.clone(),
                    source,
                })?;
                created_dirs.insert(parent.to_path_buf());
            }
        }

        let base = requested_name(file);

        let mut n = 0usize;
        let mut candidate = file.destination.clone();
        loop {
            if fs::symlink_metadata(&candidate).is_ok() {
                contents.forget(&candidate);
                if contents.same_content(&file.source, &candidate) {
                    return Ok(FileOutcome::SkippedDuplicate { existing: candidate });
                }
                tracing::debug!("{} appeared since planning, trying next name", candidate.display());
            } else {
                match move_file(&file.source, &candidate) {
                    Ok(()) => {
                        tracing::debug!("Moved {} -> {}", file.source.display(), candidate.display());
                        return Ok(FileOutcome::Moved { destination: candidate });
                    }
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                    Err(source) => {
                        return Err(OrganizeError::Move {
                            from: file.source.clone(),
                            to: candidate,
                            source,
                        })
                    }
                }
            }
            n += 1;
            candidate = next_candidate(&base, &file.destination, &mut n);
        }
    }
}

/// Numbering restarts from the originally requested name so a re-resolved
/// collision does not produce `name (1) (1).ext`
fn requested_name(file: &PlannedFile) -> PathBuf {
    file.collision
        .as_ref()
        .map(|c| c.requested.clone())
        .unwrap_or_else(|| file.destination.clone())
}

/// Where an earlier apply put this file, if it is still there.
///
/// Checks the planned destination, then the numbered names an earlier apply
/// may have fallen back to. An occupant only counts when its size matches
/// and, if the plan knows the fingerprint, its content does too.
fn moved_copy(file: &PlannedFile, contents: &mut ContentCache) -> Option<PathBuf> {
    let base = requested_name(file);
    let mut n = 0usize;
    let mut candidate = file.destination.clone();
    loop {
        let meta = fs::symlink_metadata(&candidate).ok()?;
        let matches = meta.is_file()
            && meta.len() == file.size
            && file.fingerprint.map_or(true, |expected| {
                contents.forget(&candidate);
                contents.fingerprint(&candidate) == Some(expected)
            });
        if matches {
            return Some(candidate);
        }
        n += 1;
        candidate = next_candidate(&base, &file.destination, &mut n);
    }
}

/// The next numbered name after `n`, skipping the planned destination
fn next_candidate(base: &Path, planned: &Path, n: &mut usize) -> PathBuf {
    let mut candidate = numbered_path(base, *n);
    if candidate == planned {
        *n += 1;
        candidate = numbered_path(base, *n);
    }
    candidate
}
