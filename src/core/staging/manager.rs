//! Moves duplicates into the review area and back out again.

use super::repository::StageRepository;
use super::types::{StageOutcome, StageRecord};
use crate::core::cancellation::CancellationToken;
use crate::core::grouper::DuplicateGroup;
use crate::core::hasher::{ContentHasher, Fingerprint};
use crate::core::mover::move_file;
use crate::error::{CommitDeleteError, RevertError, StageError, StoreError};
use crate::events::{Event, EventSender, StageEvent};
use chrono::{SubsecRound, Utc};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Characters of the fingerprint used to disambiguate review-area names
const NAME_FINGERPRINT_CHARS: usize = 12;

/// Owns the review area and its record database.
///
/// Staging never deletes: files leave the review area only through
/// [`revert`](Self::revert) or an explicit [`commit_delete`](Self::commit_delete).
pub struct StageManager {
    review_dir: PathBuf,
    repository: StageRepository,
    hasher: ContentHasher,
    events: EventSender,
}

impl StageManager {
    pub fn new(review_dir: impl Into<PathBuf>, repository: StageRepository) -> Self {
        Self {
            review_dir: review_dir.into(),
            repository,
            hasher: ContentHasher::new(),
            events: EventSender::disabled(),
        }
    }

    /// Open the review area with records stored at `db_path`
    pub fn open(review_dir: impl Into<PathBuf>, db_path: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(review_dir, StageRepository::open(db_path)?))
    }

    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn review_dir(&self) -> &Path {
        &self.review_dir
    }

    /// Move `path` into the review area.
    ///
    /// The file is hashed again first and must still belong to the set
    /// identified by `expected`.
    pub fn stage(&self, path: &Path, expected: &Fingerprint) -> Result<StageRecord, StageError> {
        let original = absolute_location(path).ok_or_else(|| StageError::SourceMissing {
            path: path.to_path_buf(),
        })?;
        match fs::symlink_metadata(&original) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StageError::NotRegularFile { path: original }),
            Err(_) => return Err(StageError::SourceMissing { path: original }),
        }

        let review_dir = self.prepare_review_dir()?;
        if original.starts_with(&review_dir) {
            return Err(StageError::AlreadyStaged { path: original });
        }

        let hashed = self
            .hasher
            .hash_file(&original)
            .map_err(|source| StageError::Unreadable {
                path: original.clone(),
                source,
            })?;
        if hashed.fingerprint != *expected {
            return Err(StageError::FingerprintMismatch {
                path: original,
                expected: expected.to_hex(),
                actual: hashed.fingerprint.to_hex(),
            });
        }

        let staged_path = self.move_into_review(&original, &review_dir, expected)?;

        let record = StageRecord {
            id: Uuid::new_v4(),
            original_path: original.clone(),
            staged_path: staged_path.clone(),
            fingerprint: *expected,
            size: hashed.bytes,
            // Stored at millisecond precision
            staged_at: Utc::now().trunc_subsecs(3),
        };

        if let Err(source) = self.repository.insert(&record) {
            if let Err(e) = move_file(&staged_path, &original) {
                tracing::error!(
                    "Could not undo stage of {} after record failure: {}",
                    original.display(),
                    e
                );
            }
            return Err(StageError::Record {
                path: original,
                source,
            });
        }

        tracing::info!("Staged {} -> {}", original.display(), staged_path.display());
        self.events.send(Event::Stage(StageEvent::Staged {
            original,
            staged: staged_path,
        }));

        Ok(record)
    }

    /// Keep `keep` and stage every other member of the set.
    ///
    /// Failures are reported per file; one bad file does not stop the rest.
    pub fn resolve_group(
        &self,
        group: &DuplicateGroup,
        keep: &Path,
        cancel: &CancellationToken,
    ) -> Result<Vec<StageOutcome>, StageError> {
        if !group.contains(keep) {
            return Err(StageError::NotInGroup {
                path: keep.to_path_buf(),
            });
        }

        let outcomes = group
            .paths()
            .filter(|path| path.as_path() != keep)
            .map(|path| {
                let result = if cancel.is_cancelled() {
                    Err(StageError::Cancelled { path: path.clone() })
                } else {
                    self.stage(path, group.fingerprint())
                };
                if let Err(e) = &result {
                    tracing::warn!("{}", e);
                    self.events.send(Event::Stage(StageEvent::Failed {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                }
                StageOutcome {
                    path: path.clone(),
                    result,
                }
            })
            .collect();

        Ok(outcomes)
    }

    /// Put a staged file back at its original location
    pub fn revert(&self, record: &StageRecord) -> Result<(), RevertError> {
        let active = self
            .repository
            .get(&record.id)?
            .ok_or_else(|| RevertError::UnknownRecord {
                id: record.id.to_string(),
            })?;

        if fs::symlink_metadata(&active.staged_path).is_err() {
            return Err(RevertError::StagedMissing {
                path: active.staged_path,
            });
        }
        if fs::symlink_metadata(&active.original_path).is_ok() {
            return Err(RevertError::OriginalOccupied {
                path: active.original_path,
            });
        }

        if let Some(parent) = active.original_path.parent() {
            fs::create_dir_all(parent).map_err(|source| RevertError::Move {
                from: active.staged_path.clone(),
                to: active.original_path.clone(),
                source,
            })?;
        }

        move_file(&active.staged_path, &active.original_path).map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                RevertError::OriginalOccupied {
                    path: active.original_path.clone(),
                }
            } else {
                RevertError::Move {
                    from: active.staged_path.clone(),
                    to: active.original_path.clone(),
                    source,
                }
            }
        })?;

        // The record and the file must agree: with the record still active,
        // the file goes back into review
        if let Err(source) = self.repository.remove(&active.id) {
            if let Err(e) = move_file(&active.original_path, &active.staged_path) {
                tracing::error!(
                    "Could not return {} to review after record failure: {}",
                    active.original_path.display(),
                    e
                );
            }
            return Err(RevertError::Record {
                path: active.original_path,
                source,
            });
        }

        tracing::info!("Reverted {}", active.original_path.display());
        self.events.send(Event::Stage(StageEvent::Reverted {
            original: active.original_path,
        }));
        Ok(())
    }

    /// Permanently delete a staged file and clear its record
    pub fn commit_delete(&self, record: &StageRecord) -> Result<(), CommitDeleteError> {
        let active = self
            .repository
            .get(&record.id)?
            .ok_or_else(|| CommitDeleteError::UnknownRecord {
                id: record.id.to_string(),
            })?;

        match fs::symlink_metadata(&active.staged_path) {
            Ok(meta) if meta.is_file() => {}
            _ => {
                return Err(CommitDeleteError::StagedMissing {
                    path: active.staged_path,
                })
            }
        }

        fs::remove_file(&active.staged_path).map_err(|source| CommitDeleteError::Delete {
            path: active.staged_path.clone(),
            source,
        })?;

        self.repository
            .remove(&active.id)
            .map_err(|source| CommitDeleteError::Record {
                path: active.staged_path.clone(),
                source,
            })?;

        tracing::warn!("Permanently deleted {}", active.staged_path.display());
        self.events.send(Event::Stage(StageEvent::Deleted {
            staged: active.staged_path,
        }));
        Ok(())
    }

    /// Drop a record without touching any file. Returns whether it existed.
    pub fn forget(&self, record: &StageRecord) -> Result<bool, StoreError> {
        let removed = self.repository.remove(&record.id)?;
        if removed {
            tracing::info!("Forgot staging record {}", record.id);
        }
        Ok(removed)
    }

    /// Active records, oldest first
    pub fn records(&self) -> Result<Vec<StageRecord>, StoreError> {
        self.repository.list()
    }

    pub fn record(&self, id: &Uuid) -> Result<Option<StageRecord>, StoreError> {
        self.repository.get(id)
    }

    /// Active records whose staged file has gone missing
    pub fn orphaned(&self) -> Result<Vec<StageRecord>, StoreError> {
        Ok(self
            .repository
            .list()?
            .into_iter()
            .filter(|r| fs::symlink_metadata(&r.staged_path).is_err())
            .collect())
    }

    fn prepare_review_dir(&self) -> Result<PathBuf, StageError> {
        fs::create_dir_all(&self.review_dir).map_err(|source| StageError::ReviewDirectory {
            path: self.review_dir.clone(),
            source,
        })?;
        self.review_dir
            .canonicalize()
            .map_err(|source| StageError::ReviewDirectory {
                path: self.review_dir.clone(),
                source,
            })
    }

    /// Move into the first free candidate name. A name taken between the
    /// check and the move just advances to the next candidate.
    fn move_into_review(
        &self,
        original: &Path,
        review_dir: &Path,
        fingerprint: &Fingerprint,
    ) -> Result<PathBuf, StageError> {
        let mut attempt = 0usize;
        loop {
            let target = review_dir.join(review_name(original, fingerprint, attempt));
            attempt += 1;

            if fs::symlink_metadata(&target).is_ok() {
                continue;
            }

            match move_file(original, &target) {
                Ok(()) => return Ok(target),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) if e.kind() == io::ErrorKind::NotFound && !original.exists() => {
                    return Err(StageError::SourceMissing {
                        path: original.to_path_buf(),
                    })
                }
                Err(source) => {
                    return Err(StageError::Move {
                        from: original.to_path_buf(),
                        to: target,
                        source,
                    })
                }
            }
        }
    }
}

/// `name.ext`, then `name-<fp>.ext`, then `name-<fp>-2.ext`, ...
fn review_name(original: &Path, fingerprint: &Fingerprint, attempt: usize) -> OsString {
    let file_name = original.file_name().map(OsString::from).unwrap_or_default();
    if attempt == 0 {
        return file_name;
    }

    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let short = fingerprint.short(NAME_FINGERPRINT_CHARS);

    let mut name = if attempt == 1 {
        format!("{}-{}", stem, short)
    } else {
        format!("{}-{}-{}", stem, short, attempt)
    };
    if let Some(ext) = original.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    OsString::from(name)
}

/// Canonical parent joined with the file name, so a symlink is not followed
fn absolute_location(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Some(parent.canonicalize().ok()?.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaFile;
    use std::time::SystemTime;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        photos: PathBuf,
        manager: StageManager,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let photos = temp.path().join("photos");
        fs::create_dir_all(&photos).unwrap();
        let photos = photos.canonicalize().unwrap();
        let manager = StageManager::new(
            temp.path().join("review"),
            StageRepository::open_in_memory().unwrap(),
        );
        Fixture {
            _temp: temp,
            photos,
            manager,
        }
    }

    fn write(path: &Path, content: &[u8]) -> Fingerprint {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        ContentHasher::new().hash_file(path).unwrap().fingerprint
    }

    fn group_of(paths: &[&Path]) -> DuplicateGroup {
        let hasher = ContentHasher::new();
        let members: Vec<MediaFile> = paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let size = fs::metadata(p).unwrap().len();
                MediaFile::discovered(p.to_path_buf(), size, SystemTime::now(), i)
                    .with_hash(hasher.hash_file(p).unwrap())
            })
            .collect();
        let fp = members[0].fingerprint.unwrap();
        DuplicateGroup::new(fp, members).unwrap()
    }

    #[test]
    fn stage_then_revert_restores_file() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"same bytes");

        let record = fx.manager.stage(&a, &fp).unwrap();
        assert!(!a.exists());
        assert!(record.staged_path.exists());
        assert_eq!(record.original_path, a);
        assert_eq!(record.size, 10);

        fx.manager.revert(&record).unwrap();
        assert_eq!(fs::read(&a).unwrap(), b"same bytes");
        assert!(!record.staged_path.exists());
        assert!(fx.manager.records().unwrap().is_empty());
    }

    #[test]
    fn returned_record_matches_stored_record() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"same bytes");

        let record = fx.manager.stage(&a, &fp).unwrap();
        assert_eq!(fx.manager.record(&record.id).unwrap(), Some(record));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_staged() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"target");
        let link = fx.photos.join("link.jpg");
        std::os::unix::fs::symlink(&a, &link).unwrap();

        let err = fx.manager.stage(&link, &fp).unwrap_err();
        assert!(matches!(err, StageError::NotRegularFile { .. }));
        assert!(fs::symlink_metadata(&link).is_ok());
        assert!(fx.manager.records().unwrap().is_empty());
    }

    #[test]
    fn members_of_one_group_stage_in_parallel() {
        let fx = fixture();
        let paths: Vec<PathBuf> = (0..8)
            .map(|i| fx.photos.join(format!("dir{}", i)).join("IMG_1.jpg"))
            .collect();
        let fp = paths.iter().map(|p| write(p, b"burst")).last().unwrap();

        let manager = &fx.manager;
        let fp = &fp;
        let records: Vec<StageRecord> = std::thread::scope(|scope| {
            let handles: Vec<_> = paths
                .iter()
                .map(|p| scope.spawn(move || manager.stage(p, fp)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        let staged: std::collections::HashSet<_> =
            records.iter().map(|r| r.staged_path.clone()).collect();
        assert_eq!(staged.len(), paths.len());
        assert!(staged.iter().all(|p| fs::read(p).unwrap() == b"burst"));
        assert_eq!(fx.manager.records().unwrap().len(), paths.len());
        assert!(paths.iter().all(|p| !p.exists()));
    }

    #[test]
    fn stage_rejects_changed_content() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"before");
        fs::write(&a, b"after").unwrap();

        let err = fx.manager.stage(&a, &fp).unwrap_err();
        assert!(matches!(err, StageError::FingerprintMismatch { .. }));
        assert!(a.exists());
        assert!(fx.manager.records().unwrap().is_empty());
    }

    #[test]
    fn stage_missing_file_fails() {
        let fx = fixture();
        let fp = Fingerprint::from_bytes([0; 32]);
        let err = fx.manager.stage(&fx.photos.join("gone.jpg"), &fp).unwrap_err();
        assert!(matches!(err, StageError::SourceMissing { .. }));
    }

    #[test]
    fn name_collision_uses_fingerprint_suffix() {
        let fx = fixture();
        let a = fx.photos.join("x").join("IMG_1.jpg");
        let b = fx.photos.join("y").join("IMG_1.jpg");
        let fp = write(&a, b"dup");
        write(&b, b"dup");

        let first = fx.manager.stage(&a, &fp).unwrap();
        let second = fx.manager.stage(&b, &fp).unwrap();

        assert_ne!(first.staged_path, second.staged_path);
        let second_name = second.staged_path.file_name().unwrap().to_string_lossy();
        assert_eq!(second_name, format!("IMG_1-{}.jpg", fp.short(12)));
        assert!(first.staged_path.exists());
        assert!(second.staged_path.exists());
    }

    #[test]
    fn staged_file_cannot_be_staged_again() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"content");
        let record = fx.manager.stage(&a, &fp).unwrap();

        let err = fx.manager.stage(&record.staged_path, &fp).unwrap_err();
        assert!(matches!(err, StageError::AlreadyStaged { .. }));
    }

    #[test]
    fn revert_refuses_to_overwrite() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"original");
        let record = fx.manager.stage(&a, &fp).unwrap();

        fs::write(&a, b"newcomer").unwrap();

        let err = fx.manager.revert(&record).unwrap_err();
        assert!(matches!(err, RevertError::OriginalOccupied { .. }));
        assert_eq!(fs::read(&a).unwrap(), b"newcomer");
        assert!(record.staged_path.exists());
        assert_eq!(fx.manager.records().unwrap().len(), 1);
    }

    #[test]
    fn revert_recreates_missing_parent() {
        let fx = fixture();
        let dir = fx.photos.join("trip");
        let a = dir.join("a.jpg");
        let fp = write(&a, b"content");
        let record = fx.manager.stage(&a, &fp).unwrap();
        fs::remove_dir(&dir).unwrap();

        fx.manager.revert(&record).unwrap();
        assert!(a.exists());
    }

    #[test]
    fn revert_of_missing_staged_file_keeps_record() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"content");
        let record = fx.manager.stage(&a, &fp).unwrap();
        fs::remove_file(&record.staged_path).unwrap();

        let err = fx.manager.revert(&record).unwrap_err();
        assert!(matches!(err, RevertError::StagedMissing { .. }));
        assert_eq!(fx.manager.orphaned().unwrap().len(), 1);

        assert!(fx.manager.forget(&record).unwrap());
        assert!(fx.manager.records().unwrap().is_empty());
    }

    #[test]
    fn revert_unknown_record_fails() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"content");
        let record = fx.manager.stage(&a, &fp).unwrap();
        fx.manager.revert(&record).unwrap();

        let err = fx.manager.revert(&record).unwrap_err();
        assert!(matches!(err, RevertError::UnknownRecord { .. }));
    }

    #[test]
    fn commit_delete_removes_staged_file_only() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let b = fx.photos.join("b.jpg");
        let fp = write(&a, b"dup");
        write(&b, b"dup");

        let record = fx.manager.stage(&a, &fp).unwrap();
        fx.manager.commit_delete(&record).unwrap();

        assert!(!record.staged_path.exists());
        assert!(b.exists());
        assert!(fx.manager.record(&record.id).unwrap().is_none());
    }

    #[test]
    fn commit_delete_of_missing_file_fails() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let fp = write(&a, b"dup");
        let record = fx.manager.stage(&a, &fp).unwrap();
        fs::remove_file(&record.staged_path).unwrap();

        let err = fx.manager.commit_delete(&record).unwrap_err();
        assert!(matches!(err, CommitDeleteError::StagedMissing { .. }));
        assert!(fx.manager.record(&record.id).unwrap().is_some());
    }

    #[test]
    fn resolve_group_keeps_one() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let b = fx.photos.join("b.jpg");
        let c = fx.photos.join("c.jpg");
        for p in [&a, &b, &c] {
            write(p, b"triplicate");
        }
        let group = group_of(&[&a, &b, &c]);

        let outcomes = fx
            .manager
            .resolve_group(&group, &b, &CancellationToken::new())
            .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(StageOutcome::is_staged));
        assert!(b.exists());
        assert!(!a.exists());
        assert!(!c.exists());
    }

    #[test]
    fn resolve_group_rejects_outside_keeper() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let b = fx.photos.join("b.jpg");
        write(&a, b"pair");
        write(&b, b"pair");
        let group = group_of(&[&a, &b]);

        let err = fx
            .manager
            .resolve_group(&group, &fx.photos.join("other.jpg"), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, StageError::NotInGroup { .. }));
        assert!(a.exists() && b.exists());
    }

    #[test]
    fn resolve_group_stops_when_cancelled() {
        let fx = fixture();
        let a = fx.photos.join("a.jpg");
        let b = fx.photos.join("b.jpg");
        write(&a, b"pair");
        write(&b, b"pair");
        let group = group_of(&[&a, &b]);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcomes = fx.manager.resolve_group(&group, &a, &cancel).unwrap();

        assert!(matches!(outcomes[0].result, Err(StageError::Cancelled { .. })));
        assert!(b.exists());
    }
}
