//! A scan session: walk, hash on a bounded pool, group.

use super::walker::{MediaWalker, ScanConfig, WalkItem};
use super::{MediaFile, MediaKind, ScanResult, SkipReason, SkippedEntry};
use crate::core::cancellation::CancellationToken;
use crate::core::grouper::{DuplicateGrouper, FingerprintIndex};
use crate::core::hasher::ContentHasher;
use crate::core::metadata::read_capture_date;
use crate::error::ScanError;
use crate::events::{Event, EventSender, HashEvent, HashProgress, ScanEvent};
use rayon::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use uuid::Uuid;

/// Everything one scan needs, passed explicitly.
///
/// Sessions share no state, so several can run side by side.
pub struct ScanSession {
    id: Uuid,
    config: ScanConfig,
    hasher: ContentHasher,
    events: EventSender,
    cancel: CancellationToken,
}

impl ScanSession {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            hasher: ContentHasher::new(),
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

    pub fn with_hasher(mut self, hasher: ContentHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Handle for cancelling this session from another thread
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Walk `roots`, hash every eligible file and group duplicates.
    ///
    /// Fails only when a root cannot be read.
    pub fn scan(&self, roots: &[PathBuf]) -> Result<ScanResult, ScanError> {
        let start = Instant::now();
        let roots = validate_roots(roots)?;

        tracing::info!(session = %self.id, roots = roots.len(), "scan started");
        self.events.send(Event::Scan(ScanEvent::Started {
            roots: roots.clone(),
        }));

        let mut walker = MediaWalker::new(roots, &self.config)
            .with_events(self.events.clone())
            .with_cancellation(self.cancel.clone());

        let mut discovered = Vec::new();
        let mut skipped = Vec::new();
        for item in walker.by_ref() {
            match item {
                WalkItem::File(file) => discovered.push(file),
                WalkItem::Skipped(entry) => skipped.push(entry),
            }
        }

        self.events.send(Event::Scan(ScanEvent::Completed {
            files_found: walker.files_found(),
            ceiling_skipped: walker.ceiling_skipped(),
        }));

        let index = FingerprintIndex::new();
        let (files_examined, mut unreadable) = self.hash_all(&discovered, &index)?;
        unreadable.sort_by_key(|(discovery_index, _)| *discovery_index);
        skipped.extend(unreadable.into_iter().map(|(_, entry)| entry));

        let index_map = index.into_inner();
        let mut files: Vec<MediaFile> = index_map.values().flatten().cloned().collect();
        files.sort_by_key(|f| f.discovery_index);

        let groups = DuplicateGrouper::group_map(index_map);

        self.events.send(Event::Hash(HashEvent::Completed {
            total_hashed: files.len(),
            duplicate_groups: groups.len(),
        }));

        let cancelled = walker.was_cancelled() || self.cancel.is_cancelled();
        tracing::info!(
            session = %self.id,
            examined = files_examined,
            groups = groups.len(),
            skipped = skipped.len(),
            cancelled,
            "scan finished"
        );

        Ok(ScanResult {
            session_id: self.id,
            groups,
            skipped,
            files_examined,
            ceiling_skipped: walker.ceiling_skipped(),
            files,
            cancelled,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Hash files on a dedicated pool sized by configuration
    fn hash_all(
        &self,
        files: &[MediaFile],
        index: &FingerprintIndex,
    ) -> Result<(usize, Vec<(usize, SkippedEntry)>), ScanError> {
        let workers = self.config.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("photosift-hash-{}", i))
            .build()
            .map_err(|e| ScanError::WorkerPool(e.to_string()))?;

        self.events.send(Event::Hash(HashEvent::Started {
            total_files: files.len(),
            workers,
        }));

        let total = files.len();
        let examined = AtomicUsize::new(0);
        let bytes_hashed = AtomicU64::new(0);
        let unreadable = Mutex::new(Vec::new());

        pool.install(|| {
            files.par_iter().for_each(|file| {
                if self.cancel.is_cancelled() {
                    return;
                }
                let completed = examined.fetch_add(1, Ordering::SeqCst) + 1;

                match self.hasher.hash_file(&file.path) {
                    Ok(hashed) => {
                        let capture_date = if self.config.read_capture_dates
                            && file.kind == MediaKind::Image
                        {
                            read_capture_date(&file.path)
                        } else {
                            None
                        };
                        let bytes = bytes_hashed.fetch_add(hashed.bytes, Ordering::SeqCst)
                            + hashed.bytes;

                        index.insert(file.clone().with_hash(hashed).with_capture_date(capture_date));

                        self.events.send(Event::Hash(HashEvent::Progress(HashProgress {
                            completed,
                            total,
                            current_path: file.path.clone(),
                            bytes_hashed: bytes,
                        })));
                    }
                    Err(e) => {
                        tracing::warn!(path = %file.path.display(), error = %e, "excluding unreadable file");
                        self.events.send(Event::Hash(HashEvent::Error {
                            path: file.path.clone(),
                            message: e.to_string(),
                        }));
                        let entry = SkippedEntry::new(
                            file.path.clone(),
                            SkipReason::Unreadable(e.to_string()),
                        );
                        unreadable
                            .lock()
                            .unwrap_or_else(|p| p.into_inner())
                            .push((file.discovery_index, entry));
                    }
                }
            });
        });

        let unreadable = unreadable.into_inner().unwrap_or_else(|p| p.into_inner());
        Ok((examined.into_inner(), unreadable))
    }
}

/// Canonicalize roots, failing on the first one that cannot be read
fn validate_roots(roots: &[PathBuf]) -> Result<Vec<PathBuf>, ScanError> {
    if roots.is_empty() {
        return Err(ScanError::NoRoots);
    }

    roots
        .iter()
        .map(|root| {
            let canonical = root.canonicalize().map_err(|source| ScanError::RootInaccessible {
                path: root.clone(),
                source,
            })?;
            if !canonical.is_dir() {
                return Err(ScanError::RootNotDirectory { path: root.clone() });
            }
            fs::read_dir(&canonical).map_err(|source| ScanError::RootInaccessible {
                path: root.clone(),
                source,
            })?;
            Ok(canonical)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::test_support::jpeg_with_capture_date;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn scan_groups_identical_files() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a.jpg", b"sunset");
        write(temp_dir.path(), "b.jpg", b"sunset");
        write(temp_dir.path(), "c.jpg", b"sunrise");

        let result = ScanSession::new(ScanConfig::default())
            .scan(&[temp_dir.path().to_path_buf()])
            .unwrap();

        assert_eq!(result.files_examined, 3);
        assert_eq!(result.groups.len(), 1);
        let names: Vec<_> = result.groups[0].members().iter().map(|m| m.file_name()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn missing_root_is_fatal() {
        let result = ScanSession::new(ScanConfig::default())
            .scan(&[PathBuf::from("/nonexistent/path/12345")]);
        assert!(matches!(result, Err(ScanError::RootInaccessible { .. })));
    }

    #[test]
    fn file_root_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let file = write(temp_dir.path(), "a.jpg", b"x");

        let result = ScanSession::new(ScanConfig::default()).scan(&[file]);
        assert!(matches!(result, Err(ScanError::RootNotDirectory { .. })));
    }

    #[test]
    fn empty_roots_are_rejected() {
        let result = ScanSession::new(ScanConfig::default()).scan(&[]);
        assert!(matches!(result, Err(ScanError::NoRoots)));
    }

    #[test]
    fn overlapping_roots_do_not_duplicate_files() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write(&nested, "only.jpg", b"one copy");

        let result = ScanSession::new(ScanConfig::default())
            .scan(&[temp_dir.path().to_path_buf(), nested])
            .unwrap();

        assert_eq!(result.files.len(), 1);
        assert!(result.groups.is_empty());
    }

    #[test]
    fn overlapping_roots_do_not_consume_the_ceiling() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write(&nested, "a.jpg", b"a");
        write(&nested, "b.jpg", b"b");
        write(temp_dir.path(), "z.jpg", b"z");

        let config = ScanConfig::default().ceiling(Some(3));
        let result = ScanSession::new(config)
            .scan(&[temp_dir.path().to_path_buf(), nested])
            .unwrap();

        assert_eq!(result.files_examined, 3);
        assert_eq!(result.ceiling_skipped, 0);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn capture_dates_are_read_for_images() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "img.jpg", &jpeg_with_capture_date("2023:06:15 10:30:00"));

        let result = ScanSession::new(ScanConfig::default())
            .scan(&[temp_dir.path().to_path_buf()])
            .unwrap();

        assert!(result.files[0].capture_date.is_some());
    }

    #[test]
    fn cancelled_session_examines_nothing() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a.jpg", b"a");

        let session = ScanSession::new(ScanConfig::default());
        session.cancellation_token().cancel();
        let result = session.scan(&[temp_dir.path().to_path_buf()]).unwrap();

        assert!(result.cancelled);
        assert_eq!(result.files_examined, 0);
    }

    #[test]
    fn sessions_have_distinct_ids() {
        let a = ScanSession::new(ScanConfig::default());
        let b = ScanSession::new(ScanConfig::default());
        assert_ne!(a.id(), b.id());
    }
}
