//! Directory walking implementation using walkdir.

use super::{filter::MediaFilter, MediaFile, SkipReason, SkippedEntry};
use crate::core::cancellation::CancellationToken;
use crate::events::{Event, EventSender, ScanEvent, ScanProgress};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Default number of hashing workers
pub const DEFAULT_WORKERS: usize = 4;

/// Configuration for a scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Custom extensions to include (None = default image and video types)
    pub extensions: Option<Vec<String>>,
    /// Directories pruned from the walk (the review area, for instance)
    pub exclude: Vec<PathBuf>,
    /// Maximum number of files examined (None = unlimited)
    pub ceiling: Option<usize>,
    /// Size of the hashing worker pool
    pub workers: usize,
    /// Read embedded capture dates while hashing images
    pub read_capture_dates: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_hidden: false,
            extensions: None,
            exclude: Vec::new(),
            ceiling: None,
            workers: DEFAULT_WORKERS,
            read_capture_dates: true,
        }
    }
}

impl ScanConfig {
    pub fn ceiling(mut self, ceiling: Option<usize>) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Worker count, at least one
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude.push(dir.into());
        self
    }

    pub fn extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub(crate) fn filter(&self) -> MediaFilter {
        let filter = MediaFilter::new().with_hidden(self.include_hidden);
        match &self.extensions {
            Some(extensions) => filter.with_extensions(extensions),
            None => filter,
        }
    }
}

/// One item produced by the walk
#[derive(Debug, Clone)]
pub enum WalkItem {
    File(MediaFile),
    Skipped(SkippedEntry),
}

type EntryIter = Box<dyn Iterator<Item = walkdir::Result<DirEntry>> + Send>;

/// Lazy walk over several roots in the order given.
///
/// Entries inside each directory are visited in file-name order so repeated
/// walks over an unchanged tree yield the same sequence. A path reached
/// through overlapping roots is yielded once and counted once.
pub struct MediaWalker {
    entries: EntryIter,
    filter: MediaFilter,
    seen: HashSet<PathBuf>,
    ceiling: Option<usize>,
    events: EventSender,
    cancel: CancellationToken,
    files_found: usize,
    directories_scanned: usize,
    ceiling_skipped: usize,
    cancelled: bool,
}

impl MediaWalker {
    /// Roots are expected to be validated (and ideally canonical) already.
    pub fn new(roots: Vec<PathBuf>, config: &ScanConfig) -> Self {
        // Match both spellings so a non-canonical root still prunes correctly
        let mut exclude = config.exclude.clone();
        exclude.extend(config.exclude.iter().filter_map(|p| p.canonicalize().ok()));
        let include_hidden = config.include_hidden;

        let entries = roots.into_iter().flat_map(move |root| {
            let exclude = exclude.clone();
            WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(move |entry| keep_entry(entry, &exclude, include_hidden))
        });

        Self {
            entries: Box::new(entries),
            filter: config.filter(),
            seen: HashSet::new(),
            ceiling: config.ceiling,
            events: EventSender::disabled(),
            cancel: CancellationToken::new(),
            files_found: 0,
            directories_scanned: 0,
            ceiling_skipped: 0,
            cancelled: false,
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

    pub fn files_found(&self) -> usize {
        self.files_found
    }

    pub fn ceiling_skipped(&self) -> usize {
        self.ceiling_skipped
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    fn ceiling_reached(&self) -> bool {
        self.ceiling.is_some_and(|ceiling| self.files_found >= ceiling)
    }

    fn skip_entry(&self, path: PathBuf, reason: SkipReason) -> WalkItem {
        tracing::debug!(path = %path.display(), %reason, "skipping entry");
        self.events.send(Event::Scan(ScanEvent::Skipped {
            path: path.clone(),
            reason: reason.to_string(),
        }));
        WalkItem::Skipped(SkippedEntry::new(path, reason))
    }
}

impl Iterator for MediaWalker {
    type Item = WalkItem;

    fn next(&mut self) -> Option<WalkItem> {
        loop {
            if self.cancel.is_cancelled() {
                self.cancelled = true;
                return None;
            }

            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    return Some(self.skip_entry(path, SkipReason::Inaccessible(e.to_string())));
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                self.directories_scanned += 1;
                self.events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    directories_scanned: self.directories_scanned,
                    files_found: self.files_found,
                    current_path: entry.path().to_path_buf(),
                })));
                continue;
            }

            // Symlinks are never followed, to files or to directories
            if !file_type.is_file() || !self.filter.should_include(entry.path()) {
                continue;
            }

            if !self.seen.insert(entry.path().to_path_buf()) {
                continue;
            }

            if self.ceiling_reached() {
                if self.ceiling_skipped == 0 {
                    if let Some(ceiling) = self.ceiling {
                        tracing::info!(ceiling, "file ceiling reached");
                        self.events
                            .send(Event::Scan(ScanEvent::CeilingReached { ceiling }));
                    }
                }
                self.ceiling_skipped += 1;
                return Some(self.skip_entry(entry.into_path(), SkipReason::CeilingReached));
            }

            match entry.metadata() {
                Ok(metadata) => {
                    let modified = metadata
                        .modified()
                        .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                    let file = MediaFile::discovered(
                        entry.into_path(),
                        metadata.len(),
                        modified,
                        self.files_found,
                    );
                    self.files_found += 1;
                    return Some(WalkItem::File(file));
                }
                Err(e) => {
                    let reason = SkipReason::Inaccessible(e.to_string());
                    return Some(self.skip_entry(entry.into_path(), reason));
                }
            }
        }
    }
}

fn keep_entry(entry: &DirEntry, exclude: &[PathBuf], include_hidden: bool) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if !include_hidden && MediaFilter::is_hidden(entry.path()) {
        return false;
    }
    if entry.file_type().is_dir() && exclude.iter().any(|dir| dir == entry.path()) {
        return false;
    }
    true
}
