//! Integration tests for scanning and grouping.
//!
//! These tests verify end-to-end scan behavior including:
//! - Exact duplicate detection
//! - Determinism across repeated scans
//! - The file-count ceiling
//! - Per-entry failures never aborting a scan

mod common;

use photo_sifter::core::scanner::{ScanConfig, ScanSession, SkipReason};
use photo_sifter::error::ScanError;
use photo_sifter::events::{Event, EventChannel, HashEvent};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::TempDir;

fn scan(root: &Path, config: ScanConfig) -> photo_sifter::core::ScanResult {
    ScanSession::new(config).scan(&[root.to_path_buf()]).unwrap()
}

fn names(paths: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn scan_handles_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    let result = scan(temp_dir.path(), ScanConfig::default());

    assert_eq!(result.files_examined, 0);
    assert!(result.groups.is_empty());
    assert!(result.skipped.is_empty());
}

#[test]
fn identical_files_form_one_group() {
    let temp_dir = TempDir::new().unwrap();
    let photos = temp_dir.path().join("photos");
    common::write(&photos.join("a.jpg"), b"sunset over the bay");
    common::write(&photos.join("b.jpg"), b"sunset over the bay");
    common::write(&photos.join("c.jpg"), b"a different picture");

    let result = scan(&photos, ScanConfig::default());

    assert_eq!(result.files_examined, 3);
    assert_eq!(result.groups.len(), 1);
    let group = &result.groups[0];
    assert_eq!(names(group.paths().cloned()), vec!["a.jpg", "b.jpg"]);
    assert!(result.group_for(&photos.canonicalize().unwrap().join("c.jpg")).is_none());
}

#[test]
fn empty_files_are_duplicates_of_each_other() {
    let temp_dir = TempDir::new().unwrap();
    common::write(&temp_dir.path().join("x.png"), b"");
    common::write(&temp_dir.path().join("y.png"), b"");

    let result = scan(temp_dir.path(), ScanConfig::default());
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].size(), 0);
}

#[test]
fn groups_ignore_names_and_folders() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    common::write(&root.join("2019/holiday.JPG"), b"same bytes");
    common::write(&root.join("deep/er/still/copy.jpeg"), b"same bytes");
    common::write(&root.join("clip.mp4"), b"same bytes");

    let result = scan(root, ScanConfig::default());
    assert_eq!(result.groups.len(), 1);
    assert_eq!(result.groups[0].len(), 3);
}

#[test]
fn repeated_scans_are_identical() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for i in 0..6 {
        common::write(&root.join(format!("set{}/one.jpg", i % 3)), format!("content {}", i % 2).as_bytes());
        common::write(&root.join(format!("dup{}.png", i)), format!("content {}", i % 2).as_bytes());
    }

    let config = ScanConfig::default().workers(4);
    let first = scan(root, config.clone());
    let second = scan(root, config);

    let membership = |r: &photo_sifter::core::ScanResult| -> Vec<Vec<PathBuf>> {
        r.groups.iter().map(|g| g.paths().cloned().collect()).collect()
    };
    assert_eq!(membership(&first), membership(&second));
    assert!(!first.groups.is_empty());
}

#[test]
fn every_group_shares_size_and_fingerprint() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    for (name, content) in [
        ("a.jpg", "alpha"),
        ("b.jpg", "alpha"),
        ("c.jpg", "beta"),
        ("d.jpg", "beta"),
        ("e.jpg", "beta"),
        ("f.jpg", "gamma"),
    ] {
        common::write(&root.join(name), content.as_bytes());
    }

    let result = scan(root, ScanConfig::default());
    assert_eq!(result.groups.len(), 2);
    for group in &result.groups {
        assert!(group.len() >= 2);
        for member in group.members() {
            assert_eq!(member.size, group.size());
            assert_eq!(member.fingerprint.as_ref(), Some(group.fingerprint()));
        }
    }
}

#[test]
fn ceiling_limits_examined_files() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["1.jpg", "2.jpg", "3.jpg"] {
        common::write(&temp_dir.path().join(name), name.as_bytes());
    }

    let result = scan(temp_dir.path(), ScanConfig::default().ceiling(Some(2)));

    assert_eq!(result.files_examined, 2);
    assert_eq!(result.ceiling_skipped, 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].reason, SkipReason::CeilingReached);
    assert_eq!(result.skipped[0].reason.to_string(), "ceiling reached");
}

#[test]
fn non_media_files_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    common::write(&temp_dir.path().join("notes.txt"), b"same");
    common::write(&temp_dir.path().join("notes2.txt"), b"same");

    let result = scan(temp_dir.path(), ScanConfig::default());
    assert_eq!(result.files_examined, 0);
    assert!(result.groups.is_empty());
}

#[test]
fn missing_root_fails_scan() {
    let temp_dir = TempDir::new().unwrap();
    let err = ScanSession::new(ScanConfig::default())
        .scan(&[temp_dir.path().join("nonexistent")])
        .unwrap_err();
    assert!(matches!(err, ScanError::RootInaccessible { .. }));
}

#[test]
fn file_as_root_fails_scan() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("a.jpg");
    common::write(&file, b"x");

    let err = ScanSession::new(ScanConfig::default()).scan(&[file]).unwrap_err();
    assert!(matches!(err, ScanError::RootNotDirectory { .. }));
}

#[test]
fn scanning_never_deletes_anything() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    common::write(&root.join("a.jpg"), b"dup");
    common::write(&root.join("b.jpg"), b"dup");

    let before: HashSet<_> = fs::read_dir(root).unwrap().map(|e| e.unwrap().path()).collect();
    let result = scan(root, ScanConfig::default());
    let after: HashSet<_> = fs::read_dir(root).unwrap().map(|e| e.unwrap().path()).collect();

    assert_eq!(result.groups.len(), 1);
    assert_eq!(before, after);
    assert_eq!(fs::read(root.join("a.jpg")).unwrap(), b"dup");
}

#[cfg(unix)]
#[test]
fn unreadable_file_is_skipped_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    common::write(&root.join("a.jpg"), b"dup");
    common::write(&root.join("b.jpg"), b"dup");
    let locked = root.join("locked.jpg");
    common::write(&locked, b"secret");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits
    if fs::read(&locked).is_ok() {
        return;
    }

    let result = scan(root, ScanConfig::default());
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(result.groups.len(), 1);
    assert!(result
        .skipped
        .iter()
        .any(|s| s.path.ends_with("locked.jpg") && matches!(s.reason, SkipReason::Unreadable(_))));
}

#[test]
fn cancelling_while_hashing_returns_a_consistent_partial_result() {
    let temp_dir = TempDir::new().unwrap();
    for i in 0..6 {
        // Pairs: 0/1, 2/3, 4/5
        common::write(
            &temp_dir.path().join(format!("img{}.jpg", i)),
            format!("photo {}", i / 2).as_bytes(),
        );
    }

    // One worker and a rendezvous channel keep hashing in step with the listener
    let (sender, receiver) = EventChannel::bounded(0);
    let session = ScanSession::new(ScanConfig::default().workers(1)).with_events(sender);
    let cancel = session.cancellation_token();
    let listener = thread::spawn(move || {
        for event in receiver.iter() {
            if let Event::Hash(HashEvent::Progress(progress)) = event {
                if progress.completed == 1 {
                    cancel.cancel();
                }
            }
        }
    });

    let result = session.scan(&[temp_dir.path().to_path_buf()]).unwrap();
    drop(session);
    listener.join().unwrap();

    assert!(result.cancelled);
    assert!(result.files_examined >= 1 && result.files_examined <= 2);
    assert_eq!(result.files.len(), result.files_examined);
    assert!(result.files.iter().all(|f| f.fingerprint.is_some()));

    let hashed: HashSet<_> = result.files.iter().map(|f| f.path.clone()).collect();
    for group in &result.groups {
        assert!(group.members().iter().all(|m| hashed.contains(&m.path)));
    }
}
