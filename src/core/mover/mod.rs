//! # Mover Module
//!
//! Moves a single file without ever overwriting the destination.
//!
//! A move either completes (file at destination, gone from source) or leaves
//! the source untouched. Strategies, in order:
//! 1. hard link + unlink (atomic no-clobber on one filesystem)
//! 2. rename, for filesystems without hard links
//! 3. copy into a temp file beside the destination, verify, persist without
//!    clobbering, then unlink the source (cross-device moves)

use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::Path;
use tempfile::NamedTempFile;

/// Move `from` to `to`. Fails with `AlreadyExists` if `to` is occupied.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    ensure_vacant(to)?;

    match fs::hard_link(from, to) {
        Ok(()) => {
            if let Err(e) = fs::remove_file(from) {
                // Leave things as they were
                let _ = fs::remove_file(to);
                return Err(e);
            }
            return Ok(());
        }
        Err(e) if matches!(e.kind(), ErrorKind::AlreadyExists | ErrorKind::NotFound) => {
            return Err(e);
        }
        Err(e) => {
            tracing::debug!(from = %from.display(), error = %e, "hard link unavailable, falling back");
        }
    }

    ensure_vacant(to)?;
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if from.exists() => {
            tracing::debug!(from = %from.display(), error = %e, "rename failed, copying instead");
            copy_then_remove(from, to)
        }
        Err(e) => Err(e),
    }
}

fn ensure_vacant(path: &Path) -> io::Result<()> {
    if path.symlink_metadata().is_ok() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} already exists", path.display()),
        ));
    }
    Ok(())
}

fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    let parent = to
        .parent()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "destination has no parent"))?;

    let source_meta = fs::metadata(from)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    io::copy(&mut File::open(from)?, temp.as_file_mut())?;
    temp.as_file().sync_all()?;

    let copied = temp.as_file().metadata()?.len();
    if copied != source_meta.len() {
        return Err(io::Error::new(
            ErrorKind::Other,
            format!(
                "copy verification failed: source {} bytes, copy {} bytes",
                source_meta.len(),
                copied
            ),
        ));
    }
    if let Ok(modified) = source_meta.modified() {
        temp.as_file().set_modified(modified)?;
    }

    temp.persist_noclobber(to).map_err(|e| e.error)?;

    if let Err(e) = fs::remove_file(from) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}
