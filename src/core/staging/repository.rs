//! SQLite storage for staging records.

use super::types::StageRecord;
use crate::core::hasher::Fingerprint;
use crate::error::StoreError;
use chrono::{TimeZone, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SELECT_COLUMNS: &str =
    "SELECT id, original_path, staged_path, fingerprint, size, staged_at FROM staged_files";

/// Durable mapping of original path, staged path and fingerprint.
///
/// Survives restarts so a revert stays possible across sessions.
pub struct StageRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl StageRepository {
    /// Open or create the record database
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // WAL keeps readers unblocked while a stage is being recorded
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        Self::with_connection(conn, path.to_path_buf())
    }

    /// A throwaway database, for tests and dry runs
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;
        Self::with_connection(conn, PathBuf::from(":memory:"))
    }

    fn with_connection(conn: Connection, db_path: PathBuf) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS staged_files (
                id TEXT PRIMARY KEY,
                original_path BLOB NOT NULL,
                staged_path BLOB NOT NULL UNIQUE,
                fingerprint TEXT NOT NULL,
                size INTEGER NOT NULL,
                staged_at INTEGER NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_staged_original ON staged_files(original_path)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned {
            path: self.db_path.clone(),
        })
    }

    pub fn insert(&self, record: &StageRecord) -> Result<(), StoreError> {
        let original = path_bytes(&record.original_path)?;
        let staged = path_bytes(&record.staged_path)?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO staged_files
             (id, original_path, staged_path, fingerprint, size, staged_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                record.id.to_string(),
                original,
                staged,
                record.fingerprint.to_hex(),
                record.size as i64,
                record.staged_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<StageRecord>, StoreError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            &format!("{} WHERE id = ?", SELECT_COLUMNS),
            [id.to_string()],
            read_row,
        );

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Active records, oldest first
    pub fn list(&self) -> Result<Vec<StageRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY staged_at, id", SELECT_COLUMNS))?;
        let records = stmt
            .query_map([], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Records staged from one duplicate set
    pub fn list_for_group(&self, fingerprint: &Fingerprint) -> Result<Vec<StageRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE fingerprint = ? ORDER BY staged_at, id",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map([fingerprint.to_hex()], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Drop a record. Returns whether it existed.
    pub fn remove(&self, id: &Uuid) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM staged_files WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM staged_files", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Paths are stored as raw bytes so names that are not UTF-8 survive
#[cfg(unix)]
fn path_bytes(path: &Path) -> Result<&[u8], StoreError> {
    use std::os::unix::ffi::OsStrExt;
    Ok(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Result<&[u8], StoreError> {
    path.to_str().map(str::as_bytes).ok_or_else(|| {
        StoreError::QueryFailed(format!("path is not valid Unicode: {}", path.display()))
    })
}

#[cfg(unix)]
fn bytes_path(bytes: &[u8]) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStrExt;
    Some(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn bytes_path(bytes: &[u8]) -> Option<PathBuf> {
    std::str::from_utf8(bytes).ok().map(PathBuf::from)
}

/// Accepts TEXT as well as BLOB, for databases written before paths were bytes
fn read_path(row: &Row<'_>, index: usize) -> rusqlite::Result<PathBuf> {
    let bytes = match row.get_ref(index)? {
        ValueRef::Blob(bytes) | ValueRef::Text(bytes) => bytes,
        other => {
            return Err(rusqlite::Error::InvalidColumnType(
                index,
                format!("column {}", index),
                other.data_type(),
            ))
        }
    };
    bytes_path(bytes).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Blob,
            "stored path is not valid Unicode".into(),
        )
    })
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StageRecord> {
    let id: String = row.get(0)?;
    let original_path = read_path(row, 1)?;
    let staged_path = read_path(row, 2)?;
    let fingerprint: String = row.get(3)?;
    let size: i64 = row.get(4)?;
    let staged_at: i64 = row.get(5)?;

    let conversion = |index: usize, message: String| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            message.into(),
        )
    };

    Ok(StageRecord {
        id: Uuid::parse_str(&id).map_err(|e| conversion(0, e.to_string()))?,
        original_path,
        staged_path,
        fingerprint: fingerprint
            .parse::<Fingerprint>()
            .map_err(|e| conversion(3, e.to_string()))?,
        size: size as u64,
        staged_at: Utc
            .timestamp_millis_opt(staged_at)
            .single()
            .ok_or_else(|| conversion(5, format!("invalid timestamp {}", staged_at)))?,
    })
}
