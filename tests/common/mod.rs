//! Helpers shared by the integration tests.

#![allow(dead_code)]

use chrono::{Local, NaiveDate};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

pub use photo_sifter::core::metadata::test_support::jpeg_with_capture_date;

/// Write `content` to `path`, creating parent folders
pub fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Set the modification time to local noon on the given day
pub fn set_mtime(path: &Path, year: i32, month: u32, day: u32) {
    let local = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_local_timezone(Local)
        .single()
        .unwrap();
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(local.timestamp() as u64);
    File::options().write(true).open(path).unwrap().set_modified(time).unwrap();
}
