//! # Metadata Module
//!
//! Reads capture timestamps embedded in media files.
//!
//! ## Tags consulted, in order
//! - `DateTimeOriginal` (when the shutter fired)
//! - `DateTimeDigitized`
//! - `DateTime` (last write by camera software)
//!
//! Missing, unreadable and corrupt metadata are all treated the same way:
//! no capture date. Callers fall back to the filesystem modification time.

use chrono::{DateTime, Local, NaiveDateTime};
use exif::{Exif, In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::SystemTime;

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Where an effective file date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    /// Embedded capture metadata
    Capture,
    /// Filesystem modification time
    Modified,
}

/// Read the capture timestamp of a photo, if it has a usable one
pub fn read_capture_date(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = Reader::new().read_from_container(&mut reader).ok()?;
    capture_date_from_exif(&exif)
}

fn capture_date_from_exif(exif: &Exif) -> Option<NaiveDateTime> {
    DATE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        ascii_value(&field.value).and_then(|s| parse_exif_datetime(&s))
    })
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .map(|s| s.trim_end_matches('\0').trim().to_string()),
        _ => None,
    }
}

/// Parse `YYYY:MM:DD HH:MM:SS`. Cameras write all-zero or blank dates when
/// the clock was never set; those parse as `None`.
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim().trim_matches('"');
    if let Ok(parsed) = NaiveDateTime::parse_from_str(s, EXIF_DATE_FORMAT) {
        return Some(parsed);
    }
    // Some writers use dashes in the date part
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
}

/// Convert a filesystem timestamp to local wall-clock time
pub fn local_datetime(time: SystemTime) -> NaiveDateTime {
    let datetime: DateTime<Local> = time.into();
    datetime.naive_local()
}

/// Fixtures shared by unit and integration tests.
#[doc(hidden)]
pub mod test_support {
    /// A minimal JPEG whose only content is an EXIF block carrying
    /// `DateTimeOriginal`. `date` must be exactly 19 characters.
    pub fn jpeg_with_capture_date(date: &str) -> Vec<u8> {
        assert_eq!(date.len(), 19);

        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II\x2a\x00");
        tiff.extend_from_slice(&8u32.to_le_bytes());
        // IFD0: a single pointer to the Exif sub-IFD at offset 26
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x8769u16.to_le_bytes());
        tiff.extend_from_slice(&4u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&26u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        // Exif IFD: DateTimeOriginal, ASCII, 20 bytes at offset 44
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x9003u16.to_le_bytes());
        tiff.extend_from_slice(&2u16.to_le_bytes());
        tiff.extend_from_slice(&20u32.to_le_bytes());
        tiff.extend_from_slice(&44u32.to_le_bytes());
        tiff.extend_from_slice(&0u32.to_le_bytes());
        tiff.extend_from_slice(date.as_bytes());
        tiff.push(0);

        let segment_len = (2 + 6 + tiff.len()) as u16;
        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&segment_len.to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }
}
