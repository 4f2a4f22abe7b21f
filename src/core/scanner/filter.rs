//! File filtering logic for the scanner.

use super::MediaKind;
use std::collections::HashSet;
use std::path::Path;

/// Image extensions recognized by default
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif", "heic", "heif",
];

/// Video extensions recognized by default
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "wmv", "m4v", "3gp"];

/// Decides which files are eligible media
pub struct MediaFilter {
    extensions: HashSet<String>,
    include_hidden: bool,
}

impl MediaFilter {
    /// Accept the default image and video extensions
    pub fn new() -> Self {
        Self {
            extensions: IMAGE_EXTENSIONS
                .iter()
                .chain(VIDEO_EXTENSIONS)
                .map(|e| e.to_string())
                .collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Replace the accepted extensions. Matching is case-insensitive and a
    /// leading dot is ignored.
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        self
    }

    pub fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && Self::is_hidden(path) {
            return false;
        }

        // Partial downloads and editor scratch files
        if path.extension().and_then(|e| e.to_str()) == Some("tmp") {
            return false;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.contains(&e.to_lowercase()))
            .unwrap_or(false)
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaKind {
    /// Classify a path by extension. Unknown extensions are treated as images
    /// only when a custom extension list admitted them.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}
