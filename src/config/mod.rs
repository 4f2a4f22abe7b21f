//! # Configuration
//!
//! Settings shared by the CLI and any other front end. Everything has a
//! default; a JSON file may override any subset of fields.

use crate::core::organize::{FolderStructure, OrganizeConfig};
use crate::core::scanner::ScanConfig;
use crate::error::{Result, SiftError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "photosift";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Where staged duplicates are held until reverted or deleted
    pub review_dir: PathBuf,
    /// SQLite database of staging records
    pub database: PathBuf,
    pub workers: usize,
    /// Maximum files examined per scan
    pub ceiling: Option<usize>,
    pub include_hidden: bool,
    pub structure: FolderStructure,
}

impl Default for SiftConfig {
    fn default() -> Self {
        let data = data_dir();
        Self {
            review_dir: data.join("review"),
            database: data.join("staging.db"),
            workers: crate::core::scanner::DEFAULT_WORKERS,
            ceiling: None,
            include_hidden: false,
            structure: FolderStructure::default(),
        }
    }
}

impl SiftConfig {
    /// `<config dir>/photosift/config.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| SiftError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| SiftError::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Load `path` if given, else the default file if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Self::default_path();
                if default.is_file() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Scan settings. The review area is always excluded so staged files
    /// never show up as duplicates of what was kept.
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .workers(self.workers.max(1))
            .ceiling(self.ceiling)
            .include_hidden(self.include_hidden)
            .exclude(self.review_dir.clone())
    }

    pub fn organize_config(&self) -> OrganizeConfig {
        OrganizeConfig::default()
            .structure(self.structure)
            .scan(self.scan_config())
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
