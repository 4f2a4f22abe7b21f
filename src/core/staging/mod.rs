//! # Staging Module
//!
//! A reversible review area for duplicates.
//!
//! ## Features
//! - Files are moved, never deleted, until the user commits
//! - Records persist in SQLite so staging survives restarts
//! - Revert never overwrites whatever now occupies the original location

mod manager;
mod repository;
mod types;

pub use manager::StageManager;
pub use repository::StageRepository;
pub use types::{ReviewSummary, StageOutcome, StageRecord};
