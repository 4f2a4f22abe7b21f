//! # Core Module
//!
//! The UI-agnostic engine.
//!
//! ## Modules
//! - `scanner` - Discovers media files and builds the fingerprint index
//! - `hasher` - Streams file content through SHA-256
//! - `grouper` - Partitions the index into duplicate sets
//! - `staging` - Reversible review area with persistent records
//! - `organize` - Plans and applies date-based folder layouts
//! - `metadata` - Reads capture dates from EXIF
//! - `mover` - No-clobber file moves shared by staging and organize

pub mod cancellation;
pub mod grouper;
pub mod hasher;
pub mod metadata;
pub mod mover;
pub mod organize;
pub mod scanner;
pub mod staging;

// Re-export commonly used types
pub use cancellation::CancellationToken;
pub use grouper::{DuplicateGroup, DuplicateGrouper};
pub use hasher::{ContentHasher, Fingerprint};
pub use organize::{OrganizeExecutor, OrganizePlan, OrganizePlanner};
pub use scanner::{MediaFile, ScanConfig, ScanResult, ScanSession};
pub use staging::{StageManager, StageRecord};
