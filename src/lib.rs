//! # Photo Sifter
//!
//! Finds byte-identical photos and videos, moves unwanted copies into a
//! reversible review area, and organizes libraries into dated folders.
//!
//! ## Core Philosophy
//! - **Never auto-delete** - only an explicit commit removes a file
//! - **Never overwrite** - every move refuses an occupied destination
//! - **Exact matches only** - duplicates share a SHA-256 fingerprint
//!
//! ## Architecture
//! - `core` - Scanning, grouping, staging and organizing
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - Error types with the path involved in every message
//! - `config` - Settings and their default locations

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use config::SiftConfig;
pub use error::{Result, SiftError};

/// Initialize tracing for the library
///
/// Called by the application entry point. `RUST_LOG` takes precedence;
/// otherwise `verbose` selects between `debug` and `warn`.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "photo_sifter=debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // A subscriber may already be installed by an embedding application
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
