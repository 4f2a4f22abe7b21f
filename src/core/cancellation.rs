//! Cooperative cancellation shared between a caller and a running pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Checked between files, never in the middle of one, so a cancelled pass
/// leaves every file either fully processed or untouched.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
