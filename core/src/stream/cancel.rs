//! Cooperative cancellation shared by every pipeline thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owning side of the cancellation flag. Only the controller holds one.
#[derive(Debug, Default)]
pub struct CancellationSource {
    flag: Arc<AtomicBool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken { flag: Arc::clone(&self.flag) }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Read-only view of the flag handed to readers, workers and queues.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token nobody can cancel.
    pub fn never() -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)) }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
