//! Fixed settle delays between device steps
//!
//! Waits are plain sleeps with no cancellation; a started wait always runs
//! to completion.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

/// Blocking delay between device steps
pub trait Wait: Send + Sync {
    fn wait_secs(&self, secs: u64);
}

/// Sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadWait;

impl Wait for ThreadWait {
    fn wait_secs(&self, secs: u64) {
        if secs > 0 {
            thread::sleep(Duration::from_secs(secs));
        }
    }
}

/// Returns immediately and accumulates the requested delay (dry runs, tests)
#[derive(Debug, Default)]
pub struct RecordedWait {
    total_secs: AtomicU64,
}

impl RecordedWait {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total seconds that would have been slept
    pub fn total_secs(&self) -> u64 {
        self.total_secs.load(Ordering::Relaxed)
    }
}

impl Wait for RecordedWait {
    fn wait_secs(&self, secs: u64) {
        self.total_secs.fetch_add(secs, Ordering::Relaxed);
    }
}
