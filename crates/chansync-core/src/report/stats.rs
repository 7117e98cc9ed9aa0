//! Monotonic run counters
//!
//! Counters only ever increase during a run; any worker may bump them
//! without coordination. `snapshot()` is the pull-based view consumed by
//! whatever presentation layer is attached.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Thread-safe counters for one replication run.
#[derive(Debug, Default)]
pub struct RunStats {
    files_uploaded: AtomicU64,
    files_ignored: AtomicU64,
    files_failed: AtomicU64,
    folders_created: AtomicU64,
    bytes_transferred: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub files_uploaded: u64,
    pub files_ignored: u64,
    pub files_failed: u64,
    pub folders_created: u64,
    pub bytes_transferred: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_uploaded(&self, bytes: u64) {
        self.files_uploaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn file_ignored(&self) {
        self.files_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn file_failed(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn folder_created(&self) {
        self.folders_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            files_uploaded: self.files_uploaded.load(Ordering::Relaxed),
            files_ignored: self.files_ignored.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            folders_created: self.folders_created.load(Ordering::Relaxed),
            bytes_transferred: self.bytes_transferred.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    /// Files that reached a terminal state.
    pub fn files_completed(&self) -> u64 {
        self.files_uploaded + self.files_ignored + self.files_failed
    }
}
