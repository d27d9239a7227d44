//! Cache statistics types
//!
//! This module provides structures for reporting on the prefix cache:
//! - `CacheStats`: Snapshot of what is on disk (file count, total size)
//! - `FetchCounters`: Lock-free counters of background fetch outcomes

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the cache directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of files in the cache directory
    pub file_count: u64,
    /// Sum of all file sizes in bytes
    pub total_size_bytes: u64,
}

impl CacheStats {
    pub fn is_empty(&self) -> bool {
        self.file_count == 0
    }
}

/// Counters of background fetch outcomes, shared with fetch tasks
#[derive(Debug, Default)]
pub(crate) struct FetchCounters {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    bytes_fetched: AtomicU64,
}

impl FetchCounters {
    pub fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, bytes: u64) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.bytes_fetched.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchStats {
        FetchStats {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_fetched: self.bytes_fetched.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the fetch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub started: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub bytes_fetched: u64,
}

impl FetchStats {
    /// Fetches that have neither succeeded nor failed yet
    pub fn pending(&self) -> u64 {
        self.started.saturating_sub(self.succeeded + self.failed)
    }

    /// Fraction of finished fetches that succeeded
    /// Returns 0.0 if no fetch has finished
    pub fn success_rate(&self) -> f64 {
        let finished = self.succeeded + self.failed;
        if finished == 0 {
            0.0
        } else {
            self.succeeded as f64 / finished as f64
        }
    }
}
