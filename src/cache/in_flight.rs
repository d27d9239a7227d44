//! In-flight fetch tracking
//!
//! Deduplicates concurrent prefix fetches for the same cache key.
//! The first caller for a key receives an `InFlightGuard` and owns the fetch;
//! every other caller is told the key is busy and does nothing. Dropping the
//! guard releases the key, whether the fetch succeeded, failed or panicked.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Set of cache keys currently being fetched
#[derive(Debug, Clone, Default)]
pub struct InFlightSet {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claim `key`
    ///
    /// Returns `None` when another fetch already holds the key.
    pub fn try_acquire(&self, key: &str) -> Option<InFlightGuard> {
        let mut keys = self.keys.lock();
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            key: key.to_string(),
            set: self.clone(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.lock().contains(key)
    }

    /// Number of keys currently claimed
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }

    fn release(&self, key: &str) {
        self.keys.lock().remove(key);
    }
}

/// Claim on a single key; released on drop
#[derive(Debug)]
pub struct InFlightGuard {
    key: String,
    set: InFlightSet,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.release(&self.key);
    }
}
