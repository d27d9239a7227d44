//! Cache events broadcast to observers (status projection, CLI)

use serde::Serialize;

/// Something observable happened in the prefix cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CacheEvent {
    FetchStarted { key: String, url: String },
    FetchCompleted { key: String, bytes: u64 },
    /// The entry was discarded; `reason` is a short error kind
    FetchFailed { key: String, reason: String },
    Cleared { removed: u64 },
}

impl CacheEvent {
    /// Whether this event can change what `ContentCache::stats` reports
    pub fn changes_disk_usage(&self) -> bool {
        !matches!(self, CacheEvent::FetchStarted { .. })
    }
}
