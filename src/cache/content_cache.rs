//! Prefix content cache
//!
//! Maps remote sources to `cache_{hash}.tmp` files in a single directory and
//! fills them in the background with the first `preview_size_bytes` of the
//! resource. Lookups and stats are plain filesystem reads; fetches run as
//! tokio tasks, at most one per key.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::config::{CacheConfig, FetchConfig};
use super::error::{CacheError, FetchError};
use super::events::CacheEvent;
use super::fetch::PrefixFetcher;
use super::in_flight::InFlightSet;
use super::stats::{CacheStats, FetchCounters, FetchStats};
use super::utils::{cache_file_path, key_for};
use crate::constants::CACHE_EVENT_CAPACITY;
use crate::source::SourceReference;

/// Outcome of asking the cache to fetch a prefix
#[derive(Debug)]
pub enum FetchTicket {
    /// A usable entry already exists; nothing was scheduled
    AlreadyCached,
    /// Another fetch for the same key is running; nothing was scheduled
    InFlight,
    /// A new background fetch was spawned
    Spawned(JoinHandle<Result<u64, FetchError>>),
}

impl FetchTicket {
    pub fn is_spawned(&self) -> bool {
        matches!(self, FetchTicket::Spawned(_))
    }

    /// Wait for a spawned fetch; `None` when nothing was spawned or the task
    /// was aborted
    pub async fn wait(self) -> Option<Result<u64, FetchError>> {
        match self {
            FetchTicket::Spawned(handle) => handle.await.ok(),
            FetchTicket::AlreadyCached | FetchTicket::InFlight => None,
        }
    }
}

/// Disk-backed prefix cache
pub struct ContentCache {
    dir: PathBuf,
    fetcher: Arc<PrefixFetcher>,
    in_flight: InFlightSet,
    counters: Arc<FetchCounters>,
    events: broadcast::Sender<CacheEvent>,
    runtime: Handle,
}

impl ContentCache {
    /// Build a cache rooted at the configured directory
    ///
    /// Must be called from within a tokio runtime; background fetches are
    /// spawned onto that runtime.
    pub fn new(cache: &CacheConfig, fetch: &FetchConfig) -> Result<Self, CacheError> {
        cache.validate().map_err(CacheError::Config)?;
        fetch.validate().map_err(CacheError::Config)?;

        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let dir = cache.cache_dir();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::Directory {
            path: dir.clone(),
            source,
        })?;

        let (events, _) = broadcast::channel(CACHE_EVENT_CAPACITY);

        tracing::debug!(
            cache_dir = %dir.display(),
            preview_size_bytes = cache.preview_size_bytes,
            "Content cache ready"
        );

        Ok(Self {
            dir,
            fetcher: Arc::new(PrefixFetcher::new(cache, fetch)?),
            in_flight: InFlightSet::new(),
            counters: Arc::new(FetchCounters::default()),
            events,
            runtime,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache key for a URL
    pub fn key_for(url: &str) -> String {
        key_for(url)
    }

    /// Path the entry for `url` lives at, whether or not it exists yet
    pub fn path_for(&self, url: &str) -> PathBuf {
        cache_file_path(&self.dir, &key_for(url))
    }

    /// Cached file for a source, if one is usable
    ///
    /// Local sources never have a cache entry: they are already optimal.
    pub fn lookup(&self, source: &SourceReference) -> Option<PathBuf> {
        match source {
            SourceReference::Local(_) => None,
            SourceReference::Remote(url) => self.lookup_url(url),
        }
    }

    fn lookup_url(&self, url: &str) -> Option<PathBuf> {
        let path = self.path_for(url);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Schedule a prefix fetch for `url` unless it is cached or already in flight
    pub fn start_background_fetch(&self, url: &str) -> FetchTicket {
        if self.lookup_url(url).is_some() {
            return FetchTicket::AlreadyCached;
        }

        let key = key_for(url);
        let Some(guard) = self.in_flight.try_acquire(&key) else {
            tracing::trace!(key = %key, "Prefix fetch already in flight");
            return FetchTicket::InFlight;
        };

        // A fetch may have finished between the lookup and the claim
        if self.lookup_url(url).is_some() {
            return FetchTicket::AlreadyCached;
        }

        self.counters.record_started();
        let _ = self.events.send(CacheEvent::FetchStarted {
            key: key.clone(),
            url: url.to_string(),
        });

        let dest = cache_file_path(&self.dir, &key);
        let url = url.to_string();
        let fetcher = self.fetcher.clone();
        let counters = self.counters.clone();
        let events = self.events.clone();

        let handle = self.runtime.spawn(async move {
            // Released only after the entry is renamed into place
            let _guard = guard;

            match fetcher.fetch_into(&url, &dest).await {
                Ok(bytes) => {
                    tracing::info!(url = %url, key = %key, bytes = bytes, "Cached media prefix");
                    counters.record_success(bytes);
                    let _ = events.send(CacheEvent::FetchCompleted { key, bytes });
                    Ok(bytes)
                }
                Err(e) => {
                    tracing::warn!(
                        url = %url,
                        key = %key,
                        error = %e,
                        "Prefix fetch failed, continuing without cache"
                    );
                    counters.record_failure();
                    let _ = events.send(CacheEvent::FetchFailed {
                        key,
                        reason: e.kind().to_string(),
                    });
                    Err(e)
                }
            }
        });

        FetchTicket::Spawned(handle)
    }

    /// Delete every file in the cache directory
    ///
    /// Best-effort: files that cannot be removed are skipped. Returns the
    /// number of files removed.
    pub fn clear_all(&self) -> u64 {
        let mut removed = 0;

        match std::fs::read_dir(&self.dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !path.is_file() {
                        continue;
                    }
                    match std::fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            tracing::debug!(path = %path.display(), error = %e, "Skipping cache file")
                        }
                    }
                }
            }
            Err(e) => {
                tracing::debug!(cache_dir = %self.dir.display(), error = %e, "Cache directory unreadable")
            }
        }

        tracing::info!(removed = removed, "Cleared content cache");
        let _ = self.events.send(CacheEvent::Cleared { removed });
        removed
    }

    /// Snapshot of the cache directory
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();

        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return stats;
        };

        // Files may vanish mid-scan; skip them
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                if meta.is_file() {
                    stats.file_count += 1;
                    stats.total_size_bytes += meta.len();
                }
            }
        }
        stats
    }

    pub fn fetch_stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    /// Number of fetches currently running
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("dir", &self.dir)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}
