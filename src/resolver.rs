//! Content resolver
//!
//! The single entry point the rest of the system uses to turn a requested
//! source into something playable. A remote source with a cached prefix is
//! swapped for the local cache file; a miss returns the original reference
//! untouched and schedules a background fetch so the next request hits.
//! Resolution never waits on the network.

use std::sync::Arc;

use crate::cache::{ContentCache, FetchTicket};
use crate::source::SourceReference;

/// Cache-aware resolver shared by the narrative engine and callers
#[derive(Debug, Clone)]
pub struct ContentResolver {
    cache: Arc<ContentCache>,
}

impl ContentResolver {
    pub fn new(cache: Arc<ContentCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    /// Best playable reference for `source`
    pub fn resolve(&self, source: &SourceReference) -> SourceReference {
        self.resolve_with_ticket(source).0
    }

    /// Resolve, then wait for any fetch the miss scheduled
    ///
    /// Returns the resolution after the fetch settled. Meant for explicit
    /// prefetching; playback paths use [`ContentResolver::resolve`].
    pub async fn resolve_and_wait(&self, source: &SourceReference) -> SourceReference {
        let (resolved, ticket) = self.resolve_with_ticket(source);
        match ticket {
            Some(ticket @ FetchTicket::Spawned(_)) => {
                let _ = ticket.wait().await;
                self.resolve_cached(source).unwrap_or(resolved)
            }
            _ => resolved,
        }
    }

    fn resolve_with_ticket(&self, source: &SourceReference) -> (SourceReference, Option<FetchTicket>) {
        let SourceReference::Remote(url) = source else {
            return (source.clone(), None);
        };

        if let Some(path) = self.cache.lookup(source) {
            tracing::debug!(url = %url, path = %path.display(), "Resolved from prefix cache");
            return (SourceReference::Local(path), None);
        }

        let ticket = self.cache.start_background_fetch(url);
        tracing::debug!(
            url = %url,
            fetch_scheduled = ticket.is_spawned(),
            "Prefix cache miss, streaming from origin"
        );
        (source.clone(), Some(ticket))
    }

    fn resolve_cached(&self, source: &SourceReference) -> Option<SourceReference> {
        self.cache.lookup(source).map(SourceReference::Local)
    }
}
