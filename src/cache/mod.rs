//! Prefix cache module
//!
//! Turns remote media references into locally servable ones by storing the
//! first few megabytes of each resource on disk:
//! - `ContentCache`: hit/miss decisions, background prefix fetches, clear and stats
//! - `InFlightSet`: one fetch per key at a time
//! - `PrefixFetcher`: HTTP range request streamed to a staging file
//!
//! Fetch failures never escape this module as errors; they show up as a
//! missing entry, a counter and a `CacheEvent::FetchFailed`.

pub mod config;
pub mod content_cache;
pub mod error;
pub mod events;
mod fetch;
pub mod in_flight;
pub mod stats;
pub mod utils;

pub use config::{CacheConfig, FetchConfig};
pub use content_cache::{ContentCache, FetchTicket};
pub use error::{CacheError, FetchError};
pub use events::CacheEvent;
pub use in_flight::{InFlightGuard, InFlightSet};
pub use stats::{CacheStats, FetchStats};
