//! Cache error types
//!
//! `FetchError` covers everything that can go wrong while pulling a prefix
//! from the origin. Those failures never leave the cache: they are logged,
//! counted and turned into "no cache available". `CacheError` covers setup
//! problems that prevent a `ContentCache` from being built at all.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single background prefix fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or protocol failure reported by the HTTP client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Origin answered with something other than 206 Partial Content
    #[error("expected 206 Partial Content, got HTTP {0}")]
    UnexpectedStatus(u16),

    /// Waiting on the origin exceeded a configured timeout
    #[error("timed out after {after:?} waiting for {stage}")]
    Timeout {
        after: Duration,
        stage: &'static str,
    },

    /// Writing the cache file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Origin returned 206 with no body bytes
    #[error("origin returned an empty body")]
    EmptyBody,
}

impl FetchError {
    /// Short machine-friendly label used in logs and cache events
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Http(_) => "http",
            FetchError::UnexpectedStatus(_) => "status",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Io(_) => "io",
            FetchError::EmptyBody => "empty_body",
        }
    }
}

/// Failure to construct a content cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache directory could not be created
    #[error("failed to prepare cache directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Background fetches need a tokio runtime to be spawned on
    #[error("no tokio runtime available to run background fetches")]
    NoRuntime,

    /// The HTTP client could not be built (TLS backend, resolver, ...)
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Cache or fetch configuration failed validation
    #[error("invalid cache configuration: {0}")]
    Config(String),
}
