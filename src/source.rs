//! Source references
//!
//! A `SourceReference` is an abstract locator for playable media. Local
//! references are always considered fully cached; remote references are the
//! ones the prefix cache works on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Locator for playable media, either on the local filesystem or remote
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum SourceReference {
    /// Resource on the local filesystem (bundled media or a cache file)
    Local(PathBuf),
    /// Resource reachable over HTTP(S)
    Remote(String),
}

impl SourceReference {
    /// Build a local reference
    pub fn local(path: impl Into<PathBuf>) -> Self {
        SourceReference::Local(path.into())
    }

    /// Build a remote reference
    pub fn remote(url: impl Into<String>) -> Self {
        SourceReference::Remote(url.into())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, SourceReference::Local(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceReference::Remote(_))
    }

    /// Remote URL, if this is a remote reference
    pub fn url(&self) -> Option<&str> {
        match self {
            SourceReference::Remote(url) => Some(url),
            SourceReference::Local(_) => None,
        }
    }
}

impl fmt::Display for SourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceReference::Local(path) => write!(f, "{}", path.display()),
            SourceReference::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Error returned when a string cannot be parsed into a source reference
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("source reference cannot be empty")]
pub struct EmptySourceError;

impl FromStr for SourceReference {
    type Err = EmptySourceError;

    /// `http://` and `https://` parse as remote; `file://` and everything
    /// else parse as a local path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(EmptySourceError);
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(SourceReference::Remote(trimmed.to_string()))
        } else if let Some(path) = trimmed.strip_prefix("file://") {
            Ok(SourceReference::Local(PathBuf::from(path)))
        } else {
            Ok(SourceReference::Local(PathBuf::from(trimmed)))
        }
    }
}
