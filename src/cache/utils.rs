//! Utility functions for cache file naming

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::constants::{CACHE_FILE_EXTENSION, CACHE_FILE_PREFIX, STAGING_FILE_EXTENSION};

/// Convert a source URL to a SHA256 hash for use as a filename
pub fn key_for(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Path of the complete cache file for a key: `{dir}/cache_{key}.tmp`
pub fn cache_file_path(cache_dir: &Path, key: &str) -> PathBuf {
    cache_dir.join(format!(
        "{}{}.{}",
        CACHE_FILE_PREFIX, key, CACHE_FILE_EXTENSION
    ))
}

/// Path a fetch writes to before the entry becomes visible
pub fn staging_path(cache_file: &Path) -> PathBuf {
    let mut name = cache_file.as_os_str().to_os_string();
    name.push(".");
    name.push(STAGING_FILE_EXTENSION);
    PathBuf::from(name)
}
