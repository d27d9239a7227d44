//! Cache configuration types
//!
//! This module defines configuration structures for the prefix cache:
//! - Cache directory and prefix sizing
//! - Origin fetch timeouts

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CACHE_DIR_NAME, DEFAULT_CHUNK_SIZE, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_READ_TIMEOUT_SECS, PREVIEW_SIZE,
};

/// Prefix cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory; the OS temp dir is used when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_preview_size_bytes")]
    pub preview_size_bytes: u64,
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            preview_size_bytes: default_preview_size_bytes(),
            chunk_size_bytes: default_chunk_size_bytes(),
        }
    }
}

fn default_preview_size_bytes() -> u64 {
    PREVIEW_SIZE
}

fn default_chunk_size_bytes() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl CacheConfig {
    /// Config rooted at an explicit directory, everything else defaulted
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Default::default()
        }
    }

    /// Resolved cache directory
    pub fn cache_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_CACHE_DIR_NAME))
    }

    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(dir) = &self.dir {
            if dir.as_os_str().is_empty() {
                return Err("cache dir cannot be empty when set".to_string());
            }
        }
        if self.preview_size_bytes == 0 {
            return Err("preview_size_bytes must be greater than 0".to_string());
        }
        if self.chunk_size_bytes == 0 {
            return Err("chunk_size_bytes must be greater than 0".to_string());
        }
        if self.chunk_size_bytes as u64 > self.preview_size_bytes {
            return Err(format!(
                "chunk_size_bytes ({}) cannot be greater than preview_size_bytes ({})",
                self.chunk_size_bytes, self.preview_size_bytes
            ));
        }
        Ok(())
    }
}

/// Origin fetch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Validate fetch configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be greater than 0".to_string());
        }
        if self.read_timeout_secs == 0 {
            return Err("read_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
