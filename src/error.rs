// Error types module

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::narrative::{EngineError, StoryError};
use crate::source::EmptySourceError;

/// Crate-level error aggregating each subsystem's failures
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Story error: {0}")]
    Story(#[from] StoryError),

    #[error("Narrative error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid source: {0}")]
    Source(#[from] EmptySourceError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

pub type Result<T> = std::result::Result<T, Error>;
