// Constants module - centralized default values for configuration
//
// Every configurable default lives here so the config layer, the cache and
// the tests agree on the same numbers.

// =============================================================================
// Cache defaults
// =============================================================================

/// Number of leading bytes fetched and stored per remote source (2 MiB)
pub const PREVIEW_SIZE: u64 = 2 * 1024 * 1024;

/// Size of the buffer used when streaming a prefix to disk (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Directory name created under the OS temp dir when no cache dir is configured
pub const DEFAULT_CACHE_DIR_NAME: &str = "reelfork-cache";

/// Prefix of every cache file name (`cache_{hash}.tmp`)
pub const CACHE_FILE_PREFIX: &str = "cache_";

/// Extension of every complete cache file
pub const CACHE_FILE_EXTENSION: &str = "tmp";

/// Extension appended while a prefix is still being written
pub const STAGING_FILE_EXTENSION: &str = "part";

/// Capacity of the cache event broadcast channel
pub const CACHE_EVENT_CAPACITY: usize = 64;

// =============================================================================
// Fetch defaults
// =============================================================================

/// Default connect timeout for prefix fetches in seconds
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default read timeout for prefix fetches in seconds
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 15;

// =============================================================================
// Narrative defaults
// =============================================================================

/// Id of the node every story begins at
pub const START_NODE_ID: &str = "start";

/// Choice target that ends the story instead of naming a node
pub const END_SENTINEL: &str = "end";

/// Capacity of the narrative event broadcast channel
pub const NARRATIVE_EVENT_CAPACITY: usize = 64;

// =============================================================================
// Playback defaults
// =============================================================================

/// Capacity of the player signal broadcast channel
pub const PLAYER_SIGNAL_CAPACITY: usize = 256;

/// Interval between progress signals emitted by the simulated player
pub const SIMULATED_PROGRESS_INTERVAL_MS: u64 = 250;

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log level when neither config nor RUST_LOG sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";
