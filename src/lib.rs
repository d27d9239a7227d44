// Reelfork: prefix media cache and branching narrative playback

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod narrative;
pub mod playback;
pub mod resolver;
pub mod session;
pub mod source;
pub mod status;

pub use error::{Error, Result};
pub use session::MediaSession;
pub use source::SourceReference;
