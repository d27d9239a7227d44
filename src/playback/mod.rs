//! Playback engine collaborator
//!
//! The core never decodes media. It drives an external engine through the
//! `PlaybackEngine` trait and observes it through `PlayerSignal`s delivered on
//! a broadcast channel. Because signals are asynchronous, implementations
//! never call back into the core while a command is executing.

pub mod simulated;

pub use simulated::SimulatedPlayer;

use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;

use crate::source::SourceReference;

/// State reported by the playback engine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Buffering,
    Ready,
    Playing,
    Paused,
    Ended,
    Error(String),
}

impl PlaybackStatus {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackStatus::Playing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Buffering => "buffering",
            PlaybackStatus::Ready => "ready",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
            PlaybackStatus::Ended => "ended",
            PlaybackStatus::Error(_) => "error",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Error(message) => write!(f, "error: {}", message),
            other => f.write_str(other.label()),
        }
    }
}

/// Playback position report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub position_ms: u64,
    /// Unknown until the engine has probed the media
    pub duration_ms: Option<u64>,
}

impl Progress {
    /// Position as a percentage of duration, clamped to `[0, 100]`
    pub fn percent(&self) -> u8 {
        match self.duration_ms {
            Some(duration) if duration > 0 => {
                let pct = self.position_ms.saturating_mul(100) / duration;
                pct.min(100) as u8
            }
            _ => 0,
        }
    }
}

/// Signal emitted by a playback engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerSignal {
    StateChanged(PlaybackStatus),
    Progress(Progress),
    Error(String),
}

impl PlayerSignal {
    /// Status this signal implies, if any
    pub fn status(&self) -> Option<PlaybackStatus> {
        match self {
            PlayerSignal::StateChanged(status) => Some(status.clone()),
            PlayerSignal::Error(message) => Some(PlaybackStatus::Error(message.clone())),
            PlayerSignal::Progress(_) => None,
        }
    }
}

/// Contract the core expects from a media playback engine
pub trait PlaybackEngine: Send + Sync {
    /// Replace the current media; playback stops
    fn set_source(&self, source: SourceReference);

    /// Start loading the current media
    fn prepare(&self);

    fn play(&self);

    fn pause(&self);

    /// Current state, as the engine sees it right now
    fn status(&self) -> PlaybackStatus;

    fn subscribe(&self) -> broadcast::Receiver<PlayerSignal>;
}
