// Status projection
// Folds playback, cache and narrative signals into one displayable snapshot

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::cache::CacheStats;
use crate::narrative::{Choice, NarrativeState};
use crate::playback::{PlaybackStatus, PlayerSignal, Progress};

/// Latest value of every input the projection depends on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectorInputs {
    pub playback: PlaybackStatus,
    pub progress: Progress,
    pub cache: CacheStats,
    pub narrative: NarrativeState,
    /// Labels on offer while a decision is pending
    pub pending_choices: Vec<String>,
}

/// Immutable status snapshot for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub status_text: String,
    pub progress_percent: u8,
    pub player_state: PlaybackStatus,
    pub cache_summary: String,
    pub narrative: NarrativeState,
}

/// Compute a snapshot from inputs; pure
pub fn project(inputs: &ProjectorInputs) -> StatusSnapshot {
    StatusSnapshot {
        status_text: status_text(inputs),
        progress_percent: inputs.progress.percent(),
        player_state: inputs.playback.clone(),
        cache_summary: cache_summary(&inputs.cache),
        narrative: inputs.narrative.clone(),
    }
}

fn status_text(inputs: &ProjectorInputs) -> String {
    // A failed player outranks whatever the story is doing
    if let PlaybackStatus::Error(message) = &inputs.playback {
        return format!("Playback error: {}", message);
    }

    match &inputs.narrative {
        NarrativeState::AwaitingDecision(node) if inputs.pending_choices.is_empty() => {
            format!("Decision at '{}'", node)
        }
        NarrativeState::AwaitingDecision(node) => {
            format!("Choose at '{}': {}", node, inputs.pending_choices.join(" / "))
        }
        NarrativeState::PlayingNode(node) => match &inputs.playback {
            PlaybackStatus::Buffering => format!("Buffering '{}'", node),
            PlaybackStatus::Paused => format!("Paused in '{}'", node),
            _ => format!("Playing '{}'", node),
        },
        NarrativeState::Ended => "The end".to_string(),
        NarrativeState::Inactive => match &inputs.playback {
            PlaybackStatus::Idle => "Idle".to_string(),
            PlaybackStatus::Buffering => "Buffering".to_string(),
            PlaybackStatus::Ready => "Ready".to_string(),
            PlaybackStatus::Playing => "Playing".to_string(),
            PlaybackStatus::Paused => "Paused".to_string(),
            PlaybackStatus::Ended => "Finished".to_string(),
            PlaybackStatus::Error(message) => format!("Playback error: {}", message),
        },
    }
}

/// `"{n} file(s), {size}"`
pub fn cache_summary(stats: &CacheStats) -> String {
    let noun = if stats.file_count == 1 { "file" } else { "files" };
    format!(
        "{} {}, {}",
        stats.file_count,
        noun,
        format_bytes(stats.total_size_bytes)
    )
}

/// Human-readable size in binary units, one decimal above bytes
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.1} {}", value, unit)
}

/// Stateful projector publishing snapshots on a watch channel
///
/// Every update recomputes the snapshot synchronously and replaces the
/// published value; subscribers only ever see whole snapshots.
pub struct StatusProjector {
    inputs: Mutex<ProjectorInputs>,
    tx: watch::Sender<Arc<StatusSnapshot>>,
}

impl StatusProjector {
    pub fn new() -> Self {
        let inputs = ProjectorInputs::default();
        let (tx, _) = watch::channel(Arc::new(project(&inputs)));
        Self {
            inputs: Mutex::new(inputs),
            tx,
        }
    }

    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.tx.subscribe()
    }

    pub fn on_player_signal(&self, signal: &PlayerSignal) {
        self.update(|inputs| {
            if let PlayerSignal::Progress(progress) = signal {
                inputs.progress = *progress;
            }
            if let Some(status) = signal.status() {
                if status == PlaybackStatus::Idle {
                    inputs.progress = Progress::default();
                }
                inputs.playback = status;
            }
        });
    }

    pub fn set_cache_stats(&self, stats: CacheStats) {
        self.update(|inputs| inputs.cache = stats);
    }

    pub fn set_narrative(&self, state: NarrativeState, pending: &[Choice]) {
        self.update(|inputs| {
            inputs.narrative = state;
            inputs.pending_choices = pending.iter().map(|c| c.label.clone()).collect();
        });
    }

    fn update<F: FnOnce(&mut ProjectorInputs)>(&self, apply: F) {
        let mut inputs = self.inputs.lock();
        apply(&mut inputs);
        let snapshot = Arc::new(project(&inputs));
        // Publish under the inputs lock so snapshots never go backwards
        self.tx.send_if_modified(|current| {
            if **current == *snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

impl Default for StatusProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatusProjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusProjector")
            .field("snapshot", &*self.snapshot())
            .finish()
    }
}
