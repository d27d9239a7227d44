//! In-process playback engine
//!
//! `SimulatedPlayer` follows the same state machine a real media engine
//! reports (idle → buffering → ready → playing ⇄ paused → ended) without
//! decoding anything. Position advances on the tokio clock, so tests can
//! drive it deterministically with `tokio::time::pause`.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{PlaybackEngine, PlaybackStatus, PlayerSignal, Progress};
use crate::constants::{PLAYER_SIGNAL_CAPACITY, SIMULATED_PROGRESS_INTERVAL_MS};
use crate::source::SourceReference;

/// Headless player with a virtual clock
#[derive(Clone)]
pub struct SimulatedPlayer {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<PlayerState>,
    signals: broadcast::Sender<PlayerSignal>,
    default_duration: Duration,
    tick: Duration,
    durations: Mutex<HashMap<SourceReference, Duration>>,
    failures: Mutex<HashMap<SourceReference, String>>,
}

#[derive(Default)]
struct PlayerState {
    source: Option<SourceReference>,
    status: PlaybackStatus,
    position_ms: u64,
    duration_ms: u64,
    /// Bumped whenever the ticker must stop; stale ticks compare against it
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

impl PlayerState {
    fn stop_ticker(&mut self) {
        self.generation += 1;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl SimulatedPlayer {
    /// Player where every source lasts `default_duration`
    pub fn new(default_duration: Duration) -> Self {
        Self::with_tick(
            default_duration,
            Duration::from_millis(SIMULATED_PROGRESS_INTERVAL_MS),
        )
    }

    /// Player with a custom progress interval
    pub fn with_tick(default_duration: Duration, tick: Duration) -> Self {
        let (signals, _) = broadcast::channel(PLAYER_SIGNAL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(PlayerState::default()),
                signals,
                default_duration,
                tick,
                durations: Mutex::new(HashMap::new()),
                failures: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Give one source its own duration
    pub fn set_duration(&self, source: SourceReference, duration: Duration) {
        self.inner.durations.lock().insert(source, duration);
    }

    /// Make `prepare` fail for a source with `message`
    pub fn fail_on(&self, source: SourceReference, message: impl Into<String>) {
        self.inner.failures.lock().insert(source, message.into());
    }

    /// Fail the current playback immediately
    pub fn inject_error(&self, message: impl Into<String>) {
        let message = message.into();
        let mut state = self.inner.state.lock();
        state.stop_ticker();
        state.status = PlaybackStatus::Error(message.clone());
        self.inner.emit(PlayerSignal::Error(message));
    }

    /// Source most recently handed to `set_source`
    pub fn current_source(&self) -> Option<SourceReference> {
        self.inner.state.lock().source.clone()
    }

    pub fn position(&self) -> Duration {
        Duration::from_millis(self.inner.state.lock().position_ms)
    }

    fn start_ticker(&self, state: &mut PlayerState) {
        state.stop_ticker();
        let generation = state.generation;

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("Simulated player has no runtime, position will not advance");
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let tick = self.inner.tick;
        state.ticker = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if !inner.advance(generation) {
                    break;
                }
            }
        }));
    }
}

impl Inner {
    fn emit(&self, signal: PlayerSignal) {
        // No subscribers is fine
        let _ = self.signals.send(signal);
    }

    fn set_status(&self, state: &mut PlayerState, status: PlaybackStatus) {
        if state.status != status {
            state.status = status.clone();
            self.emit(PlayerSignal::StateChanged(status));
        }
    }

    /// Advance one tick; returns whether the ticker should keep running
    fn advance(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation || !state.status.is_playing() {
            return false;
        }

        let step = self.tick.as_millis() as u64;
        state.position_ms = (state.position_ms + step).min(state.duration_ms);
        self.emit(PlayerSignal::Progress(Progress {
            position_ms: state.position_ms,
            duration_ms: Some(state.duration_ms),
        }));

        if state.position_ms >= state.duration_ms {
            state.ticker = None;
            self.set_status(&mut state, PlaybackStatus::Ended);
            return false;
        }
        true
    }
}

impl PlaybackEngine for SimulatedPlayer {
    fn set_source(&self, source: SourceReference) {
        let mut state = self.inner.state.lock();
        state.stop_ticker();
        state.source = Some(source);
        state.position_ms = 0;
        state.duration_ms = 0;
        // Re-announce Idle even if we were idle: a new source was loaded
        state.status = PlaybackStatus::Idle;
        self.inner
            .emit(PlayerSignal::StateChanged(PlaybackStatus::Idle));
    }

    fn prepare(&self) {
        let mut state = self.inner.state.lock();
        let Some(source) = state.source.clone() else {
            tracing::debug!("prepare() without a source");
            return;
        };

        if let Some(message) = self.inner.failures.lock().get(&source).cloned() {
            state.status = PlaybackStatus::Error(message.clone());
            self.inner.emit(PlayerSignal::Error(message));
            return;
        }

        let duration = self
            .inner
            .durations
            .lock()
            .get(&source)
            .copied()
            .unwrap_or(self.inner.default_duration);

        self.inner.set_status(&mut state, PlaybackStatus::Buffering);
        state.position_ms = 0;
        state.duration_ms = duration.as_millis() as u64;
        self.inner.emit(PlayerSignal::Progress(Progress {
            position_ms: 0,
            duration_ms: Some(state.duration_ms),
        }));
        self.inner.set_status(&mut state, PlaybackStatus::Ready);
    }

    fn play(&self) {
        let mut state = self.inner.state.lock();
        match state.status {
            PlaybackStatus::Ready | PlaybackStatus::Paused => {
                self.inner.set_status(&mut state, PlaybackStatus::Playing);
                self.start_ticker(&mut state);
            }
            _ => tracing::debug!(status = %state.status, "play() ignored"),
        }
    }

    fn pause(&self) {
        let mut state = self.inner.state.lock();
        match state.status {
            PlaybackStatus::Playing | PlaybackStatus::Ready | PlaybackStatus::Buffering => {
                state.stop_ticker();
                self.inner.set_status(&mut state, PlaybackStatus::Paused);
            }
            _ => tracing::debug!(status = %state.status, "pause() ignored"),
        }
    }

    fn status(&self) -> PlaybackStatus {
        self.inner.state.lock().status.clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerSignal> {
        self.inner.signals.subscribe()
    }
}

impl std::fmt::Debug for SimulatedPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SimulatedPlayer")
            .field("source", &state.source)
            .field("status", &state.status)
            .field("position_ms", &state.position_ms)
            .finish()
    }
}
