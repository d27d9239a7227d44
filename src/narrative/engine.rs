//! Narrative state machine
//!
//! Drives a `Story` on top of a playback engine:
//!
//! ```text
//!   Inactive ──start──▶ PlayingNode(start) ──countdown──▶ AwaitingDecision(start)
//!                           │      ▲                               │
//!                     ended │      └──────────── choose ───────────┘
//!                           ▼
//!                         Ended
//! ```
//!
//! The session is owned here and mutated only by the handlers below, each
//! under one lock. Callers send intents (`start`, `choose`, `cancel`) and
//! forward player signals; everything observable goes out through a `watch`
//! of `NarrativeState` and a broadcast of `NarrativeEvent`.
//!
//! Countdown relevance is decided when it fires, not when it is armed: the
//! handler re-reads the session and the player's live status, and ignores
//! firings whose generation no longer matches the armed countdown. Player
//! pauses cancel the countdown as they are reported; a reported resume
//! arms a fresh one.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::countdown::Countdown;
use super::story::{Choice, NarrativeNode, Story};
use crate::constants::NARRATIVE_EVENT_CAPACITY;
use crate::playback::{PlaybackEngine, PlaybackStatus, PlayerSignal};
use crate::resolver::ContentResolver;
use crate::source::SourceReference;

/// Where the narrative currently is
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "node", rename_all = "snake_case")]
pub enum NarrativeState {
    #[default]
    Inactive,
    PlayingNode(String),
    AwaitingDecision(String),
    Ended,
}

impl NarrativeState {
    /// Playing or waiting on a decision
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            NarrativeState::PlayingNode(_) | NarrativeState::AwaitingDecision(_)
        )
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            NarrativeState::PlayingNode(id) | NarrativeState::AwaitingDecision(id) => Some(id),
            NarrativeState::Inactive | NarrativeState::Ended => None,
        }
    }
}

/// Notable narrative transitions, for the UI layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NarrativeEvent {
    NodeEntered {
        node: String,
        source: SourceReference,
    },
    /// The caller must pick one of `choices`
    DecisionRequested {
        node: String,
        choices: Vec<Choice>,
    },
    /// The countdown fired while playback was not running
    DecisionSuppressed {
        node: String,
        status: PlaybackStatus,
    },
    Ended {
        node: String,
    },
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no tokio runtime available to run decision countdowns")]
    NoRuntime,
}

/// Handle to a narrative engine; clones share one session
#[derive(Clone)]
pub struct NarrativeEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    story: Arc<Story>,
    resolver: ContentResolver,
    player: Arc<dyn PlaybackEngine>,
    session: Mutex<Session>,
    state_tx: watch::Sender<NarrativeState>,
    events: broadcast::Sender<NarrativeEvent>,
    runtime: Handle,
}

#[derive(Debug, Default)]
struct Session {
    id: Option<Uuid>,
    state: NarrativeState,
    countdown: Option<Countdown>,
    /// The current node's window already fired (or was pre-empted)
    window_consumed: bool,
    next_generation: u64,
}

impl Session {
    /// Cancel the live countdown; returns whether one was live
    fn cancel_countdown(&mut self) -> bool {
        match self.countdown.take() {
            Some(countdown) => {
                countdown.cancel();
                true
            }
            None => false,
        }
    }

    fn playing_node(&self) -> Option<String> {
        match &self.state {
            NarrativeState::PlayingNode(id) => Some(id.clone()),
            _ => None,
        }
    }
}

impl NarrativeEngine {
    /// Engine over `story`, resolving media through `resolver` and driving `player`
    ///
    /// Must be called from within a tokio runtime; countdowns run on it.
    pub fn new(
        story: Arc<Story>,
        resolver: ContentResolver,
        player: Arc<dyn PlaybackEngine>,
    ) -> Result<Self, EngineError> {
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let (state_tx, _) = watch::channel(NarrativeState::Inactive);
        let (events, _) = broadcast::channel(NARRATIVE_EVENT_CAPACITY);

        Ok(Self {
            inner: Arc::new(EngineInner {
                story,
                resolver,
                player,
                session: Mutex::new(Session::default()),
                state_tx,
                events,
                runtime,
            }),
        })
    }

    pub fn story(&self) -> &Story {
        &self.inner.story
    }

    pub fn state(&self) -> NarrativeState {
        self.inner.session.lock().state.clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<NarrativeState> {
        self.inner.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<NarrativeEvent> {
        self.inner.events.subscribe()
    }

    /// Choices the caller must pick from, empty unless awaiting a decision
    pub fn pending_choices(&self) -> Vec<Choice> {
        let session = self.inner.session.lock();
        match &session.state {
            NarrativeState::AwaitingDecision(id) => self
                .inner
                .story
                .node(id)
                .map(|node| node.choices.clone())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Time until the live countdown fires, if one is armed
    pub fn countdown_remaining(&self) -> Option<Duration> {
        self.inner
            .session
            .lock()
            .countdown
            .as_ref()
            .map(Countdown::remaining)
    }

    /// Begin the story at its start node
    ///
    /// Ignored while a narrative is already running. Returns whether the
    /// intent was applied.
    pub fn start(&self) -> bool {
        let mut session = self.inner.session.lock();
        if session.state.is_active() {
            tracing::debug!(state = ?session.state, "start() ignored, narrative already running");
            return false;
        }

        session.id = Some(Uuid::new_v4());
        tracing::info!(session_id = ?session.id, "Narrative started");
        let start = self.inner.story.start();
        self.enter_node(&mut session, start);
        true
    }

    /// Pick the branch labelled `label` at a pending decision
    ///
    /// Ignored unless a decision is pending and `label` is one of its
    /// choices. Returns whether the intent was applied.
    pub fn choose(&self, label: &str) -> bool {
        let mut session = self.inner.session.lock();
        let NarrativeState::AwaitingDecision(id) = session.state.clone() else {
            tracing::debug!(label = %label, state = ?session.state, "choose() ignored, no decision pending");
            return false;
        };

        let Some(choice) = self
            .inner
            .story
            .node(&id)
            .and_then(|node| node.choice(label))
            .cloned()
        else {
            tracing::debug!(label = %label, node = %id, "choose() ignored, unknown label");
            return false;
        };

        session.cancel_countdown();
        tracing::info!(
            session_id = ?session.id,
            node = %id,
            label = %label,
            target = %choice.target,
            "Narrative choice made"
        );

        if choice.ends_story() {
            self.finish(&mut session, &id);
            return true;
        }

        let Some(target) = self.inner.story.node(&choice.target) else {
            // Story validation rules this out
            tracing::warn!(target = %choice.target, "Choice target missing from story");
            return false;
        };
        self.enter_node(&mut session, target);
        true
    }

    /// Leave the narrative from any state; idempotent
    pub fn cancel(&self) {
        let mut session = self.inner.session.lock();
        session.cancel_countdown();
        session.window_consumed = false;

        if session.state == NarrativeState::Inactive {
            return;
        }

        tracing::info!(
            session_id = ?session.id,
            node = ?session.state.node_id(),
            state = ?session.state,
            "Narrative cancelled"
        );
        session.id = None;
        self.set_state(&mut session, NarrativeState::Inactive);
        self.emit(NarrativeEvent::Cancelled);
    }

    /// React to a playback engine signal
    ///
    /// Transitions are handled as reported, so a pause and resume that land
    /// back to back still restart the decision window. A reported `Playing`
    /// or `Ended` only counts while the player's live status agrees; late
    /// signals from a previous node cannot move the current one.
    pub fn on_player_signal(&self, signal: &PlayerSignal) {
        let PlayerSignal::StateChanged(reported) = signal else {
            return;
        };
        self.apply_status(reported);
    }

    /// Re-apply the player's live status, for callers that missed signals
    pub fn resync(&self) {
        let live = self.inner.player.status();
        self.apply_status(&live);
    }

    fn apply_status(&self, reported: &PlaybackStatus) {
        let mut session = self.inner.session.lock();
        let Some(id) = session.playing_node() else {
            // AwaitingDecision takes precedence over anything the player says
            return;
        };
        let Some(node) = self.inner.story.node(&id) else {
            return;
        };

        match reported {
            PlaybackStatus::Paused => {
                if session.cancel_countdown() {
                    tracing::debug!(node = %id, "Playback paused, decision countdown cancelled");
                }
            }
            PlaybackStatus::Playing if self.inner.player.status().is_playing() => {
                if session.countdown.is_none() && !session.window_consumed {
                    if node.has_decision() {
                        tracing::debug!(node = %id, "Playback resumed, restarting decision countdown");
                    }
                    self.arm_countdown(&mut session, node);
                }
            }
            PlaybackStatus::Ended if self.inner.player.status() == PlaybackStatus::Ended => {
                session.cancel_countdown();
                if node.has_choices() {
                    // Media ran out before the window did
                    session.window_consumed = true;
                    self.request_decision(&mut session, node);
                } else {
                    self.finish(&mut session, &id);
                }
            }
            _ => {}
        }
    }

    /// Forward this engine's player signals into `on_player_signal`
    ///
    /// The task ends when the player's signal channel closes or the engine
    /// is dropped.
    pub fn attach(&self) -> JoinHandle<()> {
        let mut signals = self.inner.player.subscribe();
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);

        self.inner.runtime.spawn(async move {
            loop {
                let signal = match signals.recv().await {
                    Ok(signal) => Some(signal),
                    Err(broadcast::error::RecvError::Lagged(_)) => None,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let engine = NarrativeEngine { inner };
                match signal {
                    Some(signal) => engine.on_player_signal(&signal),
                    None => engine.resync(),
                }
            }
        })
    }

    fn on_countdown_fired(&self, generation: u64) {
        let mut session = self.inner.session.lock();
        match &session.countdown {
            Some(countdown) if countdown.generation() == generation => {}
            _ => {
                tracing::trace!(generation = generation, "Stale countdown firing ignored");
                return;
            }
        }
        session.countdown = None;

        let Some(id) = session.playing_node() else {
            return;
        };
        let Some(node) = self.inner.story.node(&id) else {
            return;
        };
        session.window_consumed = true;

        if !node.has_choices() {
            return;
        }

        let status = self.inner.player.status();
        if !status.is_playing() {
            tracing::info!(node = %id, status = %status, "Decision suppressed, playback not running");
            self.emit(NarrativeEvent::DecisionSuppressed { node: id, status });
            return;
        }

        self.inner.player.pause();
        self.request_decision(&mut session, node);
    }

    fn enter_node(&self, session: &mut Session, node: &NarrativeNode) {
        session.cancel_countdown();
        session.window_consumed = false;

        let source = self.inner.resolver.resolve(&node.media);
        let cached = source != node.media;
        tracing::info!(
            session_id = ?session.id,
            node = %node.id,
            source = %source,
            cached = cached,
            "Entering narrative node"
        );

        self.inner.player.set_source(source.clone());
        self.inner.player.prepare();
        self.inner.player.play();

        self.arm_countdown(session, node);
        self.set_state(session, NarrativeState::PlayingNode(node.id.clone()));
        self.emit(NarrativeEvent::NodeEntered {
            node: node.id.clone(),
            source,
        });
    }

    /// Arm a full-length countdown for `node`; replaces any live one
    fn arm_countdown(&self, session: &mut Session, node: &NarrativeNode) {
        let Some(window) = node.decision_window() else {
            return;
        };

        session.cancel_countdown();
        session.next_generation += 1;
        let generation = session.next_generation;

        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        session.countdown = Some(Countdown::arm(
            &self.inner.runtime,
            generation,
            window,
            move |generation| {
                if let Some(inner) = weak.upgrade() {
                    NarrativeEngine { inner }.on_countdown_fired(generation);
                }
            },
        ));
    }

    fn request_decision(&self, session: &mut Session, node: &NarrativeNode) {
        tracing::info!(
            session_id = ?session.id,
            node = %node.id,
            choices = node.choices.len(),
            "Narrative decision requested"
        );
        self.set_state(session, NarrativeState::AwaitingDecision(node.id.clone()));
        self.emit(NarrativeEvent::DecisionRequested {
            node: node.id.clone(),
            choices: node.choices.clone(),
        });
    }

    fn finish(&self, session: &mut Session, node_id: &str) {
        session.cancel_countdown();
        tracing::info!(session_id = ?session.id, node = %node_id, "Narrative ended");
        self.set_state(session, NarrativeState::Ended);
        self.emit(NarrativeEvent::Ended {
            node: node_id.to_string(),
        });
    }

    fn set_state(&self, session: &mut Session, state: NarrativeState) {
        session.state = state.clone();
        self.inner.state_tx.send_replace(state);
    }

    fn emit(&self, event: NarrativeEvent) {
        let _ = self.inner.events.send(event);
    }
}

impl std::fmt::Debug for NarrativeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.session.lock();
        f.debug_struct("NarrativeEngine")
            .field("state", &session.state)
            .field("countdown_armed", &session.countdown.is_some())
            .finish()
    }
}
