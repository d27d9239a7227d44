//! Media session
//!
//! Composition root: builds the content cache, resolver, narrative engine and
//! status projector around one playback engine, and runs the task that feeds
//! player signals, cache events and narrative transitions into them.
//! Nothing here is global; callers own the session and everything hangs off
//! it by `Arc`.

use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::cache::{CacheStats, ContentCache, FetchStats};
use crate::config::Config;
use crate::error::Result;
use crate::narrative::{NarrativeEngine, NarrativeEvent, NarrativeState, Story};
use crate::playback::{PlaybackEngine, PlayerSignal};
use crate::resolver::ContentResolver;
use crate::source::SourceReference;
use crate::status::{StatusProjector, StatusSnapshot};

pub struct MediaSession {
    cache: Arc<ContentCache>,
    resolver: ContentResolver,
    engine: NarrativeEngine,
    player: Arc<dyn PlaybackEngine>,
    projector: Arc<StatusProjector>,
    pump: JoinHandle<()>,
}

impl MediaSession {
    /// Session over `story`, driving `player`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &Config, story: Story, player: Arc<dyn PlaybackEngine>) -> Result<Self> {
        let cache = Arc::new(ContentCache::new(&config.cache, &config.fetch)?);
        let resolver = ContentResolver::new(cache.clone());
        let engine = NarrativeEngine::new(Arc::new(story), resolver.clone(), player.clone())?;

        let projector = Arc::new(StatusProjector::new());
        projector.set_cache_stats(cache.stats());

        let pump = spawn_pump(
            cache.clone(),
            engine.clone(),
            player.subscribe(),
            projector.clone(),
        );

        tracing::info!(
            cache_dir = %cache.dir().display(),
            story_nodes = engine.story().len(),
            "Media session ready"
        );

        Ok(Self {
            cache,
            resolver,
            engine,
            player,
            projector,
            pump,
        })
    }

    /// Session using the story named in `config`, or the built-in one
    pub fn from_config(config: &Config, player: Arc<dyn PlaybackEngine>) -> Result<Self> {
        let story = match &config.narrative.story_file {
            Some(path) => Story::from_file(path)?,
            None => Story::default_story(),
        };
        Self::new(config, story, player)
    }

    /// Best playable reference for `source`; never waits on the network
    pub fn resolve(&self, source: &SourceReference) -> SourceReference {
        self.resolver.resolve(source)
    }

    /// Resolve and wait for the prefix fetch a miss schedules
    pub async fn prefetch(&self, source: &SourceReference) -> SourceReference {
        self.resolver.resolve_and_wait(source).await
    }

    /// Play a single source outside any narrative
    pub fn play(&self, source: &SourceReference) -> SourceReference {
        let resolved = self.resolve(source);
        self.player.set_source(resolved.clone());
        self.player.prepare();
        self.player.play();
        resolved
    }

    pub fn pause(&self) {
        self.player.pause();
    }

    pub fn resume(&self) {
        self.player.play();
    }

    pub fn start_narrative(&self) -> bool {
        self.engine.start()
    }

    pub fn choose_narrative(&self, label: &str) -> bool {
        self.engine.choose(label)
    }

    pub fn cancel_narrative(&self) {
        self.engine.cancel();
    }

    pub fn narrative(&self) -> &NarrativeEngine {
        &self.engine
    }

    pub fn narrative_state(&self) -> NarrativeState {
        self.engine.state()
    }

    pub fn subscribe_narrative(&self) -> broadcast::Receiver<NarrativeEvent> {
        self.engine.subscribe_events()
    }

    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn fetch_stats(&self) -> FetchStats {
        self.cache.fetch_stats()
    }

    /// Remove every cache file; returns how many were removed
    pub fn clear_cache(&self) -> u64 {
        let removed = self.cache.clear_all();
        self.projector.set_cache_stats(self.cache.stats());
        removed
    }

    pub fn status(&self) -> Arc<StatusSnapshot> {
        self.projector.snapshot()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.projector.subscribe()
    }
}

impl Drop for MediaSession {
    fn drop(&mut self) {
        self.engine.cancel();
        self.pump.abort();
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("cache", &self.cache)
            .field("narrative", &self.engine)
            .finish()
    }
}

fn spawn_pump(
    cache: Arc<ContentCache>,
    engine: NarrativeEngine,
    mut signals: broadcast::Receiver<PlayerSignal>,
    projector: Arc<StatusProjector>,
) -> JoinHandle<()> {
    let mut cache_events = cache.subscribe();
    let mut narrative = engine.subscribe_state();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Ok(signal) => {
                        engine.on_player_signal(&signal);
                        projector.on_player_signal(&signal);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped = skipped, "Status pump lagged behind player signals");
                        engine.resync();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                event = cache_events.recv() => match event {
                    Ok(event) if event.changes_disk_usage() => {
                        projector.set_cache_stats(cache.stats());
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        projector.set_cache_stats(cache.stats());
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = narrative.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = narrative.borrow_and_update().clone();
                    projector.set_narrative(state, &engine.pending_choices());
                }
            }
        }
    })
}
