//! Quiz session orchestration
//!
//! Turns learner intents (next, repeat, choose, play from root, exit) into
//! interval generation, playback requests and statistics updates, and
//! publishes the resulting [`SessionSnapshot`].

use crate::playback::{PlaybackSink, PlayerInput};
use crate::stats::{StatsTracker, TrackerData};
use diad_common::events::{DiadEvent, EventBus, StateCell};
use diad_common::models::{Interval, PlaybackType, PlayerLevel};
use diad_common::navigation::{Navigator, Route};
use diad_common::{IntervalGenerator, IntervalId};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Note length for harmonic playback (seconds)
pub const SIMULTANEOUS_DURATION: f64 = 2.0;
pub const SIMULTANEOUS_PAUSE: f64 = 0.0;
/// Note length for melodic playback (seconds)
pub const SEQUENTIAL_DURATION: f64 = 1.25;
pub const SEQUENTIAL_PAUSE: f64 = 0.1;

/// Observable state of the quiz
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionSnapshot {
    /// Whether the answer for the current interval is revealed
    pub show_result: bool,
    pub selected_interval_id: IntervalId,
    pub current_interval: Option<Interval>,
    pub level: Option<PlayerLevel>,
}

struct SessionState {
    snapshot: SessionSnapshot,
    stats: StatsTracker,
}

struct StateInner {
    state: RwLock<SessionState>,
    published: StateCell<SessionSnapshot>,
    generator: IntervalGenerator,
    sink: Arc<dyn PlaybackSink>,
    navigator: Arc<dyn Navigator>,
    events: EventBus,
}

/// Quiz orchestrator
///
/// Must be created from within a Tokio runtime.
pub struct PlayerState {
    inner: Arc<StateInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerState {
    /// Start following `levels` and sending playback requests to `sink`.
    pub fn new(
        levels: watch::Receiver<Option<PlayerLevel>>,
        sink: Arc<dyn PlaybackSink>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let inner = Arc::new(StateInner {
            state: RwLock::new(SessionState {
                snapshot: SessionSnapshot::default(),
                stats: StatsTracker::new(),
            }),
            published: StateCell::new(SessionSnapshot::default()),
            generator: IntervalGenerator::new(),
            sink,
            navigator,
            events: EventBus::default(),
        });

        let task = tokio::spawn(run(Arc::clone(&inner), levels));

        Self {
            inner,
            task: Mutex::new(Some(task)),
        }
    }

    /// Generate and play a new interval. Dropped if no level is known yet.
    ///
    /// The interval is current once this returns, so a following
    /// [`make_choice`](Self::make_choice) scores it.
    pub async fn next(&self) {
        self.inner.play_next().await;
    }

    /// Reveal the result and score the answer against the current interval.
    pub async fn make_choice(&self, id: IntervalId) {
        let inner = &self.inner;
        let mut state = inner.state.write().await;
        state.snapshot.show_result = true;
        state.snapshot.selected_interval_id = id;

        if let Some(current_id) = state.snapshot.current_interval.as_ref().map(|i| i.interval_id) {
            let correct = id == current_id;
            state.stats.add_item(current_id, correct);
            info!(interval_id = current_id, chosen_id = id, correct, "choice made");
            inner.events.emit_lossy(DiadEvent::ChoiceMade {
                interval_id: current_id,
                chosen_id: id,
                correct,
                timestamp: chrono::Utc::now(),
            });
        }
        inner.publish(&state);
    }

    /// Play the current interval again in the level's tuning
    pub async fn repeat(&self) {
        let state = self.inner.state.read().await;
        let (Some(interval), Some(level)) =
            (&state.snapshot.current_interval, &state.snapshot.level)
        else {
            debug!("Nothing to repeat");
            return;
        };
        self.inner
            .sink
            .play(player_input(level, interval.freqs(level.is_perfect)));
    }

    /// Play interval `id` from the current root. Never scored.
    pub async fn play_from_root(&self, id: IntervalId) {
        let state = self.inner.state.read().await;
        let (Some(current), Some(level)) =
            (&state.snapshot.current_interval, &state.snapshot.level)
        else {
            debug!("No current root to play from");
            return;
        };

        match self
            .inner
            .generator
            .generate(&[id], &level.root_range, Some(current.root))
        {
            Ok(interval) => self
                .inner
                .sink
                .play(player_input(level, interval.freqs(level.is_perfect))),
            Err(e) => warn!(interval_id = id, "Cannot play from root: {}", e),
        }
    }

    /// Leave the player for the level selection screen
    pub fn exit(&self) {
        self.inner.navigator.navigate(Route::Levels);
    }

    /// Switch to the statistics tab and return the current counters
    pub async fn open_stats(&self) -> TrackerData {
        self.inner.navigator.navigate(Route::Stats);
        self.stats().await
    }

    /// Switch back to the quiz tab
    pub fn open_player(&self) {
        self.inner.navigator.navigate(Route::Player);
    }

    /// Whether a revealed answer matches the current interval
    pub fn is_matching_choice(&self) -> bool {
        let snapshot = self.inner.published.get();
        snapshot.show_result
            && snapshot
                .current_interval
                .as_ref()
                .is_some_and(|i| i.interval_id == snapshot.selected_interval_id)
    }

    /// Note names of `interval`, e.g. `C4–E4`
    pub fn interval_note_names(interval: &Interval) -> String {
        std::iter::once(interval.root_name.as_str())
            .chain(interval.note_names.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("–")
    }

    pub async fn stats(&self) -> TrackerData {
        self.inner.state.read().await.stats.stats_data()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.published.get()
    }

    /// Current snapshot first, then every change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.published.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DiadEvent> {
        self.inner.events.subscribe()
    }

    /// Stop following level changes
    pub fn destroy(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl Drop for PlayerState {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn player_input(level: &PlayerLevel, freqs: Vec<f64>) -> PlayerInput {
    let (duration, pause) = match level.playback_type {
        PlaybackType::Simultaneous => (SIMULTANEOUS_DURATION, SIMULTANEOUS_PAUSE),
        PlaybackType::Sequential => (SEQUENTIAL_DURATION, SEQUENTIAL_PAUSE),
    };
    PlayerInput {
        freqs,
        instrument_type: level.instrument_type,
        playback_type: level.playback_type,
        duration,
        pause,
    }
}

impl StateInner {
    fn publish(&self, state: &SessionState) {
        self.published.set(state.snapshot.clone());
    }

    async fn apply_level(&self, level: Option<PlayerLevel>) {
        let Some(level) = level else {
            return;
        };

        let mut state = self.state.write().await;
        state.stats.reload_level(&level.level);
        let level_id = level.level.id;
        state.snapshot = SessionSnapshot {
            level: Some(level),
            ..SessionSnapshot::default()
        };
        self.publish(&state);

        info!(level_id, "level reloaded");
        self.events.emit_lossy(DiadEvent::LevelReloaded {
            level_id,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn play_next(&self) {
        let mut state = self.state.write().await;
        let Some(level) = state.snapshot.level.clone() else {
            debug!("Dropping next request: no level selected");
            return;
        };

        let interval =
            match self
                .generator
                .generate(&level.level.intervals, &level.root_range, None)
            {
                Ok(interval) => interval,
                Err(e) => {
                    warn!(level_id = level.level.id, "Cannot generate interval: {}", e);
                    return;
                }
            };

        debug!(
            interval_id = interval.interval_id,
            root = interval.root,
            "interval generated"
        );
        self.events.emit_lossy(DiadEvent::IntervalGenerated {
            interval_id: interval.interval_id,
            root: interval.root,
            timestamp: chrono::Utc::now(),
        });

        let freqs = interval.tempered_voicing();
        state.snapshot.current_interval = Some(interval);
        state.snapshot.show_result = false;
        self.publish(&state);

        self.sink.play(player_input(&level, freqs));
    }
}

async fn run(inner: Arc<StateInner>, mut levels: watch::Receiver<Option<PlayerLevel>>) {
    let initial = levels.borrow_and_update().clone();
    inner.apply_level(initial).await;

    while levels.changed().await.is_ok() {
        let level = levels.borrow_and_update().clone();
        inner.apply_level(level).await;
    }
    debug!("Level source closed");
}
