//! Level selection
//!
//! Latest-value cells for every learner preference, combined with the level
//! catalog into the current [`PlayerLevel`]. The catalog arrives over the
//! message channel and is requested when the selector is created.

use crate::error::{Error, Result};
use diad_common::channel::{MessageChannel, Payload, LEVELS_REQUEST, LEVELS_RESPONSE};
use diad_common::events::StateCell;
use diad_common::models::{InstrumentType, Levels, PlaybackType, PlayerLevel, RootRange};
use diad_common::navigation::{Navigator, Route};
use diad_common::notation::MIDDLE_C;
use diad_common::{NotationConverter, PitchNumber};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_LEVEL_ID: u32 = 1;

/// Id of the custom entry in the root-range catalog
pub const CUSTOM_RANGE_ID: &str = "4";

/// Lowest key offered for custom roots (C3)
pub const CUSTOM_ROOT_MIN: PitchNumber = 28;
/// Highest key offered for custom roots (B4)
pub const CUSTOM_ROOT_MAX: PitchNumber = 51;

const TUNING_TET: &str = "TET";
const TUNING_PERFECT: &str = "perfect";

/// Root ranges the learner can choose from
pub fn root_ranges() -> Vec<RootRange> {
    vec![
        span("1", "Octaves 3 & 4", 28, 51),
        span("2", "Octave 3", 28, 39),
        span("3", "Octave 4", 40, 51),
        custom_range(vec![MIDDLE_C]),
    ]
}

fn span(id: &str, name: &str, min: PitchNumber, max: PitchNumber) -> RootRange {
    RootRange::Span {
        id: id.to_string(),
        name: name.to_string(),
        min,
        max,
    }
}

fn custom_range(roots: Vec<PitchNumber>) -> RootRange {
    RootRange::Custom {
        id: CUSTOM_RANGE_ID.to_string(),
        name: "Custom".to_string(),
        roots,
    }
}

/// Keys offered for custom roots with their note names
pub fn all_custom_roots() -> Vec<(PitchNumber, String)> {
    (CUSTOM_ROOT_MIN..=CUSTOM_ROOT_MAX)
        .map(|pitch| (pitch, NotationConverter::note_name(pitch)))
        .collect()
}

pub fn tuning_types() -> &'static [&'static str] {
    &[TUNING_TET, TUNING_PERFECT]
}

pub fn tuning_name(is_perfect: bool) -> &'static str {
    if is_perfect {
        TUNING_PERFECT
    } else {
        TUNING_TET
    }
}

/// Parse a tuning name; `true` means just intonation
pub fn parse_tuning(name: &str) -> Result<bool> {
    match name.to_lowercase().as_str() {
        "tet" | "tempered" => Ok(false),
        "perfect" | "just" => Ok(true),
        other => Err(Error::Common(diad_common::Error::InvalidInput(format!(
            "unknown tuning '{}'",
            other
        )))),
    }
}

pub fn playback_name(playback_type: PlaybackType) -> &'static str {
    playback_type.display_name()
}

struct SelectorInner {
    level_id: StateCell<u32>,
    playback_type: StateCell<PlaybackType>,
    instrument_type: StateCell<InstrumentType>,
    root_range: StateCell<RootRange>,
    custom_roots: StateCell<Vec<PitchNumber>>,
    is_perfect: StateCell<bool>,
    levels: StateCell<Option<Arc<Levels>>>,
    current_level: StateCell<Option<PlayerLevel>>,
    /// Serializes recomputation so the last writer sees the latest inputs
    combine: Mutex<()>,
    navigator: Arc<dyn Navigator>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Learner preferences and the resulting current level
#[derive(Clone)]
pub struct LevelSelector {
    inner: Arc<SelectorInner>,
}

impl LevelSelector {
    /// Create a selector with default preferences and request the level
    /// catalog on `channel`. Must be called from within a Tokio runtime.
    pub fn new(channel: &dyn MessageChannel, navigator: Arc<dyn Navigator>) -> Self {
        let selector = Self::detached(navigator);

        let rx = channel.listen(LEVELS_RESPONSE);
        let listener = tokio::spawn(listen_for_levels(Arc::downgrade(&selector.inner), rx));
        *selector.lock_listener() = Some(listener);
        channel.send(LEVELS_REQUEST, Payload::Empty);

        selector
    }

    /// Selector without a channel; the catalog is provided with
    /// [`set_levels`](Self::set_levels).
    pub fn detached(navigator: Arc<dyn Navigator>) -> Self {
        let default_range = root_ranges()
            .into_iter()
            .next()
            .unwrap_or_else(|| span("1", "Octaves 3 & 4", 28, 51));

        Self {
            inner: Arc::new(SelectorInner {
                level_id: StateCell::new(DEFAULT_LEVEL_ID),
                playback_type: StateCell::new(PlaybackType::Simultaneous),
                instrument_type: StateCell::new(InstrumentType::Mixed),
                root_range: StateCell::new(default_range),
                custom_roots: StateCell::new(vec![MIDDLE_C]),
                is_perfect: StateCell::new(true),
                levels: StateCell::new(None),
                current_level: StateCell::new(None),
                combine: Mutex::new(()),
                navigator,
                listener: Mutex::new(None),
            }),
        }
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.inner
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_levels(&self, levels: Arc<Levels>) {
        self.inner.levels.set(Some(levels));
        self.inner.recompute();
    }

    pub fn levels(&self) -> Option<Arc<Levels>> {
        self.inner.levels.get()
    }

    pub fn select_level(&self, id: u32) {
        self.inner.level_id.set(id);
        self.inner.recompute();
    }

    pub fn select_playback_type(&self, playback_type: PlaybackType) {
        self.inner.playback_type.set(playback_type);
        self.inner.recompute();
    }

    pub fn select_instrument_type(&self, instrument_type: InstrumentType) {
        self.inner.instrument_type.set(instrument_type);
        self.inner.recompute();
    }

    pub fn select_perfect(&self, is_perfect: bool) {
        self.inner.is_perfect.set(is_perfect);
        self.inner.recompute();
    }

    /// Select a root range from [`root_ranges`] by id
    pub fn select_root_range(&self, id: &str) -> Result<()> {
        let range = root_ranges()
            .into_iter()
            .find(|range| range.id() == id)
            .ok_or_else(|| {
                Error::Common(diad_common::Error::NotFound(format!("root range '{}'", id)))
            })?;
        self.inner.root_range.set(range);
        self.inner.recompute();
        Ok(())
    }

    /// Set the custom root keys and switch to the custom range
    pub fn select_custom_roots(&self, roots: Vec<PitchNumber>) {
        self.inner.custom_roots.set(roots.clone());
        self.inner.root_range.set(custom_range(roots));
        self.inner.recompute();
    }

    /// Select `id` and open the player screen
    pub fn start_level(&self, id: u32) {
        self.select_level(id);
        info!(level_id = id, "starting level");
        self.inner.navigator.navigate(Route::Player);
    }

    pub fn level_id(&self) -> u32 {
        self.inner.level_id.get()
    }

    pub fn playback_type(&self) -> PlaybackType {
        self.inner.playback_type.get()
    }

    pub fn instrument_type(&self) -> InstrumentType {
        self.inner.instrument_type.get()
    }

    pub fn root_range(&self) -> RootRange {
        self.inner.root_range.get()
    }

    pub fn custom_roots(&self) -> Vec<PitchNumber> {
        self.inner.custom_roots.get()
    }

    pub fn is_perfect(&self) -> bool {
        self.inner.is_perfect.get()
    }

    pub fn current_level(&self) -> Option<PlayerLevel> {
        self.inner.current_level.get()
    }

    /// Current level first (once the catalog is known), then every change
    pub fn subscribe_current(&self) -> watch::Receiver<Option<PlayerLevel>> {
        self.inner.current_level.subscribe()
    }

    /// Stop listening for catalog updates
    pub fn destroy(&self) {
        if let Some(listener) = self.lock_listener().take() {
            listener.abort();
        }
    }
}

impl SelectorInner {
    fn recompute(&self) {
        let _guard = self
            .combine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(levels) = self.levels.get() else {
            debug!("level catalog not loaded yet");
            return;
        };
        let Some(level) = levels.find_or_first(self.level_id.get()) else {
            warn!("level catalog is empty");
            self.current_level.set_if_changed(None);
            return;
        };

        let root_range = match self.root_range.get() {
            RootRange::Custom { .. } => custom_range(self.custom_roots.get()),
            range => range,
        };

        let player_level = PlayerLevel {
            level: level.clone(),
            instrument_type: self.instrument_type.get(),
            playback_type: self.playback_type.get(),
            root_range,
            is_perfect: self.is_perfect.get(),
        };
        if self.current_level.set_if_changed(Some(player_level)) {
            debug!(level_id = level.id, "current level updated");
        }
    }
}

async fn listen_for_levels(inner: Weak<SelectorInner>, mut rx: broadcast::Receiver<Payload>) {
    loop {
        match rx.recv().await {
            Ok(Payload::Levels(levels)) => {
                let Some(inner) = inner.upgrade() else { break };
                info!(levels = levels.diads.len(), "level catalog received");
                inner.levels.set(Some(levels));
                inner.recompute();
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Level listener lagged by {} messages", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
