//! Event types for the DIAD event system
//!
//! Two kinds of streams are used across the engine and they are kept apart:
//!
//! - [`EventBus`]: pure events (`tokio::broadcast`). Subscribers only see
//!   events emitted after they subscribed.
//! - [`StateCell`]: latest-value cells (`tokio::watch`). New subscribers
//!   observe the current value immediately.

mod playback_types;

pub use playback_types::PlayerStatus;

use crate::notation::IntervalId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// DIAD event types
///
/// Emitted by the audio player and the session orchestrator. Events are
/// informational: no component depends on another one receiving them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiadEvent {
    /// Active level changed and statistics were reset
    LevelReloaded {
        level_id: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new quiz interval was generated
    IntervalGenerated {
        interval_id: IntervalId,
        root: i32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Learner answered the current interval
    ChoiceMade {
        /// Interval that was played
        interval_id: IntervalId,
        /// Interval the learner picked
        chosen_id: IntervalId,
        correct: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback session voices were connected to the graph
    SessionScheduled {
        session_id: u64,
        voice_count: usize,
        /// Context time (seconds) of the first scheduled note
        start_time: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Voices of a session were stopped and disconnected
    SessionReleased {
        session_id: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session finished building after a newer request and was dropped
    SessionDiscarded {
        session_id: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session build failed; nothing was played for it
    SessionFailed {
        session_id: u64,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DiadEvent {
    /// Session id for playback events
    pub fn session_id(&self) -> Option<u64> {
        match self {
            DiadEvent::SessionScheduled { session_id, .. }
            | DiadEvent::SessionReleased { session_id, .. }
            | DiadEvent::SessionDiscarded { session_id, .. }
            | DiadEvent::SessionFailed { session_id, .. } => Some(*session_id),
            _ => None,
        }
    }
}

/// Central event distribution bus
///
/// Uses `tokio::broadcast`: non-blocking publish, multiple subscribers,
/// lagged subscribers lose the oldest events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DiadEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DiadEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: DiadEvent) -> Result<usize, broadcast::error::SendError<DiadEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DiadEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Observable latest-value cell
///
/// Holds the current value and replays it to every new subscriber. Cloning
/// the cell shares the same underlying value.
pub struct StateCell<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Modify the value in place and notify subscribers
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) {
        self.tx.send_modify(f);
    }

    /// Clone of the current value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Receiver positioned on the current value.
    ///
    /// Wrap in `tokio_stream::wrappers::WatchStream` to receive the current
    /// value first and then every change.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + PartialEq> StateCell<T> {
    /// Replace the value only if it differs; returns whether subscribers
    /// were notified
    pub fn set_if_changed(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }
}

impl<T: Clone + Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
