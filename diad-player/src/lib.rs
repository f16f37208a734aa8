//! # DIAD Player Library (diad-player)
//!
//! Interval ear-training engine: quiz orchestration, statistics and the
//! audio player rendering sampled and synthesized voices.
//!
//! **Architecture:** symphonia decode + rubato resample into a decode cache,
//! voices mixed by a software render graph pulled by a cpal output stream.

pub mod audio;
pub mod config;
pub mod error;
pub mod loader;
pub mod playback;
pub mod player_state;
pub mod selector;
pub mod stats;

pub use error::{Error, Result};
pub use loader::DataLoader;
pub use playback::{AudioContext, AudioPlayer, PlaybackSink, PlayerInput};
pub use player_state::{PlayerState, SessionSnapshot};
pub use selector::LevelSelector;
pub use stats::{StatsTracker, TrackerData};
