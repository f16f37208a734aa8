//! Playback-related type definitions

use serde::{Deserialize, Serialize};

/// Audio player lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// No session has been scheduled yet
    #[default]
    Idle,
    /// A session is decoding/building its voices
    Resolving,
    /// A session's voices are connected to the graph
    Playing,
    /// `destroy()` was called; further input is ignored
    Closed,
}

impl std::fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerStatus::Idle => write!(f, "Idle"),
            PlayerStatus::Resolving => write!(f, "Resolving"),
            PlayerStatus::Playing => write!(f, "Playing"),
            PlayerStatus::Closed => write!(f, "Closed"),
        }
    }
}
