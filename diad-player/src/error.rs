//! Error types for diad-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use diad_common::models::SampledInstrument;
use thiserror::Error;

/// Main error type for diad-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Notation, generator or model errors from diad-common
    #[error(transparent)]
    Common(#[from] diad_common::Error),

    /// Sample bytes could not be decoded or resampled
    #[error("Playback decode error: {0}")]
    Decode(String),

    /// The instrument has no samples in the table
    #[error("No samples for instrument: {0:?}")]
    SampleNotFound(SampledInstrument),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Operation on a destroyed player
    #[error("Player closed")]
    Closed,

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON payload errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type using diad-player Error
pub type Result<T> = std::result::Result<T, Error>;
