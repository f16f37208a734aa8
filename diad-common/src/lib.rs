//! # DIAD Common Library
//!
//! Shared code for the DIAD ear-training engine including:
//! - Music notation and interval tables
//! - Random interval generation
//! - Data model (levels, root ranges, instruments, sample table)
//! - Event bus and latest-value state cells
//! - Message channel and navigation boundaries
//! - Configuration resolution
//! - Fade curve definitions

pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;
pub mod generator;
pub mod models;
pub mod navigation;
pub mod notation;

pub use error::{Error, Result};
pub use fade_curves::FadeCurve;
pub use generator::IntervalGenerator;
pub use notation::{IntervalId, NotationConverter, PitchNumber};
