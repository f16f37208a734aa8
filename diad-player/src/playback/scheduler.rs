//! Note start/stop scheduling
//!
//! Simultaneous notes start together with a small random offset each;
//! sequential notes are spaced `duration + pause` apart.

use diad_common::models::PlaybackType;
use rand::Rng;

/// Smallest start offset of a simultaneous note (seconds)
pub const JITTER_MIN: f64 = 0.006;

/// Largest start offset of a simultaneous note (seconds)
pub const JITTER_MAX: f64 = 0.010;

/// Start and stop of one note on the context clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTiming {
    pub start: f64,
    pub stop: f64,
}

/// Timings for `count` notes scheduled from context time `now`.
pub fn schedule<R: Rng + ?Sized>(
    rng: &mut R,
    playback_type: PlaybackType,
    now: f64,
    count: usize,
    duration: f64,
    pause: f64,
) -> Vec<NoteTiming> {
    let duration = duration.max(0.0);
    (0..count)
        .map(|k| {
            let start = match playback_type {
                PlaybackType::Simultaneous => now + rng.gen_range(JITTER_MIN..=JITTER_MAX),
                PlaybackType::Sequential => now + k as f64 * (duration + pause),
            };
            NoteTiming {
                start,
                stop: start + duration,
            }
        })
        .collect()
}
