//! Nearest-sample lookup for sampled instruments
//!
//! A target frequency is played by pitch-shifting the recording with the
//! closest fundamental.

use crate::error::{Error, Result};
use diad_common::models::{SampleData, SampleTable, SampledInstrument};

/// Sample with the smallest absolute frequency distance to `freq`.
///
/// Ties resolve to the first sample in table order.
pub fn closest_sample(samples: &[SampleData], freq: f64) -> Option<&SampleData> {
    let mut closest: Option<(&SampleData, f64)> = None;
    for sample in samples {
        let dist = (freq - sample.freq).abs();
        match closest {
            Some((_, best)) if dist >= best => {}
            _ => closest = Some((sample, dist)),
        }
    }
    closest.map(|(sample, _)| sample)
}

/// Playback rate that shifts `sample_freq` to `target_freq`
pub fn play_rate(target_freq: f64, sample_freq: f64) -> f64 {
    target_freq / sample_freq
}

/// Closest sample of `instrument` for `freq` and its playback rate.
pub fn resolve<'a>(
    table: &'a SampleTable,
    instrument: SampledInstrument,
    freq: f64,
) -> Result<(&'a SampleData, f64)> {
    let samples = table
        .get(&instrument)
        .map(|entry| entry.samples.as_slice())
        .unwrap_or_default();
    let sample = closest_sample(samples, freq).ok_or(Error::SampleNotFound(instrument))?;
    Ok((sample, play_rate(freq, sample.freq)))
}
