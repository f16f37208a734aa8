//! Loudness compensation for synthesized tones
//!
//! Sine voices are scaled by the inverse of the A-weighting curve so low and
//! high pitches sound about as loud as mid-range ones. Sampled instruments
//! are recorded at a balanced level and play at unity gain.

use diad_common::models::Instrument;

/// Gain of a synthesized tone at 1 kHz (A-weighting ≈ 0 dB)
pub const BASE_GAIN: f32 = 0.2;

/// Ceiling for any compensated gain
pub const MAX_GAIN: f32 = 0.5;

/// Gain of sampled voices
pub const SAMPLED_GAIN: f32 = 1.0;

/// A-weighting in dB (IEC 61672), normalized to ≈0 dB at 1 kHz
pub fn a_weighting_db(freq: f64) -> f64 {
    let f2 = freq * freq;
    let c1 = 20.6f64.powi(2);
    let c2 = 107.7f64.powi(2);
    let c3 = 737.9f64.powi(2);
    let c4 = 12194.0f64.powi(2);

    let r_a = c4 * f2 * f2 / ((f2 + c1) * ((f2 + c2) * (f2 + c3)).sqrt() * (f2 + c4));
    20.0 * r_a.log10() + 2.0
}

/// Compensated gain of a sine tone at `freq`, clamped to [`MAX_GAIN`]
pub fn compensated_gain(freq: f64) -> f32 {
    if !(freq.is_finite() && freq > 0.0) {
        return 0.0;
    }
    let gain = BASE_GAIN as f64 * 10f64.powf(-a_weighting_db(freq) / 20.0);
    (gain as f32).min(MAX_GAIN)
}

/// Voice level for a resolved instrument
pub fn voice_level(instrument: Instrument, freq: f64) -> f32 {
    match instrument {
        Instrument::Sampled(_) => SAMPLED_GAIN,
        Instrument::Synthesized => compensated_gain(freq),
    }
}
