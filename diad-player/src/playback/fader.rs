//! Gain envelope for scheduled voices
//!
//! # Timing Points
//!
//! - **Start**: voice begins at full `level`
//! - **Fade start**: `stop - window`, curve begins
//! - **Stop**: curve has reached its last point; voice is silent after
//!
//! The window is [`FadeCurve::window_for`] the note duration, so short notes
//! fade over their whole length.

use diad_common::FadeCurve;

/// Constant level followed by a fade-out curve ending at the stop time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEnvelope {
    /// Gain held until the fade starts
    level: f32,
    /// Curve applied over the fade window
    curve: FadeCurve,
    /// Context time (seconds) the fade starts
    fade_start: f64,
    /// Context time (seconds) the fade ends (the voice stop time)
    fade_end: f64,
}

impl GainEnvelope {
    /// Envelope for a note playing from `start` to `stop` at `level`.
    pub fn new(level: f32, curve: FadeCurve, start: f64, stop: f64) -> Self {
        let window = FadeCurve::window_for(stop - start);
        Self {
            level,
            curve,
            fade_start: stop - window,
            fade_end: stop,
        }
    }

    /// Gain at context time `time`
    pub fn gain_at(&self, time: f64) -> f32 {
        if time < self.fade_start {
            return self.level;
        }
        let window = self.fade_end - self.fade_start;
        if window <= 0.0 {
            return if time < self.fade_end { self.level } else { 0.0 };
        }
        let position = ((time - self.fade_start) / window) as f32;
        self.level * self.curve.calculate_fade_out(position)
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn fade_start(&self) -> f64 {
        self.fade_start
    }

    pub fn fade_end(&self) -> f64 {
        self.fade_end
    }
}
