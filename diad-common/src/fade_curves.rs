//! Fade-out curves applied at the end of every voice
//!
//! A curve is a list of gain points spread evenly over the fade window;
//! gain between two points is interpolated linearly.

use serde::{Deserialize, Serialize};

/// Default release window in seconds
pub const RELEASE_WINDOW: f64 = 0.1;

const RELEASE_POINTS: [f32; 5] = [1.0, 0.9, 0.7, 0.3, 0.0];

/// Fade-out curve types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FadeCurve {
    /// `[1, 0.9, 0.7, 0.3, 0]`: holds most of the level, then drops
    #[default]
    Release,
}

impl FadeCurve {
    /// Gain points, evenly spaced from the start to the end of the window
    pub fn points(&self) -> &'static [f32] {
        match self {
            FadeCurve::Release => &RELEASE_POINTS,
        }
    }

    /// Fade-out multiplier at normalized `position` (0.0 = window start,
    /// 1.0 = window end). Values outside the window are clamped.
    pub fn calculate_fade_out(&self, position: f32) -> f32 {
        let points = self.points();
        let t = position.clamp(0.0, 1.0);
        let segments = (points.len() - 1) as f32;
        let scaled = t * segments;
        let index = (scaled.floor() as usize).min(points.len() - 2);
        let frac = scaled - index as f32;
        points[index] + (points[index + 1] - points[index]) * frac
    }

    /// Fade window for a note of `duration` seconds.
    ///
    /// Notes shorter than [`RELEASE_WINDOW`] fade over their whole length.
    pub fn window_for(duration: f64) -> f64 {
        RELEASE_WINDOW.min(duration.max(0.0))
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FadeCurve::Release => "Release",
        }
    }

    pub fn all_variants() -> &'static [FadeCurve] {
        &[FadeCurve::Release]
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
