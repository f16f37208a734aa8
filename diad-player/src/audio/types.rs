//! Core audio data types
//!
//! Defines structures for decoded sample buffers and frames used throughout the
//! render graph.

/// DecodedBuffer holds one decoded and resampled sample recording.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Stereo interleaved: [L, R, L, R, ...]
/// - Sample rate matches the audio context after resampling
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    /// PCM audio samples (interleaved stereo)
    pub samples: Vec<f32>,

    /// Sample rate of `samples`
    pub sample_rate: u32,

    /// Number of stereo frames (samples.len() / 2)
    pub frame_count: usize,
}

impl DecodedBuffer {
    /// Create a new DecodedBuffer from interleaved stereo samples
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let frame_count = samples.len() / 2;
        Self {
            samples,
            sample_rate,
            frame_count,
        }
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count as f64 / self.sample_rate as f64
    }

    /// Get audio frame at specific frame index
    pub fn frame(&self, frame_index: usize) -> Option<AudioFrame> {
        if frame_index >= self.frame_count {
            return None;
        }
        let sample_index = frame_index * 2;
        Some(AudioFrame {
            left: self.samples[sample_index],
            right: self.samples[sample_index + 1],
        })
    }

    /// Frame at a fractional position, linearly interpolated.
    ///
    /// Positions before the start or past the last frame are silent.
    pub fn frame_at(&self, position: f64) -> AudioFrame {
        if position < 0.0 || !position.is_finite() {
            return AudioFrame::zero();
        }
        let index = position.floor() as usize;
        let frac = (position - index as f64) as f32;

        match (self.frame(index), self.frame(index + 1)) {
            (Some(a), Some(b)) => AudioFrame {
                left: a.left + (b.left - a.left) * frac,
                right: a.right + (b.right - a.right) * frac,
            },
            (Some(a), None) => a,
            _ => AudioFrame::zero(),
        }
    }
}

/// AudioFrame represents a single stereo sample (one frame of audio).
///
/// Used for passing audio data between the render graph and output device.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioFrame {
    /// Left channel sample
    pub left: f32,

    /// Right channel sample
    pub right: f32,
}

impl AudioFrame {
    /// Create a silent frame (0.0, 0.0)
    pub fn zero() -> Self {
        AudioFrame { left: 0.0, right: 0.0 }
    }

    /// Create a frame from mono sample (duplicate to both channels)
    pub fn from_mono(sample: f32) -> Self {
        AudioFrame {
            left: sample,
            right: sample,
        }
    }

    /// Create a frame from left and right samples
    pub fn from_stereo(left: f32, right: f32) -> Self {
        AudioFrame { left, right }
    }

    /// Apply volume scaling to both channels
    pub fn apply_volume(&mut self, volume: f32) {
        self.left *= volume;
        self.right *= volume;
    }

    /// Add another frame to this frame (for mixing)
    pub fn add(&mut self, other: &AudioFrame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Clamp samples to valid range [-1.0, 1.0] to prevent clipping
    pub fn clamp(&mut self) {
        self.left = self.left.clamp(-1.0, 1.0);
        self.right = self.right.clamp(-1.0, 1.0);
    }

    /// Peak absolute value over both channels
    pub fn peak(&self) -> f32 {
        self.left.abs().max(self.right.abs())
    }
}
