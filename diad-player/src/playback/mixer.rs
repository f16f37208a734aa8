//! Voice mixer
//!
//! Sums every connected voice frame by frame and applies master volume.
//! Voices carry their own gain envelopes, so the mixer does no per-voice
//! gain work beyond the sum.

use crate::audio::AudioFrame;
use crate::playback::voice::VoiceNode;
use std::sync::Arc;

/// Audio mixer for the render graph
#[derive(Debug, Clone)]
pub struct Mixer {
    master_volume: f32,
}

impl Mixer {
    pub fn new(master_volume: f32) -> Self {
        Self {
            master_volume: master_volume.clamp(0.0, 1.0),
        }
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.clamp(0.0, 1.0);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Mix `voices` into `output`.
    ///
    /// `first_frame` is the context frame index of `output[0]`.
    pub fn mix(
        &self,
        voices: &[Arc<VoiceNode>],
        first_frame: u64,
        sample_rate: u32,
        output: &mut [AudioFrame],
    ) {
        let rate = sample_rate as f64;
        for (offset, out) in output.iter_mut().enumerate() {
            let time = (first_frame + offset as u64) as f64 / rate;
            let mut frame = AudioFrame::zero();
            for voice in voices {
                frame.add(&voice.frame_at(time));
            }
            frame.apply_volume(self.master_volume);
            *out = frame;
        }
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(1.0)
    }
}
