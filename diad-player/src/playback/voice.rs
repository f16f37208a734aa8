//! Scheduled voices and voice groups
//!
//! A [`VoiceNode`] is one note: a source (sample buffer or sine oscillator),
//! a start/stop time on the context clock and a gain envelope. A
//! [`VoiceGroup`] owns every voice of one playback session and releases them
//! together when the session is superseded or the player is destroyed.

use crate::audio::{AudioFrame, DecodedBuffer};
use crate::playback::context::AudioContext;
use crate::playback::fader::GainEnvelope;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Sound source of a voice
#[derive(Debug, Clone)]
pub enum VoiceSource {
    /// Decoded sample played back at `rate` (1.0 = recorded pitch)
    Buffer { buffer: Arc<DecodedBuffer>, rate: f64 },
    /// Sine oscillator
    Oscillator { freq: f64 },
}

/// One scheduled note in the render graph
#[derive(Debug)]
pub struct VoiceNode {
    source: VoiceSource,
    envelope: GainEnvelope,
    start_time: f64,
    /// f64 bits; only ever moves earlier
    stop_time: AtomicU64,
    stop_count: AtomicUsize,
    disconnect_count: AtomicUsize,
    connected: AtomicBool,
}

impl VoiceNode {
    pub fn new(source: VoiceSource, envelope: GainEnvelope, start_time: f64, stop_time: f64) -> Self {
        Self {
            source,
            envelope,
            start_time,
            stop_time: AtomicU64::new(stop_time.to_bits()),
            stop_count: AtomicUsize::new(0),
            disconnect_count: AtomicUsize::new(0),
            connected: AtomicBool::new(false),
        }
    }

    /// Output of this voice at context time `time`
    pub fn frame_at(&self, time: f64) -> AudioFrame {
        if time < self.start_time || time >= self.stop_time() {
            return AudioFrame::zero();
        }
        let elapsed = time - self.start_time;
        let gain = self.envelope.gain_at(time);

        let mut frame = match &self.source {
            VoiceSource::Buffer { buffer, rate } => {
                buffer.frame_at(elapsed * buffer.sample_rate as f64 * rate)
            }
            VoiceSource::Oscillator { freq } => {
                AudioFrame::from_mono((TAU * freq * elapsed).sin() as f32)
            }
        };
        frame.apply_volume(gain);
        frame
    }

    /// Stop at context time `when` (or keep an earlier scheduled stop).
    pub fn stop(&self, when: f64) {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        let _ = self
            .stop_time
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                (when < f64::from_bits(bits)).then(|| when.to_bits())
            });
    }

    pub(crate) fn mark_connected(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.disconnect_count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn source(&self) -> &VoiceSource {
        &self.source
    }

    pub fn envelope(&self) -> &GainEnvelope {
        &self.envelope
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn stop_time(&self) -> f64 {
        f64::from_bits(self.stop_time.load(Ordering::SeqCst))
    }

    /// Number of `stop` calls received
    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }

    /// Number of times this voice was disconnected from a context
    pub fn disconnect_count(&self) -> usize {
        self.disconnect_count.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// All voices of one playback session
#[derive(Debug)]
pub struct VoiceGroup {
    session_id: u64,
    voices: Vec<Arc<VoiceNode>>,
}

impl VoiceGroup {
    pub fn new(session_id: u64, voices: Vec<Arc<VoiceNode>>) -> Self {
        Self { session_id, voices }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn voices(&self) -> &[Arc<VoiceNode>] {
        &self.voices
    }

    /// Earliest start time of the group
    pub fn start_time(&self) -> Option<f64> {
        self.voices
            .iter()
            .map(|v| v.start_time())
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Connect every voice to `context`
    pub fn connect(&self, context: &AudioContext) {
        for voice in &self.voices {
            context.connect(Arc::clone(voice));
        }
    }

    /// Stop every voice now and disconnect it from `context`.
    ///
    /// Consumes the group so each voice is released at most once.
    pub fn release(self, context: &AudioContext) -> usize {
        let now = context.current_time();
        for voice in &self.voices {
            voice.stop(now);
            context.disconnect(voice);
        }
        self.voices.len()
    }
}
