//! Software audio context
//!
//! Owns the render graph and the frame clock. `current_time()` is
//! `frames_rendered / sample_rate`, so time only advances as audio is pulled,
//! either by the cpal output callback or by offline rendering.

use crate::audio::AudioFrame;
use crate::playback::mixer::Mixer;
use crate::playback::voice::VoiceNode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

struct Graph {
    voices: Vec<Arc<VoiceNode>>,
    mixer: Mixer,
}

struct ContextInner {
    sample_rate: u32,
    frames_rendered: AtomicU64,
    closed: AtomicBool,
    graph: Mutex<Graph>,
}

/// Shared handle to the render graph
#[derive(Clone)]
pub struct AudioContext {
    inner: Arc<ContextInner>,
}

impl AudioContext {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                sample_rate: sample_rate.max(1),
                frames_rendered: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                graph: Mutex::new(Graph {
                    voices: Vec::new(),
                    mixer: Mixer::default(),
                }),
            }),
        }
    }

    fn graph(&self) -> MutexGuard<'_, Graph> {
        self.inner
            .graph
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    /// Context clock in seconds
    pub fn current_time(&self) -> f64 {
        self.inner.frames_rendered.load(Ordering::SeqCst) as f64 / self.inner.sample_rate as f64
    }

    /// Render the next block of frames and advance the clock.
    ///
    /// A closed context renders silence and does not advance.
    pub fn render(&self, output: &mut [AudioFrame]) {
        if self.is_closed() {
            output.fill(AudioFrame::zero());
            return;
        }
        let graph = self.graph();
        let first_frame = self.inner.frames_rendered.load(Ordering::SeqCst);
        graph
            .mixer
            .mix(&graph.voices, first_frame, self.inner.sample_rate, output);
        self.inner
            .frames_rendered
            .fetch_add(output.len() as u64, Ordering::SeqCst);
    }

    /// Render `frames` frames into a new vector
    pub fn render_offline(&self, frames: usize) -> Vec<AudioFrame> {
        let mut block = vec![AudioFrame::zero(); frames];
        self.render(&mut block);
        block
    }

    /// Add a voice to the graph
    pub fn connect(&self, voice: Arc<VoiceNode>) {
        if self.is_closed() {
            return;
        }
        voice.mark_connected();
        self.graph().voices.push(voice);
    }

    /// Remove a voice from the graph
    pub fn disconnect(&self, voice: &Arc<VoiceNode>) {
        self.graph().voices.retain(|v| !Arc::ptr_eq(v, voice));
        voice.mark_disconnected();
    }

    /// Number of voices in the graph
    pub fn connected_count(&self) -> usize {
        self.graph().voices.len()
    }

    pub fn set_master_volume(&self, volume: f32) {
        self.graph().mixer.set_master_volume(volume);
    }

    /// Drop every voice and stop rendering
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped = std::mem::take(&mut self.graph().voices);
        debug!("Audio context closed ({} voices dropped)", dropped.len());
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}
