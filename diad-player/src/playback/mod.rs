//! Playback sessions, voice scheduling and the render graph

pub mod cache;
pub mod context;
pub mod engine;
pub mod fader;
pub mod loudness;
pub mod mixer;
pub mod sampler;
pub mod scheduler;
pub mod voice;

pub use cache::BufferCache;
pub use context::AudioContext;
pub use engine::{AudioPlayer, PlaybackSink, PlayerInput};
pub use fader::GainEnvelope;
pub use voice::{VoiceGroup, VoiceNode, VoiceSource};
