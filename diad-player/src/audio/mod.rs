//! Audio decoding, resampling and device output

pub mod decoder;
pub mod output;
pub mod resampler;
pub mod types;

pub use decoder::SampleDecoder;
pub use output::AudioOutput;
pub use resampler::{Resampler, DEFAULT_SAMPLE_RATE};
pub use types::{AudioFrame, DecodedBuffer};
