//! Sample decoder using symphonia
//!
//! Decodes in-memory sample recordings (WAV, MP3, FLAC, AAC, Vorbis) to
//! interleaved stereo f32 PCM.

use crate::audio::resampler::Resampler;
use crate::audio::types::DecodedBuffer;
use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Stateless decoder for sample table entries.
pub struct SampleDecoder;

impl SampleDecoder {
    /// Decode an encoded recording to PCM samples.
    ///
    /// # Returns
    /// - `samples`: Interleaved stereo f32 samples (mono is duplicated,
    ///   channels beyond the second are dropped)
    /// - `sample_rate`: Original sample rate (before resampling)
    ///
    /// # Errors
    /// - Unrecognized container or codec
    /// - No audio track, or no decodable packet
    pub fn decode_bytes(data: &[u8]) -> Result<(Vec<f32>, u32)> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        // Get the default audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut sample_rate = codec_params.sample_rate;
        let mut samples = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);

                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    Self::push_stereo(buf.samples(), spec.channels.count(), &mut samples);
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("Decoder failed: {}", e))),
            }
        }

        let sample_rate =
            sample_rate.ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

        if samples.is_empty() {
            return Err(Error::Decode("No audio decoded".to_string()));
        }

        debug!(
            "Decoded {} frames at {}Hz",
            samples.len() / 2,
            sample_rate
        );

        Ok((samples, sample_rate))
    }

    /// Decode and resample to `target_rate` in one step.
    pub fn decode_to_buffer(data: &[u8], target_rate: u32) -> Result<DecodedBuffer> {
        let (samples, sample_rate) = Self::decode_bytes(data)?;
        let samples = Resampler::resample(&samples, sample_rate, target_rate, 2)?;
        Ok(DecodedBuffer::new(samples, target_rate))
    }

    /// Append interleaved `input` with `channels` channels as stereo frames.
    fn push_stereo(input: &[f32], channels: usize, output: &mut Vec<f32>) {
        match channels {
            0 => {}
            1 => {
                output.reserve(input.len() * 2);
                for &sample in input {
                    output.push(sample);
                    output.push(sample);
                }
            }
            n => {
                for frame in input.chunks_exact(n) {
                    output.push(frame[0]);
                    output.push(frame[1]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                for ch in 0..channels {
                    let value = if ch == 0 { (i % 100) as i16 * 100 } else { -1000 };
                    writer.write_sample(value).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_push_stereo_mono() {
        let mut out = Vec::new();
        SampleDecoder::push_stereo(&[0.1, 0.2, 0.3], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn test_push_stereo_drops_extra_channels() {
        let mut out = Vec::new();
        SampleDecoder::push_stereo(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, &mut out);
        assert_eq!(out, vec![1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_decode_mono_wav() {
        let bytes = wav_bytes(1, 22050, 2205);
        let (samples, rate) = SampleDecoder::decode_bytes(&bytes).unwrap();

        assert_eq!(rate, 22050);
        assert_eq!(samples.len(), 2205 * 2);
        assert_eq!(samples[2], samples[3]);
    }

    #[test]
    fn test_decode_to_buffer_resamples() {
        let bytes = wav_bytes(2, 22050, 2205);
        let buffer = SampleDecoder::decode_to_buffer(&bytes, 44100).unwrap();

        assert_eq!(buffer.sample_rate, 44100);
        assert!(
            (4380..=4440).contains(&buffer.frame_count),
            "got {} frames",
            buffer.frame_count
        );
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = SampleDecoder::decode_bytes(b"definitely not audio");
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
