//! Render Graph Throughput Benchmark
//!
//! Measures offline rendering of a two-voice interval to verify the audio
//! callback runs far faster than realtime.
//!
//! **Target:** >100x realtime for two voices

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use diad_common::FadeCurve;
use diad_player::audio::DecodedBuffer;
use diad_player::playback::{AudioContext, GainEnvelope, VoiceNode, VoiceSource};
use std::sync::Arc;

const SAMPLE_RATE: u32 = 44_100;
const STOP_TIME: f64 = 1.0e9;

fn voice(source: VoiceSource) -> Arc<VoiceNode> {
    let envelope = GainEnvelope::new(0.3, FadeCurve::Release, 0.0, STOP_TIME);
    Arc::new(VoiceNode::new(source, envelope, 0.0, STOP_TIME))
}

fn bench_render_oscillators(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_throughput");

    group.bench_function("two_oscillators_1s", |b| {
        let context = AudioContext::new(SAMPLE_RATE);
        context.connect(voice(VoiceSource::Oscillator { freq: 261.63 }));
        context.connect(voice(VoiceSource::Oscillator { freq: 392.44 }));

        b.iter(|| {
            let frames = context.render_offline(SAMPLE_RATE as usize);
            black_box(frames);
        });
    });

    group.finish();
}

fn bench_render_buffers(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_throughput");

    group.bench_function("two_pitched_buffers_1s", |b| {
        // 10s stereo sawtooth
        let samples: Vec<f32> = (0..SAMPLE_RATE as usize * 10)
            .flat_map(|i| {
                let v = (i % 100) as f32 / 100.0 - 0.5;
                [v, v]
            })
            .collect();
        let buffer = Arc::new(DecodedBuffer::new(samples, SAMPLE_RATE));

        let context = AudioContext::new(SAMPLE_RATE);
        context.connect(voice(VoiceSource::Buffer {
            buffer: Arc::clone(&buffer),
            rate: 1.0,
        }));
        context.connect(voice(VoiceSource::Buffer {
            buffer,
            rate: 1.5,
        }));

        b.iter(|| {
            let frames = context.render_offline(SAMPLE_RATE as usize);
            black_box(frames);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_render_oscillators, bench_render_buffers);
criterion_main!(benches);
