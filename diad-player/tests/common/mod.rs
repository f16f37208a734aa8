//! Shared fixtures for diad-player integration tests

#![allow(dead_code)]

use diad_common::events::DiadEvent;
use diad_common::models::{
    InstrumentSamples, InstrumentType, Level, LevelGroup, Levels, PlaybackType, SampleData,
    SampleTable, SampledInstrument,
};
use diad_player::config::PlayerConfig;
use diad_player::PlayerInput;
use std::f64::consts::TAU;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Sample rate used for fixtures and test contexts (no resampling)
pub const TEST_RATE: u32 = 8000;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// In-memory mono 16-bit WAV of a sine at `freq`, `seconds` long
pub fn sine_wav(freq: f64, seconds: f64) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TEST_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let frames = (seconds * TEST_RATE as f64) as usize;
        for i in 0..frames {
            let t = i as f64 / TEST_RATE as f64;
            let value = (TAU * freq * t).sin() * 0.5;
            writer.write_sample((value * i16::MAX as f64) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

pub fn sample(freq: f64) -> SampleData {
    SampleData {
        freq,
        data: sine_wav(freq, 0.5),
    }
}

/// Table with decodable samples at 220/440/880 Hz for every instrument
pub fn sample_table() -> Arc<SampleTable> {
    let mut table = SampleTable::new();
    for &instrument in SampledInstrument::all_variants() {
        table.insert(
            instrument,
            InstrumentSamples {
                samples: vec![sample(220.0), sample(440.0), sample(880.0)],
            },
        );
    }
    Arc::new(table)
}

/// Table whose piano sample cannot be decoded
pub fn broken_table() -> Arc<SampleTable> {
    let mut table = SampleTable::new();
    table.insert(
        SampledInstrument::Piano,
        InstrumentSamples {
            samples: vec![SampleData {
                freq: 440.0,
                data: vec![0x42; 64],
            }],
        },
    );
    Arc::new(table)
}

pub fn player_config() -> PlayerConfig {
    PlayerConfig {
        sample_rate: TEST_RATE,
        ..PlayerConfig::default()
    }
}

pub fn input(instrument_type: InstrumentType, playback_type: PlaybackType, freqs: &[f64]) -> PlayerInput {
    let (duration, pause) = match playback_type {
        PlaybackType::Simultaneous => (2.0, 0.0),
        PlaybackType::Sequential => (1.25, 0.1),
    };
    PlayerInput {
        freqs: freqs.to_vec(),
        instrument_type,
        playback_type,
        duration,
        pause,
    }
}

pub fn levels() -> Levels {
    Levels {
        diads: vec![
            Level {
                id: 1,
                name: "Thirds".to_string(),
                group: LevelGroup::Consonant,
                intervals: vec![3, 4],
            },
            Level {
                id: 2,
                name: "Octave".to_string(),
                group: LevelGroup::Consonant,
                intervals: vec![12],
            },
        ],
    }
}

/// Next event matching `pred`, skipping others
pub async fn wait_for_event<F>(rx: &mut broadcast::Receiver<DiadEvent>, pred: F) -> DiadEvent
where
    F: Fn(&DiadEvent) -> bool,
{
    tokio::time::timeout(TIMEOUT, async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event stream failed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

pub fn is_scheduled(session: u64) -> impl Fn(&DiadEvent) -> bool {
    move |event| matches!(event, DiadEvent::SessionScheduled { session_id, .. } if *session_id == session)
}
