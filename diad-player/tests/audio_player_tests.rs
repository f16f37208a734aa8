//! Audio player session tests
//!
//! Playback is verified by rendering the context offline; no audio device
//! is needed.

mod common;

use common::*;
use diad_common::channel::{LocalChannel, MessageChannel, Payload, TABLE_REQUEST, TABLE_RESPONSE};
use diad_common::events::{DiadEvent, PlayerStatus};
use diad_common::models::{InstrumentType, PlaybackType, SampledInstrument};
use diad_player::playback::scheduler::{JITTER_MAX, JITTER_MIN};
use diad_player::playback::VoiceSource;
use diad_player::{AudioContext, AudioPlayer};
use std::sync::Arc;

fn new_player() -> (AudioPlayer, AudioContext) {
    let channel = LocalChannel::default();
    let context = AudioContext::new(TEST_RATE);
    let player = AudioPlayer::new(context.clone(), &channel, &player_config());
    (player, context)
}

#[tokio::test]
async fn test_sine_session_plays() {
    let (player, context) = new_player();
    let mut events = player.subscribe_events();

    player.play(input(
        InstrumentType::Sine,
        PlaybackType::Simultaneous,
        &[261.63, 329.63],
    ));
    wait_for_event(&mut events, is_scheduled(1)).await;

    assert_eq!(player.status(), PlayerStatus::Playing);
    assert_eq!(context.connected_count(), 2);
    let voices = player.active_voices().await;
    assert!(voices
        .iter()
        .all(|v| matches!(v.source(), VoiceSource::Oscillator { .. })));

    let frames = context.render_offline((TEST_RATE / 10) as usize);
    let peak = frames.iter().map(|f| f.peak()).fold(0.0f32, f32::max);
    assert!(peak > 0.0);
    assert!(peak <= 1.0);
}

#[tokio::test]
async fn test_second_session_releases_first_exactly_once() {
    let (player, context) = new_player();
    let mut events = player.subscribe_events();

    player.play(input(
        InstrumentType::Sine,
        PlaybackType::Sequential,
        &[220.0, 277.18],
    ));
    wait_for_event(&mut events, is_scheduled(1)).await;
    let first = player.active_voices().await;
    assert_eq!(first.len(), 2);

    context.render_offline(400);

    player.play(input(
        InstrumentType::Sine,
        PlaybackType::Sequential,
        &[246.94, 329.63],
    ));
    wait_for_event(&mut events, is_scheduled(2)).await;

    for voice in &first {
        assert_eq!(voice.stop_count(), 1);
        assert_eq!(voice.disconnect_count(), 1);
        assert!(!voice.is_connected());
        assert!(voice.stop_time() <= context.current_time() + 1e-9);
    }

    let second = player.active_voices().await;
    assert_eq!(context.connected_count(), 2);
    assert!(second.iter().all(|v| v.is_connected()));
    assert!(second.iter().all(|v| v.stop_count() == 0));
}

#[tokio::test]
async fn test_sequential_start_spacing() {
    let (player, context) = new_player();
    let mut events = player.subscribe_events();
    context.render_offline(800);

    player.play(input(
        InstrumentType::Sine,
        PlaybackType::Sequential,
        &[220.0, 277.18, 329.63],
    ));
    wait_for_event(&mut events, is_scheduled(1)).await;

    let voices = player.active_voices().await;
    assert!((voices[0].start_time() - context.current_time()).abs() < 1e-9);
    for pair in voices.windows(2) {
        let spacing = pair[1].start_time() - pair[0].start_time();
        assert!((spacing - 1.35).abs() < 1e-9, "spacing {}", spacing);
    }
    for voice in &voices {
        assert!((voice.stop_time() - voice.start_time() - 1.25).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_simultaneous_jitter_band() {
    let (player, context) = new_player();
    let mut events = player.subscribe_events();
    let now = context.current_time();

    player.play(input(
        InstrumentType::Sine,
        PlaybackType::Simultaneous,
        &[220.0, 330.0],
    ));
    wait_for_event(&mut events, is_scheduled(1)).await;

    for voice in player.active_voices().await {
        let offset = voice.start_time() - now;
        assert!(offset >= JITTER_MIN - 1e-9 && offset <= JITTER_MAX + 1e-9);
        assert!((voice.stop_time() - voice.start_time() - 2.0).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_superseded_session_is_discarded() {
    let (player, context) = new_player();
    let mut events = player.subscribe_events();

    // No table yet: the sampled session waits while the sine one completes
    player.play(input(
        InstrumentType::Sampled(SampledInstrument::Piano),
        PlaybackType::Simultaneous,
        &[220.0, 440.0],
    ));
    player.play(input(InstrumentType::Sine, PlaybackType::Simultaneous, &[300.0]));
    wait_for_event(&mut events, is_scheduled(2)).await;

    player.set_sample_table(sample_table());
    let event = wait_for_event(&mut events, |e| e.session_id() == Some(1)).await;
    assert!(matches!(event, DiadEvent::SessionDiscarded { session_id: 1, .. }));

    let voices = player.active_voices().await;
    assert_eq!(voices.len(), 1);
    assert!(matches!(voices[0].source(), VoiceSource::Oscillator { .. }));
    assert_eq!(context.connected_count(), 1);
    // Decodes of the discarded session stay cached
    assert!(player.cache().contains(SampledInstrument::Piano, 220.0));
}

#[tokio::test]
async fn test_decode_failure_keeps_previous_group() {
    let (player, context) = new_player();
    let mut events = player.subscribe_events();

    player.play(input(InstrumentType::Sine, PlaybackType::Simultaneous, &[440.0]));
    wait_for_event(&mut events, is_scheduled(1)).await;

    player.set_sample_table(broken_table());
    player.play(input(
        InstrumentType::Sampled(SampledInstrument::Piano),
        PlaybackType::Simultaneous,
        &[440.0],
    ));
    let event = wait_for_event(&mut events, |e| e.session_id() == Some(2)).await;
    match event {
        DiadEvent::SessionFailed { reason, .. } => assert!(reason.contains("decode")),
        other => panic!("unexpected event {:?}", other),
    }

    assert_eq!(player.status(), PlayerStatus::Playing);
    assert_eq!(context.connected_count(), 1);
    assert!(player.active_voices().await[0].is_connected());
    assert!(player.cache().is_empty());

    // The player stays usable
    player.play(input(InstrumentType::Sine, PlaybackType::Simultaneous, &[500.0]));
    wait_for_event(&mut events, is_scheduled(3)).await;
}

#[tokio::test]
async fn test_missing_instrument_fails_session() {
    let (player, _context) = new_player();
    let mut events = player.subscribe_events();
    player.set_sample_table(broken_table());

    player.play(input(
        InstrumentType::Sampled(SampledInstrument::Organ),
        PlaybackType::Simultaneous,
        &[440.0],
    ));
    let event = wait_for_event(&mut events, |e| e.session_id() == Some(1)).await;
    assert!(matches!(event, DiadEvent::SessionFailed { .. }));
    assert_eq!(player.status(), PlayerStatus::Idle);
}

#[tokio::test]
async fn test_sampled_notes_use_nearest_sample_and_share_decodes() {
    let (player, _context) = new_player();
    let mut events = player.subscribe_events();
    player.set_sample_table(sample_table());

    player.play(input(
        InstrumentType::Sampled(SampledInstrument::Harpsichord),
        PlaybackType::Simultaneous,
        &[600.0, 450.0],
    ));
    wait_for_event(&mut events, is_scheduled(1)).await;

    let voices = player.active_voices().await;
    let rates: Vec<f64> = voices
        .iter()
        .map(|v| match v.source() {
            VoiceSource::Buffer { rate, .. } => *rate,
            other => panic!("unexpected source {:?}", other),
        })
        .collect();
    assert!((rates[0] - 600.0 / 440.0).abs() < 1e-12);
    assert!((rates[1] - 450.0 / 440.0).abs() < 1e-12);
    assert_eq!(player.cache().decode_count(), 1);
    assert!(voices.iter().all(|v| v.envelope().level() == 1.0));
}

#[tokio::test]
async fn test_mixed_resolves_to_sampled_instruments() {
    let (player, _context) = new_player();
    let mut events = player.subscribe_events();
    player.set_sample_table(sample_table());

    player.play(input(
        InstrumentType::Mixed,
        PlaybackType::Sequential,
        &[220.0, 330.0],
    ));
    wait_for_event(&mut events, is_scheduled(1)).await;

    assert!(player
        .active_voices()
        .await
        .iter()
        .all(|v| matches!(v.source(), VoiceSource::Buffer { .. })));
}

#[tokio::test]
async fn test_table_requested_over_channel() {
    let channel = Arc::new(LocalChannel::default());
    let mut requests = channel.listen(TABLE_REQUEST);

    let player = AudioPlayer::new(AudioContext::new(TEST_RATE), channel.as_ref(), &player_config());
    assert!(matches!(requests.recv().await.unwrap(), Payload::Empty));
    assert!(!player.has_sample_table());

    channel.send(TABLE_RESPONSE, Payload::SampleTable(sample_table()));
    tokio::time::timeout(TIMEOUT, async {
        while !player.has_sample_table() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("sample table not received");
}

#[tokio::test]
async fn test_destroy_closes_everything() {
    let (player, context) = new_player();
    let mut events = player.subscribe_events();
    player.set_sample_table(sample_table());

    player.play(input(
        InstrumentType::Sampled(SampledInstrument::Piano),
        PlaybackType::Simultaneous,
        &[440.0],
    ));
    wait_for_event(&mut events, is_scheduled(1)).await;
    let voices = player.active_voices().await;

    player.destroy().await;

    assert_eq!(player.status(), PlayerStatus::Closed);
    assert!(context.is_closed());
    assert!(player.cache().is_empty());
    assert_eq!(voices[0].stop_count(), 1);
    assert_eq!(context.connected_count(), 0);

    let before = context.current_time();
    context.render_offline(100);
    assert_eq!(context.current_time(), before);

    player.play(input(InstrumentType::Sine, PlaybackType::Simultaneous, &[440.0]));
    assert_eq!(player.latest_session(), 1);
    assert_eq!(player.status(), PlayerStatus::Closed);
}
