//! Quiz orchestration tests with a recording playback sink

mod common;

use common::*;
use diad_common::models::{InstrumentType, Level, LevelGroup, Levels, PlaybackType};
use diad_common::navigation::{Navigator, Route, RouteCell};
use diad_player::player_state::SessionSnapshot;
use diad_player::{LevelSelector, PlaybackSink, PlayerInput, PlayerState};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

struct RecordingSink {
    tx: mpsc::UnboundedSender<PlayerInput>,
}

impl PlaybackSink for RecordingSink {
    fn play(&self, input: PlayerInput) {
        let _ = self.tx.send(input);
    }
}

struct Fixture {
    state: PlayerState,
    selector: LevelSelector,
    navigator: Arc<RouteCell>,
    played: mpsc::UnboundedReceiver<PlayerInput>,
}

fn fixture() -> Fixture {
    let navigator = Arc::new(RouteCell::new());
    let selector = LevelSelector::detached(navigator.clone());
    let (tx, played) = mpsc::unbounded_channel();
    let state = PlayerState::new(
        selector.subscribe_current(),
        Arc::new(RecordingSink { tx }),
        navigator.clone(),
    );
    Fixture {
        state,
        selector,
        navigator,
        played,
    }
}

async fn wait_snapshot<F>(rx: &mut watch::Receiver<SessionSnapshot>, pred: F) -> SessionSnapshot
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    tokio::time::timeout(TIMEOUT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("snapshot source closed")
        .clone()
}

async fn next_played(rx: &mut mpsc::UnboundedReceiver<PlayerInput>) -> PlayerInput {
    tokio::time::timeout(TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for playback")
        .expect("sink closed")
}

/// Load the catalog and wait until the state has applied level `id`
async fn load_level(f: &Fixture, id: u32) -> watch::Receiver<SessionSnapshot> {
    f.selector.set_levels(Arc::new(levels()));
    f.selector.select_level(id);
    let mut rx = f.state.subscribe();
    wait_snapshot(&mut rx, |s| s.level.as_ref().map(|l| l.level.id) == Some(id)).await;
    rx
}

#[tokio::test]
async fn test_next_without_level_is_dropped() {
    let mut f = fixture();
    f.state.next().await;
    assert!(f.state.snapshot().current_interval.is_none());

    load_level(&f, 1).await;
    assert!(f.played.try_recv().is_err());
    assert!(f.state.snapshot().current_interval.is_none());
}

#[tokio::test]
async fn test_next_plays_tempered_interval() {
    let mut f = fixture();
    let mut rx = load_level(&f, 1).await;

    f.state.next().await;
    let input = next_played(&mut f.played).await;
    let snapshot = wait_snapshot(&mut rx, |s| s.current_interval.is_some()).await;
    let interval = snapshot.current_interval.unwrap();

    assert!(!snapshot.show_result);
    assert!([3, 4].contains(&interval.interval_id));
    assert!((28..=51).contains(&interval.root));
    assert_eq!(input.freqs, interval.tempered_voicing());
    assert_eq!(input.instrument_type, InstrumentType::Mixed);
    assert_eq!(input.playback_type, PlaybackType::Simultaneous);
    assert_eq!(input.duration, 2.0);
    assert_eq!(input.pause, 0.0);
}

#[tokio::test]
async fn test_choice_scores_current_interval() {
    let mut f = fixture();
    let mut rx = load_level(&f, 1).await;

    f.state.next().await;
    next_played(&mut f.played).await;
    let interval = wait_snapshot(&mut rx, |s| s.current_interval.is_some())
        .await
        .current_interval
        .unwrap();

    f.state.make_choice(interval.interval_id).await;
    let snapshot = f.state.snapshot();
    assert!(snapshot.show_result);
    assert_eq!(snapshot.selected_interval_id, interval.interval_id);
    assert!(f.state.is_matching_choice());

    let wrong = if interval.interval_id == 3 { 4 } else { 3 };
    f.state.make_choice(wrong).await;
    assert!(!f.state.is_matching_choice());

    let stats = f.state.stats().await;
    assert_eq!(stats.total_count, 2);
    assert!((stats.total_ratio - 0.5).abs() < 1e-9);
    let item = stats
        .items
        .iter()
        .find(|i| i.id == interval.interval_id)
        .unwrap();
    assert_eq!(item.count, 2);
}

#[tokio::test]
async fn test_choice_right_after_next_scores_new_interval() {
    let mut f = fixture();
    load_level(&f, 2).await;

    f.state.next().await;
    f.state.make_choice(12).await;
    assert!(f.state.is_matching_choice());
    assert_eq!(f.state.stats().await.total_count, 1);

    // The second round scores its own interval, not the first one again
    f.state.next().await;
    assert!(!f.state.snapshot().show_result);
    f.state.make_choice(7).await;
    assert!(!f.state.is_matching_choice());

    let stats = f.state.stats().await;
    assert_eq!(stats.total_count, 2);
    assert!((stats.total_ratio - 0.5).abs() < 1e-9);
    assert_eq!(next_played(&mut f.played).await.freqs.len(), 2);
    assert_eq!(next_played(&mut f.played).await.freqs.len(), 2);
}

#[tokio::test]
async fn test_unison_matches_only_after_reveal() {
    let f = fixture();
    f.selector.set_levels(Arc::new(Levels {
        diads: vec![Level {
            id: 7,
            name: "Unison".to_string(),
            group: LevelGroup::Consonant,
            intervals: vec![0],
        }],
    }));
    f.selector.select_level(7);
    let mut rx = f.state.subscribe();
    wait_snapshot(&mut rx, |s| s.level.is_some()).await;

    f.state.next().await;
    let snapshot = f.state.snapshot();
    assert_eq!(snapshot.current_interval.map(|i| i.interval_id), Some(0));
    assert_eq!(snapshot.selected_interval_id, 0);
    assert!(!f.state.is_matching_choice());

    f.state.make_choice(0).await;
    assert!(f.state.is_matching_choice());
}

#[tokio::test]
async fn test_choice_without_interval_is_not_scored() {
    let f = fixture();
    load_level(&f, 1).await;

    f.state.make_choice(3).await;
    assert!(f.state.snapshot().show_result);
    assert!(!f.state.is_matching_choice());
    assert_eq!(f.state.stats().await.total_count, 0);
}

#[tokio::test]
async fn test_repeat_and_play_from_root_honor_tuning() {
    let mut f = fixture();
    let mut rx = load_level(&f, 2).await;
    assert!(f.selector.is_perfect());

    f.state.next().await;
    next_played(&mut f.played).await;
    let interval = wait_snapshot(&mut rx, |s| s.current_interval.is_some())
        .await
        .current_interval
        .unwrap();
    assert_eq!(interval.interval_id, 12);

    f.state.repeat().await;
    let repeated = next_played(&mut f.played).await;
    assert_eq!(repeated.freqs, interval.perfect_voicing());
    assert!((repeated.freqs[1] - 2.0 * interval.root_freq).abs() < 1e-9);

    f.state.play_from_root(7).await;
    let fifth = next_played(&mut f.played).await;
    assert_eq!(fifth.freqs[0], interval.root_freq);
    assert!((fifth.freqs[1] - 1.5 * interval.root_freq).abs() < 1e-9);

    // Playing from root never scores or changes the current interval
    assert_eq!(f.state.stats().await.total_count, 0);
    assert_eq!(
        f.state.snapshot().current_interval.map(|i| i.interval_id),
        Some(12)
    );
}

#[tokio::test]
async fn test_sequential_level_durations() {
    let mut f = fixture();
    f.selector.select_playback_type(PlaybackType::Sequential);
    load_level(&f, 1).await;

    f.state.next().await;
    let input = next_played(&mut f.played).await;
    assert_eq!(input.playback_type, PlaybackType::Sequential);
    assert_eq!(input.duration, 1.25);
    assert_eq!(input.pause, 0.1);
}

#[tokio::test]
async fn test_level_change_resets_session_and_stats() {
    let mut f = fixture();
    let mut rx = load_level(&f, 1).await;

    f.state.next().await;
    next_played(&mut f.played).await;
    let interval = wait_snapshot(&mut rx, |s| s.current_interval.is_some())
        .await
        .current_interval
        .unwrap();
    f.state.make_choice(interval.interval_id).await;
    assert_eq!(f.state.stats().await.total_count, 1);

    f.selector.select_level(2);
    let snapshot = wait_snapshot(&mut rx, |s| {
        s.level.as_ref().map(|l| l.level.id) == Some(2)
    })
    .await;

    assert!(!snapshot.show_result);
    assert_eq!(snapshot.selected_interval_id, 0);
    assert!(snapshot.current_interval.is_none());
    let stats = f.state.stats().await;
    assert_eq!(stats.total_count, 0);
    assert_eq!(stats.items.len(), 1);
}

#[tokio::test]
async fn test_stats_and_player_tabs() {
    let f = fixture();
    load_level(&f, 1).await;
    f.state.make_choice(3).await;

    let data = f.state.open_stats().await;
    assert_eq!(f.navigator.current(), Route::Stats);
    assert_eq!(data.items.len(), 2);

    f.state.open_player();
    assert_eq!(f.navigator.current(), Route::Player);
}

#[tokio::test]
async fn test_exit_navigates_to_levels() {
    let f = fixture();
    f.navigator.navigate(Route::Player);
    f.state.exit();
    assert_eq!(f.navigator.current(), Route::Levels);
}
