use std::sync::Arc;
use std::time::Duration;

use assert_matches::*;
use pretty_assertions::assert_eq;
use rstest::*;
use serde_json::json;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

use libambient_player::MockEngine;
use libambient_player::ambient_player::{
    AmbientPlayer, Countdown, FileStore, KeyValueStore, LocalBus, MemoryStore, Message,
    Messenger, PlaybackState, Role, Settings, StateCache, StoreError, Track,
};

#[ctor::ctor]
fn init() {
    tracing_subscriber::fmt()
        .pretty()
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_test_writer()
        .init();
}

fn fast_settings() -> Settings {
    Settings {
        claim_timeout: Duration::from_millis(50),
        ..Default::default()
    }
}

fn rain() -> Track {
    Track {
        artist_name: Some("Nature".to_owned()),
        duration: Some("10:00".to_owned()),
        ..Track::new("rain", "Rain", "https://cdn.test/rain.mp3")
    }
}

async fn timed_await<T>(future: T) -> T::Output
where
    T: Future,
{
    timeout(Duration::from_secs(10), future)
        .await
        .expect("timed out")
}

#[tokio::test]
async fn file_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new_from_path(dir.path().join("state")).unwrap();

    assert_eq!(None, store.get("player_state").await.unwrap());
    store
        .put("player_state", json!({ "timestamp": 1, "data": null }))
        .await
        .unwrap();
    store
        .put("player_state", json!({ "timestamp": 2, "data": null }))
        .await
        .unwrap();
    assert_eq!(
        Some(json!({ "timestamp": 2, "data": null })),
        store.get("player_state").await.unwrap()
    );
}

#[tokio::test]
async fn file_store_keeps_keys_apart() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new_from_path(dir.path()).unwrap();

    store.put("a/b", json!(1)).await.unwrap();
    store.put("a_b", json!(2)).await.unwrap();
    store.put("a%2Fb", json!(3)).await.unwrap();
    store.put("../escape", json!(4)).await.unwrap();
    assert_eq!(Some(json!(1)), store.get("a/b").await.unwrap());
    assert_eq!(Some(json!(2)), store.get("a_b").await.unwrap());
    assert_eq!(Some(json!(3)), store.get("a%2Fb").await.unwrap());
    assert_eq!(Some(json!(4)), store.get("../escape").await.unwrap());
    assert_eq!(4, std::fs::read_dir(dir.path()).unwrap().count());
}

#[test]
fn file_store_rejects_file_path() {
    let file = NamedTempFile::new().unwrap();
    assert_matches!(
        FileStore::new_from_path(file.path()),
        Err(StoreError::NotADirectory(_))
    );
}

#[tokio::test]
async fn file_store_reports_corrupt_data() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new_from_path(dir.path()).unwrap();
    std::fs::write(dir.path().join("player_state.json"), "{not json").unwrap();

    assert!(store.get("player_state").await.is_err());

    let cache = StateCache::new(Box::new(store), "player_state", Duration::from_secs(300));
    assert_eq!(None, cache.load().await);
}

#[tokio::test]
async fn state_cache_survives_restart() {
    let dir = TempDir::new().unwrap();
    let state = PlaybackState {
        is_playing: true,
        track_id: Some("rain".to_owned()),
        track: Some(Arc::new(rain())),
        is_looping: true,
        remaining_time: 120,
    };

    let cache = StateCache::new(
        Box::new(FileStore::new_from_path(dir.path()).unwrap()),
        "player_state",
        Duration::from_secs(300),
    );
    cache.save(&state).await;
    drop(cache);

    let cache = StateCache::new(
        Box::new(FileStore::new_from_path(dir.path()).unwrap()),
        "player_state",
        Duration::from_secs(300),
    );
    assert_eq!(Some(state), cache.load().await);
}

#[tokio::test]
async fn new_session_resumes_from_file_store() {
    let dir = TempDir::new().unwrap();
    let engine = MockEngine::new();
    let first = AmbientPlayer::with_bus(
        engine.clone(),
        &LocalBus::new(),
        FileStore::new_from_path(dir.path()).unwrap(),
        fast_settings(),
    );
    sleep(Duration::from_millis(200)).await;
    assert!(first.is_owner());

    first.load_track(rain(), true).await.unwrap();
    first.set_loop(true).await.unwrap();
    sleep(Duration::from_millis(200)).await;

    let resumed_engine = MockEngine::new();
    let resumed = AmbientPlayer::with_bus(
        resumed_engine.clone(),
        &LocalBus::new(),
        FileStore::new_from_path(dir.path()).unwrap(),
        fast_settings(),
    );
    sleep(Duration::from_millis(200)).await;

    assert!(resumed.is_owner());
    assert_eq!(Some("rain".to_owned()), resumed.current_track_id());
    assert!(resumed.is_looping_enabled());
    assert!(resumed.is_playing());
    assert!(resumed_engine.is_sounding());
}

#[tokio::test]
async fn watch_reports_role_changes() {
    let player = AmbientPlayer::with_bus(
        MockEngine::new(),
        &LocalBus::new(),
        MemoryStore::new(),
        fast_settings(),
    );
    let mut watch = player.watch();

    timed_await(watch.wait_for(|snapshot| snapshot.role == Role::Owner))
        .await
        .unwrap();
    player.load_track(rain(), true).await.unwrap();
    let snapshot = timed_await(watch.wait_for(|snapshot| snapshot.state.is_playing))
        .await
        .unwrap()
        .clone();
    assert_eq!(Some("rain".to_owned()), snapshot.state.track_id);

    player.destroy().await.unwrap();
}

#[tokio::test]
async fn messengers_exchange_messages() {
    let bus = LocalBus::new();
    let mut first = Messenger::new(Box::new(bus.open("player_channel")));
    let mut second = Messenger::new(Box::new(bus.open("player_channel")));

    first.broadcast(&Message::WhoIsOwner);
    first.broadcast(&Message::PauseRequest);
    assert_eq!(Message::WhoIsOwner, timed_await(second.recv()).await);
    assert_eq!(Message::PauseRequest, timed_await(second.recv()).await);

    second.broadcast(&Message::StopRequest);
    assert_eq!(Message::StopRequest, timed_await(first.recv()).await);
}

#[rstest]
#[case(3, 3)]
#[case(1, 1)]
#[tokio::test(start_paused = true)]
async fn countdown_reaches_zero(#[case] seconds: i64, #[case] ticks: usize) {
    let mut countdown = Countdown::new(Duration::from_secs(1));
    countdown.set_remaining_time(seconds);
    countdown.start();

    let mut seen = vec![];
    for _ in 0..ticks {
        seen.push(countdown.tick().await);
    }
    assert_eq!(Some(&0), seen.last());
    assert!(!countdown.is_running());
}

#[test]
fn decodes_browser_state_update() {
    let frame = json!({
        "type": "STATE_UPDATE",
        "payload": {
            "isPlaying": true,
            "trackId": "rain",
            "track": {
                "id": "rain",
                "title": "Rain",
                "stream_url": "https://cdn.test/rain.mp3",
                "artist_name": "Nature",
                "duration": "10:00",
                "is_favorite": false
            },
            "isLooping": true,
            "remainingTime": 42
        }
    })
    .to_string();

    assert_matches!(
        Message::decode(&frame),
        Ok(Message::StateUpdate(PlaybackState {
            is_playing: true,
            is_looping: true,
            remaining_time: 42,
            track: Some(track),
            ..
        })) if track.stream_url == "https://cdn.test/rain.mp3"
    );
}

#[test]
fn encodes_set_remaining_time_request() {
    let frame = Message::SetRemainingTimeRequest { seconds: 60 }
        .encode()
        .unwrap();
    assert_eq!(
        json!({ "type": "SET_REMAINING_TIME_REQUEST", "payload": { "seconds": 60 } }),
        serde_json::from_str::<serde_json::Value>(&frame).unwrap()
    );
}
