#![no_main]
use std::time::Duration;

use libambient_player::MockEngine;
use libambient_player::ambient_player::{AmbientPlayer, LocalBus, MemoryStore, Settings, Track};
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};
use once_cell::sync::Lazy;
use tokio::runtime::Runtime;

#[derive(Arbitrary, Debug)]
enum Input {
    Load { track: u8, autoplay: bool },
    Play,
    Pause,
    Stop,
    SetLoop(bool),
    SetRemainingTime(Option<i64>),
    Finish,
    Wait(u8),
}

#[derive(Arbitrary, Debug)]
struct Step {
    second_tab: bool,
    input: Input,
}

static RUNTIME: Lazy<Runtime> = Lazy::new(|| Runtime::new().unwrap());

static ENGINE: Lazy<MockEngine> = Lazy::new(MockEngine::new);

static TABS: Lazy<[AmbientPlayer; 2]> = Lazy::new(|| {
    let _guard = RUNTIME.enter();
    let bus = LocalBus::new();
    let store = MemoryStore::new();
    let settings = Settings {
        claim_timeout: Duration::from_millis(10),
        tick_interval: Duration::from_millis(10),
        ..Default::default()
    };
    [
        AmbientPlayer::with_bus(ENGINE.clone(), &bus, store.clone(), settings.clone()),
        AmbientPlayer::with_bus(ENGINE.clone(), &bus, store, settings),
    ]
});

#[ctor::ctor]
fn init() {
    tracing_subscriber::fmt()
        .pretty()
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_test_writer()
        .init();
}

fuzz_target!(|step: Step| {
    let tab = &TABS[step.second_tab as usize];
    RUNTIME.block_on(async {
        match step.input {
            Input::Load { track, autoplay } => {
                let track = Track::new(
                    track.to_string(),
                    format!("Track {track}"),
                    format!("https://cdn.test/{track}.mp3"),
                );
                tab.load_track(track, autoplay).await.unwrap();
            }
            Input::Play => tab.play().await.unwrap(),
            Input::Pause => tab.pause().await.unwrap(),
            Input::Stop => tab.stop().await.unwrap(),
            Input::SetLoop(looping) => tab.set_loop(looping).await.unwrap(),
            Input::SetRemainingTime(seconds) => tab.set_remaining_time(seconds).await.unwrap(),
            Input::Finish => ENGINE.finish(),
            Input::Wait(millis) => tokio::time::sleep(Duration::from_millis(millis as u64)).await,
        }
    });
});
