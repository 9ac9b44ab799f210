use std::time::Duration;

use eyre::Result;
use libambient_player::MockEngine;
use libambient_player::ambient_player::{AmbientPlayer, LocalBus, MemoryStore, Settings, Track};
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_thread_ids(true)
        .with_thread_names(true)
        .init();

    let bus = LocalBus::new();
    let store = MemoryStore::new();
    let engine = MockEngine::new();
    let settings = Settings::default();

    let first = AmbientPlayer::with_bus(engine.clone(), &bus, store.clone(), settings.clone());
    sleep(settings.claim_timeout + Duration::from_millis(100)).await;
    let second = AmbientPlayer::with_bus(engine.clone(), &bus, store, settings);
    let _timer = second.subscribe_to_timer(|remaining| info!("Time left: {remaining}s"));

    second
        .load_track(
            Track::new("rain", "Rain on a tin roof", "https://cdn.test/rain.mp3"),
            true,
        )
        .await?;
    second.set_loop(true).await?;
    second.set_remaining_time(Some(3)).await?;
    sleep(Duration::from_millis(3500)).await;

    info!(
        "Owner: {}, playing: {}, looping: {}",
        first.is_owner(),
        second.is_playing(),
        second.is_looping_enabled()
    );

    first.destroy().await?;
    sleep(Duration::from_millis(100)).await;
    info!("After closing the owner: {:?}", second.state());
    second.destroy().await?;
    info!("Engine calls: {:?}", engine.calls());
    Ok(())
}
