use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tap::TapFallible;
use tracing::{debug, error, warn};

use crate::dto::playback_state::PlaybackState;
use crate::store::KeyValueStore;

#[derive(Debug, Serialize, Deserialize)]
struct CachedState {
    timestamp: u64,
    data: PlaybackState,
}

/// Best-effort, timestamped copy of the playback state so a freshly opened instance can
/// show something before it hears from the owner.
pub struct StateCache {
    store: Box<dyn KeyValueStore>,
    key: String,
    max_age: Duration,
}

impl StateCache {
    pub fn new(store: Box<dyn KeyValueStore>, key: impl Into<String>, max_age: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            max_age,
        }
    }

    pub async fn save(&self, state: &PlaybackState) {
        self.save_at(state, now_millis()).await;
    }

    pub async fn load(&self) -> Option<PlaybackState> {
        self.load_at(now_millis()).await
    }

    pub(crate) async fn save_at(&self, state: &PlaybackState, timestamp: u64) {
        let cached = CachedState {
            timestamp,
            data: state.clone(),
        };
        let value = match serde_json::to_value(&cached) {
            Ok(value) => value,
            Err(e) => {
                error!("Error serializing player state: {e:?}");
                return;
            }
        };
        self.store
            .put(&self.key, value)
            .await
            .tap_err(|e| error!("Error saving player state: {e:?}"))
            .ok();
    }

    pub(crate) async fn load_at(&self, now: u64) -> Option<PlaybackState> {
        let value = self
            .store
            .get(&self.key)
            .await
            .tap_err(|e| error!("Error loading player state: {e:?}"))
            .ok()??;
        let cached: CachedState = serde_json::from_value(value)
            .tap_err(|e| warn!("Ignoring unreadable player state: {e}"))
            .ok()?;

        let age = now.saturating_sub(cached.timestamp);
        if age >= self.max_age.as_millis() as u64 {
            debug!("Cached player state is stale ({age} ms old)");
            return None;
        }
        cached
            .data
            .validate()
            .tap_err(|e| warn!("Ignoring invalid player state: {e}"))
            .ok()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use eyre::{Result, eyre};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;
    use crate::dto::track::Track;
    use crate::store::MemoryStore;

    const MAX_AGE: Duration = Duration::from_secs(5 * 60);

    struct FailingStore;

    #[async_trait]
    impl KeyValueStore for FailingStore {
        async fn put(&self, _key: &str, _value: Value) -> Result<()> {
            Err(eyre!("quota exceeded"))
        }

        async fn get(&self, _key: &str) -> Result<Option<Value>> {
            Err(eyre!("storage unavailable"))
        }
    }

    fn playing_state() -> PlaybackState {
        PlaybackState {
            is_playing: true,
            track_id: Some("t1".to_owned()),
            track: Some(Arc::new(Track::new("t1", "Rain", "https://cdn.test/t1.mp3"))),
            is_looping: true,
            remaining_time: 42,
        }
    }

    fn cache(store: &MemoryStore) -> StateCache {
        StateCache::new(Box::new(store.clone()), "player_state", MAX_AGE)
    }

    #[tokio::test]
    async fn loads_what_was_saved() {
        let store = MemoryStore::new();
        let cache = cache(&store);

        cache.save(&playing_state()).await;

        assert_eq!(Some(playing_state()), cache.load().await);
    }

    #[tokio::test]
    async fn stored_format_has_timestamp_and_data() {
        let store = MemoryStore::new();
        cache(&store).save_at(&PlaybackState::default(), 1234).await;

        let value = store.get("player_state").await.unwrap().unwrap();

        assert_eq!(json!(1234), value["timestamp"]);
        assert_eq!(json!(false), value["data"]["isPlaying"]);
    }

    #[rstest]
    #[case(0, true)]
    #[case(299_999, true)]
    #[case(300_000, false)]
    #[case(3_600_000, false)]
    #[tokio::test]
    async fn respects_freshness_window(#[case] age: u64, #[case] fresh: bool) {
        let store = MemoryStore::new();
        let cache = cache(&store);
        let saved_at = 10_000_000;

        cache.save_at(&playing_state(), saved_at).await;

        assert_eq!(fresh, cache.load_at(saved_at + age).await.is_some());
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        assert_eq!(None, cache(&MemoryStore::new()).load().await);
    }

    #[tokio::test]
    async fn storage_errors_are_swallowed() {
        let cache = StateCache::new(Box::new(FailingStore), "player_state", MAX_AGE);

        cache.save(&playing_state()).await;

        assert_eq!(None, cache.load().await);
    }

    #[tokio::test]
    async fn invalid_snapshot_is_a_miss() {
        let store = MemoryStore::new();
        store
            .put(
                "player_state",
                json!({
                    "timestamp": now_millis(),
                    "data": {"isPlaying": true, "trackId": null, "isLooping": false, "remainingTime": 0}
                }),
            )
            .await
            .unwrap();

        assert_eq!(None, cache(&store).load().await);
    }
}
