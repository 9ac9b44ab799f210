use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Settings {
    /// Topic shared by every instance of the extension
    pub channel_name: String,
    /// Key the last known playback state is stored under
    pub storage_key: String,
    /// How long a new instance waits for an existing owner before claiming ownership
    pub claim_timeout: Duration,
    pub tick_interval: Duration,
    /// Stored state older than this is ignored on startup
    pub cache_max_age: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channel_name: "player_channel".to_owned(),
            storage_key: "player_state".to_owned(),
            claim_timeout: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
            cache_max_age: Duration::from_secs(5 * 60),
        }
    }
}
