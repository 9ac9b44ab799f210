use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::Display;

use super::{instance_id::InstanceId, playback_state::PlaybackState, track::Track};

/// Everything that travels between instances over the messenger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Message {
    PlayRequest {
        track_id: Option<String>,
    },
    PauseRequest,
    StopRequest,
    LoadTrackRequest {
        track: Arc<Track>,
        autoplay: bool,
    },
    SetLoopRequest {
        #[serde(rename = "loop")]
        looping: bool,
    },
    SetRemainingTimeRequest {
        seconds: u32,
    },
    StateUpdate(PlaybackState),
    SetOwner {
        owner: InstanceId,
    },
    WhoIsOwner,
    IAmOwner {
        owner: InstanceId,
    },
    ReleaseOwner {
        owner: InstanceId,
    },
}

impl Message {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}
