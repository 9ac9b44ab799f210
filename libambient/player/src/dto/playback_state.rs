use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::track::Track;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Track {track} does not match track id {track_id:?}")]
    TrackMismatch {
        track_id: Option<String>,
        track: String,
    },
    #[error("State is marked as playing but has no track")]
    PlayingWithoutTrack,
}

/// The replicated view of the player that every instance converges on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub track_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<Arc<Track>>,
    pub is_looping: bool,
    #[serde(default)]
    pub remaining_time: u32,
}

impl PlaybackState {
    pub fn validate(self) -> Result<Self, StateError> {
        if let Some(track) = &self.track {
            if self.track_id.as_deref() != Some(track.id.as_str()) {
                return Err(StateError::TrackMismatch {
                    track_id: self.track_id,
                    track: track.id.clone(),
                });
            }
        }
        if self.is_playing && self.track_id.is_none() {
            return Err(StateError::PlayingWithoutTrack);
        }
        Ok(self)
    }

    /// Computes the state that results from receiving `update`.
    ///
    /// Updates replace the whole state, except that an update which omits the track
    /// details for the track that is already loaded keeps the known details.
    pub fn apply_update(&self, update: PlaybackState) -> Result<PlaybackState, StateError> {
        let mut next = update.validate()?;
        if next.track.is_none() && next.track_id.is_some() && next.track_id == self.track_id {
            next.track = self.track.clone();
        }
        Ok(next)
    }

    pub fn has_active_countdown(&self) -> bool {
        self.remaining_time > 0
    }
}
