use super::{playback_state::PlaybackState, role::Role};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerSnapshot {
    pub state: PlaybackState,
    pub role: Role,
}
