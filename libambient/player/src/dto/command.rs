use std::sync::Arc;

use strum::Display;

use super::track::Track;

#[derive(Clone, Debug, Display)]
pub(crate) enum Command {
    LoadTrack { track: Arc<Track>, autoplay: bool },
    Play,
    Pause,
    Stop,
    SetLoop(bool),
    SetRemainingTime(Option<i64>),
    Destroy,
}
