use std::sync::Arc;

use strum::Display;

use super::{message::Message, track::Track};

/// A playback change that only the owning instance is allowed to carry out.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub(crate) enum Request {
    Play { track_id: Option<String> },
    Pause,
    Stop,
    LoadTrack { track: Arc<Track>, autoplay: bool },
    SetLoop(bool),
    SetRemainingTime(u32),
}

impl Request {
    pub(crate) fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::PlayRequest { track_id } => Some(Request::Play { track_id }),
            Message::PauseRequest => Some(Request::Pause),
            Message::StopRequest => Some(Request::Stop),
            Message::LoadTrackRequest { track, autoplay } => {
                Some(Request::LoadTrack { track, autoplay })
            }
            Message::SetLoopRequest { looping } => Some(Request::SetLoop(looping)),
            Message::SetRemainingTimeRequest { seconds } => {
                Some(Request::SetRemainingTime(seconds))
            }
            Message::StateUpdate(_)
            | Message::SetOwner { .. }
            | Message::WhoIsOwner
            | Message::IAmOwner { .. }
            | Message::ReleaseOwner { .. } => None,
        }
    }

    pub(crate) fn into_message(self) -> Message {
        match self {
            Request::Play { track_id } => Message::PlayRequest { track_id },
            Request::Pause => Message::PauseRequest,
            Request::Stop => Message::StopRequest,
            Request::LoadTrack { track, autoplay } => Message::LoadTrackRequest { track, autoplay },
            Request::SetLoop(looping) => Message::SetLoopRequest { looping },
            Request::SetRemainingTime(seconds) => Message::SetRemainingTimeRequest { seconds },
        }
    }
}
