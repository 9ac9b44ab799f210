pub(crate) mod command;
pub(crate) mod instance_id;
pub(crate) mod message;
pub(crate) mod playback_state;
pub(crate) mod player_response;
pub(crate) mod player_snapshot;
pub(crate) mod request;
pub(crate) mod role;
pub(crate) mod sound_event;
pub(crate) mod track;
