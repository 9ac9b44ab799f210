use strum::Display;

#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum SoundEvent {
    Play,
    Pause,
    Stop,
    End,
    LoadError(String),
}
