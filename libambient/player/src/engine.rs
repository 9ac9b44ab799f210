use tap::TapFallible;
use tracing::debug;

use crate::dto::sound_event::SoundEvent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SoundOptions {
    pub looping: bool,
}

/// Lets a sound report what happened to it. Each sound gets its own sender, tagged with the
/// generation of the sound so reports from a discarded sound can be told apart.
#[derive(Clone, Debug)]
pub struct SoundEvents {
    generation: u64,
    tx: flume::Sender<(u64, SoundEvent)>,
}

impl SoundEvents {
    pub(crate) fn new(generation: u64, tx: flume::Sender<(u64, SoundEvent)>) -> Self {
        Self { generation, tx }
    }

    pub fn emit(&self, event: SoundEvent) {
        self.tx
            .send((self.generation, event))
            .tap_err(|e| debug!("Player is gone, dropping sound event {:?}", (e.0).1))
            .ok();
    }
}

/// A live sound created by an [`AudioEngine`].
pub trait SoundHandle: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn unload(&mut self);
    fn playing(&self) -> bool;
    fn set_loop(&mut self, looping: bool);
}

pub trait AudioEngine: Send + 'static {
    /// Creates a sound for the given stream. Loading happens in the background, failures
    /// are reported through [`SoundEvent::LoadError`].
    fn create(
        &mut self,
        url: &str,
        options: SoundOptions,
        events: SoundEvents,
    ) -> Box<dyn SoundHandle>;
}
