use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::dto::sound_event::SoundEvent;
use crate::engine::{AudioEngine, SoundEvents, SoundHandle, SoundOptions};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCall {
    Create { handle: usize, url: String },
    Play { handle: usize },
    Pause { handle: usize },
    Stop { handle: usize },
    Unload { handle: usize },
    SetLoop { handle: usize, looping: bool },
}

struct MockSoundState {
    loaded: bool,
    playing: bool,
    looping: bool,
    events: SoundEvents,
}

#[derive(Default)]
struct MockState {
    calls: Vec<EngineCall>,
    sounds: Vec<MockSoundState>,
    failing_urls: HashSet<String>,
    live: usize,
    max_live: usize,
}

/// Audio engine that makes no sound. It records every call and reports events the way a
/// real engine would. Clones share the same recordings.
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any sound created for `url` from now on fails to load.
    pub fn fail_url(&self, url: impl Into<String>) {
        self.lock().failing_urls.insert(url.into());
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn created(&self) -> usize {
        self.lock().sounds.len()
    }

    pub fn live_sounds(&self) -> usize {
        self.lock().live
    }

    pub fn max_live_sounds(&self) -> usize {
        self.lock().max_live
    }

    pub fn is_sounding(&self) -> bool {
        self.lock().sounds.iter().any(|s| s.loaded && s.playing)
    }

    pub fn is_looping(&self, handle: usize) -> Option<bool> {
        self.lock().sounds.get(handle).map(|s| s.looping)
    }

    /// Simulates the most recently created sound reaching its natural end.
    pub fn finish(&self) {
        let mut state = self.lock();
        if let Some(sound) = state.sounds.last_mut() {
            if sound.loaded && sound.playing {
                sound.playing = false;
                sound.events.emit(SoundEvent::End);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AudioEngine for MockEngine {
    fn create(
        &mut self,
        url: &str,
        options: SoundOptions,
        events: SoundEvents,
    ) -> Box<dyn SoundHandle> {
        let mut state = self.lock();
        let handle = state.sounds.len();
        state.calls.push(EngineCall::Create {
            handle,
            url: url.to_owned(),
        });

        let loaded = !state.failing_urls.contains(url);
        if loaded {
            state.live += 1;
            state.max_live = state.max_live.max(state.live);
        } else {
            events.emit(SoundEvent::LoadError(format!("Unable to load {url}")));
        }
        state.sounds.push(MockSoundState {
            loaded,
            playing: false,
            looping: options.looping,
            events,
        });

        Box::new(MockSound {
            handle,
            state: self.state.clone(),
        })
    }
}

struct MockSound {
    handle: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockSound {
    fn record(&self, call: EngineCall, apply: impl FnOnce(&mut MockState, usize)) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(call);
        apply(&mut state, self.handle);
    }
}

impl SoundHandle for MockSound {
    fn play(&mut self) {
        self.record(EngineCall::Play { handle: self.handle }, |state, handle| {
            let sound = &mut state.sounds[handle];
            if sound.loaded && !sound.playing {
                sound.playing = true;
                sound.events.emit(SoundEvent::Play);
            }
        });
    }

    fn pause(&mut self) {
        self.record(EngineCall::Pause { handle: self.handle }, |state, handle| {
            let sound = &mut state.sounds[handle];
            if sound.playing {
                sound.playing = false;
                sound.events.emit(SoundEvent::Pause);
            }
        });
    }

    fn stop(&mut self) {
        self.record(EngineCall::Stop { handle: self.handle }, |state, handle| {
            let sound = &mut state.sounds[handle];
            if sound.loaded {
                sound.playing = false;
                sound.events.emit(SoundEvent::Stop);
            }
        });
    }

    fn unload(&mut self) {
        self.record(EngineCall::Unload { handle: self.handle }, |state, handle| {
            if state.sounds[handle].loaded {
                state.sounds[handle].loaded = false;
                state.sounds[handle].playing = false;
                state.live -= 1;
            }
        });
    }

    fn playing(&self) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.sounds[self.handle].playing
    }

    fn set_loop(&mut self, looping: bool) {
        self.record(
            EngineCall::SetLoop {
                handle: self.handle,
                looping,
            },
            |state, handle| state.sounds[handle].looping = looping,
        );
    }
}
