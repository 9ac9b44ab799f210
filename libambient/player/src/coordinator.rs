use std::mem;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{Sleep, sleep};
use tracing::{debug, error, info, warn};

use crate::countdown::Countdown;
use crate::dto::command::Command;
use crate::dto::instance_id::InstanceId;
use crate::dto::message::Message;
use crate::dto::playback_state::PlaybackState;
use crate::dto::player_snapshot::PlayerSnapshot;
use crate::dto::request::Request;
use crate::dto::role::Role;
use crate::dto::sound_event::SoundEvent;
use crate::dto::track::Track;
use crate::engine::{AudioEngine, SoundEvents, SoundHandle, SoundOptions};
use crate::listener_registry::ListenerRegistry;
use crate::messenger::Messenger;
use crate::settings::Settings;
use crate::state_cache::StateCache;

/// Listener collections shared between the coordinator and the handles that subscribe to
/// them.
#[derive(Clone, Default)]
pub(crate) struct Listeners {
    pub(crate) playback: ListenerRegistry<bool>,
    pub(crate) looping: ListenerRegistry<bool>,
    pub(crate) timer: ListenerRegistry<u32>,
}

/// One instance's side of the cross-tab player. Only the owner holds a sound, every other
/// instance forwards requests to it and mirrors the state it broadcasts.
pub(crate) struct Coordinator<E: AudioEngine> {
    id: InstanceId,
    settings: Settings,
    role: Role,
    is_playing: bool,
    track_id: Option<String>,
    track: Option<Arc<Track>>,
    is_looping: bool,
    engine: E,
    sound: Option<Box<dyn SoundHandle>>,
    // Bumped whenever a sound is created or discarded so late events from old sounds are
    // recognizable
    generation: u64,
    sound_tx: flume::Sender<(u64, SoundEvent)>,
    cache: StateCache,
    // Requests made before the ownership negotiation settled
    pending: Vec<Request>,
    listeners: Listeners,
    snapshot_tx: watch::Sender<PlayerSnapshot>,
    pub(crate) messenger: Messenger,
    pub(crate) countdown: Countdown,
    pub(crate) claim_deadline: Option<Pin<Box<Sleep>>>,
}

pub(crate) struct CoordinatorParts<E: AudioEngine> {
    pub(crate) id: InstanceId,
    pub(crate) settings: Settings,
    pub(crate) engine: E,
    pub(crate) messenger: Messenger,
    pub(crate) cache: StateCache,
    pub(crate) listeners: Listeners,
    pub(crate) sound_tx: flume::Sender<(u64, SoundEvent)>,
    pub(crate) snapshot_tx: watch::Sender<PlayerSnapshot>,
}

impl<E: AudioEngine> Coordinator<E> {
    pub(crate) fn new(parts: CoordinatorParts<E>) -> Self {
        let countdown =
            Countdown::with_listeners(parts.settings.tick_interval, parts.listeners.timer.clone());
        Self {
            id: parts.id,
            settings: parts.settings,
            role: Role::Unclaimed,
            is_playing: false,
            track_id: None,
            track: None,
            is_looping: false,
            engine: parts.engine,
            sound: None,
            generation: 0,
            sound_tx: parts.sound_tx,
            cache: parts.cache,
            pending: vec![],
            listeners: parts.listeners,
            snapshot_tx: parts.snapshot_tx,
            messenger: parts.messenger,
            countdown,
            claim_deadline: None,
        }
    }

    /// Restores the last known state and starts looking for an owner.
    pub(crate) async fn start(&mut self) {
        if let Some(cached) = self.cache.load().await {
            info!("Restoring cached player state for track {:?}", cached.track_id);
            self.assign(cached);
            self.notify_playback_and_loop();
        }
        self.begin_claim();
    }

    pub(crate) async fn handle_command(&mut self, command: Command) {
        let request = match command {
            Command::LoadTrack { track, autoplay } => Request::LoadTrack { track, autoplay },
            Command::Play => Request::Play {
                track_id: self.track_id.clone(),
            },
            Command::Pause => Request::Pause,
            Command::Stop => Request::Stop,
            Command::SetLoop(looping) => Request::SetLoop(looping),
            Command::SetRemainingTime(seconds) => {
                Request::SetRemainingTime(normalize_seconds(seconds))
            }
            Command::Destroy => {
                self.destroy().await;
                return;
            }
        };
        self.dispatch(request).await;
    }

    async fn dispatch(&mut self, request: Request) {
        match self.role {
            Role::Owner => self.apply(request).await,
            Role::Follower => self.messenger.broadcast(&request.into_message()),
            Role::Unclaimed | Role::ClaimPending => {
                debug!("Ownership not settled yet, deferring {request}");
                self.pending.push(request);
            }
        }
    }

    async fn apply(&mut self, request: Request) {
        debug!("Applying {request}");
        match request {
            Request::Play { track_id } => {
                if track_id.is_some() && track_id != self.track_id {
                    debug!(
                        "Ignoring play request for {track_id:?}, current track is {:?}",
                        self.track_id
                    );
                    return;
                }
                self.play_internal().await;
            }
            Request::Pause => self.pause_internal().await,
            Request::Stop => self.stop_internal().await,
            Request::LoadTrack { track, autoplay } => {
                self.load_track_internal(track, autoplay).await;
            }
            Request::SetLoop(looping) => self.set_loop_internal(looping).await,
            Request::SetRemainingTime(seconds) => self.set_remaining_time_internal(seconds).await,
        }
    }

    async fn load_track_internal(&mut self, track: Arc<Track>, autoplay: bool) {
        self.discard_sound();
        self.reset_state();
        self.track_id = Some(track.id.clone());
        self.track = Some(track.clone());
        self.create_sound(&track);

        if autoplay {
            self.play_internal().await;
        } else {
            self.sync_state().await;
        }
    }

    async fn play_internal(&mut self) {
        // The engine reports back through the play event which syncs the new state
        if let Some(sound) = self.sound.as_mut().filter(|s| !s.playing()) {
            sound.play();
        } else {
            self.sync_state().await;
        }
    }

    async fn pause_internal(&mut self) {
        if let Some(sound) = self.sound.as_mut().filter(|s| s.playing()) {
            sound.pause();
        } else {
            self.sync_state().await;
        }
    }

    async fn stop_internal(&mut self) {
        self.discard_sound();
        self.reset_state();
        self.sync_state().await;
    }

    async fn set_loop_internal(&mut self, looping: bool) {
        self.set_looping(looping);
        if let Some(sound) = self.sound.as_mut() {
            sound.set_loop(looping);
        }
        self.sync_state().await;
    }

    async fn set_remaining_time_internal(&mut self, seconds: u32) {
        self.countdown.set_remaining_time(seconds as i64);
        if self.is_playing && seconds > 0 {
            self.countdown.start();
        } else if self.countdown.is_running() {
            self.countdown.stop();
        }
        self.sync_state().await;
    }

    pub(crate) async fn handle_sound_event(&mut self, generation: u64, event: SoundEvent) {
        if generation != self.generation || self.sound.is_none() {
            debug!("Ignoring {event} from a discarded sound");
            return;
        }
        debug!("Sound event {event}");

        match event {
            SoundEvent::Play => {
                self.set_playing(true);
                if self.countdown.remaining_time() > 0 && !self.countdown.is_running() {
                    self.countdown.start();
                }
                self.sync_state().await;
            }
            SoundEvent::Pause => {
                self.set_playing(false);
                self.countdown.stop();
                self.sync_state().await;
            }
            SoundEvent::Stop => {
                self.set_playing(false);
                self.countdown.set_remaining_time(0);
                self.sync_state().await;
            }
            SoundEvent::End => {
                if self.is_looping {
                    if let Some(sound) = self.sound.as_mut() {
                        debug!("Replaying looped track");
                        sound.play();
                    }
                } else {
                    self.set_playing(false);
                    self.countdown.set_remaining_time(0);
                    self.sync_state().await;
                }
            }
            SoundEvent::LoadError(e) => {
                error!("Error loading audio for track {:?}: {e}", self.track_id);
                self.set_playing(false);
                self.sync_state().await;
            }
        }
    }

    pub(crate) async fn on_countdown_tick(&mut self, remaining: u32) {
        if !self.role.is_owner() {
            return;
        }
        if remaining == 0 && self.is_looping {
            info!("Sleep timer finished, turning off looping");
            self.set_loop_internal(false).await;
        } else {
            self.sync_state().await;
        }
    }

    pub(crate) async fn handle_message(&mut self, message: Message) {
        match message {
            Message::WhoIsOwner => {
                if self.role.is_owner() {
                    self.messenger
                        .broadcast(&Message::IAmOwner { owner: self.id });
                    self.messenger
                        .broadcast(&Message::StateUpdate(self.current_state()));
                }
            }
            Message::SetOwner { owner } | Message::IAmOwner { owner } => {
                self.on_owner_announced(owner).await;
            }
            Message::ReleaseOwner { owner } => {
                if self.role == Role::Follower {
                    info!("Owner {owner} released ownership");
                    self.begin_claim();
                }
            }
            Message::StateUpdate(update) => self.adopt(update).await,
            other => {
                if let Some(request) = Request::from_message(other) {
                    if self.role.is_owner() {
                        self.apply(request).await;
                    } else {
                        debug!("Not the owner, ignoring {request}");
                    }
                }
            }
        }
    }

    async fn on_owner_announced(&mut self, owner: InstanceId) {
        if owner == self.id {
            return;
        }
        match self.role {
            Role::Owner if self.id < owner => {
                info!("Instance {owner} also claims ownership, keeping it");
                self.messenger
                    .broadcast(&Message::IAmOwner { owner: self.id });
            }
            Role::Owner => {
                info!("Yielding ownership to {owner}");
                let handover = self.handover_state();
                self.relinquish();
                self.become_follower();
                if handover.track_id.is_some() {
                    self.messenger.broadcast(&Message::StateUpdate(handover));
                }
            }
            Role::Unclaimed | Role::ClaimPending | Role::Follower => self.become_follower(),
        }
    }

    fn begin_claim(&mut self) {
        debug!("Looking for an owner");
        self.role = Role::ClaimPending;
        self.messenger.broadcast(&Message::WhoIsOwner);
        self.claim_deadline = Some(Box::pin(sleep(self.settings.claim_timeout)));
        self.publish();
    }

    pub(crate) async fn claim_ownership(&mut self) {
        self.claim_deadline = None;
        if self.role != Role::ClaimPending {
            return;
        }
        info!("No owner responded, instance {} is taking ownership", self.id);
        self.role = Role::Owner;
        self.messenger.broadcast(&Message::SetOwner { owner: self.id });

        match self.track.clone() {
            Some(track) => self.restore_sound(track).await,
            None => {
                if self.track_id.is_some() {
                    warn!("Track details for {:?} are unknown, not restoring", self.track_id);
                }
                self.publish();
            }
        }

        for request in mem::take(&mut self.pending) {
            self.apply(request).await;
        }
    }

    fn become_follower(&mut self) {
        self.claim_deadline = None;
        if self.role != Role::Follower {
            info!("Instance {} is following", self.id);
        }
        self.role = Role::Follower;
        for request in mem::take(&mut self.pending) {
            self.messenger.broadcast(&request.into_message());
        }
        self.publish();
    }

    // Picks up where the previous owner left off, keeping the loop and timer values
    async fn restore_sound(&mut self, track: Arc<Track>) {
        self.create_sound(&track);
        if self.is_playing {
            if let Some(sound) = self.sound.as_mut() {
                sound.play();
            }
            self.publish();
        } else {
            self.sync_state().await;
        }
    }

    // A sound asked to play may not have reported back yet
    fn handover_state(&self) -> PlaybackState {
        let mut state = self.current_state();
        state.is_playing |= self.sound.as_ref().is_some_and(|sound| sound.playing());
        state
    }

    fn relinquish(&mut self) {
        self.discard_sound();
        if self.countdown.is_running() {
            self.countdown.stop();
        }
    }

    async fn adopt(&mut self, update: PlaybackState) {
        let next = match self.current_state().apply_update(update) {
            Ok(next) => next,
            Err(e) => {
                warn!("Rejecting state update: {e}");
                return;
            }
        };
        let countdown_active = next.is_playing && next.has_active_countdown();
        let sounding_track = self.sound.as_ref().and(self.track_id.clone());
        self.assign(next);
        self.notify_playback_and_loop();

        if self.role.is_owner() {
            if countdown_active {
                if !self.countdown.is_running() {
                    self.countdown.start();
                }
            } else if self.countdown.is_running() {
                self.countdown.stop();
            }
            self.align_sound(sounding_track).await;
        }
        self.publish();
    }

    // The owner's sound follows whatever state it adopts
    async fn align_sound(&mut self, sounding_track: Option<String>) {
        match self.track.clone() {
            Some(track) if sounding_track.as_deref() != Some(track.id.as_str()) => {
                info!("Taking over playback of track {}", track.id);
                self.discard_sound();
                self.restore_sound(track).await;
            }
            Some(_) => {
                if let Some(sound) = self.sound.as_mut() {
                    if self.is_playing && !sound.playing() {
                        sound.play();
                    } else if !self.is_playing && sound.playing() {
                        sound.pause();
                    }
                }
            }
            None => {
                if self.track_id.is_none() {
                    self.discard_sound();
                }
            }
        }
    }

    fn assign(&mut self, state: PlaybackState) {
        self.is_playing = state.is_playing;
        self.track_id = state.track_id;
        self.track = state.track;
        self.is_looping = state.is_looping;
        self.countdown.set_remaining_time(state.remaining_time as i64);
    }

    pub(crate) async fn destroy(&mut self) {
        info!("Destroying player instance {}", self.id);
        if self.role.is_owner() {
            self.stop_internal().await;
            self.messenger.broadcast(&Message::StopRequest);
            self.messenger
                .broadcast(&Message::ReleaseOwner { owner: self.id });
        } else {
            self.discard_sound();
        }
        self.countdown.stop();
        self.claim_deadline = None;
        self.pending.clear();
        self.role = Role::Unclaimed;

        self.listeners.playback.notify(&false);
        self.listeners.looping.notify(&false);
        self.listeners.timer.notify(&0);
        self.messenger.close();
        self.publish();
    }

    fn create_sound(&mut self, track: &Track) {
        self.generation += 1;
        info!("Creating sound for track {}", track.id);
        let events = SoundEvents::new(self.generation, self.sound_tx.clone());
        let options = SoundOptions {
            looping: self.is_looping,
        };
        self.sound = Some(self.engine.create(&track.stream_url, options, events));
    }

    fn discard_sound(&mut self) {
        if let Some(mut sound) = self.sound.take() {
            self.generation += 1;
            sound.stop();
            sound.unload();
        }
    }

    fn reset_state(&mut self) {
        self.track_id = None;
        self.track = None;
        self.set_looping(false);
        self.set_playing(false);
        self.countdown.set_remaining_time(0);
    }

    fn set_playing(&mut self, is_playing: bool) {
        self.is_playing = is_playing;
        self.listeners.playback.notify(&is_playing);
    }

    fn set_looping(&mut self, looping: bool) {
        self.is_looping = looping;
        self.listeners.looping.notify(&looping);
    }

    fn notify_playback_and_loop(&self) {
        self.listeners.playback.notify(&self.is_playing);
        self.listeners.looping.notify(&self.is_looping);
    }

    fn current_state(&self) -> PlaybackState {
        PlaybackState {
            is_playing: self.is_playing,
            track_id: self.track_id.clone(),
            track: self.track.clone(),
            is_looping: self.is_looping,
            remaining_time: self.countdown.remaining_time(),
        }
    }

    async fn sync_state(&mut self) {
        let state = self.current_state();
        self.cache.save(&state).await;
        self.messenger.broadcast(&Message::StateUpdate(state));
        self.publish();
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(PlayerSnapshot {
            state: self.current_state(),
            role: self.role,
        });
    }
}

fn normalize_seconds(seconds: Option<i64>) -> u32 {
    match seconds {
        Some(seconds) if seconds > 0 => seconds.min(u32::MAX as i64) as u32,
        _ => 0,
    }
}
