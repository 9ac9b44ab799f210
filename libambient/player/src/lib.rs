mod coordinator;
mod countdown;
mod dto;
mod engine;
mod event_loop;
mod listener_registry;
mod local_bus;
mod messenger;
mod mock_engine;
mod settings;
mod state_cache;
mod store;
mod two_way_channel;

pub use mock_engine::{EngineCall, MockEngine};

pub mod ambient_player {
    use std::sync::Arc;

    use derivative::Derivative;
    use thiserror::Error;
    use tokio::sync::watch;
    use tracing::info;

    use crate::coordinator::{Coordinator, CoordinatorParts, Listeners};
    pub use crate::countdown::Countdown;
    use crate::dto::command::Command;
    pub use crate::dto::instance_id::InstanceId;
    pub use crate::dto::message::Message;
    pub use crate::dto::playback_state::{PlaybackState, StateError};
    use crate::dto::player_response::PlayerResponse;
    pub use crate::dto::player_snapshot::PlayerSnapshot;
    pub use crate::dto::role::Role;
    pub use crate::dto::sound_event::SoundEvent;
    pub use crate::dto::track::Track;
    pub use crate::engine::{AudioEngine, SoundEvents, SoundHandle, SoundOptions};
    use crate::event_loop::main_loop;
    pub use crate::listener_registry::{ListenerRegistry, Subscription};
    pub use crate::local_bus::{LocalBus, LocalChannel};
    pub use crate::messenger::{BroadcastChannel, Messenger, TransportError};
    pub use crate::settings::Settings;
    pub use crate::state_cache::StateCache;
    pub use crate::store::{FileStore, KeyValueStore, MemoryStore, StoreError};
    use crate::two_way_channel::{TwoWaySender, two_way_channel};

    #[derive(Debug, Clone, Error)]
    #[error("{0}")]
    pub struct PlayerError(String);

    /// Handle to one instance of the shared player. Every instance opened on the same
    /// channel cooperates so only one of them produces sound, the others follow its state.
    #[derive(Derivative)]
    #[derivative(Debug)]
    pub struct AmbientPlayer {
        id: InstanceId,
        cmd_sender: TwoWaySender<Command, PlayerResponse>,
        snapshot_rx: watch::Receiver<PlayerSnapshot>,
        #[derivative(Debug = "ignore")]
        listeners: Listeners,
        #[derivative(Debug = "ignore")]
        message_listeners: ListenerRegistry<Message>,
    }

    impl AmbientPlayer {
        /// Starts a player instance. Must be called from within a tokio runtime.
        pub fn new<E, S>(
            engine: E,
            channel: impl BroadcastChannel + 'static,
            store: S,
            settings: Settings,
        ) -> Self
        where
            E: AudioEngine,
            S: KeyValueStore + 'static,
        {
            let id = InstanceId::new();
            info!("Starting player instance {id} on channel {}", channel.name());

            let (cmd_tx, cmd_rx) = two_way_channel();
            let (sound_tx, sound_rx) = flume::unbounded();
            let (snapshot_tx, snapshot_rx) = watch::channel(PlayerSnapshot::default());
            let listeners = Listeners::default();
            let messenger = Messenger::new(Box::new(channel));
            let message_listeners = messenger.listeners();
            let cache = StateCache::new(
                Box::new(store),
                settings.storage_key.clone(),
                settings.cache_max_age,
            );

            let coordinator = Coordinator::new(CoordinatorParts {
                id,
                settings,
                engine,
                messenger,
                cache,
                listeners: listeners.clone(),
                sound_tx,
                snapshot_tx,
            });
            tokio::spawn(main_loop(cmd_rx, sound_rx, coordinator));

            AmbientPlayer {
                id,
                cmd_sender: cmd_tx,
                snapshot_rx,
                listeners,
                message_listeners,
            }
        }

        /// Opens the channel named in `settings` on an in-process bus.
        pub fn with_bus<E, S>(engine: E, bus: &LocalBus, store: S, settings: Settings) -> Self
        where
            E: AudioEngine,
            S: KeyValueStore + 'static,
        {
            let channel = bus.open(&settings.channel_name);
            Self::new(engine, channel, store, settings)
        }

        pub fn instance_id(&self) -> InstanceId {
            self.id
        }

        pub async fn load_track(&self, track: Track, autoplay: bool) -> Result<(), PlayerError> {
            self.send(Command::LoadTrack {
                track: Arc::new(track),
                autoplay,
            })
            .await
        }

        pub async fn play(&self) -> Result<(), PlayerError> {
            self.send(Command::Play).await
        }

        pub async fn pause(&self) -> Result<(), PlayerError> {
            self.send(Command::Pause).await
        }

        pub async fn stop(&self) -> Result<(), PlayerError> {
            self.send(Command::Stop).await
        }

        pub async fn set_loop(&self, looping: bool) -> Result<(), PlayerError> {
            self.send(Command::SetLoop(looping)).await
        }

        /// Sets the sleep timer. Missing or negative values clear it.
        pub async fn set_remaining_time(&self, seconds: Option<i64>) -> Result<(), PlayerError> {
            self.send(Command::SetRemainingTime(seconds)).await
        }

        pub fn remaining_time(&self) -> u32 {
            self.snapshot_rx.borrow().state.remaining_time
        }

        pub fn is_playing(&self) -> bool {
            self.snapshot_rx.borrow().state.is_playing
        }

        pub fn current_track_id(&self) -> Option<String> {
            self.snapshot_rx.borrow().state.track_id.clone()
        }

        pub fn is_looping_enabled(&self) -> bool {
            self.snapshot_rx.borrow().state.is_looping
        }

        pub fn is_owner(&self) -> bool {
            self.snapshot_rx.borrow().role.is_owner()
        }

        pub fn role(&self) -> Role {
            self.snapshot_rx.borrow().role
        }

        pub fn state(&self) -> PlaybackState {
            self.snapshot_rx.borrow().state.clone()
        }

        pub fn watch(&self) -> watch::Receiver<PlayerSnapshot> {
            self.snapshot_rx.clone()
        }

        pub fn subscribe_to_playback<F>(&self, listener: F) -> Subscription
        where
            F: Fn(&bool) + Send + Sync + 'static,
        {
            self.listeners.playback.subscribe(listener)
        }

        pub fn subscribe_to_loop<F>(&self, listener: F) -> Subscription
        where
            F: Fn(&bool) + Send + Sync + 'static,
        {
            self.listeners.looping.subscribe(listener)
        }

        pub fn subscribe_to_timer<F>(&self, listener: F) -> Subscription
        where
            F: Fn(&u32) + Send + Sync + 'static,
        {
            self.listeners.timer.subscribe(listener)
        }

        /// Observes every well-formed message received from other instances.
        pub fn subscribe_to_messages<F>(&self, listener: F) -> Subscription
        where
            F: Fn(&Message) + Send + Sync + 'static,
        {
            self.message_listeners.subscribe(listener)
        }

        /// Tears the instance down, handing ownership over if this instance holds it.
        /// Resolves once teardown is complete.
        pub async fn destroy(self) -> Result<(), PlayerError> {
            info!("Sending destroy command to {}", self.id);
            match self.cmd_sender.get_response(Command::Destroy).await {
                Ok(PlayerResponse::Destroyed) => Ok(()),
                Err(e) => Err(PlayerError(format!("{e:?}"))),
            }
        }

        async fn send(&self, command: Command) -> Result<(), PlayerError> {
            self.cmd_sender
                .send_async(command)
                .await
                .map_err(|e| PlayerError(format!("{e:?}")))
        }
    }
}
