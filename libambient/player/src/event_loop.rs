use std::future::pending;
use std::pin::Pin;

use flume::Receiver;
use tokio::time::Sleep;
use tracing::{debug, error, info};

use crate::{
    coordinator::Coordinator,
    dto::{command::Command, player_response::PlayerResponse, sound_event::SoundEvent},
    engine::AudioEngine,
    two_way_channel::TwoWayReceiver,
};

pub(crate) async fn main_loop<E: AudioEngine>(
    mut receiver: TwoWayReceiver<Command, PlayerResponse>,
    sound_rx: Receiver<(u64, SoundEvent)>,
    mut coordinator: Coordinator<E>,
) {
    coordinator.start().await;

    loop {
        tokio::select! {
            next_command = receiver.recv_async() => {
                let Ok(next_command) = next_command else {
                    info!("All player handles dropped");
                    coordinator.destroy().await;
                    break;
                };
                info!("Got command {next_command}");
                if let Command::Destroy = next_command {
                    coordinator.destroy().await;
                    if let Err(e) = receiver.respond(PlayerResponse::Destroyed) {
                        error!("Error sending destroy response: {e:?}");
                    }
                    break;
                }
                coordinator.handle_command(next_command).await;
                debug!("Completed command");
            }
            message = coordinator.messenger.recv() => {
                debug!("Got message {message}");
                coordinator.handle_message(message).await;
            }
            Ok((generation, event)) = sound_rx.recv_async() => {
                coordinator.handle_sound_event(generation, event).await;
            }
            _ = wait_for_deadline(&mut coordinator.claim_deadline) => {
                coordinator.claim_ownership().await;
            }
            remaining = coordinator.countdown.tick() => {
                coordinator.on_countdown_tick(remaining).await;
            }
        }
    }
    info!("Player loop completed");
}

async fn wait_for_deadline(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(deadline) => deadline.as_mut().await,
        None => pending().await,
    }
}
