use async_trait::async_trait;
use tap::TapFallible;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::dto::message::Message;
use crate::listener_registry::{ListenerRegistry, Subscription};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Channel is closed")]
    Closed,
    #[error("Transport failure: {0}")]
    Other(String),
}

/// A named, cross-instance broadcast primitive. Frames posted on a channel reach every
/// other channel on the same topic but never the sender itself.
#[async_trait]
pub trait BroadcastChannel: Send {
    fn name(&self) -> &str;

    fn post_message(&self, frame: String) -> Result<(), TransportError>;

    /// Next frame posted by another instance, or `None` once the channel can't deliver
    /// anything else.
    async fn recv(&mut self) -> Option<String>;

    fn close(&mut self);
}

pub struct Messenger {
    channel: Box<dyn BroadcastChannel>,
    open: bool,
    listeners: ListenerRegistry<Message>,
}

impl Messenger {
    pub fn new(channel: Box<dyn BroadcastChannel>) -> Self {
        Self {
            channel,
            open: true,
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn broadcast(&self, message: &Message) {
        if !self.open {
            debug!("Messenger closed, not sending {message}");
            return;
        }
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Error encoding {message}: {e:?}");
                return;
            }
        };
        debug!("Sending {message} on {}", self.channel.name());
        self.channel
            .post_message(frame)
            .tap_err(|e| warn!("Error sending {message}: {e}"))
            .ok();
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub(crate) fn listeners(&self) -> ListenerRegistry<Message> {
        self.listeners.clone()
    }

    /// Waits for the next well-formed message from another instance. Frames that can't be
    /// decoded are dropped. Never resolves once the messenger is closed.
    pub async fn recv(&mut self) -> Message {
        loop {
            if !self.open {
                return std::future::pending().await;
            }
            match self.channel.recv().await {
                Some(frame) => match Message::decode(&frame) {
                    Ok(message) => {
                        debug!("Received {message} on {}", self.channel.name());
                        self.listeners.notify(&message);
                        return message;
                    }
                    Err(e) => warn!("Dropping malformed frame {frame:?}: {e}"),
                },
                None => {
                    warn!("Channel {} disconnected", self.channel.name());
                    self.open = false;
                }
            }
        }
    }

    pub fn close(&mut self) {
        if self.open {
            self.channel.close();
            self.open = false;
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}
