use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::messenger::{BroadcastChannel, TransportError};

const TOPIC_CAPACITY: usize = 256;

#[derive(Clone, Debug)]
struct Frame {
    origin: u64,
    body: String,
}

#[derive(Default)]
struct Topics {
    senders: HashMap<String, broadcast::Sender<Frame>>,
}

/// In-process stand-in for the browser's broadcast channel. Every channel opened on the
/// same topic receives what the others post, never its own frames.
#[derive(Clone, Default)]
pub struct LocalBus {
    topics: Arc<Mutex<Topics>>,
    next_id: Arc<AtomicU64>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, name: &str) -> LocalChannel {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        let tx = topics
            .senders
            .entry(name.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone();
        let rx = tx.subscribe();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("Opened channel {id} on topic {name}");

        LocalChannel {
            name: name.to_owned(),
            id,
            tx: Some(tx),
            rx: Some(rx),
        }
    }
}

#[derive(Debug)]
pub struct LocalChannel {
    name: String,
    id: u64,
    tx: Option<broadcast::Sender<Frame>>,
    rx: Option<broadcast::Receiver<Frame>>,
}

#[async_trait]
impl BroadcastChannel for LocalChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn post_message(&self, frame: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        // Nobody listening is fine, the frame is simply dropped
        let _ = tx.send(Frame {
            origin: self.id,
            body: frame,
        });
        Ok(())
    }

    async fn recv(&mut self) -> Option<String> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.recv().await {
                Ok(frame) if frame.origin == self.id => continue,
                Ok(frame) => return Some(frame.body),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Channel {} lagged, skipped {skipped} frames", self.name);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn close(&mut self) {
        self.tx = None;
        self.rx = None;
    }
}
