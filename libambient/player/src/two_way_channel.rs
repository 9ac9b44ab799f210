use flume::{Receiver, Sender};
use thiserror::Error;
use tokio::sync::oneshot::{Sender as OneShotSender, channel as oneshot_channel};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChannelError {
    #[error("Receiver was dropped")]
    Disconnected,
    #[error("Receiver did not respond")]
    NoResponse,
}

type Envelope<TIn, TOut> = (TIn, Option<OneShotSender<TOut>>);

pub(crate) fn two_way_channel<TIn, TOut>() -> (TwoWaySender<TIn, TOut>, TwoWayReceiver<TIn, TOut>) {
    let (main_tx, main_rx) = flume::unbounded();
    (
        TwoWaySender { main_tx },
        TwoWayReceiver {
            main_rx,
            oneshot: None,
        },
    )
}

#[derive(Debug)]
pub(crate) struct TwoWaySender<TIn, TOut> {
    main_tx: Sender<Envelope<TIn, TOut>>,
}

impl<TIn, TOut> Clone for TwoWaySender<TIn, TOut> {
    fn clone(&self) -> Self {
        Self {
            main_tx: self.main_tx.clone(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TwoWayReceiver<TIn, TOut> {
    main_rx: Receiver<Envelope<TIn, TOut>>,
    oneshot: Option<OneShotSender<TOut>>,
}

impl<TIn, TOut> TwoWaySender<TIn, TOut> {
    pub(crate) async fn send_async(&self, message: TIn) -> Result<(), ChannelError> {
        self.main_tx
            .send_async((message, None))
            .await
            .map_err(|_| ChannelError::Disconnected)
    }

    pub(crate) async fn get_response(&self, message: TIn) -> Result<TOut, ChannelError> {
        let (oneshot_tx, oneshot_rx) = oneshot_channel();
        self.main_tx
            .send_async((message, Some(oneshot_tx)))
            .await
            .map_err(|_| ChannelError::Disconnected)?;
        oneshot_rx.await.map_err(|_| ChannelError::NoResponse)
    }
}

impl<TIn, TOut> TwoWayReceiver<TIn, TOut> {
    pub(crate) async fn recv_async(&mut self) -> Result<TIn, ChannelError> {
        let (message, oneshot) = self
            .main_rx
            .recv_async()
            .await
            .map_err(|_| ChannelError::Disconnected)?;
        self.oneshot = oneshot;
        Ok(message)
    }

    /// Answers the message most recently received, if the sender asked for an answer.
    pub(crate) fn respond(&mut self, response: TOut) -> Result<(), TOut> {
        match self.oneshot.take() {
            Some(oneshot) => oneshot.send(response),
            None => Ok(()),
        }
    }
}
