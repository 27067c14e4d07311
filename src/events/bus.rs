use std::future::Future;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

const DEFAULT_BUS_CAPACITY: usize = 256;

/// Fan-out channel for one kind of event.
#[derive(Clone)]
pub struct EventBus<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl<T: Clone + Send + 'static> EventBus<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes to current subscribers. With none listening the event is dropped.
    pub fn publish(&self, event: T) {
        let _ = self.sender.send(event);
    }

    pub fn receiver(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Runs `handler` for every event until the subscription is disposed or
    /// the bus goes away.
    pub fn subscribe<F, Fut>(&self, mut handler: F) -> Subscription
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut receiver = self.receiver();
        Subscription::spawn(move |cancel| async move {
            loop {
                tokio::select! {
                    received = receiver.recv() => match received {
                        Ok(event) => handler(event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            log_warn!("event listener fell behind, skipped {skipped} events");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = cancel.cancelled() => break,
                }
            }
        })
    }
}

/// Handle to a running listener. Disposing (or dropping) it stops the listener.
pub struct Subscription {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn spawn<F, Fut>(listener: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(listener(cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stops the listener and waits for it to exit.
    pub async fn dispose(mut self) -> Result<()> {
        self.cancel.cancel();
        match self.handle.take() {
            Some(handle) => handle.await.context("event listener task failed to join"),
            None => Ok(()),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
