//! Ordered hand-off of `session/update` notifications
//!
//! The connection's reader loop pushes; one workflow at a time consumes.
//! Delivery order equals push order.

use std::sync::Arc;

use shipwright_acp_client::SessionNotification;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc};
use tracing::debug;

/// Producer handle, cheap to clone
#[derive(Debug, Clone)]
pub struct NotificationSender {
    tx: mpsc::UnboundedSender<SessionNotification>,
}

impl NotificationSender {
    /// Queue a notification; `false` once the queue has been dropped
    pub fn push(&self, notification: SessionNotification) -> bool {
        self.tx.send(notification).is_ok()
    }
}

/// Unbounded multi-producer single-consumer queue
#[derive(Debug)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<SessionNotification>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<SessionNotification>>>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn sender(&self) -> NotificationSender {
        NotificationSender {
            tx: self.tx.clone(),
        }
    }

    /// Exclusive consumer access; waits while another consumer holds it
    pub async fn consumer(&self) -> QueueConsumer {
        QueueConsumer {
            rx: Arc::clone(&self.rx).lock_owned().await,
        }
    }
}

/// The single consumer of a [`NotificationQueue`]
pub struct QueueConsumer {
    rx: OwnedMutexGuard<mpsc::UnboundedReceiver<SessionNotification>>,
}

impl QueueConsumer {
    /// Next notification, waiting until one arrives
    pub async fn recv(&mut self) -> Option<SessionNotification> {
        self.rx.recv().await
    }

    /// Next notification if one is already buffered
    pub fn try_recv(&mut self) -> Option<SessionNotification> {
        match self.rx.try_recv() {
            Ok(notification) => Some(notification),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Everything currently buffered, in order
    pub fn drain(&mut self) -> Vec<SessionNotification> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Drop leftovers from an earlier run; returns how many were dropped
    pub fn discard_stale(&mut self) -> usize {
        let stale = self.drain().len();
        if stale > 0 {
            debug!(count = stale, "Discarded stale session notifications");
        }
        stale
    }
}
